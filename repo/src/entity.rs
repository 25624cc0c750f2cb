//! Entity abstraction and the concrete entity types served by repositories.

use std::fmt;
use std::hash::Hash;

use geofeed_geo::{Annotation, AnnotationKind, Coordinate, Score};
use serde::{Deserialize, Serialize};

/// How a batch fetch treats ids it could resolve neither remotely nor from
/// the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Skip unresolved ids and return what was resolved.
    BestEffort,
    /// Fail the whole batch on the first unresolved id.
    AllOrNothing,
}

/// A domain object identified by a stable id.
///
/// The resilient fetch protocol is identical for every entity; only the id
/// type, the cache cost estimate and the batch policy vary.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    const BATCH_POLICY: BatchPolicy = BatchPolicy::BestEffort;

    fn id(&self) -> Self::Id;

    /// Estimated size used as the cache cost.
    fn cost(&self) -> usize {
        1
    }
}

/// Serialized JSON length, or 1 if the value does not serialize.
fn json_cost<T: Serialize>(value: &T) -> usize {
    serde_json::to_vec(value).map_or(1, |bytes| bytes.len().max(1))
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a [`Post`].
    PostId
);
string_id!(
    /// Identifier of a [`Media`] item.
    MediaId
);
string_id!(
    /// Identifier of a [`User`].
    UserId
);

/// A feed post, optionally pinned to a map location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media: Vec<MediaId>,
    #[serde(default)]
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
}

impl Post {
    pub fn new(id: impl Into<PostId>, author: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            caption: String::new(),
            media: Vec::new(),
            score: Score::ZERO,
            location: None,
        }
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = caption.to_string();
        self
    }

    pub fn with_media(mut self, media: impl Into<MediaId>) -> Self {
        self.media.push(media.into());
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Score::new(score);
        self
    }

    pub fn with_location(mut self, location: Coordinate) -> Self {
        self.location = Some(location);
        self
    }

    /// The map pin for this post, if it has a location.
    pub fn annotation(&self) -> Option<Annotation> {
        self.location.map(|at| {
            Annotation::new(
                self.id.as_str(),
                at,
                i64::from(self.score.get()),
                AnnotationKind::Post,
            )
        })
    }
}

/// Feeds tolerate holes: a post that cannot be resolved is left out.
impl Entity for Post {
    type Id = PostId;

    fn id(&self) -> PostId {
        self.id.clone()
    }

    fn cost(&self) -> usize {
        json_cost(self)
    }
}

/// An image attached to posts, with a smaller thumbnail rendition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: MediaId,
    pub url: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Media {
    pub fn new(id: impl Into<MediaId>, url: &str, thumbnail_url: &str) -> Self {
        Self {
            id: id.into(),
            url: url.to_string(),
            thumbnail_url: thumbnail_url.to_string(),
            width: 0,
            height: 0,
        }
    }
}

/// Galleries render whatever media resolved.
impl Entity for Media {
    type Id = MediaId;

    fn id(&self) -> MediaId {
        self.id.clone()
    }

    fn cost(&self) -> usize {
        json_cost(self)
    }
}

/// A user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(id: impl Into<UserId>, display_name: &str) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.to_string(),
            avatar_url: None,
        }
    }
}

/// Participant lists must be complete: a missing user fails the batch.
impl Entity for User {
    type Id = UserId;

    const BATCH_POLICY: BatchPolicy = BatchPolicy::AllOrNothing;

    fn id(&self) -> UserId {
        self.id.clone()
    }

    fn cost(&self) -> usize {
        json_cost(self)
    }
}
