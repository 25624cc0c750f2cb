//! Map annotations and their ranking score.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

/// Ranking score of an annotation. Always non-negative.
///
/// Negative inputs clamp to zero; this is a business rule, not an error.
/// Deserialization applies the same clamp.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "i64", into = "u32")]
pub struct Score(u32);

impl Score {
    pub const ZERO: Score = Score(0);

    pub fn new(raw: i64) -> Self {
        Score(raw.clamp(0, u32::MAX as i64) as u32)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<i64> for Score {
    fn from(raw: i64) -> Self {
        Score::new(raw)
    }
}

impl From<u32> for Score {
    fn from(raw: u32) -> Self {
        Score(raw)
    }
}

impl From<Score> for u32 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// What an annotation points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Post,
    User,
    Poi,
    #[default]
    Generic,
}

/// An immutable map marker with a coordinate and a ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    id: String,
    coordinate: Coordinate,
    #[serde(default)]
    score: Score,
    #[serde(default)]
    kind: AnnotationKind,
}

impl Annotation {
    pub fn new(
        id: impl Into<String>,
        coordinate: Coordinate,
        score: i64,
        kind: AnnotationKind,
    ) -> Self {
        Self {
            id: id.into(),
            coordinate,
            score: Score::new(score),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }
}
