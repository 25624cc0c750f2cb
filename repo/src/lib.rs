//! Remote-first entity repositories with cache fallback.
//!
//! A [`ResilientRepository`] pairs a [`RemoteSource`] with a shared
//! [`geofeed_cache::BoundedCache`]. Reads prefer the remote and degrade to
//! the last cached value when the remote fails; writes go straight to the
//! remote and update the cache on success. [`ThumbnailResolver`] applies the
//! same cache to image bytes.

pub mod entity;
pub mod error;
pub mod fake;
pub mod fault;
mod guard;
pub mod live;
pub mod local;
pub mod remote;
pub mod repository;
pub mod thumbnail;

pub use entity::{BatchPolicy, Entity, Media, MediaId, Post, PostId, User, UserId};
pub use error::RepoError;
pub use fake::FakeRemote;
pub use fault::{RepositoryConfig, SimulatedFaultSource};
pub use live::LiveRemote;
pub use local::CachedLocal;
pub use remote::RemoteSource;
pub use repository::ResilientRepository;
pub use thumbnail::{HttpMediaLoader, MediaLoader, ThumbnailResolver};
