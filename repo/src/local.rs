use async_trait::async_trait;
use geofeed_cache::BoundedCache;

use crate::entity::Entity;
use crate::error::RepoError;
use crate::remote::RemoteSource;

/// A read-only source that answers from a shared cache.
///
/// Used to run screens offline against whatever earlier fetches left in the
/// cache. Writes fail with [`RepoError::RemoteUnavailable`]: there is no
/// upstream to write through to.
#[derive(Debug, Clone)]
pub struct CachedLocal<E: Entity> {
    cache: BoundedCache<E::Id, E>,
}

impl<E: Entity> CachedLocal<E> {
    pub fn new(cache: BoundedCache<E::Id, E>) -> Self {
        Self { cache }
    }
}

fn read_only() -> RepoError {
    RepoError::RemoteUnavailable("cached local source is read-only".into())
}

#[async_trait]
impl<E: Entity> RemoteSource<E> for CachedLocal<E> {
    async fn fetch(&self, id: &E::Id) -> Result<E, RepoError> {
        self.cache
            .get(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    async fn create(&self, _entity: E) -> Result<E, RepoError> {
        Err(read_only())
    }

    async fn update(&self, _entity: E) -> Result<E, RepoError> {
        Err(read_only())
    }

    async fn delete(&self, _id: &E::Id) -> Result<(), RepoError> {
        Err(read_only())
    }
}
