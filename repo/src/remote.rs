use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::RepoError;

/// RemoteSource is the source of truth a repository reads through.
///
/// It may be backed by a network service ([`LiveRemote`](crate::LiveRemote)),
/// an in-memory stub ([`FakeRemote`](crate::FakeRemote)) or the local cache
/// itself ([`CachedLocal`](crate::CachedLocal)). Implementations must be safe
/// for concurrent use.
#[async_trait]
pub trait RemoteSource<E: Entity>: Send + Sync {
    /// Fetch a single entity.
    async fn fetch(&self, id: &E::Id) -> Result<E, RepoError>;

    /// Fetch several entities at once.
    ///
    /// Ids the source does not know are omitted from the result rather than
    /// failing the call. The default implementation fetches one id at a time.
    async fn fetch_batch(&self, ids: &[E::Id]) -> Result<Vec<E>, RepoError> {
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch(id).await {
                Ok(entity) => entities.push(entity),
                Err(RepoError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(entities)
    }

    /// Create an entity, returning it as stored by the source.
    async fn create(&self, entity: E) -> Result<E, RepoError>;

    /// Replace an existing entity, returning it as stored by the source.
    async fn update(&self, entity: E) -> Result<E, RepoError>;

    /// Delete an entity.
    async fn delete(&self, id: &E::Id) -> Result<(), RepoError>;
}

#[async_trait]
impl<E: Entity, R: RemoteSource<E> + ?Sized> RemoteSource<E> for Arc<R> {
    async fn fetch(&self, id: &E::Id) -> Result<E, RepoError> {
        (**self).fetch(id).await
    }

    async fn fetch_batch(&self, ids: &[E::Id]) -> Result<Vec<E>, RepoError> {
        (**self).fetch_batch(ids).await
    }

    async fn create(&self, entity: E) -> Result<E, RepoError> {
        (**self).create(entity).await
    }

    async fn update(&self, entity: E) -> Result<E, RepoError> {
        (**self).update(entity).await
    }

    async fn delete(&self, id: &E::Id) -> Result<(), RepoError> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<E: Entity, R: RemoteSource<E> + ?Sized> RemoteSource<E> for Box<R> {
    async fn fetch(&self, id: &E::Id) -> Result<E, RepoError> {
        (**self).fetch(id).await
    }

    async fn fetch_batch(&self, ids: &[E::Id]) -> Result<Vec<E>, RepoError> {
        (**self).fetch_batch(ids).await
    }

    async fn create(&self, entity: E) -> Result<E, RepoError> {
        (**self).create(entity).await
    }

    async fn update(&self, entity: E) -> Result<E, RepoError> {
        (**self).update(entity).await
    }

    async fn delete(&self, id: &E::Id) -> Result<(), RepoError> {
        (**self).delete(id).await
    }
}
