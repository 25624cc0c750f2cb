//! Deterministic latency and failure injection for non-production wiring.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::entity::Entity;
use crate::error::RepoError;
use crate::remote::RemoteSource;

/// Builder-style configuration for test and mock repositories.
///
/// Treated as an immutable value once handed to a repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig<E: Entity> {
    /// Delay applied before every remote call.
    pub simulated_remote_delay: Duration,
    /// When set, every remote call fails after the delay.
    pub should_simulate_failure: bool,
    /// Fixed entities served instead of the remote, and seeded into the
    /// repository cache.
    pub preloaded_cache: HashMap<E::Id, E>,
    /// Upper bound on a single remote call.
    pub remote_timeout: Option<Duration>,
}

impl<E: Entity> Default for RepositoryConfig<E> {
    fn default() -> Self {
        Self {
            simulated_remote_delay: Duration::ZERO,
            should_simulate_failure: false,
            preloaded_cache: HashMap::new(),
            remote_timeout: None,
        }
    }
}

impl<E: Entity> RepositoryConfig<E> {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.simulated_remote_delay = delay;
        self
    }

    pub fn with_failure(mut self, fail: bool) -> Self {
        self.should_simulate_failure = fail;
        self
    }

    pub fn with_preloaded(mut self, entities: impl IntoIterator<Item = E>) -> Self {
        self.preloaded_cache
            .extend(entities.into_iter().map(|e| (e.id(), e)));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = Some(timeout);
        self
    }
}

/// Wraps a remote source and injects the faults described by a
/// [`RepositoryConfig`].
///
/// Every call first waits `simulated_remote_delay`. Then:
/// - with `should_simulate_failure`, the call fails with
///   [`RepoError::RemoteUnavailable`];
/// - with a non-empty `preloaded_cache`, reads are answered from that map and
///   never reach the inner source;
/// - otherwise the call is delegated.
pub struct SimulatedFaultSource<E: Entity, R> {
    inner: R,
    config: RepositoryConfig<E>,
}

impl<E: Entity, R> SimulatedFaultSource<E, R> {
    pub fn new(inner: R, config: RepositoryConfig<E>) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RepositoryConfig<E> {
        &self.config
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn inject(&self, op: &'static str) -> Result<(), RepoError> {
        let delay = self.config.simulated_remote_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.config.should_simulate_failure {
            debug!(op, ?delay, "repo: simulated remote failure");
            return Err(RepoError::RemoteUnavailable("simulated failure".into()));
        }
        Ok(())
    }

    fn preloaded(&self) -> Option<&HashMap<E::Id, E>> {
        (!self.config.preloaded_cache.is_empty()).then_some(&self.config.preloaded_cache)
    }
}

#[async_trait]
impl<E: Entity, R: RemoteSource<E>> RemoteSource<E> for SimulatedFaultSource<E, R> {
    async fn fetch(&self, id: &E::Id) -> Result<E, RepoError> {
        self.inject("fetch").await?;
        match self.preloaded() {
            Some(fixed) => fixed
                .get(id)
                .cloned()
                .ok_or_else(|| RepoError::NotFound(id.to_string())),
            None => self.inner.fetch(id).await,
        }
    }

    async fn fetch_batch(&self, ids: &[E::Id]) -> Result<Vec<E>, RepoError> {
        self.inject("fetch_batch").await?;
        match self.preloaded() {
            Some(fixed) => Ok(ids.iter().filter_map(|id| fixed.get(id).cloned()).collect()),
            None => self.inner.fetch_batch(ids).await,
        }
    }

    async fn create(&self, entity: E) -> Result<E, RepoError> {
        self.inject("create").await?;
        self.inner.create(entity).await
    }

    async fn update(&self, entity: E) -> Result<E, RepoError> {
        self.inject("update").await?;
        self.inner.update(entity).await
    }

    async fn delete(&self, id: &E::Id) -> Result<(), RepoError> {
        self.inject("delete").await?;
        self.inner.delete(id).await
    }
}
