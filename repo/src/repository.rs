use std::collections::HashMap;
use std::time::Duration;

use geofeed_cache::BoundedCache;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::entity::{BatchPolicy, Entity};
use crate::error::RepoError;
use crate::fault::{RepositoryConfig, SimulatedFaultSource};
use crate::guard::guarded;
use crate::remote::RemoteSource;

/// Remote-first entity repository with cache fallback.
///
/// Reads go to the remote source and refresh the cache on success. When the
/// remote fails, times out or the caller cancels, the last cached value is
/// served instead (it may be stale); only when nothing is cached does the
/// error reach the caller. Writes always go to the remote and never fall
/// back; on success the cache entry is replaced or removed.
///
/// The cache is shared: clone one [`BoundedCache`] into every repository and
/// collaborator that should see the same entries.
pub struct ResilientRepository<E: Entity, R> {
    remote: R,
    cache: BoundedCache<E::Id, E>,
    timeout: Option<Duration>,
}

impl<E: Entity, R: RemoteSource<E>> ResilientRepository<E, R> {
    pub fn new(remote: R, cache: BoundedCache<E::Id, E>) -> Self {
        Self {
            remote,
            cache,
            timeout: None,
        }
    }

    /// Bounds every remote call; an elapsed call counts as a remote failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn cache(&self) -> &BoundedCache<E::Id, E> {
        &self.cache
    }

    /// Cache-only lookup; never contacts the remote.
    pub fn cached(&self, id: &E::Id) -> Option<E> {
        self.cache.get(id)
    }

    /// Fetches one entity, falling back to the cache on any remote failure.
    pub async fn fetch(&self, id: &E::Id, cancel: &CancellationToken) -> Result<E, RepoError> {
        match guarded(self.remote.fetch(id), self.timeout, cancel).await {
            Ok(entity) => {
                self.store(id.clone(), &entity);
                Ok(entity)
            }
            Err(err) => match self.cache.get(id) {
                Some(cached) => {
                    warn!(%id, error = %err, "repo: remote fetch failed, serving cached entity");
                    Ok(cached)
                }
                None => {
                    debug!(%id, error = %err, "repo: remote fetch failed, nothing cached");
                    Err(err)
                }
            },
        }
    }

    /// Fetches several entities, with one remote call when it succeeds.
    ///
    /// Results keep the order of `ids`. Ids the remote did not return are
    /// looked up in the cache. When the batch call itself fails, every id goes
    /// through [`fetch`](Self::fetch) on its own, so one failing id does not
    /// take the others down with it. What happens to ids still unresolved
    /// depends on `E::BATCH_POLICY`: with `BestEffort` they are left out, with
    /// `AllOrNothing` the first one fails the batch. Cancellation always fails
    /// the batch if any id is left unresolved.
    pub async fn fetch_batch(
        &self,
        ids: &[E::Id],
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let entities = match guarded(self.remote.fetch_batch(ids), self.timeout, cancel).await {
            Ok(entities) => entities,
            Err(RepoError::Cancelled) => return self.resolve_cached(ids, RepoError::Cancelled),
            Err(err) => {
                warn!(
                    error = %err,
                    requested = ids.len(),
                    "repo: remote batch failed, fetching ids one by one"
                );
                return self.fetch_each(ids, cancel).await;
            }
        };

        let mut fetched = HashMap::with_capacity(entities.len());
        for entity in entities {
            let id = entity.id();
            self.store(id.clone(), &entity);
            fetched.insert(id, entity);
        }

        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = fetched.get(id) {
                resolved.push(entity.clone());
            } else if let Some(cached) = self.cache.get(id) {
                debug!(%id, "repo: batch entry served from cache");
                resolved.push(cached);
            } else {
                Self::unresolved(id, RepoError::NotFound(id.to_string()))?;
            }
        }
        Ok(resolved)
    }

    async fn fetch_each(
        &self,
        ids: &[E::Id],
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepoError> {
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch(id, cancel).await {
                Ok(entity) => resolved.push(entity),
                Err(err) => Self::unresolved(id, err)?,
            }
        }
        Ok(resolved)
    }

    fn resolve_cached(&self, ids: &[E::Id], err: RepoError) -> Result<Vec<E>, RepoError> {
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match self.cache.get(id) {
                Some(cached) => resolved.push(cached),
                None => return Err(err),
            }
        }
        Ok(resolved)
    }

    /// Applies the batch policy to an id that could not be resolved.
    fn unresolved(id: &E::Id, err: RepoError) -> Result<(), RepoError> {
        if err == RepoError::Cancelled || E::BATCH_POLICY == BatchPolicy::AllOrNothing {
            return Err(err);
        }
        warn!(%id, error = %err, "repo: skipping unresolved id in batch");
        Ok(())
    }

    /// Creates an entity remotely and caches what the remote returned.
    pub async fn create(&self, entity: E, cancel: &CancellationToken) -> Result<E, RepoError> {
        let created = guarded(self.remote.create(entity), self.timeout, cancel).await?;
        self.store(created.id(), &created);
        Ok(created)
    }

    /// Updates an entity remotely and replaces its cache entry.
    pub async fn update(&self, entity: E, cancel: &CancellationToken) -> Result<E, RepoError> {
        let id = entity.id();
        let updated = guarded(self.remote.update(entity), self.timeout, cancel).await?;
        self.cache.remove(&id);
        self.store(updated.id(), &updated);
        Ok(updated)
    }

    /// Deletes an entity remotely and drops its cache entry.
    pub async fn delete(&self, id: &E::Id, cancel: &CancellationToken) -> Result<(), RepoError> {
        guarded(self.remote.delete(id), self.timeout, cancel).await?;
        self.cache.remove(id);
        Ok(())
    }

    /// Replaces the cache entry for `id`. An entity too large to cache still
    /// evicts the older value.
    fn store(&self, id: E::Id, entity: &E) {
        self.cache.remove(&id);
        self.cache.set(id, entity.clone(), entity.cost());
    }
}

impl<E: Entity, R: RemoteSource<E>> ResilientRepository<E, SimulatedFaultSource<E, R>> {
    /// Builds a repository for tests and mock wiring.
    ///
    /// `remote` is wrapped in a [`SimulatedFaultSource`] driven by `config`,
    /// the preloaded entities are seeded into `cache`, and the configured
    /// timeout, if any, bounds each remote call.
    pub fn with_config(
        remote: R,
        cache: BoundedCache<E::Id, E>,
        config: RepositoryConfig<E>,
    ) -> Self {
        for (id, entity) in &config.preloaded_cache {
            cache.set(id.clone(), entity.clone(), entity.cost());
        }
        let timeout = config.remote_timeout;
        Self {
            remote: SimulatedFaultSource::new(remote, config),
            cache,
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Media, MediaId, Post, PostId, User, UserId};
    use crate::fake::FakeRemote;
    use std::sync::Arc;

    fn pid(id: &str) -> PostId {
        PostId::from(id)
    }

    fn post_repo(
        posts: impl IntoIterator<Item = Post>,
    ) -> (Arc<FakeRemote<Post>>, ResilientRepository<Post, Arc<FakeRemote<Post>>>) {
        let fake = Arc::new(FakeRemote::with_entities(posts));
        let repo = ResilientRepository::new(fake.clone(), BoundedCache::new(64 * 1024));
        (fake, repo)
    }

    #[tokio::test]
    async fn test_success_populates_cache() {
        let (_, repo) = post_repo([Post::new("p1", "u1").with_score(5)]);
        let cancel = CancellationToken::new();

        let post = repo.fetch(&pid("p1"), &cancel).await.unwrap();
        assert_eq!(post.score.get(), 5);
        assert_eq!(repo.cached(&pid("p1")), Some(post.clone()));
        assert_eq!(repo.cache().total_cost(), post.cost());
    }

    #[tokio::test]
    async fn test_failure_serves_cached() {
        let (fake, repo) = post_repo([Post::new("p1", "u1").with_caption("v1")]);
        let cancel = CancellationToken::new();
        repo.fetch(&pid("p1"), &cancel).await.unwrap();

        fake.insert(Post::new("p1", "u1").with_caption("v2"));
        fake.set_failing(true);

        let post = repo.fetch(&pid("p1"), &cancel).await.unwrap();
        assert_eq!(post.caption, "v1");
    }

    #[tokio::test]
    async fn test_failure_without_cache_propagates() {
        let (fake, repo) = post_repo([Post::new("p1", "u1")]);
        fake.set_failing(true);

        let err = repo.fetch(&pid("p1"), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, RepoError::RemoteUnavailable("fake remote offline".into()));
    }

    #[tokio::test]
    async fn test_not_found_propagates() {
        let (_, repo) = post_repo([]);
        let err = repo.fetch(&pid("ghost"), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, RepoError::NotFound("ghost".into()));
    }

    #[tokio::test]
    async fn test_preloaded_with_forced_failure() {
        let config = RepositoryConfig::<Post>::default()
            .with_preloaded([Post::new("p1", "u1").with_score(5)])
            .with_failure(true);
        let repo = ResilientRepository::with_config(
            FakeRemote::<Post>::new(),
            BoundedCache::new(64 * 1024),
            config,
        );

        let post = repo.fetch(&pid("p1"), &CancellationToken::new()).await.unwrap();
        assert_eq!(post.score.get(), 5);

        let err = repo.fetch(&pid("p2"), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RepoError::RemoteUnavailable(_)));
    }

    #[tokio::test]
    async fn test_preloaded_serves_without_remote() {
        let config = RepositoryConfig::<Post>::default().with_preloaded([Post::new("p1", "u1")]);
        let fake = Arc::new(FakeRemote::<Post>::new());
        let repo = ResilientRepository::with_config(fake.clone(), BoundedCache::new(4096), config);

        assert!(repo.fetch(&pid("p1"), &CancellationToken::new()).await.is_ok());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_serves_cached_or_cancelled() {
        let config = RepositoryConfig::<Post>::default().with_delay(Duration::from_secs(30));
        let fake = Arc::new(FakeRemote::with_entities([
            Post::new("p1", "u1"),
            Post::new("p2", "u1"),
        ]));
        let cache = BoundedCache::new(4096);
        let seeded = Post::new("p1", "u1").with_caption("cached");
        cache.set(pid("p1"), seeded.clone(), seeded.cost());
        let repo = ResilientRepository::with_config(fake.clone(), cache, config);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        assert_eq!(repo.fetch(&pid("p1"), &cancel).await, Ok(seeded));
        assert_eq!(repo.fetch(&pid("p2"), &cancel).await, Err(RepoError::Cancelled));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_remote_unavailable() {
        let config = RepositoryConfig::<Post>::default()
            .with_delay(Duration::from_secs(30))
            .with_timeout(Duration::from_secs(2));
        let fake = Arc::new(FakeRemote::with_entities([Post::new("p1", "u1")]));
        let repo = ResilientRepository::with_config(fake, BoundedCache::new(4096), config);

        let err = repo.fetch(&pid("p1"), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RepoError::RemoteUnavailable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_create_and_update_replace_cache() {
        let (fake, repo) = post_repo([]);
        let cancel = CancellationToken::new();

        repo.create(Post::new("p1", "u1").with_caption("draft"), &cancel).await.unwrap();
        assert_eq!(repo.cached(&pid("p1")).unwrap().caption, "draft");

        repo.update(Post::new("p1", "u1").with_caption("final"), &cancel).await.unwrap();
        assert_eq!(repo.cached(&pid("p1")).unwrap().caption, "final");
        assert_eq!(fake.get(&pid("p1")).unwrap().caption, "final");
    }

    #[tokio::test]
    async fn test_oversized_write_drops_stale_entry() {
        let fake = Arc::new(FakeRemote::with_entities([Post::new("p1", "u1").with_caption("old")]));
        let repo = ResilientRepository::new(fake.clone(), BoundedCache::new(200));
        let cancel = CancellationToken::new();
        repo.fetch(&pid("p1"), &cancel).await.unwrap();
        assert!(repo.cached(&pid("p1")).is_some());

        let long = "x".repeat(500);
        let created = repo
            .create(Post::new("p1", "u1").with_caption(&long), &cancel)
            .await
            .unwrap();
        assert!(created.cost() > repo.cache().limit());
        assert!(repo.cached(&pid("p1")).is_none());

        // Offline, there is nothing older than the write to fall back to.
        fake.set_failing(true);
        assert!(repo.fetch(&pid("p1"), &cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_fetch_drops_stale_entry() {
        let fake = Arc::new(FakeRemote::with_entities([Post::new("p1", "u1").with_caption("old")]));
        let repo = ResilientRepository::new(fake.clone(), BoundedCache::new(200));
        let cancel = CancellationToken::new();
        repo.fetch(&pid("p1"), &cancel).await.unwrap();

        fake.insert(Post::new("p1", "u1").with_caption(&"y".repeat(500)));
        let fresh = repo.fetch(&pid("p1"), &cancel).await.unwrap();
        assert_eq!(fresh.caption.len(), 500);
        assert!(repo.cached(&pid("p1")).is_none());
    }

    /// Serves every post except those listed in `broken`, which fail as if the
    /// remote were down. Batches use the default one-id-at-a-time loop.
    struct PartlyBroken {
        posts: FakeRemote<Post>,
        broken: Vec<PostId>,
    }

    #[async_trait::async_trait]
    impl RemoteSource<Post> for PartlyBroken {
        async fn fetch(&self, id: &PostId) -> Result<Post, RepoError> {
            if self.broken.contains(id) {
                return Err(RepoError::RemoteUnavailable(format!("{id} unavailable")));
            }
            self.posts.fetch(id).await
        }

        async fn create(&self, entity: Post) -> Result<Post, RepoError> {
            self.posts.create(entity).await
        }

        async fn update(&self, entity: Post) -> Result<Post, RepoError> {
            self.posts.update(entity).await
        }

        async fn delete(&self, id: &PostId) -> Result<(), RepoError> {
            self.posts.delete(id).await
        }
    }

    fn partly_broken(broken: &[&str]) -> PartlyBroken {
        PartlyBroken {
            posts: FakeRemote::with_entities([
                Post::new("good", "u1"),
                Post::new("bad", "u1"),
                Post::new("also-good", "u2"),
            ]),
            broken: broken.iter().map(|id| pid(id)).collect(),
        }
    }

    #[tokio::test]
    async fn test_batch_keeps_ids_that_resolve_when_one_fails() {
        let repo = ResilientRepository::new(partly_broken(&["bad"]), BoundedCache::new(4096));
        let ids = [pid("good"), pid("bad"), pid("also-good")];

        let posts = repo.fetch_batch(&ids, &CancellationToken::new()).await.unwrap();
        let got: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(got, vec!["good", "also-good"]);
        assert!(repo.cached(&pid("good")).is_some());
        assert!(repo.cached(&pid("also-good")).is_some());
    }

    #[tokio::test]
    async fn test_batch_failing_id_served_from_cache() {
        let cache = BoundedCache::new(4096);
        let seeded = Post::new("bad", "u1").with_caption("cached");
        cache.set(pid("bad"), seeded.clone(), seeded.cost());
        let repo = ResilientRepository::new(partly_broken(&["bad"]), cache);

        let posts = repo
            .fetch_batch(&[pid("bad"), pid("good")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0], seeded);
        assert_eq!(posts[1].id, pid("good"));
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let (fake, repo) = post_repo([Post::new("p1", "u1")]);
        let cancel = CancellationToken::new();
        repo.fetch(&pid("p1"), &cancel).await.unwrap();

        repo.delete(&pid("p1"), &cancel).await.unwrap();
        assert!(repo.cached(&pid("p1")).is_none());

        // With the entry gone, an offline read has nothing to fall back to.
        fake.set_failing(true);
        assert!(repo.fetch(&pid("p1"), &cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let (fake, repo) = post_repo([Post::new("p1", "u1").with_caption("v1")]);
        let cancel = CancellationToken::new();
        repo.fetch(&pid("p1"), &cancel).await.unwrap();
        fake.set_failing(true);

        let err = repo
            .update(Post::new("p1", "u1").with_caption("v2"), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(repo.cached(&pid("p1")).unwrap().caption, "v1");

        assert!(repo.delete(&pid("p1"), &cancel).await.is_err());
        assert!(repo.cached(&pid("p1")).is_some());
    }

    #[tokio::test]
    async fn test_batch_best_effort_skips_missing() {
        let (_, repo) = post_repo([Post::new("p1", "u1"), Post::new("p3", "u1")]);
        let ids = [pid("p3"), pid("p2"), pid("p1")];

        let posts = repo.fetch_batch(&ids, &CancellationToken::new()).await.unwrap();
        let got: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(got, vec!["p3", "p1"]);
        assert!(repo.cached(&pid("p3")).is_some());
    }

    #[tokio::test]
    async fn test_batch_falls_back_per_id() {
        let (fake, repo) = post_repo([Post::new("p1", "u1"), Post::new("p2", "u1")]);
        let cancel = CancellationToken::new();
        repo.fetch(&pid("p2"), &cancel).await.unwrap();
        fake.set_failing(true);

        let posts = repo.fetch_batch(&[pid("p1"), pid("p2")], &cancel).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, pid("p2"));
    }

    #[tokio::test]
    async fn test_batch_all_or_nothing_for_users() {
        let fake = Arc::new(FakeRemote::with_entities([User::new("u1", "Ada")]));
        let repo = ResilientRepository::new(fake.clone(), BoundedCache::new(4096));
        let cancel = CancellationToken::new();

        let users = repo.fetch_batch(&[UserId::from("u1")], &cancel).await.unwrap();
        assert_eq!(users.len(), 1);

        let err = repo
            .fetch_batch(&[UserId::from("u1"), UserId::from("u2")], &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, RepoError::NotFound("u2".into()));

        fake.set_failing(true);
        let users = repo.fetch_batch(&[UserId::from("u1")], &cancel).await.unwrap();
        assert_eq!(users[0].display_name, "Ada");
        let err = repo
            .fetch_batch(&[UserId::from("u1"), UserId::from("u3")], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::RemoteUnavailable(_)));
    }

    #[tokio::test]
    async fn test_batch_cancel_is_surfaced_for_best_effort() {
        let fake = Arc::new(FakeRemote::with_entities([Media::new("m1", "u", "t")]));
        let repo = ResilientRepository::new(fake, BoundedCache::new(4096));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = repo.fetch_batch(&[MediaId::from("m1")], &cancel).await.unwrap_err();
        assert_eq!(err, RepoError::Cancelled);
    }

    #[tokio::test]
    async fn test_batch_empty_and_duplicates() {
        let (fake, repo) = post_repo([Post::new("p1", "u1")]);
        let cancel = CancellationToken::new();
        assert!(repo.fetch_batch(&[], &cancel).await.unwrap().is_empty());
        assert_eq!(fake.calls(), 0);

        let posts = repo.fetch_batch(&[pid("p1"), pid("p1")], &cancel).await.unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_cache() {
        let posts: Vec<Post> = (0..32).map(|i| Post::new(format!("p{i}"), "u1")).collect();
        let (_, repo) = post_repo(posts);
        let repo = Arc::new(repo);

        let mut handles = Vec::new();
        for i in 0..32 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let id = PostId::new(format!("p{}", i % 8));
                repo.fetch(&id, &CancellationToken::new()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(repo.cache().len(), 8);
        assert!(repo.cache().total_cost() <= repo.cache().limit());
    }
}
