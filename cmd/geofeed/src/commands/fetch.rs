//! Fetch command.

use std::sync::Arc;

use clap::Args;
use geofeed_cache::BoundedCache;
use geofeed_repo::{FakeRemote, Post, PostId, ResilientRepository, SimulatedFaultSource};
use tokio_util::sync::CancellationToken;

use super::{load_file, print_json};
use crate::config::AppConfig;

/// Fetch posts from a fixture through the resilient repository.
///
/// The fixture stands in for the remote and is wrapped by the `fault`
/// settings of the config file. With `--preload`, the named posts are seeded
/// into the cache and replace the fixture as the read source: other fixture
/// ids are then not found.
#[derive(Args)]
pub struct FetchCommand {
    /// Fixture file with a list of posts (YAML or JSON)
    #[arg(short = 'f', long)]
    pub fixture: String,

    /// Serve only these post ids from the fixture, seeded into the cache
    #[arg(long, value_delimiter = ',')]
    pub preload: Vec<String>,

    /// Post ids to fetch
    #[arg(required = true)]
    pub ids: Vec<String>,
}

type FixtureRepository =
    ResilientRepository<Post, SimulatedFaultSource<Post, Arc<FakeRemote<Post>>>>;

impl FetchCommand {
    pub async fn run(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        let posts: Vec<Post> = load_file(&self.fixture)?;
        let repo = self.repository(cfg, posts);

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let ids: Vec<PostId> = self.ids.iter().map(|id| PostId::new(id.as_str())).collect();
        let found = repo.fetch_batch(&ids, &cancel).await?;
        tracing::debug!(
            requested = ids.len(),
            found = found.len(),
            cached = repo.cache().len(),
            "fetch done"
        );
        print_json(&found)
    }

    fn repository(&self, cfg: &AppConfig, posts: Vec<Post>) -> FixtureRepository {
        let preloaded: Vec<Post> = posts
            .iter()
            .filter(|p| self.preload.iter().any(|id| id == p.id.as_str()))
            .cloned()
            .collect();
        let remote = Arc::new(FakeRemote::with_entities(posts));
        let config = cfg.fault.to_repository_config().with_preloaded(preloaded);
        ResilientRepository::with_config(remote, BoundedCache::new(cfg.cache_limit_bytes), config)
    }
}
