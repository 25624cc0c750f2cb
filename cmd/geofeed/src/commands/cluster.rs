//! Cluster command.

use clap::Args;
use geofeed_geo::{Annotation, Cluster, ClusterConfig, Coordinate, GeoClusterer};
use serde::Serialize;

use super::{load_file, print_json};
use crate::config::AppConfig;

/// Group annotations into proximity clusters.
#[derive(Args)]
pub struct ClusterCommand {
    /// Annotation file (YAML or JSON list)
    #[arg(short = 'i', long)]
    pub input: String,

    /// Cluster radius in meters (overrides config)
    #[arg(long)]
    pub radius: Option<f64>,

    /// Tolerance multiplier (overrides config)
    #[arg(long)]
    pub tolerance: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct ClusterView<'a> {
    center: Coordinate,
    size: usize,
    representative: &'a str,
    members: Vec<&'a str>,
}

impl<'a> From<&'a Cluster> for ClusterView<'a> {
    fn from(cluster: &'a Cluster) -> Self {
        Self {
            center: cluster.center(),
            size: cluster.len(),
            representative: cluster.representative().id(),
            members: cluster.members().iter().map(Annotation::id).collect(),
        }
    }
}

impl ClusterCommand {
    pub fn run(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        let config = self.cluster_config(cfg)?;
        let annotations: Vec<Annotation> = load_file(&self.input)?;
        tracing::debug!(count = annotations.len(), threshold = config.threshold(), "clustering");

        let clusters = GeoClusterer::new(config).cluster(&annotations);
        let views: Vec<ClusterView<'_>> = clusters.iter().map(ClusterView::from).collect();
        print_json(&views)
    }

    fn cluster_config(&self, cfg: &AppConfig) -> anyhow::Result<ClusterConfig> {
        let radius = self.radius.unwrap_or(cfg.cluster.radius_m);
        let tolerance = self.tolerance.unwrap_or(cfg.cluster.tolerance);
        Ok(ClusterConfig::new(radius, tolerance)?)
    }
}
