//! Pick command.

use clap::Args;
use geofeed_geo::{Annotation, Coordinate, GeoClusterer};

use super::{load_file, print_json};
use crate::config::AppConfig;

/// Pick the best annotation under a map tap.
///
/// Prints `null` when nothing is within reach of the tap.
#[derive(Args)]
pub struct PickCommand {
    /// Annotation file (YAML or JSON list)
    #[arg(short = 'i', long)]
    pub input: String,

    /// Tap latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Tap longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

impl PickCommand {
    pub fn run(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        let annotations: Vec<Annotation> = load_file(&self.input)?;
        let picked = pick(cfg, Coordinate::new(self.lat, self.lon), &annotations)?;
        print_json(&picked)
    }
}

fn pick<'a>(
    cfg: &AppConfig,
    tap: Coordinate,
    annotations: &'a [Annotation],
) -> anyhow::Result<Option<&'a Annotation>> {
    let clusterer = GeoClusterer::new(cfg.cluster.to_config()?);
    Ok(clusterer.pick_at(tap, annotations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofeed_geo::AnnotationKind;

    #[test]
    fn test_pick_highest_in_reach() {
        let annotations = vec![
            Annotation::new("near", Coordinate::new(0.0, 0.0), 2, AnnotationKind::Poi),
            Annotation::new("best", Coordinate::new(0.001, 0.0), 8, AnnotationKind::Post),
            Annotation::new("far", Coordinate::new(1.0, 0.0), 99, AnnotationKind::Post),
        ];
        let cfg = AppConfig::default();
        let tap = Coordinate::new(0.0, 0.0);
        assert_eq!(pick(&cfg, tap, &annotations).unwrap().map(Annotation::id), Some("best"));
        assert!(pick(&cfg, Coordinate::new(45.0, 45.0), &annotations).unwrap().is_none());
    }
}
