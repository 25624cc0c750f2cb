//! Proximity clustering and deterministic best-pick selection.

use tracing::debug;

use crate::annotation::{Annotation, Score};
use crate::coordinate::{Coordinate, GeoCircle, haversine_distance};
use crate::error::GeoError;

const DEFAULT_RADIUS_M: f64 = 500.0;
const DEFAULT_TOLERANCE: f64 = 1.2;

/// Clustering parameters. Two annotations are co-located when their
/// great-circle distance is at most `radius_m * tolerance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    radius_m: f64,
    tolerance: f64,
}

impl ClusterConfig {
    pub fn new(radius_m: f64, tolerance: f64) -> Result<Self, GeoError> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_m));
        }
        if !tolerance.is_finite() || tolerance < 1.0 {
            return Err(GeoError::InvalidTolerance(tolerance));
        }
        Ok(Self {
            radius_m,
            tolerance,
        })
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Effective membership distance in meters.
    pub fn threshold(&self) -> f64 {
        self.radius_m * self.tolerance
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// A group of co-located annotations with one representative.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    center: Coordinate,
    members: Vec<Annotation>,
    representative: usize,
}

impl Cluster {
    fn new(center: Coordinate, members: Vec<Annotation>) -> Self {
        // members always holds at least the seed.
        let representative = best_index(&members).unwrap_or(0);
        Self {
            center,
            members,
            representative,
        }
    }

    /// Coordinate of the seed annotation the cluster grew from.
    pub fn center(&self) -> Coordinate {
        self.center
    }

    /// Members in input order; the seed comes first.
    pub fn members(&self) -> &[Annotation] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The highest-scoring member, earliest in input order on ties.
    pub fn representative(&self) -> &Annotation {
        &self.members[self.representative]
    }

    /// Arithmetic mean of the member coordinates.
    ///
    /// Adequate for clusters spanning a few kilometers away from the
    /// antimeridian; not a true spherical centroid.
    pub fn centroid(&self) -> Coordinate {
        let n = self.members.len() as f64;
        let (lat, lon) = self.members.iter().fold((0.0, 0.0), |(lat, lon), a| {
            let c = a.coordinate();
            (lat + c.latitude, lon + c.longitude)
        });
        Coordinate::new(lat / n, lon / n)
    }
}

/// Groups annotations into proximity clusters.
///
/// Stateless: every call works only on its input slice, so one clusterer can
/// be shared freely across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeoClusterer {
    config: ClusterConfig,
}

impl GeoClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ClusterConfig {
        self.config
    }

    /// Partitions `annotations` into clusters with a greedy single pass.
    ///
    /// Annotations are visited in input order. Each one not yet clustered
    /// seeds a new cluster, which absorbs every later unclustered annotation
    /// within the threshold of the seed. An annotation within reach of two
    /// seeds joins the first one. Clusters are returned in seed order.
    pub fn cluster(&self, annotations: &[Annotation]) -> Vec<Cluster> {
        let threshold = self.config.threshold();
        let mut assigned = vec![false; annotations.len()];
        let mut clusters = Vec::new();

        for (seed_idx, seed) in annotations.iter().enumerate() {
            if assigned[seed_idx] {
                continue;
            }
            assigned[seed_idx] = true;

            let center = seed.coordinate();
            let mut members = vec![seed.clone()];
            for (idx, candidate) in annotations.iter().enumerate().skip(seed_idx + 1) {
                if assigned[idx] {
                    continue;
                }
                if haversine_distance(center, candidate.coordinate()) <= threshold {
                    assigned[idx] = true;
                    members.push(candidate.clone());
                }
            }

            clusters.push(Cluster::new(center, members));
        }

        debug!(
            annotations = annotations.len(),
            clusters = clusters.len(),
            threshold,
            "geo: clustered annotations"
        );
        clusters
    }

    /// Annotations within the threshold of `tap`, in input order.
    pub fn candidates_at<'a>(
        &self,
        tap: Coordinate,
        annotations: &'a [Annotation],
    ) -> Vec<&'a Annotation> {
        let area = GeoCircle::new(tap, self.config.threshold());
        annotations
            .iter()
            .filter(|a| area.contains(a.coordinate()))
            .collect()
    }

    /// The best annotation under a map tap, or `None` if nothing is in reach.
    pub fn pick_at<'a>(
        &self,
        tap: Coordinate,
        annotations: &'a [Annotation],
    ) -> Option<&'a Annotation> {
        let candidates = self.candidates_at(tap, annotations);
        let idx = best_index_by(&candidates, |a| a.score())?;
        Some(candidates[idx])
    }
}

/// Picks the best annotation from a flat candidate list.
///
/// A single candidate is returned as-is. Otherwise the highest score wins and
/// ties go to the candidate appearing first. Empty input selects nothing.
pub fn best_pick(candidates: &[Annotation]) -> Option<&Annotation> {
    match candidates {
        [] => None,
        [only] => Some(only),
        _ => best_index(candidates).map(|idx| &candidates[idx]),
    }
}

fn best_index(candidates: &[Annotation]) -> Option<usize> {
    best_index_by(candidates, |a| a.score())
}

fn best_index_by<T>(candidates: &[T], score: impl Fn(&T) -> Score) -> Option<usize> {
    let mut best: Option<(usize, Score)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let s = score(candidate);
        match best {
            // Only a strictly higher score displaces the current pick.
            Some((_, top)) if top >= s => {}
            _ => best = Some((idx, s)),
        }
    }
    best.map(|(idx, _)| idx)
}
