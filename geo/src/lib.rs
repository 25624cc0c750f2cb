pub mod annotation;
pub mod cluster;
pub mod coordinate;
pub mod error;

pub use annotation::{Annotation, AnnotationKind, Score};
pub use cluster::{Cluster, ClusterConfig, GeoClusterer, best_pick};
pub use coordinate::{Coordinate, EARTH_RADIUS_M, GeoCircle, haversine_distance};
pub use error::GeoError;
