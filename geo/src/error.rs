use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("geo: invalid radius {0}: must be finite and positive")]
    InvalidRadius(f64),

    #[error("geo: invalid tolerance {0}: must be finite and at least 1")]
    InvalidTolerance(f64),
}
