use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(*self, *other)
    }
}

/// Great-circle distance between two coordinates in meters, using the
/// haversine formula.
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// A circle on the Earth's surface used for membership tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCircle {
    pub center: Coordinate,
    /// Radius in meters.
    pub radius: f64,
}

impl GeoCircle {
    pub fn new(center: Coordinate, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Reports whether `point` lies inside or on the boundary.
    pub fn contains(&self, point: Coordinate) -> bool {
        haversine_distance(self.center, point) <= self.radius
    }
}
