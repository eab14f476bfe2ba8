/// Planar proximity calculation
///
/// Distance is the Euclidean norm of the raw coordinate difference scaled by
/// a constant meters-per-degree. At campus scale (tens to low hundreds of
/// meters) the latitude distortion is negligible, and the 100 m threshold is
/// tuned against this exact formula — do not substitute a great-circle
/// (haversine) distance, which would shift the accept/reject boundary.
use crate::db::models::GeoPoint;

/// Approximate meters per degree of latitude/longitude
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Planar distance between two coordinates, in meters
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_diff = a.latitude - b.latitude;
    let lon_diff = a.longitude - b.longitude;
    (lat_diff * lat_diff + lon_diff * lon_diff).sqrt() * METERS_PER_DEGREE
}

/// Whether two coordinates are within `threshold_meters` of each other
pub fn within_range(a: GeoPoint, b: GeoPoint, threshold_meters: f64) -> bool {
    distance_meters(a, b) <= threshold_meters
}
