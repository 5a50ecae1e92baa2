use crate::models::{LatLon, NormalizedScore};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Upper bounds (km, inclusive) of the distance tiers and their scores.
/// Anything past the last tier has already failed the hard distance filter.
const DISTANCE_TIERS: [(f64, f64); 5] = [
    (25.0, 1.0),
    (50.0, 0.95),
    (100.0, 0.85),
    (150.0, 0.75),
    (200.0, 0.6),
];

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two destinations, if both are known
#[inline]
pub fn destination_distance_km(a: Option<LatLon>, b: Option<LatLon>) -> Option<f64> {
    let (a, b) = (a?, b?);
    let km = haversine_distance(a.lat, a.lon, b.lat, b.lon);
    km.is_finite().then_some(km)
}

/// Map a distance in km onto the tiered score (non-increasing in distance)
#[inline]
pub fn score_for_distance_km(km: f64) -> NormalizedScore {
    DISTANCE_TIERS
        .iter()
        .find(|(max_km, _)| km <= *max_km)
        .map(|(_, score)| NormalizedScore::new(*score))
        .unwrap_or(NormalizedScore::ZERO)
}

/// Destination proximity score; unknown coordinates are neutral, not zero
pub fn distance_score(a: Option<LatLon>, b: Option<LatLon>) -> NormalizedScore {
    match destination_distance_km(a, b) {
        Some(km) => score_for_distance_km(km),
        None => NormalizedScore::NEUTRAL,
    }
}
