//! Distance-based selection of nearby attractions.

use crate::model::{Attraction, Location};

/// Mean Earth radius used by the haversine formula, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A place returned by a search provider, before distance filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub kind: String,
}

/// Great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
}

/// Keep the candidates within `radius_km` of `origin`, nearest first, at most
/// `max_results` of them.
///
/// When nothing falls inside the radius the nearest `max_results` candidates
/// are returned regardless of distance.
pub fn select_nearby(
    candidates: Vec<PlaceCandidate>,
    origin: &Location,
    radius_km: f64,
    max_results: usize,
) -> Vec<Attraction> {
    let mut places: Vec<Attraction> = candidates
        .into_iter()
        .map(|c| {
            let distance = haversine_km(origin.lat, origin.lng, c.lat, c.lng);
            Attraction {
                name: c.name,
                address: c.address,
                distance_km: (distance * 100.0).round() / 100.0,
                kind: c.kind,
            }
        })
        .collect();

    places.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    let within = places.iter().take_while(|p| p.distance_km <= radius_km).count();
    if within > 0 {
        places.truncate(within);
    }
    places.truncate(max_results);
    places
}
