//! Great-circle distance and relative direction between two points.

use unicorn_listing_models::LatLong;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3956.0;

/// Haversine distance in miles between two `(latitude, longitude)` pairs
/// given in degrees.
#[must_use]
pub fn haversine_miles(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_MILES * c
}

/// Angle in radians of the displacement `from → to`, measured as
/// `atan2(Δlat, Δlon)` on the radian coordinates.
///
/// This is the angle of the raw coordinate delta, not a compass bearing.
#[must_use]
pub fn displacement_angle(from: (f64, f64), to: (f64, f64)) -> f64 {
    let dlat = to.0.to_radians() - from.0.to_radians();
    let dlon = to.1.to_radians() - from.1.to_radians();
    dlat.atan2(dlon)
}

/// Distance (miles) and angle (radians) from `home` to `other`, or `None`
/// when either side is missing a coordinate.
#[must_use]
pub fn relative_position(home: LatLong, other: LatLong) -> Option<(f64, f64)> {
    let home = home.both()?;
    let other = other.both()?;
    Some((haversine_miles(home, other), displacement_angle(home, other)))
}
