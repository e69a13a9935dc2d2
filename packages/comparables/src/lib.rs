#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Comparable listing selection.
//!
//! Raw search payloads go through a fixed sequence of stages, each
//! producing a new immutable type:
//!
//! 1. dedupe by property id (first occurrence wins, before decoding)
//! 2. [`AnnotatedRecord`]: distance and angle from the subject property
//! 3. quality filter ([`quality::first_failure`])
//! 4. [`NormalizedRecord`]: winsorized and mean-imputed coordinates and
//!    areas, fitted on the surviving comparables
//!
//! The result is a [`ComparableSet`].

pub mod geodesic;
pub mod quality;
pub mod set;
pub mod winsorize;

use serde::{Deserialize, Serialize};
use unicorn_listing_models::{LatLong, ListingRecord};

pub use quality::{QualityThresholds, RejectReason};
pub use set::{ComparableSet, Rejection};
pub use winsorize::WinsorStats;

/// Tuning for comparable selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparableConfig {
    /// Quality-filter thresholds.
    pub quality: QualityThresholds,
    /// Fraction winsorized from each tail of latitude and longitude.
    pub coordinate_tail: f64,
    /// Fraction winsorized from each tail of `sqft` and `lot_sqft`.
    pub area_tail: f64,
}

impl Default for ComparableConfig {
    fn default() -> Self {
        Self {
            quality: QualityThresholds::default(),
            coordinate_tail: 0.05,
            area_tail: 0.025,
        }
    }
}

/// A listing placed relative to the subject property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    /// The decoded listing.
    pub record: ListingRecord,
    /// Haversine distance to the subject in miles.
    pub distance_miles: Option<f64>,
    /// `atan2(Δlat, Δlon)` from the subject, in radians.
    pub angle_radians: Option<f64>,
}

impl AnnotatedRecord {
    /// Places `record` relative to `home`. Either side missing a coordinate
    /// leaves both fields `None`; the record is kept.
    #[must_use]
    pub fn relative_to(record: ListingRecord, home: LatLong) -> Self {
        let position = geodesic::relative_position(home, record.lat_long);
        Self {
            record,
            distance_miles: position.map(|(d, _)| d),
            angle_radians: position.map(|(_, a)| a),
        }
    }

    /// The subject property (or a variant of it), at distance zero.
    #[must_use]
    pub const fn subject(record: ListingRecord) -> Self {
        Self {
            record,
            distance_miles: Some(0.0),
            angle_radians: Some(0.0),
        }
    }
}

/// An annotated listing with outlier-robust copies of its coordinates and
/// areas.
///
/// The `*_winz` fields are only `None` when the comparable population had
/// no usable value to fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// The annotated listing.
    pub annotated: AnnotatedRecord,
    /// Winsorized, mean-imputed latitude.
    pub lat_winz: Option<f64>,
    /// Winsorized, mean-imputed longitude.
    pub long_winz: Option<f64>,
    /// Winsorized, mean-imputed living area.
    pub sqft_winz: Option<f64>,
    /// Winsorized, mean-imputed lot size.
    pub lot_sqft_winz: Option<f64>,
}

impl NormalizedRecord {
    /// The underlying listing.
    #[must_use]
    pub const fn record(&self) -> &ListingRecord {
        &self.annotated.record
    }
}

/// Winsorization stats fitted on the filtered comparables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Latitude bounds.
    pub lat: Option<WinsorStats>,
    /// Longitude bounds.
    pub long: Option<WinsorStats>,
    /// Living-area bounds.
    pub sqft: Option<WinsorStats>,
    /// Lot-size bounds.
    pub lot_sqft: Option<WinsorStats>,
}

impl NormalizationStats {
    /// Fits all four stats on `records`. Missing coordinates are ignored
    /// while fitting; areas are always present.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(records: &[AnnotatedRecord], config: &ComparableConfig) -> Self {
        let column = |f: fn(&ListingRecord) -> Option<f64>| {
            records.iter().map(|r| f(&r.record)).collect::<Vec<_>>()
        };

        Self {
            lat: WinsorStats::fit(&column(|r| r.lat_long.latitude), config.coordinate_tail),
            long: WinsorStats::fit(&column(|r| r.lat_long.longitude), config.coordinate_tail),
            sqft: WinsorStats::fit(&column(|r| Some(r.sqft as f64)), config.area_tail),
            lot_sqft: WinsorStats::fit(&column(|r| Some(r.lot_sqft as f64)), config.area_tail),
        }
    }

    /// Applies the fitted stats to one record.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalize(&self, annotated: AnnotatedRecord) -> NormalizedRecord {
        let record = &annotated.record;
        let lat_winz = winsorize::winsorize(self.lat.as_ref(), record.lat_long.latitude);
        let long_winz = winsorize::winsorize(self.long.as_ref(), record.lat_long.longitude);
        let sqft_winz = winsorize::winsorize(self.sqft.as_ref(), Some(record.sqft as f64));
        let lot_sqft_winz =
            winsorize::winsorize(self.lot_sqft.as_ref(), Some(record.lot_sqft as f64));

        NormalizedRecord {
            annotated,
            lat_winz,
            long_winz,
            sqft_winz,
            lot_sqft_winz,
        }
    }
}
