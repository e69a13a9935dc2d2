#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature records.
//!
//! [`FeatureBuilder`] turns a [`NormalizedRecord`] into a [`FeatureRecord`]
//! with the same schema for training rows and for the subject property, so
//! a model fitted on comparables can score the user's home (and what-if
//! variants of it) directly.

pub mod matrix;

use serde::{Deserialize, Serialize};
use unicorn_comparables::NormalizedRecord;
use unicorn_listing_models::{ListingRecord, ListingStatus};

pub use matrix::FeatureMatrix;

/// Number of model-input columns.
pub const NUMERIC_WIDTH: usize = 18;

/// Names of the model-input columns, in [`FeatureRecord::numeric_values`]
/// order.
pub const NUMERIC_COLUMNS: [&str; NUMERIC_WIDTH] = [
    "days_listed",
    "days_updated",
    "baths_full",
    "baths_3qtr",
    "baths_half",
    "baths_1qtr",
    "total_baths",
    "year_built",
    "lot_sqft_winz",
    "sqft_winz",
    "garage",
    "stories",
    "beds",
    "new_construction",
    "distance_to_home",
    "lat_winz",
    "long_winz",
    "walk_score",
];

/// One row of the feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Listing id of the home this row describes.
    pub property_id: String,
    /// Street line, for reading the matrix by eye.
    pub address: String,
    /// Audit only, never a model input.
    pub status: ListingStatus,
    /// Days since the listing or sale date.
    pub days_listed: i64,
    /// Days since the listing was last updated.
    pub days_updated: i64,
    /// Full bathrooms.
    pub baths_full: i64,
    /// Three-quarter bathrooms.
    pub baths_3qtr: i64,
    /// Half bathrooms.
    pub baths_half: i64,
    /// Quarter bathrooms.
    pub baths_1qtr: i64,
    /// Weighted bath total.
    pub total_baths: f64,
    pub year_built: i64,
    /// Raw lot size in square feet.
    pub lot_sqft: i64,
    /// Lot size after winsorizing and imputation.
    pub lot_sqft_winz: Option<f64>,
    /// Raw living area in square feet.
    pub sqft: i64,
    /// Living area after winsorizing and imputation.
    pub sqft_winz: Option<f64>,
    /// Garage spaces.
    pub garage: i64,
    pub stories: i64,
    pub beds: i64,
    /// Sorted raw tags.
    pub tags: Vec<String>,
    pub new_construction: bool,
    /// Great-circle miles to the subject property.
    pub distance_to_home: Option<f64>,
    /// Raw latitude.
    pub lat: Option<f64>,
    /// Raw longitude.
    pub long: Option<f64>,
    /// Latitude after winsorizing and imputation.
    pub lat_winz: Option<f64>,
    /// Longitude after winsorizing and imputation.
    pub long_winz: Option<f64>,
    /// `None` only when walkability scoring is disabled.
    pub walk_score: Option<f64>,
}

impl FeatureRecord {
    /// Values of [`NUMERIC_COLUMNS`], in order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn numeric_values(&self) -> [Option<f64>; NUMERIC_WIDTH] {
        [
            Some(self.days_listed as f64),
            Some(self.days_updated as f64),
            Some(self.baths_full as f64),
            Some(self.baths_3qtr as f64),
            Some(self.baths_half as f64),
            Some(self.baths_1qtr as f64),
            Some(self.total_baths),
            Some(self.year_built as f64),
            self.lot_sqft_winz,
            self.sqft_winz,
            Some(self.garage as f64),
            Some(self.stories as f64),
            Some(self.beds as f64),
            Some(if self.new_construction { 1.0 } else { 0.0 }),
            self.distance_to_home,
            self.lat_winz,
            self.long_winz,
            self.walk_score,
        ]
    }
}

/// Builds [`FeatureRecord`]s. Pure and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Featurizes one normalized record.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(normalized: &NormalizedRecord, walk_score: Option<f64>) -> FeatureRecord {
        let record = normalized.record();
        let baths = record.baths;

        FeatureRecord {
            property_id: record.property_id.clone(),
            address: record.address.display_line(),
            status: record.status,
            days_listed: record.list_date_delta.unwrap_or(0),
            days_updated: record.last_update_delta.unwrap_or(0),
            baths_full: baths.full.trunc() as i64,
            baths_3qtr: baths.three_quarter.trunc() as i64,
            baths_half: baths.half.trunc() as i64,
            baths_1qtr: baths.one_quarter.trunc() as i64,
            total_baths: baths.weighted_total(),
            year_built: record.year_built,
            lot_sqft: record.lot_sqft,
            lot_sqft_winz: normalized.lot_sqft_winz,
            sqft: record.sqft,
            sqft_winz: normalized.sqft_winz,
            garage: record.garage,
            stories: record.stories,
            beds: record.beds,
            tags: record.tags.iter().cloned().collect(),
            new_construction: record.new_construction,
            distance_to_home: normalized.annotated.distance_miles,
            lat: record.lat_long.latitude,
            long: record.lat_long.longitude,
            lat_winz: normalized.lat_winz,
            long_winz: normalized.long_winz,
            walk_score,
        }
    }
}

/// Training target: the price floored to whole dollars, `0` when negative
/// or not finite.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn target(record: &ListingRecord) -> i64 {
    if record.price.is_finite() && record.price > 0.0 {
        record.price.floor() as i64
    } else {
        0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use unicorn_comparables::{AnnotatedRecord, NormalizationStats};
    use unicorn_listing_models::{BathCounts, LatLong, ListingAddress};

    use super::*;

    pub(crate) fn record(id: &str, price: f64) -> ListingRecord {
        ListingRecord {
            property_id: id.to_string(),
            status: ListingStatus::Sold,
            price,
            list_date_delta: None,
            last_update_delta: Some(12),
            lat_long: LatLong::new(30.1, -97.2),
            baths: BathCounts {
                full: 2.0,
                three_quarter: 0.0,
                half: 1.0,
                one_quarter: 0.0,
            },
            beds: 3,
            year_built: 1998,
            lot_sqft: 7_000,
            sqft: 1_900,
            garage: 2,
            stories: 2,
            new_construction: false,
            tags: ["pool", "central_air"].into_iter().map(String::from).collect::<BTreeSet<_>>(),
            property_type: "single_family".to_string(),
            address: ListingAddress {
                line: "9 Pine Rd".to_string(),
                city: "AUSTIN".to_string(),
                state: "TX".to_string(),
                postal_code: "78702".to_string(),
                ..ListingAddress::default()
            },
        }
    }

    fn normalized(record: ListingRecord) -> NormalizedRecord {
        let annotated = AnnotatedRecord::relative_to(record, LatLong::new(30.0, -97.0));
        NormalizationStats::default().normalize(annotated)
    }

    #[test]
    fn builds_the_full_schema() {
        let features = FeatureBuilder::build(&normalized(record("A", 350_000.0)), Some(62.0));

        assert_eq!(features.property_id, "A");
        assert_eq!(features.days_listed, 0);
        assert_eq!(features.days_updated, 12);
        assert_eq!(features.baths_full, 2);
        assert_eq!(features.baths_half, 1);
        assert!((features.total_baths - 2.5).abs() < f64::EPSILON);
        assert_eq!(features.tags, ["central_air", "pool"]);
        assert_eq!(features.walk_score, Some(62.0));
        assert!(features.distance_to_home.unwrap() > 0.0);
        // Without fitted stats the winsorized copies pass values through.
        assert_eq!(features.lat_winz, Some(30.1));
        assert_eq!(features.sqft_winz, Some(1_900.0));
    }

    #[test]
    fn building_is_deterministic() {
        let input = normalized(record("A", 350_000.0));
        let a = FeatureBuilder::build(&input, Some(50.0));
        let b = FeatureBuilder::build(&input, Some(50.0));
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn numeric_values_follow_column_order() {
        let features = FeatureBuilder::build(&normalized(record("A", 1.0)), None);
        let values = features.numeric_values();
        let beds = NUMERIC_COLUMNS.iter().position(|c| *c == "beds").unwrap();
        assert_eq!(values[beds], Some(3.0));
        assert_eq!(values[NUMERIC_WIDTH - 1], None);
    }

    #[test]
    fn target_floors_and_clamps() {
        assert_eq!(target(&record("A", 300_000.75)), 300_000);
        assert_eq!(target(&record("A", 0.0)), 0);
        assert_eq!(target(&record("A", -5.0)), 0);
        assert_eq!(target(&record("A", f64::NAN)), 0);
    }
}
