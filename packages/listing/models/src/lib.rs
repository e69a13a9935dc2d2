#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical listing types shared across the valuation pipeline.
//!
//! Every payload returned by the real-estate API (bulk search results and
//! the single-property detail lookup for the user's home) is decoded into a
//! [`ListingRecord`]. Downstream stages never look at raw JSON again.

pub mod geo;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use geo::{
    AreaInfo, GeoSummary, LocationSuggestion, MarketStatistics, PropertyValuation, ValuePoint,
};

/// Weight of a three-quarter bath in bath units.
pub const THREE_QUARTER_BATH: f64 = 0.75;
/// Weight of a half bath in bath units.
pub const HALF_BATH: f64 = 0.5;
/// Weight of a quarter bath in bath units.
pub const QUARTER_BATH: f64 = 0.25;

/// Guards the greedy bath decomposition against `0.7499999` style drift.
const BATH_EPSILON: f64 = 1e-9;

/// Market status of a listing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListingStatus {
    /// Currently on the market.
    ForSale,
    /// Recently sold.
    Sold,
    /// The API did not report a status we recognise.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ListingStatus {
    /// Parses the API status string. Anything unrecognised is
    /// [`ListingStatus::Unknown`].
    #[must_use]
    pub fn from_api(value: Option<&str>) -> Self {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::Unknown)
    }
}

/// A latitude/longitude pair where either side may be unknown.
///
/// `(None, None)` means "unknown location", never `(0, 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLong {
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
}

impl LatLong {
    /// Creates a fully known coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// An unknown location.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            latitude: None,
            longitude: None,
        }
    }

    /// Returns both coordinates when both are present.
    #[must_use]
    pub const fn both(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Bath counts per category, in real-valued bath units.
///
/// Kept as `f64` so the subject-property reconciliation can work in
/// fractional units; integer casting happens only at feature output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BathCounts {
    /// Full baths.
    pub full: f64,
    /// Three-quarter baths.
    pub three_quarter: f64,
    /// Half baths.
    pub half: f64,
    /// Quarter baths.
    pub one_quarter: f64,
}

impl BathCounts {
    /// Weighted bath total: `full + 0.75·3qtr + 0.5·half + 0.25·1qtr`.
    #[must_use]
    pub fn weighted_total(&self) -> f64 {
        self.full
            + THREE_QUARTER_BATH * self.three_quarter
            + HALF_BATH * self.half
            + QUARTER_BATH * self.one_quarter
    }

    /// Sum of the four categories, each truncated to an integer first.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn integer_sum(&self) -> i64 {
        [self.full, self.three_quarter, self.half, self.one_quarter]
            .iter()
            .map(|v| v.trunc() as i64)
            .sum()
    }

    /// Back-fills the categories so the weighted total matches an
    /// aggregate bath count.
    ///
    /// When `aggregate` exceeds [`Self::weighted_total`], the shortfall is
    /// distributed greedily into full baths, then three-quarter, half and
    /// quarter baths, each step taking as many whole units as fit. An
    /// aggregate at or below the current total leaves the counts alone.
    #[must_use]
    pub fn reconciled_with(self, aggregate: f64) -> Self {
        let mut counts = self;
        let mut missing = aggregate - counts.weighted_total();

        if !missing.is_finite() || missing <= 0.0 {
            return counts;
        }

        let mut take = |unit: f64| -> f64 {
            let n = ((missing + BATH_EPSILON) / unit).floor().max(0.0);
            missing -= n * unit;
            n
        };

        counts.full += take(1.0);
        counts.three_quarter += take(THREE_QUARTER_BATH);
        counts.half += take(HALF_BATH);
        counts.one_quarter += take(QUARTER_BATH);

        counts
    }
}

/// Address and reference details that never feed the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingAddress {
    /// Street line (e.g., "123 Main St").
    pub line: String,
    /// Upper-cased city name.
    pub city: String,
    /// Upper-cased two-letter state code.
    pub state: String,
    /// ZIP code, `"00000"` when the API omits it.
    pub postal_code: String,
    /// County name.
    pub county: Option<String>,
    /// County FIPS code.
    pub fips_code: Option<String>,
    /// Street view image URL.
    pub street_view_url: Option<String>,
}

impl ListingAddress {
    /// Single-line form used in logs and feature audit columns.
    #[must_use]
    pub fn display_line(&self) -> String {
        [
            self.line.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// A single listing normalized to the canonical schema.
///
/// Produced once from a raw payload and never mutated afterwards; later
/// pipeline stages wrap it in new types instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Listing identifier, unique within a comparable set.
    pub property_id: String,
    /// Market status.
    pub status: ListingStatus,
    /// List price (for sale) or sold price (sold), `0` when absent.
    pub price: f64,
    /// Days since the listing (or sale) date.
    pub list_date_delta: Option<i64>,
    /// Days since the listing was last updated.
    pub last_update_delta: Option<i64>,
    /// Location, possibly unknown.
    pub lat_long: LatLong,
    /// Bath counts per category.
    pub baths: BathCounts,
    /// Bedrooms.
    pub beds: i64,
    /// Year built, `0` when unknown.
    pub year_built: i64,
    /// Lot size in square feet.
    pub lot_sqft: i64,
    /// Living area in square feet.
    pub sqft: i64,
    /// Garage capacity in cars.
    pub garage: i64,
    /// Number of stories.
    pub stories: i64,
    /// Whether the home is new construction.
    pub new_construction: bool,
    /// Free-text listing tags.
    pub tags: BTreeSet<String>,
    /// Property type (e.g., `"single_family"`).
    pub property_type: String,
    /// Address and reference details.
    pub address: ListingAddress,
}

/// The user's own home, decoded from the property-detail payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProperty {
    /// The home in canonical form. Always [`ListingStatus::Sold`].
    pub record: ListingRecord,
    /// Upper-cased city used to route to a per-city model.
    pub city: String,
    /// Upper-cased state code used to route to a per-city model.
    pub state: String,
    /// Aggregate bath count reported by the detail payload.
    pub aggregate_baths: f64,
    /// Identifier for the home-value estimate lookup, when available.
    pub valuation_id: Option<String>,
}

impl SubjectProperty {
    /// The `"{CITY}_{STATE}"` key used for per-city models.
    #[must_use]
    pub fn model_key(&self) -> String {
        model_key(&self.city, &self.state)
    }
}

/// Builds the `"{CITY}_{STATE}"` key used to store per-city models.
#[must_use]
pub fn model_key(city: &str, state: &str) -> String {
    format!("{}_{}", city.trim().to_uppercase(), state.trim().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_api_values() {
        assert_eq!(ListingStatus::from_api(Some("for_sale")), ListingStatus::ForSale);
        assert_eq!(ListingStatus::from_api(Some("sold")), ListingStatus::Sold);
        assert_eq!(ListingStatus::from_api(Some("pending")), ListingStatus::Unknown);
        assert_eq!(ListingStatus::from_api(None), ListingStatus::Unknown);
    }

    #[test]
    fn status_deserializes_unknown_values() {
        let status: ListingStatus = serde_json::from_str("\"off_market\"").unwrap();
        assert_eq!(status, ListingStatus::Unknown);
    }

    #[test]
    fn lat_long_requires_both_sides() {
        assert_eq!(LatLong::new(1.0, 2.0).both(), Some((1.0, 2.0)));
        assert!(LatLong::unknown().both().is_none());
        let half = LatLong {
            latitude: Some(1.0),
            longitude: None,
        };
        assert!(half.both().is_none());
    }

    #[test]
    fn weighted_total_uses_category_weights() {
        let baths = BathCounts {
            full: 2.0,
            three_quarter: 1.0,
            half: 1.0,
            one_quarter: 1.0,
        };
        assert!((baths.weighted_total() - 3.5).abs() < f64::EPSILON);
        assert_eq!(baths.integer_sum(), 5);
    }

    #[test]
    fn reconciles_two_and_a_half_baths() {
        let baths = BathCounts::default().reconciled_with(2.5);
        assert!((baths.full - 2.0).abs() < f64::EPSILON);
        assert!(baths.three_quarter.abs() < f64::EPSILON);
        assert!((baths.half - 1.0).abs() < f64::EPSILON);
        assert!(baths.one_quarter.abs() < f64::EPSILON);
    }

    #[test]
    fn reconciles_shortfall_on_top_of_existing_counts() {
        let existing = BathCounts {
            full: 1.0,
            ..BathCounts::default()
        };
        let baths = existing.reconciled_with(2.75);
        assert!((baths.full - 2.0).abs() < f64::EPSILON);
        assert!((baths.three_quarter - 1.0).abs() < f64::EPSILON);
        assert!(baths.half.abs() < f64::EPSILON);
        assert!((baths.weighted_total() - 2.75).abs() < 1e-9);
    }

    #[test]
    fn reconcile_ignores_aggregate_below_total() {
        let existing = BathCounts {
            full: 3.0,
            ..BathCounts::default()
        };
        assert_eq!(existing.reconciled_with(2.0), existing);
    }

    #[test]
    fn model_key_is_upper_cased() {
        assert_eq!(model_key("Austin", "tx"), "AUSTIN_TX");
    }

    #[test]
    fn address_display_skips_empty_parts() {
        let address = ListingAddress {
            line: "1 Main St".to_string(),
            city: "AUSTIN".to_string(),
            state: "TX".to_string(),
            postal_code: String::new(),
            ..ListingAddress::default()
        };
        assert_eq!(address.display_line(), "1 Main St AUSTIN TX");
    }
}
