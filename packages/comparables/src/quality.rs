//! Data-quality rules applied to comparable candidates.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use unicorn_listing_models::ListingRecord;

/// Why a candidate was excluded from the comparable set.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Lot larger than the implausible-lot ceiling.
    ImplausibleLot,
    /// No bathrooms once each category is truncated to an integer.
    NoBaths,
    /// Zero bedrooms.
    NoBeds,
    /// Price above the ceiling.
    PriceTooHigh,
    /// Lot larger than the comparable-lot ceiling.
    LotTooLarge,
    /// Living area unknown.
    NoLivingArea,
}

/// Thresholds for [`first_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Lots above this are treated as bad data.
    pub max_plausible_lot_sqft: i64,
    /// Listings priced above this are excluded.
    pub max_price: f64,
    /// Lots above this are not comparable to a typical home.
    pub max_lot_sqft: i64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_plausible_lot_sqft: 1_000_000,
            max_price: 5_000_000.0,
            max_lot_sqft: 15_000,
        }
    }
}

/// Returns the first rule `record` breaks, or `None` when it is usable.
///
/// Rules are checked in a fixed order so the reported reason is stable.
/// With the default thresholds the lot-size rule subsumes the
/// implausible-lot rule; both are kept so a looser `max_lot_sqft` still
/// screens out obviously broken lots.
#[must_use]
pub fn first_failure(
    record: &ListingRecord,
    thresholds: &QualityThresholds,
) -> Option<RejectReason> {
    if record.lot_sqft > thresholds.max_plausible_lot_sqft {
        return Some(RejectReason::ImplausibleLot);
    }
    if record.baths.integer_sum() == 0 {
        return Some(RejectReason::NoBaths);
    }
    if record.beds == 0 {
        return Some(RejectReason::NoBeds);
    }
    if record.price.trunc() > thresholds.max_price {
        return Some(RejectReason::PriceTooHigh);
    }
    if record.lot_sqft > thresholds.max_lot_sqft {
        return Some(RejectReason::LotTooLarge);
    }
    if record.sqft == 0 {
        return Some(RejectReason::NoLivingArea);
    }
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use unicorn_listing_models::{BathCounts, LatLong, ListingAddress, ListingStatus};

    use super::*;

    /// A record that passes every default rule.
    pub(crate) fn usable_record(id: &str) -> ListingRecord {
        ListingRecord {
            property_id: id.to_string(),
            status: ListingStatus::Sold,
            price: 300_000.0,
            list_date_delta: Some(10),
            last_update_delta: Some(5),
            lat_long: LatLong::new(30.0, -97.0),
            baths: BathCounts {
                full: 2.0,
                ..BathCounts::default()
            },
            beds: 3,
            year_built: 2001,
            lot_sqft: 6_000,
            sqft: 1_800,
            garage: 2,
            stories: 1,
            new_construction: false,
            tags: BTreeSet::new(),
            property_type: "single_family".to_string(),
            address: ListingAddress::default(),
        }
    }

    #[test]
    fn usable_record_passes() {
        assert_eq!(first_failure(&usable_record("a"), &QualityThresholds::default()), None);
    }

    #[test]
    fn zero_beds_is_always_rejected() {
        let mut record = usable_record("a");
        record.beds = 0;
        assert_eq!(
            first_failure(&record, &QualityThresholds::default()),
            Some(RejectReason::NoBeds)
        );
    }

    #[test]
    fn fractional_only_baths_count_as_none() {
        let mut record = usable_record("a");
        record.baths = BathCounts {
            full: 0.0,
            three_quarter: 0.0,
            half: 0.9,
            one_quarter: 0.0,
        };
        assert_eq!(
            first_failure(&record, &QualityThresholds::default()),
            Some(RejectReason::NoBaths)
        );
    }

    #[test]
    fn reports_first_failing_rule() {
        let mut record = usable_record("a");
        record.lot_sqft = 2_000_000;
        record.beds = 0;
        assert_eq!(
            first_failure(&record, &QualityThresholds::default()),
            Some(RejectReason::ImplausibleLot)
        );

        record.lot_sqft = 20_000;
        record.beds = 3;
        assert_eq!(
            first_failure(&record, &QualityThresholds::default()),
            Some(RejectReason::LotTooLarge)
        );
    }

    #[test]
    fn price_and_living_area_rules() {
        let mut record = usable_record("a");
        record.price = 5_000_001.0;
        assert_eq!(
            first_failure(&record, &QualityThresholds::default()),
            Some(RejectReason::PriceTooHigh)
        );

        let mut record = usable_record("b");
        record.sqft = 0;
        assert_eq!(
            first_failure(&record, &QualityThresholds::default()),
            Some(RejectReason::NoLivingArea)
        );
    }

    #[test]
    fn thresholds_are_configurable() {
        let mut record = usable_record("a");
        record.lot_sqft = 40_000;
        let relaxed = QualityThresholds {
            max_lot_sqft: 50_000,
            ..QualityThresholds::default()
        };
        assert_eq!(first_failure(&record, &relaxed), None);
    }

    #[test]
    fn reason_display_is_snake_case() {
        assert_eq!(RejectReason::NoLivingArea.to_string(), "no_living_area");
    }
}
