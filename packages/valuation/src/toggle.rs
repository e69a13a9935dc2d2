//! What-if pricing of the subject property.
//!
//! The model prices the subject from its features; the user's own price
//! (most recent sale) usually differs from that prediction. Estimates for
//! an adjusted home are reported both raw and scaled by
//! `user_price / predicted_base`, so the number shown tracks the user's
//! price rather than the model's.

use serde::{Deserialize, Serialize};
use unicorn_comparables::ComparableSet;
use unicorn_features::{FeatureBuilder, FeatureRecord};
use unicorn_listing_models::ListingRecord;
use unicorn_model::{ModelError, Predictor};

/// Attribute overrides for the subject property. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAdjustment {
    pub beds: Option<i64>,
    pub baths_full: Option<f64>,
    pub baths_3qtr: Option<f64>,
    pub baths_half: Option<f64>,
    pub baths_1qtr: Option<f64>,
    pub sqft: Option<i64>,
    pub lot_sqft: Option<i64>,
    pub garage: Option<i64>,
    pub stories: Option<i64>,
    pub year_built: Option<i64>,
    pub new_construction: Option<bool>,
}

impl HomeAdjustment {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A copy of `record` with the overrides applied. Negative counts are
    /// floored at zero.
    #[must_use]
    pub fn apply(&self, record: &ListingRecord) -> ListingRecord {
        let mut adjusted = record.clone();
        let count = |value: Option<i64>, current: i64| value.map_or(current, |v| v.max(0));
        let units = |value: Option<f64>, current: f64| {
            value.filter(|v| v.is_finite()).map_or(current, |v| v.max(0.0))
        };

        adjusted.beds = count(self.beds, record.beds);
        adjusted.sqft = count(self.sqft, record.sqft);
        adjusted.lot_sqft = count(self.lot_sqft, record.lot_sqft);
        adjusted.garage = count(self.garage, record.garage);
        adjusted.stories = count(self.stories, record.stories);
        adjusted.year_built = count(self.year_built, record.year_built);
        adjusted.baths.full = units(self.baths_full, record.baths.full);
        adjusted.baths.three_quarter = units(self.baths_3qtr, record.baths.three_quarter);
        adjusted.baths.half = units(self.baths_half, record.baths.half);
        adjusted.baths.one_quarter = units(self.baths_1qtr, record.baths.one_quarter);
        if let Some(new_construction) = self.new_construction {
            adjusted.new_construction = new_construction;
        }
        adjusted
    }
}

/// Result of pricing an adjusted home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToggleEstimate {
    /// Model prediction for the unadjusted home.
    pub base_prediction: f64,
    /// Model prediction for the adjusted home.
    pub predicted_value: f64,
    /// `predicted_value` scaled to the user's price.
    pub scaled_value: f64,
    /// `predicted_value / base_prediction`, `1` when the base is zero.
    pub ratio_to_base: f64,
    /// The same change as a percentage.
    pub pct_change: f64,
}

/// Prices what-if variants of the subject property against a fitted
/// predictor.
#[derive(Debug, Clone, Copy)]
pub struct PriceToggle<'a, P> {
    predictor: &'a P,
    set: &'a ComparableSet,
    walk_score: Option<f64>,
    base_prediction: f64,
}

impl<'a, P: Predictor> PriceToggle<'a, P> {
    /// Prices the unadjusted subject.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the predictor cannot price the subject.
    pub fn new(
        predictor: &'a P,
        set: &'a ComparableSet,
        walk_score: Option<f64>,
    ) -> Result<Self, ModelError> {
        let base = FeatureBuilder::build(set.normalized_subject(), walk_score);
        let base_prediction = predictor.predict(&base)?;
        log::debug!(
            "Base prediction for {}: {base_prediction:.0}",
            set.subject().record.property_id
        );
        Ok(Self {
            predictor,
            set,
            walk_score,
            base_prediction,
        })
    }

    #[must_use]
    pub const fn base_prediction(&self) -> f64 {
        self.base_prediction
    }

    /// The user's own price for the home, `0` when unknown.
    #[must_use]
    pub const fn user_price(&self) -> f64 {
        self.set.subject().record.price
    }

    /// `user_price / base_prediction`, or `1` when either is zero.
    #[must_use]
    pub fn price_ratio(&self) -> f64 {
        let user = self.user_price();
        if user == 0.0 || self.base_prediction == 0.0 {
            1.0
        } else {
            user / self.base_prediction
        }
    }

    /// Features of the adjusted home, normalized with the set's stats.
    #[must_use]
    pub fn features(&self, adjustment: &HomeAdjustment) -> FeatureRecord {
        let record = adjustment.apply(&self.set.subject().record);
        FeatureBuilder::build(&self.set.normalize_variant(record), self.walk_score)
    }

    /// Prices the adjusted home.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the predictor fails.
    pub fn estimate(&self, adjustment: &HomeAdjustment) -> Result<ToggleEstimate, ModelError> {
        let predicted_value = self.predictor.predict(&self.features(adjustment))?;
        let ratio_to_base = if self.base_prediction == 0.0 {
            1.0
        } else {
            predicted_value / self.base_prediction
        };

        Ok(ToggleEstimate {
            base_prediction: self.base_prediction,
            predicted_value,
            scaled_value: predicted_value * self.price_ratio(),
            ratio_to_base,
            pct_change: (ratio_to_base - 1.0) * 100.0,
        })
    }
}
