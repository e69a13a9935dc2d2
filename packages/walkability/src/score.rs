//! Raw walkability payloads and score cleaning.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lowest valid score.
pub const MIN_SCORE: f64 = 0.0;
/// Highest valid score.
pub const MAX_SCORE: f64 = 100.0;

/// Scores as returned by the walkability API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWalkScore {
    #[serde(default)]
    pub walkscore: Option<Value>,
    #[serde(default)]
    pub transit: Option<RawSubScore>,
    #[serde(default)]
    pub bike: Option<RawSubScore>,
}

/// Nested transit or bike score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSubScore {
    #[serde(default)]
    pub score: Option<Value>,
}

impl RawWalkScore {
    /// Cleaned walk score.
    #[must_use]
    pub fn walk(&self) -> Option<f64> {
        self.walkscore.as_ref().and_then(clean_score)
    }

    /// Cleaned transit score.
    #[must_use]
    pub fn transit(&self) -> Option<f64> {
        self.transit.as_ref()?.score.as_ref().and_then(clean_score)
    }

    /// Cleaned bike score.
    #[must_use]
    pub fn bike(&self) -> Option<f64> {
        self.bike.as_ref()?.score.as_ref().and_then(clean_score)
    }
}

/// Clamps a finite numeric score into `[0, 100]`. Anything that is not a
/// finite number (including numeric strings) is `None`.
#[must_use]
pub fn clean_score(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(MIN_SCORE, MAX_SCORE))
}
