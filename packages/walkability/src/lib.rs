#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Walkability scores for the comparables and the subject property.
//!
//! Live lookups are expensive and rate limited, so each city gets a small
//! regressor from winsorized coordinates to observed score. Once a city has
//! one, later sessions predict scores without touching the network; see
//! [`estimator::WalkabilityEstimator`].

pub mod estimator;
pub mod score;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use estimator::{EstimatorPhase, WalkScores, WalkabilityEstimator};
pub use score::{RawWalkScore, clean_score};

/// Errors raised while scoring walkability.
#[derive(Debug, thiserror::Error)]
pub enum WalkScoreError {
    /// A live lookup failed.
    #[error("Walk score lookup failed: {0}")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Loading, fitting or saving the regressor failed.
    #[error("Walk score model error: {0}")]
    Model(#[from] unicorn_model::ModelError),
}

/// One location to score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkScoreQuery {
    /// Free-text address; `"{CITY} {STATE}"` is enough for the API.
    pub address: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// A live walkability lookup.
#[async_trait]
pub trait WalkScoreSource: Send + Sync {
    /// Fetches the raw scores for one location.
    ///
    /// # Errors
    ///
    /// Returns [`WalkScoreError::Lookup`] if the lookup fails.
    async fn fetch_score(&self, query: &WalkScoreQuery) -> Result<RawWalkScore, WalkScoreError>;
}

/// A source that fails every lookup, for sessions without API access.
/// A stored regressor still predicts; without one, scores fall back.
#[derive(Debug, Clone)]
pub struct OfflineSource {
    reason: String,
}

impl OfflineSource {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl WalkScoreSource for OfflineSource {
    async fn fetch_score(&self, _query: &WalkScoreQuery) -> Result<RawWalkScore, WalkScoreError> {
        Err(WalkScoreError::Lookup(self.reason.clone().into()))
    }
}

/// Walkability behaviour for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkabilityConfig {
    /// Whether walkability is scored at all. When disabled the feature is
    /// left empty.
    pub enabled: bool,
    /// Use a stored regressor for the city instead of live lookups.
    pub load_model_if_available: bool,
    /// Persist a regressor fitted during bootstrapping.
    pub save_model: bool,
    /// Maximum in-flight lookups.
    pub concurrency: usize,
    /// Observations needed before a regressor is fitted.
    pub min_training_points: usize,
    /// Neighbours used by the regressor.
    pub neighbors: usize,
    /// Score used when nothing better is known.
    pub fallback_score: f64,
}

impl Default for WalkabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            load_model_if_available: true,
            save_model: true,
            concurrency: 4,
            min_training_points: 5,
            neighbors: 5,
            fallback_score: 50.0,
        }
    }
}
