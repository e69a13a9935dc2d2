#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end valuation of a single home.
//!
//! A [`ValuationSession`] takes the raw payloads for one home and its
//! comparables through decoding, comparable selection, walkability
//! scoring and featurization. A [`PriceToggle`] then answers what-if
//! questions against a fitted price predictor.

pub mod config;
pub mod pipeline;
pub mod toggle;

pub use config::ValuationConfig;
pub use pipeline::{SessionPayloads, ValuationSession, fetch_payloads};
pub use toggle::{HomeAdjustment, PriceToggle, ToggleEstimate};

/// Errors raised by a valuation session.
#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    #[error(transparent)]
    Data(#[from] unicorn_listing::DataError),

    #[error(transparent)]
    Source(#[from] unicorn_source::SourceError),

    #[error(transparent)]
    WalkScore(#[from] unicorn_walkability::WalkScoreError),

    #[error(transparent)]
    Model(#[from] unicorn_model::ModelError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No comparable survived filtering, so there is nothing to price
    /// against.
    #[error("No usable comparables for {key}")]
    NoComparables { key: String },

    /// The subject payload has no id to search around.
    #[error("Subject property has no property id")]
    MissingPropertyId,
}
