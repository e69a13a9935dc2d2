#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Regression models and their persistence.
//!
//! Models are stored per city under a [`ModelKind`] and the
//! `"{CITY}_{STATE}"` key from [`model_key`].

pub mod knn;
pub mod price;
pub mod store;
pub mod tags;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use unicorn_features::{FeatureMatrix, FeatureRecord};

pub use knn::KnnRegressor;
pub use price::NeighborPricePredictor;
pub use store::{FileModelStore, MemoryModelStore, ModelStore};
pub use tags::TagVocabulary;
pub use unicorn_listing_models::model_key;

/// Errors raised while fitting, using or persisting a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// I/O error (model file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prediction was requested before fitting.
    #[error("Model has not been fitted")]
    NotFitted,

    /// Fitting needs at least one row.
    #[error("Cannot fit a model on an empty training set")]
    EmptyTrainingSet,

    /// Feature rows and targets (or query vectors) disagree in shape.
    #[error("Shape mismatch: {message}")]
    Shape {
        /// What disagreed.
        message: String,
    },
}

/// What a stored model predicts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    /// Home price from the full feature record.
    PricePredictor,
    /// Walkability score from winsorized coordinates.
    WalkScore,
}

/// A price model trained on a [`FeatureMatrix`].
pub trait Predictor: Send + Sync {
    /// Fits the model, replacing any previous fit.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the matrix cannot be fitted (e.g., empty).
    fn fit(&mut self, matrix: &FeatureMatrix) -> Result<(), ModelError>;

    /// Predicts a price for one feature record.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFitted`] before [`Predictor::fit`].
    fn predict(&self, features: &FeatureRecord) -> Result<f64, ModelError>;
}
