//! Session configuration.
//!
//! The defaults live in `config/default.toml` and are embedded at compile
//! time. A user file is merged over them key by key, so it only needs to
//! name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use unicorn_comparables::ComparableConfig;
use unicorn_walkability::WalkabilityConfig;

use crate::ValuationError;

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// How many comparables to request and in what mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Total comparables requested.
    pub n: usize,
    /// Share of `n` taken from for-sale listings; the rest are sold.
    pub listed_to_sold_ratio: f64,
}

/// Price predictor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Neighbours consulted per prediction.
    pub neighbors: usize,
}

/// API response caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Checkpoint API responses to disk and replay them.
    pub cache_responses: bool,
    /// Root of the response cache.
    pub cache_dir: PathBuf,
}

/// Where fitted models are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root of the per-city model store.
    pub model_dir: PathBuf,
}

/// Everything a valuation session is configured by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// `[search]`
    pub search: SearchConfig,
    /// `[comparables]`, including the `[comparables.quality]` thresholds.
    pub comparables: ComparableConfig,
    /// `[walkability]`
    pub walkability: WalkabilityConfig,
    /// `[model]`
    pub model: ModelConfig,
    /// `[source]`
    pub source: SourceConfig,
    /// `[store]`
    pub store: StoreConfig,
}

impl ValuationConfig {
    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Config`] if the embedded file is invalid.
    pub fn embedded() -> Result<Self, ValuationError> {
        Ok(toml::de::from_str(DEFAULT_TOML)?)
    }

    /// Merges `overrides` (TOML text) over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Config`] if either document is invalid or
    /// the merged result has the wrong shape.
    pub fn with_overrides(overrides: &str) -> Result<Self, ValuationError> {
        let mut merged: toml::Table = toml::de::from_str(DEFAULT_TOML)?;
        let user: toml::Table = toml::de::from_str(overrides)?;
        merge_tables(&mut merged, user);
        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Loads the defaults, merged with the file at `path` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ValuationError> {
        let Some(path) = path else {
            return Self::embedded();
        };
        log::debug!("Loading config overrides from {}", path.display());
        Self::with_overrides(&std::fs::read_to_string(path)?)
    }
}

/// Recursively overlays `overlay` onto `base`. Tables merge, everything
/// else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let nested = match value {
            toml::Value::Table(nested) => nested,
            other => {
                base.insert(key, other);
                continue;
            }
        };
        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, nested);
            continue;
        }
        base.insert(key, toml::Value::Table(nested));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = ValuationConfig::embedded().unwrap();
        assert_eq!(config.search.n, 84);
        assert!((config.search.listed_to_sold_ratio - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.comparables, ComparableConfig::default());
        assert_eq!(config.walkability, WalkabilityConfig::default());
        assert_eq!(config.model.neighbors, 5);
        assert_eq!(config.store.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn overrides_merge_into_defaults() {
        let config = ValuationConfig::with_overrides(
            r#"
            [walkability]
            enabled = false

            [comparables.quality]
            max_price = 2000000.0

            [store]
            model_dir = "/var/lib/unicorn"
            "#,
        )
        .unwrap();

        assert!(!config.walkability.enabled);
        assert_eq!(config.walkability.concurrency, 4);
        assert!((config.comparables.quality.max_price - 2_000_000.0).abs() < f64::EPSILON);
        assert_eq!(config.comparables.quality.max_lot_sqft, 15_000);
        assert_eq!(config.store.model_dir, PathBuf::from("/var/lib/unicorn"));
        assert_eq!(config.search.n, 84);
    }

    #[test]
    fn wrongly_typed_override_is_rejected() {
        assert!(matches!(
            ValuationConfig::with_overrides("[search]\nn = \"many\""),
            Err(ValuationError::Config(_))
        ));
    }
}
