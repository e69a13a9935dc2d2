//! The per-city walkability state machine.
//!
//! ```text
//! Uninitialized ──(stored model)──────────────────────────▶ Predicting
//!       │
//!       └──(no model)──▶ Bootstrapping ──(enough lookups)──▶ Predicting
//! ```

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt as _};
use serde::{Deserialize, Serialize};
use unicorn_comparables::{ComparableSet, NormalizedRecord};
use unicorn_model::store::{load_model, save_model};
use unicorn_model::{KnnRegressor, ModelKind, ModelStore};

use crate::score::{MAX_SCORE, MIN_SCORE};
use crate::{WalkScoreError, WalkScoreQuery, WalkScoreSource, WalkabilityConfig};

/// Where an estimator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorPhase {
    /// Nothing loaded or looked up yet.
    Uninitialized,
    /// No regressor; scores come from live lookups.
    Bootstrapping,
    /// A regressor is available.
    Predicting,
}

#[derive(Debug, Clone)]
enum State {
    Uninitialized,
    Bootstrapping,
    Predicting(KnnRegressor),
}

/// Walkability scores for one comparable set. Every scored record has a
/// value; the maps are empty only when scoring is disabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkScores {
    scores: BTreeMap<String, f64>,
    subject: Option<f64>,
    /// Scores that came from a live lookup.
    pub observed: usize,
    /// Scores predicted by the regressor.
    pub predicted: usize,
    /// Scores imputed from the observed mean or the fallback.
    pub imputed: usize,
}

impl WalkScores {
    /// Scores when walkability is switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Score for a comparable.
    #[must_use]
    pub fn get(&self, property_id: &str) -> Option<f64> {
        self.scores.get(property_id).copied()
    }

    /// Scores for all comparables, keyed by property id.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.scores
    }

    /// Score for the subject property.
    #[must_use]
    pub const fn subject(&self) -> Option<f64> {
        self.subject
    }
}

/// Scores walkability for one city, keyed by its `"{CITY}_{STATE}"` model
/// key.
#[derive(Debug, Clone)]
pub struct WalkabilityEstimator {
    config: WalkabilityConfig,
    key: String,
    state: State,
}

impl WalkabilityEstimator {
    #[must_use]
    pub fn new(config: WalkabilityConfig, key: impl Into<String>) -> Self {
        Self {
            config,
            key: key.into(),
            state: State::Uninitialized,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> EstimatorPhase {
        match self.state {
            State::Uninitialized => EstimatorPhase::Uninitialized,
            State::Bootstrapping => EstimatorPhase::Bootstrapping,
            State::Predicting(_) => EstimatorPhase::Predicting,
        }
    }

    /// Leaves [`EstimatorPhase::Uninitialized`], loading the stored
    /// regressor when allowed. Returns whether one was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`WalkScoreError::Model`] if a stored model exists but
    /// cannot be read.
    pub fn initialize(&mut self, store: &dyn ModelStore) -> Result<bool, WalkScoreError> {
        if !matches!(self.state, State::Uninitialized) {
            return Ok(matches!(self.state, State::Predicting(_)));
        }

        if self.config.load_model_if_available
            && let Some(regressor) =
                load_model::<KnnRegressor>(store, ModelKind::WalkScore, &self.key)?
        {
            log::info!("Loaded walk score model for {}", self.key);
            self.state = State::Predicting(regressor);
            return Ok(true);
        }

        log::info!("No walk score model for {}, bootstrapping from lookups", self.key);
        self.state = State::Bootstrapping;
        Ok(false)
    }

    /// Scores every comparable in `set` and the subject property.
    ///
    /// While bootstrapping, one lookup is made per record; a failed lookup
    /// is logged and imputed. A regressor is fitted once enough lookups
    /// succeed and, if configured, saved to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`WalkScoreError::Model`] if loading, fitting or saving the
    /// regressor fails. Individual lookup failures are not errors.
    pub async fn score(
        &mut self,
        set: &ComparableSet,
        source: &dyn WalkScoreSource,
        store: &dyn ModelStore,
    ) -> Result<WalkScores, WalkScoreError> {
        if !self.config.enabled {
            log::debug!("Walkability disabled, skipping");
            return Ok(WalkScores::disabled());
        }

        self.initialize(store)?;

        let city = format!("{} {}", set.subject().city, set.subject().state);
        let records = set
            .comparables()
            .iter()
            .chain(std::iter::once(set.normalized_subject()))
            .collect::<Vec<_>>();

        let observed = if matches!(self.state, State::Bootstrapping) {
            let observed = self.look_up(&records, &city, source).await;
            self.fit_from(&records, &observed, store)?;
            observed
        } else {
            vec![None; records.len()]
        };

        Ok(self.resolve(&records, &observed))
    }

    async fn look_up(
        &self,
        records: &[&NormalizedRecord],
        city: &str,
        source: &dyn WalkScoreSource,
    ) -> Vec<Option<f64>> {
        log::info!(
            "Looking up walk scores for {} locations (concurrency={})",
            records.len(),
            self.config.concurrency,
        );

        stream::iter(records.iter().map(|normalized| {
            let record = normalized.record();
            let query = record.lat_long.both().map(|(latitude, longitude)| WalkScoreQuery {
                address: city.to_string(),
                latitude,
                longitude,
            });
            let id = record.property_id.clone();
            async move {
                let Some(query) = query else {
                    log::debug!("No coordinates for {id}, skipping walk score lookup");
                    return None;
                };
                match source.fetch_score(&query).await {
                    Ok(raw) => raw.walk(),
                    Err(e) => {
                        log::warn!("Walk score lookup for {id} failed: {e}");
                        None
                    }
                }
            }
        }))
        .buffered(self.config.concurrency.max(1))
        .collect()
        .await
    }

    fn fit_from(
        &mut self,
        records: &[&NormalizedRecord],
        observed: &[Option<f64>],
        store: &dyn ModelStore,
    ) -> Result<(), WalkScoreError> {
        let (inputs, targets): (Vec<_>, Vec<_>) = records
            .iter()
            .zip(observed)
            .filter_map(|(r, score)| Some((vec![r.lat_winz?, r.long_winz?], (*score)?)))
            .unzip();

        if targets.len() < self.config.min_training_points.max(1) {
            log::info!(
                "Only {} walk score observation(s) for {}, not fitting a model",
                targets.len(),
                self.key,
            );
            return Ok(());
        }

        let regressor = KnnRegressor::fit(&inputs, &targets, self.config.neighbors)?;
        if self.config.save_model {
            save_model(store, ModelKind::WalkScore, &self.key, &regressor)?;
        }
        self.state = State::Predicting(regressor);
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn resolve(&self, records: &[&NormalizedRecord], observed: &[Option<f64>]) -> WalkScores {
        let known = observed.iter().flatten().copied().collect::<Vec<_>>();
        let observed_mean =
            (!known.is_empty()).then(|| known.iter().sum::<f64>() / known.len() as f64);
        let regressor = match &self.state {
            State::Predicting(regressor) => Some(regressor),
            _ => None,
        };

        let mut scores = WalkScores::default();
        let last = records.len().saturating_sub(1);

        for (i, (normalized, score)) in records.iter().zip(observed).enumerate() {
            let value = if let Some(score) = score {
                scores.observed += 1;
                *score
            } else if let Some(predicted) = regressor.and_then(|r| predict(r, normalized)) {
                scores.predicted += 1;
                predicted
            } else {
                scores.imputed += 1;
                observed_mean.unwrap_or(self.config.fallback_score)
            };

            if i == last {
                scores.subject = Some(value);
            } else {
                scores
                    .scores
                    .insert(normalized.record().property_id.clone(), value);
            }
        }

        log::info!(
            "Walk scores for {}: {} observed, {} predicted, {} imputed",
            self.key,
            scores.observed,
            scores.predicted,
            scores.imputed,
        );
        scores
    }
}

fn predict(regressor: &KnnRegressor, normalized: &NormalizedRecord) -> Option<f64> {
    let input = [normalized.lat_winz?, normalized.long_winz?];
    match regressor.predict(&input) {
        Ok(v) if v.is_finite() => Some(v.clamp(MIN_SCORE, MAX_SCORE)),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Walk score prediction failed: {e}");
            None
        }
    }
}
