//! Default price predictor.

use serde::{Deserialize, Serialize};
use unicorn_features::{FeatureMatrix, FeatureRecord, NUMERIC_WIDTH};

use crate::{KnnRegressor, ModelError, Predictor, TagVocabulary};

/// Neighbours used when none is configured.
pub const DEFAULT_NEIGHBORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedPrice {
    column_means: Vec<f64>,
    vocabulary: TagVocabulary,
    regressor: KnnRegressor,
}

/// Prices a home from its nearest comparables in feature space.
///
/// Numeric columns are mean-imputed with training means, tags are one-hot
/// encoded against a [`TagVocabulary`], and the result feeds a
/// [`KnnRegressor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborPricePredictor {
    neighbors: usize,
    fitted: Option<FittedPrice>,
}

impl Default for NeighborPricePredictor {
    fn default() -> Self {
        Self::new(DEFAULT_NEIGHBORS)
    }
}

impl NeighborPricePredictor {
    #[must_use]
    pub const fn new(neighbors: usize) -> Self {
        Self {
            neighbors,
            fitted: None,
        }
    }

    #[must_use]
    pub const fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

impl FittedPrice {
    fn encode(&self, features: &FeatureRecord) -> Vec<f64> {
        encode_row(&self.column_means, &self.vocabulary, features)
    }
}

/// Numeric columns (mean-imputed) followed by the one-hot tag columns.
fn encode_row(
    column_means: &[f64],
    vocabulary: &TagVocabulary,
    features: &FeatureRecord,
) -> Vec<f64> {
    let mut row = features
        .numeric_values()
        .iter()
        .zip(column_means)
        .map(|(v, mean)| v.filter(|x| x.is_finite()).unwrap_or(*mean))
        .collect::<Vec<_>>();
    row.extend(vocabulary.encode(&features.tags));
    row
}

#[allow(clippy::cast_precision_loss)]
fn column_means(rows: &[FeatureRecord]) -> Vec<f64> {
    let mut sums = [0.0; NUMERIC_WIDTH];
    let mut counts = [0_usize; NUMERIC_WIDTH];
    for row in rows {
        for (c, value) in row.numeric_values().iter().enumerate() {
            if let Some(v) = value.filter(|x| x.is_finite()) {
                sums[c] += v;
                counts[c] += 1;
            }
        }
    }
    sums.iter()
        .zip(counts)
        .map(|(sum, count)| if count == 0 { 0.0 } else { sum / count as f64 })
        .collect()
}

impl Predictor for NeighborPricePredictor {
    #[allow(clippy::cast_precision_loss)]
    fn fit(&mut self, matrix: &FeatureMatrix) -> Result<(), ModelError> {
        if matrix.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let column_means = column_means(&matrix.rows);
        let vocabulary = TagVocabulary::fit(matrix.rows.iter().map(|r| &r.tags));
        let inputs = matrix
            .rows
            .iter()
            .map(|row| encode_row(&column_means, &vocabulary, row))
            .collect::<Vec<_>>();
        let targets = matrix.targets.iter().map(|t| *t as f64).collect::<Vec<_>>();
        let fitted = FittedPrice {
            regressor: KnnRegressor::fit(&inputs, &targets, self.neighbors)?,
            column_means,
            vocabulary,
        };

        log::info!(
            "Fitted price predictor on {} comparables ({} tags kept)",
            matrix.len(),
            fitted.vocabulary.len(),
        );
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, features: &FeatureRecord) -> Result<f64, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        fitted.regressor.predict(&fitted.encode(features))
    }
}
