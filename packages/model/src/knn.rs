//! Standardized k-nearest-neighbour regression.

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Distance below which two standardized points count as identical.
const SAME_POINT: f64 = 1e-12;

/// k-NN regressor over standardized features with inverse-distance
/// weights.
///
/// Each input column is standardized with the training mean and standard
/// deviation (a constant column is left unscaled). A query that coincides
/// with training points returns the mean of their targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnRegressor {
    neighbors: usize,
    means: Vec<f64>,
    scales: Vec<f64>,
    points: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl KnnRegressor {
    /// Fits on `inputs` (one row per observation) and `targets`.
    ///
    /// # Errors
    ///
    /// * [`ModelError::EmptyTrainingSet`] when there are no rows
    /// * [`ModelError::Shape`] when rows differ in width or do not match
    ///   the number of targets
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(inputs: &[Vec<f64>], targets: &[f64], neighbors: usize) -> Result<Self, ModelError> {
        let Some(first) = inputs.first() else {
            return Err(ModelError::EmptyTrainingSet);
        };
        if inputs.len() != targets.len() {
            return Err(ModelError::Shape {
                message: format!("{} rows but {} targets", inputs.len(), targets.len()),
            });
        }
        let width = first.len();
        if let Some(row) = inputs.iter().find(|r| r.len() != width) {
            return Err(ModelError::Shape {
                message: format!("expected {width} columns, found {}", row.len()),
            });
        }

        let n = inputs.len() as f64;
        let means = (0..width)
            .map(|c| inputs.iter().map(|r| r[c]).sum::<f64>() / n)
            .collect::<Vec<_>>();
        let scales = (0..width)
            .map(|c| {
                let variance = inputs.iter().map(|r| (r[c] - means[c]).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                if std > 0.0 && std.is_finite() { std } else { 1.0 }
            })
            .collect::<Vec<_>>();

        let mut model = Self {
            neighbors: neighbors.max(1),
            means,
            scales,
            points: Vec::with_capacity(inputs.len()),
            targets: targets.to_vec(),
        };
        model.points = inputs.iter().map(|r| model.standardize(r)).collect();

        log::debug!(
            "Fitted k-NN regressor on {} rows x {width} columns (k = {})",
            model.points.len(),
            model.neighbors,
        );

        Ok(model)
    }

    /// Number of input columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Predicts the target for one input row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Shape`] when `input` has the wrong width.
    pub fn predict(&self, input: &[f64]) -> Result<f64, ModelError> {
        if input.len() != self.width() {
            return Err(ModelError::Shape {
                message: format!("expected {} columns, found {}", self.width(), input.len()),
            });
        }
        let query = self.standardize(input);

        let mut distances = self
            .points
            .iter()
            .zip(&self.targets)
            .map(|(point, target)| {
                let d = point
                    .iter()
                    .zip(&query)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (d, *target)
            })
            .collect::<Vec<_>>();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));
        distances.truncate(self.neighbors);

        let exact = distances
            .iter()
            .filter(|(d, _)| *d < SAME_POINT)
            .map(|(_, t)| *t)
            .collect::<Vec<_>>();
        if !exact.is_empty() {
            return Ok(mean(&exact));
        }

        let (weighted, total) = distances
            .iter()
            .fold((0.0, 0.0), |(sum, weights), (d, t)| (sum + t / d, weights + 1.0 / d));
        Ok(weighted / total)
    }

    fn standardize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
