//! Winsorization with mean imputation.
//!
//! Bounds are fitted once on a population and then applied to any value,
//! including records that were not part of the fit (the subject property
//! and its what-if variants).

use serde::{Deserialize, Serialize};

/// Fitted winsorization bounds and the post-winsorization mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinsorStats {
    /// Values below this are raised to it.
    pub lower: f64,
    /// Values above this are lowered to it.
    pub upper: f64,
    /// Mean of the winsorized fitting values, used to impute `None`.
    pub mean: f64,
}

impl WinsorStats {
    /// Fits bounds on the non-null, finite entries of `values`.
    ///
    /// With `n` usable values sorted ascending and `k = floor(tail * n)`,
    /// the bounds are the values at indices `k` and `n - k - 1`. `tail` is
    /// clamped into `[0, 0.5)`. Returns `None` when there is nothing to fit.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn fit(values: &[Option<f64>], tail: f64) -> Option<Self> {
        let mut sorted = values
            .iter()
            .filter_map(|v| v.filter(|x| x.is_finite()))
            .collect::<Vec<_>>();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let tail = if tail.is_finite() { tail.clamp(0.0, 0.499_999) } else { 0.0 };
        let k = ((tail * n as f64).floor() as usize).min((n - 1) / 2);

        let lower = sorted[k];
        let upper = sorted[n - k - 1];
        let mean = sorted.iter().map(|v| v.clamp(lower, upper)).sum::<f64>() / n as f64;

        Some(Self { lower, upper, mean })
    }

    /// Clamps a present value into the fitted bounds; imputes the mean for
    /// a missing or non-finite one.
    #[must_use]
    pub fn apply(&self, value: Option<f64>) -> f64 {
        match value {
            Some(v) if v.is_finite() => v.clamp(self.lower, self.upper),
            _ => self.mean,
        }
    }
}

/// Applies optional stats: with none fitted the value passes through.
#[must_use]
pub fn winsorize(stats: Option<&WinsorStats>, value: Option<f64>) -> Option<f64> {
    match stats {
        Some(stats) => Some(stats.apply(value)),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hundred_with_outliers() -> Vec<Option<f64>> {
        // 90 well-behaved values plus 5 extreme outliers per tail.
        let mut values = (0..90).map(|i| Some(f64::from(i) + 100.0)).collect::<Vec<_>>();
        values.extend((0..5).map(|_| Some(-10_000.0)));
        values.extend((0..5).map(|_| Some(10_000.0)));
        values
    }

    #[test]
    fn outliers_are_clamped_to_percentile_values() {
        let stats = WinsorStats::fit(&hundred_with_outliers(), 0.05).unwrap();
        // Sorted: 5 low outliers, 100..=189, 5 high outliers. k = 5.
        assert!((stats.lower - 100.0).abs() < f64::EPSILON);
        assert!((stats.upper - 189.0).abs() < f64::EPSILON);

        for v in hundred_with_outliers() {
            let w = stats.apply(v);
            assert!(w >= stats.lower && w <= stats.upper);
        }
    }

    #[test]
    fn mean_is_taken_after_clamping() {
        let stats = WinsorStats::fit(&hundred_with_outliers(), 0.05).unwrap();
        // 5 × 100 + sum(100..=189) + 5 × 189, over 100.
        let expected =
            (5.0 * 100.0 + (100..=189).map(f64::from).sum::<f64>() + 5.0 * 189.0) / 100.0;
        assert!((stats.mean - expected).abs() < 1e-9);
        assert!((stats.apply(None) - expected).abs() < 1e-9);
    }

    #[test]
    fn nulls_are_ignored_when_fitting() {
        let values = vec![Some(1.0), None, Some(3.0), None, Some(f64::NAN)];
        let stats = WinsorStats::fit(&values, 0.05).unwrap();
        assert!((stats.lower - 1.0).abs() < f64::EPSILON);
        assert!((stats.upper - 3.0).abs() < f64::EPSILON);
        assert!((stats.mean - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn both_tails_trim_the_same_count() {
        // 0.05 × 30 = 1.5 floors to one value trimmed from each end.
        let values = (1..=30).map(|i| Some(f64::from(i))).collect::<Vec<_>>();
        let stats = WinsorStats::fit(&values, 0.05).unwrap();
        assert!((stats.lower - 2.0).abs() < f64::EPSILON);
        assert!((stats.upper - 29.0).abs() < f64::EPSILON);
    }

    #[test]
    fn small_samples_keep_their_extremes() {
        let values = vec![Some(5.0), Some(1.0), Some(9.0)];
        let stats = WinsorStats::fit(&values, 0.05).unwrap();
        assert!((stats.lower - 1.0).abs() < f64::EPSILON);
        assert!((stats.upper - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_to_fit() {
        assert!(WinsorStats::fit(&[None, None], 0.05).is_none());
        assert_eq!(winsorize(None, Some(4.0)), Some(4.0));
        assert_eq!(winsorize(None, None), None);
    }

    #[test]
    fn unseen_values_are_clamped() {
        let stats = WinsorStats::fit(&[Some(10.0), Some(20.0)], 0.0).unwrap();
        assert!((stats.apply(Some(50.0)) - 20.0).abs() < f64::EPSILON);
        assert!((stats.apply(Some(-50.0)) - 10.0).abs() < f64::EPSILON);
        assert!((stats.apply(Some(15.0)) - 15.0).abs() < f64::EPSILON);
    }
}
