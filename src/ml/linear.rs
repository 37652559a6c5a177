use crate::error::{AppError, Result};
use crate::ml::gbdt::sigmoid;
use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Logistic regression classifier
///
/// Fit through linfa; the solver's coefficients are extracted into this
/// plain struct, which is what gets persisted and used for inference. The
/// margin is oriented so that positive values mean the failure class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    /// Model format version
    pub model_version: i64,
    /// Per-feature coefficients in scaled-feature space
    pub weights: Array1<f64>,
    /// Intercept term
    pub intercept: f64,
    /// Number of samples the model was fit on
    pub n_training_samples: usize,
    /// Training timestamp
    pub trained_at: DateTime<Utc>,
}

impl LinearModel {
    /// Fit on scaled features and binary targets.
    pub fn train(
        features: &Array2<f64>,
        targets: &[usize],
        max_iterations: u64,
    ) -> Result<Self> {
        let n = features.nrows();
        if n == 0 || n != targets.len() {
            return Err(AppError::Dataset(format!(
                "feature rows ({}) and targets ({}) differ or are empty",
                n,
                targets.len()
            )));
        }

        let records = features.clone();
        let labels = Array1::from_vec(targets.to_vec());
        let dataset = Dataset::new(records, labels);

        let fitted = LogisticRegression::default()
            .max_iterations(max_iterations)
            .fit(&dataset)
            .map_err(|e| AppError::Computation(format!("logistic regression fit failed: {}", e)))?;

        let mut weights = fitted.params().to_owned();
        let mut intercept = fitted.intercept();

        // Orient the margin so failures score positive.
        let mut sum_pos = 0.0;
        let mut n_pos = 0usize;
        let mut sum_neg = 0.0;
        let mut n_neg = 0usize;
        for (i, &t) in targets.iter().enumerate() {
            let margin = weights.dot(&features.row(i)) + intercept;
            if t == 1 {
                sum_pos += margin;
                n_pos += 1;
            } else {
                sum_neg += margin;
                n_neg += 1;
            }
        }
        if n_pos > 0 && n_neg > 0 && sum_pos / (n_pos as f64) < sum_neg / n_neg as f64 {
            weights.mapv_inplace(|w| -w);
            intercept = -intercept;
        }

        Ok(Self {
            model_version: 1,
            weights,
            intercept,
            n_training_samples: n,
            trained_at: Utc::now(),
        })
    }

    /// Number of features expected per sample.
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Raw margin (log-odds) for one sample.
    pub fn margin(&self, features: ArrayView1<'_, f64>) -> f64 {
        self.weights.dot(&features) + self.intercept
    }

    /// Probability of the positive (failure) class.
    pub fn predict_probability(&self, features: ArrayView1<'_, f64>) -> f64 {
        sigmoid(self.margin(features))
    }

    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(AppError::Serialization(
                "linear model has no coefficients".to_string(),
            ));
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(AppError::Serialization(
                "linear model has non-finite coefficients".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let features = array![
            [-2.0, 0.3],
            [-1.5, -0.2],
            [-1.0, 0.1],
            [-0.5, -0.4],
            [0.5, 0.2],
            [1.0, -0.1],
            [1.5, 0.4],
            [2.0, -0.3],
        ];
        let targets = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (features, targets)
    }

    #[test]
    fn separates_classes_with_positive_failure_margin() {
        let (features, targets) = separable();
        let model = LinearModel::train(&features, &targets, 500).unwrap();
        model.validate().unwrap();

        for (i, &t) in targets.iter().enumerate() {
            let p = model.predict_probability(features.row(i));
            if t == 1 {
                assert!(p > 0.5, "sample {} should score positive, got {}", i, p);
            } else {
                assert!(p < 0.5, "sample {} should score negative, got {}", i, p);
            }
        }
    }

    #[test]
    fn bincode_round_trip_preserves_margins() {
        let (features, targets) = separable();
        let model = LinearModel::train(&features, &targets, 500).unwrap();
        let bytes = bincode::serialize(&model).unwrap();
        let restored: LinearModel = bincode::deserialize(&bytes).unwrap();
        for row in features.outer_iter() {
            assert_eq!(model.margin(row), restored.margin(row));
        }
    }

    #[test]
    fn rejects_empty_training_set() {
        let features = Array2::<f64>::zeros((0, 2));
        assert!(LinearModel::train(&features, &[], 100).is_err());
    }
}
