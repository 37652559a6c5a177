use crate::error::{AppError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Standardizing feature scaler
///
/// Centers every feature to zero mean and unit variance. Fit once by the
/// training step; immutable afterwards and shared read-only by both models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean
    mean: Array1<f64>,

    /// Per-feature scale (population standard deviation)
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit a scaler on a feature matrix (rows = samples)
    pub fn fit(features: &Array2<f64>) -> Result<Self> {
        if features.nrows() == 0 {
            return Err(AppError::Dataset(
                "cannot fit scaler on an empty feature matrix".to_string(),
            ));
        }

        let mean = features
            .mean_axis(Axis(0))
            .ok_or_else(|| AppError::Dataset("feature matrix has no columns".to_string()))?;
        let mut scale = features.std_axis(Axis(0), 0.0);

        // Constant columns scale by 1.0 so transform stays finite.
        scale.mapv_inplace(|s| if s == 0.0 { 1.0 } else { s });

        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fit on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Scale a single feature vector
    pub fn transform(&self, features: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if features.len() != self.mean.len() {
            return Err(AppError::Computation(format!(
                "expected {} features, got {}",
                self.mean.len(),
                features.len()
            )));
        }
        Ok((&features - &self.mean) / &self.scale)
    }

    /// Scale a feature matrix in place, row by row
    pub fn transform_matrix(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.mean.len() {
            return Err(AppError::Computation(format!(
                "expected {} features, got {}",
                self.mean.len(),
                features.ncols()
            )));
        }
        Ok((features - &self.mean) / &self.scale)
    }

    /// The scaled image of the all-zero raw vector, used as the linear
    /// attribution background.
    pub fn zero_background(&self) -> Array1<f64> {
        -&self.mean / &self.scale
    }
}
