use crate::error::Result;
use crate::explain::shap::{linear_shap, tree_shap, Attribution};
use crate::ml::gbdt::GbdtModel;
use crate::ml::linear::LinearModel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// The two model families served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Gbdt,
    Linear,
}

impl ModelKind {
    /// Parse the wire identifier.
    ///
    /// Unrecognized values select the linear model; the front end relies on
    /// this lenient fallback.
    pub fn from_request(name: &str) -> Self {
        if name == "xgboost" {
            ModelKind::Gbdt
        } else {
            ModelKind::Linear
        }
    }

    /// Human-readable name used in responses.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Gbdt => "XGBoost",
            ModelKind::Linear => "Logistic Regression",
        }
    }
}

/// Capability set shared by both classifiers
///
/// Implementations operate on scaled feature vectors in training-time column
/// order. `background` is the scaled image of the all-zero raw vector; the
/// tree ensemble derives its baseline from training covers and ignores it.
pub trait FailureModel: Send + Sync {
    /// Raw margin (log-odds of failure)
    fn margin(&self, features: ArrayView1<'_, f64>) -> f64;

    /// Class label: 1 = failure
    fn predict(&self, features: ArrayView1<'_, f64>) -> u8;

    /// Probability pair `[P(no failure), P(failure)]`
    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> [f64; 2];

    /// Per-feature attribution with baseline
    fn attribute(
        &self,
        features: ArrayView1<'_, f64>,
        background: ArrayView1<'_, f64>,
    ) -> Result<Attribution>;
}

impl FailureModel for GbdtModel {
    fn margin(&self, features: ArrayView1<'_, f64>) -> f64 {
        GbdtModel::margin(self, features)
    }

    fn predict(&self, features: ArrayView1<'_, f64>) -> u8 {
        u8::from(self.predict_probability(features) >= 0.5)
    }

    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> [f64; 2] {
        let p = self.predict_probability(features);
        [1.0 - p, p]
    }

    fn attribute(
        &self,
        features: ArrayView1<'_, f64>,
        _background: ArrayView1<'_, f64>,
    ) -> Result<Attribution> {
        tree_shap(self, features)
    }
}

impl FailureModel for LinearModel {
    fn margin(&self, features: ArrayView1<'_, f64>) -> f64 {
        LinearModel::margin(self, features)
    }

    fn predict(&self, features: ArrayView1<'_, f64>) -> u8 {
        u8::from(self.predict_probability(features) >= 0.5)
    }

    fn predict_proba(&self, features: ArrayView1<'_, f64>) -> [f64; 2] {
        let p = self.predict_probability(features);
        [1.0 - p, p]
    }

    fn attribute(
        &self,
        features: ArrayView1<'_, f64>,
        background: ArrayView1<'_, f64>,
    ) -> Result<Attribution> {
        linear_shap(self, features, background)
    }
}
