//! Explainable equipment-failure prediction service.
//!
//! An offline trainer fits a gradient-boosted tree ensemble and a logistic
//! regression on a tabular maintenance dataset and persists them alongside a
//! feature scaler and the ordered feature-name list. The server loads those
//! artifacts once at startup and answers prediction and model-comparison
//! requests, attaching per-feature SHAP attribution plots.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod explain;
pub mod ml;
