/// Machine learning module for the failure classifier pair
///
/// This module provides the offline training pipeline and the inference-side
/// model implementations:
/// - CSV dataset ingest with one-hot encoding of the equipment type
/// - SMOTE oversampling for class balance
/// - Standardizing feature scaler
/// - In-crate gradient-boosted trees (binary logistic objective)
/// - Logistic regression fit through linfa, persisted as plain weights

pub mod dataset;
pub mod gbdt;
pub mod linear;
pub mod model;
pub mod pipeline;
pub mod scaler;
pub mod smote;

pub use dataset::{load_training_csv, RawDataset};
pub use gbdt::{GbdtModel, GbdtParams};
pub use linear::LinearModel;
pub use model::{FailureModel, ModelKind};
pub use pipeline::{train_artifacts, TrainParams};
pub use scaler::StandardScaler;
pub use smote::smote_oversample;
