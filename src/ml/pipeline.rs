use crate::artifacts::Artifacts;
use crate::error::Result;
use crate::ml::dataset::RawDataset;
use crate::ml::gbdt::{GbdtModel, GbdtParams};
use crate::ml::linear::LinearModel;
use crate::ml::model::FailureModel;
use crate::ml::scaler::StandardScaler;
use crate::ml::smote::smote_oversample;
use ndarray::Array2;
use tracing::info;

/// Training pipeline parameters.
#[derive(Debug, Clone)]
pub struct TrainParams {
    /// Seed for the oversampler
    pub seed: u64,
    /// Neighbours considered per synthetic sample
    pub smote_neighbours: usize,
    /// Boosting hyperparameters
    pub gbdt: GbdtParams,
    /// Iteration cap for the logistic solver
    pub max_iterations: u64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            seed: 42,
            smote_neighbours: 5,
            gbdt: GbdtParams::default(),
            max_iterations: 1000,
        }
    }
}

/// Run the full training pipeline on a decoded dataset
///
/// Balances classes, fits the scaler on the resampled features, then fits
/// both classifiers on the scaled data. The result is the complete artifact
/// set ready for persistence.
pub fn train_artifacts(dataset: &RawDataset, params: &TrainParams) -> Result<Artifacts> {
    info!(
        samples = dataset.n_samples(),
        features = dataset.n_features(),
        "training on dataset"
    );

    let (resampled, targets) = smote_oversample(
        &dataset.features,
        &dataset.targets,
        params.smote_neighbours,
        params.seed,
    )?;
    info!(
        resampled = resampled.nrows(),
        "class imbalance corrected via oversampling"
    );

    let scaler = StandardScaler::fit(&resampled)?;
    let scaled = scaler.transform_matrix(&resampled)?;

    let gbdt = GbdtModel::train(&scaled, &targets, &params.gbdt)?;
    info!(
        accuracy = training_accuracy(&gbdt, &scaled, &targets),
        trees = gbdt.trees.len(),
        "tree ensemble trained"
    );

    let linear = LinearModel::train(&scaled, &targets, params.max_iterations)?;
    info!(
        accuracy = training_accuracy(&linear, &scaled, &targets),
        "logistic regression trained"
    );

    let artifacts = Artifacts {
        gbdt,
        linear,
        scaler,
        feature_names: dataset.feature_names.clone(),
    };
    artifacts.validate()?;
    Ok(artifacts)
}

fn training_accuracy(model: &dyn FailureModel, features: &Array2<f64>, targets: &[usize]) -> f64 {
    let correct = targets
        .iter()
        .enumerate()
        .filter(|(i, &t)| model.predict(features.row(*i)) as usize == t)
        .count();
    correct as f64 / targets.len().max(1) as f64
}
