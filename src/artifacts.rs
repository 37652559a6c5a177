use crate::error::{AppError, Result};
use crate::ml::{FailureModel, GbdtModel, LinearModel, ModelKind, StandardScaler};
use std::fs;
use std::path::{Path, PathBuf};

pub const GBDT_MODEL_FILE: &str = "gbdt_model.bin";
pub const LINEAR_MODEL_FILE: &str = "linear_model.bin";
pub const SCALER_FILE: &str = "scaler.bin";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";

/// The loaded artifact set
///
/// Produced once by the training step and shared read-only for the lifetime
/// of the inference process. Never partially constructed: loading fails as a
/// whole if any file is absent or undecodable.
#[derive(Debug)]
pub struct Artifacts {
    pub gbdt: GbdtModel,
    pub linear: LinearModel,
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
}

impl Artifacts {
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Select a model implementation by kind.
    pub fn model(&self, kind: ModelKind) -> &dyn FailureModel {
        match kind {
            ModelKind::Gbdt => &self.gbdt,
            ModelKind::Linear => &self.linear,
        }
    }

    /// Cross-check that every artifact agrees on the feature arity.
    pub fn validate(&self) -> Result<()> {
        self.gbdt.validate()?;
        self.linear.validate()?;

        let n = self.feature_names.len();
        if n == 0 {
            return Err(AppError::Serialization(
                "feature name list is empty".to_string(),
            ));
        }
        if self.gbdt.n_features != n
            || self.linear.n_features() != n
            || self.scaler.n_features() != n
        {
            return Err(AppError::Serialization(format!(
                "artifact arity mismatch: {} feature names, gbdt {}, linear {}, scaler {}",
                n,
                self.gbdt.n_features,
                self.linear.n_features(),
                self.scaler.n_features()
            )));
        }
        Ok(())
    }
}

/// On-disk layout of the four artifact files under one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist all four artifacts, creating the directory if needed.
    pub fn save(&self, artifacts: &Artifacts) -> Result<()> {
        artifacts.validate()?;
        fs::create_dir_all(&self.dir)?;

        fs::write(
            self.dir.join(GBDT_MODEL_FILE),
            bincode::serialize(&artifacts.gbdt)?,
        )?;
        fs::write(
            self.dir.join(LINEAR_MODEL_FILE),
            bincode::serialize(&artifacts.linear)?,
        )?;
        fs::write(
            self.dir.join(SCALER_FILE),
            bincode::serialize(&artifacts.scaler)?,
        )?;
        fs::write(
            self.dir.join(FEATURE_NAMES_FILE),
            serde_json::to_vec(&artifacts.feature_names)?,
        )?;

        Ok(())
    }

    /// Load all four artifacts or fail without partial state.
    pub fn load(&self) -> Result<Artifacts> {
        let gbdt: GbdtModel = bincode::deserialize(&self.read(GBDT_MODEL_FILE)?)?;
        let linear: LinearModel = bincode::deserialize(&self.read(LINEAR_MODEL_FILE)?)?;
        let scaler: StandardScaler = bincode::deserialize(&self.read(SCALER_FILE)?)?;
        let feature_names: Vec<String> = serde_json::from_slice(&self.read(FEATURE_NAMES_FILE)?)?;

        let artifacts = Artifacts {
            gbdt,
            linear,
            scaler,
            feature_names,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Err(AppError::ArtifactMissing(path.display().to_string()));
        }
        Ok(fs::read(&path)?)
    }
}
