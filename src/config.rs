use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Artifact store configuration
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Training configuration
    #[serde(default)]
    pub training: TrainingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: FAILSIGHT_)
            .add_source(
                config::Environment::with_prefix("FAILSIGHT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            artifacts: ArtifactsConfig::default(),
            training: TrainingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Directory holding the static HTML pages
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory holding the serialized model artifacts
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Path to the training dataset
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Random seed for oversampling
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Nearest neighbours considered per synthetic sample
    #[serde(default = "default_smote_neighbours")]
    pub smote_neighbours: usize,

    /// Boosting rounds for the tree ensemble
    #[serde(default = "default_boosting_rounds")]
    pub boosting_rounds: usize,

    /// Maximum tree depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Learning rate applied per boosting round
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Iteration cap for the logistic regression solver
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            seed: default_seed(),
            smote_neighbours: default_smote_neighbours(),
            boosting_rounds: default_boosting_rounds(),
            max_depth: default_max_depth(),
            learning_rate: default_learning_rate(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON logs
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/equipfails.csv")
}

fn default_seed() -> u64 {
    42
}

fn default_smote_neighbours() -> usize {
    5
}

fn default_boosting_rounds() -> usize {
    60
}

fn default_max_depth() -> usize {
    3
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_max_iterations() -> u64 {
    1000
}
