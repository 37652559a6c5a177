use clap::Parser;
use failsight::{
    artifacts::ArtifactStore,
    ml::{load_training_csv, train_artifacts, GbdtParams, TrainParams},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "failsight-train")]
#[command(about = "Train the equipment-failure models and persist the artifact set", long_about = None)]
struct Args {
    /// Path to the training CSV
    #[arg(short, long, default_value = "data/equipfails.csv")]
    dataset: PathBuf,

    /// Output directory for the artifact files
    #[arg(short, long, default_value = "models")]
    out_dir: PathBuf,

    /// Random seed for oversampling
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Nearest neighbours considered per synthetic sample
    #[arg(long, default_value_t = 5)]
    smote_neighbours: usize,

    /// Boosting rounds
    #[arg(long, default_value_t = 60)]
    rounds: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 3)]
    max_depth: usize,

    /// Learning rate per boosting round
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,

    /// Iteration cap for the logistic regression solver
    #[arg(long, default_value_t = 1000)]
    max_iterations: u64,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "failsight=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    tracing::info!("Starting model training process");

    let dataset = match load_training_csv(&args.dataset) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::error!(
                error = %e,
                path = %args.dataset.display(),
                "FATAL: training dataset could not be loaded"
            );
            std::process::exit(1);
        }
    };
    tracing::info!(
        samples = dataset.n_samples(),
        features = dataset.n_features(),
        path = %args.dataset.display(),
        "dataset loaded"
    );

    let params = TrainParams {
        seed: args.seed,
        smote_neighbours: args.smote_neighbours,
        gbdt: GbdtParams {
            rounds: args.rounds,
            max_depth: args.max_depth,
            learning_rate: args.learning_rate,
            ..GbdtParams::default()
        },
        max_iterations: args.max_iterations,
    };

    let artifacts = match train_artifacts(&dataset, &params) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            tracing::error!(error = %e, "FATAL: training failed");
            std::process::exit(1);
        }
    };

    let store = ArtifactStore::new(&args.out_dir);
    if let Err(e) = store.save(&artifacts) {
        tracing::error!(
            error = %e,
            dir = %args.out_dir.display(),
            "FATAL: failed to persist artifacts"
        );
        std::process::exit(1);
    }

    tracing::info!(
        dir = %args.out_dir.display(),
        "Training complete; artifacts saved"
    );
}
