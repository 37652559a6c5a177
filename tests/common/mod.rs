//! Common test utilities
//!
//! Builds a small trained artifact set on a synthetic two-cluster dataset
//! over the canonical feature columns, and wires it into the API router the
//! way the server binary does.
#![allow(dead_code)]

use axum::Router;
use failsight::api::{build_router, AppState};
use failsight::artifacts::Artifacts;
use failsight::ml::{train_artifacts, RawDataset, TrainParams};
use ndarray::Array2;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

pub const FEATURE_NAMES: [&str; 7] = [
    "Air temperature [K]",
    "Process temperature [K]",
    "Rotational speed [rpm]",
    "Torque [Nm]",
    "Tool wear [min]",
    "Type_L",
    "Type_M",
];

/// Imbalanced dataset with a healthy cluster and a failing cluster.
pub fn synthetic_dataset() -> RawDataset {
    let mut rows: Vec<f64> = Vec::new();
    let mut targets = Vec::new();
    for i in 0..40 {
        let drift = (i % 7) as f64 * 0.1;
        rows.extend_from_slice(&[
            298.0 + drift,
            308.0 + drift,
            1500.0 + (i % 5) as f64 * 10.0,
            40.0 + drift,
            10.0 + (i % 11) as f64,
            (i % 2) as f64,
            ((i + 1) % 2) as f64,
        ]);
        targets.push(0);
    }
    for i in 0..10 {
        let drift = (i % 3) as f64 * 0.2;
        rows.extend_from_slice(&[
            303.0 + drift,
            312.0 + drift,
            1250.0 - (i % 4) as f64 * 15.0,
            65.0 + drift,
            200.0 + (i % 5) as f64 * 3.0,
            (i % 2) as f64,
            ((i + 1) % 2) as f64,
        ]);
        targets.push(1);
    }

    RawDataset {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        features: Array2::from_shape_vec((50, 7), rows).unwrap(),
        targets,
    }
}

pub fn trained_artifacts() -> Artifacts {
    train_artifacts(&synthetic_dataset(), &TrainParams::default()).unwrap()
}

pub fn test_app_with(artifacts: Artifacts) -> Router {
    let state = AppState::new(Arc::new(artifacts));
    let static_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("static");
    build_router(state, &static_dir)
}

pub fn test_app() -> Router {
    test_app_with(trained_artifacts())
}

/// The canonical end-to-end feature map.
pub fn canonical_features() -> Value {
    json!({
        "Air temperature [K]": 300.0,
        "Process temperature [K]": 310.0,
        "Rotational speed [rpm]": 1500,
        "Torque [Nm]": 40,
        "Tool wear [min]": 10,
        "Type_L": 1,
        "Type_M": 0
    })
}
