use crate::api::AppState;
use crate::artifacts::Artifacts;
use crate::error::{AppError, Result};
use crate::explain::{comparison_points, render_force_plot};
use crate::ml::ModelKind;
use axum::{extract::State, Json};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Predict with one selected model
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>> {
    request.validate()?;

    let kind = ModelKind::from_request(&request.model_name);
    let raw = reindex_features(&request.features, &state.artifacts.feature_names)?;
    let scaled = state.artifacts.scaler.transform(raw.view())?;
    let background = state.artifacts.scaler.zero_background();

    let model = state.artifacts.model(kind);
    let prediction = model.predict(scaled.view());
    let prediction_probability = model.predict_proba(scaled.view());

    // The plot is an enrichment: a failed attribution leaves it empty.
    let shap_plot = match model.attribute(scaled.view(), background.view()) {
        Ok(attribution) => render_force_plot(&attribution, &state.artifacts.feature_names),
        Err(e) => {
            tracing::warn!(model = kind.display_name(), error = %e, "attribution failed");
            String::new()
        }
    };

    Ok(Json(PredictResponse {
        prediction,
        prediction_probability,
        shap_plot,
        model_name: kind.display_name().to_string(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    pub model_name: String,
    #[validate(length(min = 1, message = "No features provided"))]
    pub features: HashMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: u8,
    pub prediction_probability: [f64; 2],
    pub shap_plot: String,
    pub model_name: String,
}

/// Run both models and compare their explanations
pub async fn compare_models(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<CompareResponse>> {
    if request.features.is_empty() {
        return Err(AppError::Validation("No features provided".to_string()));
    }
    request.validate()?;

    let raw = reindex_features(&request.features, &state.artifacts.feature_names)?;
    let scaled = state.artifacts.scaler.transform(raw.view())?;
    let background = state.artifacts.scaler.zero_background();

    let (xgboost, gbdt_values) = evaluate_for_comparison(
        &state.artifacts,
        ModelKind::Gbdt,
        scaled.view(),
        background.view(),
    );
    let (logistic_regression, linear_values) = evaluate_for_comparison(
        &state.artifacts,
        ModelKind::Linear,
        scaled.view(),
        background.view(),
    );

    let points = comparison_points(&gbdt_values, &linear_values, &state.artifacts.feature_names);

    Ok(Json(CompareResponse {
        xgboost,
        logistic_regression,
        comparison_points: points,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompareRequest {
    #[validate(length(min = 1, message = "No features provided"))]
    pub features: HashMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct ModelComparisonEntry {
    pub prediction: u8,
    pub probability: [f64; 2],
    pub shap_plot: String,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub xgboost: ModelComparisonEntry,
    pub logistic_regression: ModelComparisonEntry,
    pub comparison_points: Vec<String>,
}

/// Predict with one model and degrade its explanation independently.
///
/// A failed attribution substitutes a zero vector for the comparison text
/// and leaves the plot empty; the numeric prediction always proceeds.
fn evaluate_for_comparison(
    artifacts: &Artifacts,
    kind: ModelKind,
    scaled: ArrayView1<'_, f64>,
    background: ArrayView1<'_, f64>,
) -> (ModelComparisonEntry, Vec<f64>) {
    let model = artifacts.model(kind);
    let prediction = model.predict(scaled);
    let probability = model.predict_proba(scaled);

    let (values, shap_plot) = match model.attribute(scaled, background) {
        Ok(attribution) => {
            let plot = render_force_plot(&attribution, &artifacts.feature_names);
            (attribution.values, plot)
        }
        Err(e) => {
            tracing::warn!(
                model = kind.display_name(),
                error = %e,
                "attribution failed, substituting zero contributions"
            );
            (vec![0.0; artifacts.feature_count()], String::new())
        }
    };

    (
        ModelComparisonEntry {
            prediction,
            probability,
            shap_plot,
        },
        values,
    )
}

/// Debug endpoint reporting artifact load status
pub async fn debug_info(State(state): State<AppState>) -> Json<DebugResponse> {
    let artifacts = &state.artifacts;
    Json(DebugResponse {
        models_loaded: ModelsLoaded {
            xgb_model: artifacts.gbdt.validate().is_ok(),
            lr_model: artifacts.linear.validate().is_ok(),
            scaler: artifacts.scaler.n_features() > 0,
            feature_names: !artifacts.feature_names.is_empty(),
        },
        feature_count: artifacts.feature_count(),
    })
}

#[derive(Debug, Serialize)]
pub struct ModelsLoaded {
    pub xgb_model: bool,
    pub lr_model: bool,
    pub scaler: bool,
    pub feature_names: bool,
}

#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub models_loaded: ModelsLoaded,
    pub feature_count: usize,
}

/// Reorder a feature map into training-time column order.
///
/// Missing and unknown keys are both client errors; the offending names are
/// listed in the message.
pub fn reindex_features(
    features: &HashMap<String, f64>,
    feature_names: &[String],
) -> Result<Array1<f64>> {
    let mut missing: Vec<&str> = feature_names
        .iter()
        .filter(|name| !features.contains_key(*name))
        .map(|name| name.as_str())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(AppError::Validation(format!(
            "missing required features: {}",
            missing.join(", ")
        )));
    }

    let mut unknown: Vec<&str> = features
        .keys()
        .filter(|key| !feature_names.contains(key))
        .map(|key| key.as_str())
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(AppError::Validation(format!(
            "unknown features: {}",
            unknown.join(", ")
        )));
    }

    Ok(Array1::from_iter(
        feature_names.iter().map(|name| features[name]),
    ))
}
