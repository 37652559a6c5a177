/// Attribution and presentation module
///
/// Computes per-feature SHAP attributions for both model families, renders
/// them as force-style plots, and derives the natural-language comparison
/// between the two models. Everything here is an enrichment of the numeric
/// prediction: failures degrade to empty plots or fallback text, they never
/// fail a request.

pub mod compare;
pub mod plot;
pub mod shap;

pub use compare::comparison_points;
pub use plot::render_force_plot;
pub use shap::{linear_shap, tree_shap, Attribution};
