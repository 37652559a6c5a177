pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::artifacts::Artifacts;
use std::sync::Arc;

/// Shared application state
///
/// Built once at startup after a successful artifact load and never mutated;
/// concurrent handlers share it read-only.
#[derive(Clone)]
pub struct AppState {
    pub artifacts: Arc<Artifacts>,
}

impl AppState {
    pub fn new(artifacts: Arc<Artifacts>) -> Self {
        Self { artifacts }
    }
}
