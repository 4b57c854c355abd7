use crate::{config::Config, services::ProgressTracker};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub tracker: ProgressTracker,
    pub config: Config,
}

impl FromRef<AppState> for ProgressTracker {
    fn from_ref(state: &AppState) -> Self {
        state.tracker.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
