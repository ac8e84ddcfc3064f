//! Application state.

use ttm_worker::GenerationService;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub service: GenerationService,
}

impl AppState {
    pub fn new(config: ApiConfig, service: GenerationService) -> Self {
        Self { config, service }
    }
}
