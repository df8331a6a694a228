//! Application state for the PDF toolbox API

use crate::config::Config;

/// Shared, read-only per process; every request builds its own documents
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        if let Some(dir) = &config.output_dir {
            tracing::info!("Writing results to {}", dir.display());
        }
        Self { config }
    }
}
