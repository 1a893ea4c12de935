pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod rest;
pub mod task;
pub mod validate;

use std::sync::Arc;

use config::AppConfig;
use provider::Provider;

/// Shared application state passed to every route handler.
///
/// Constructed once at process start and injected — handlers never reach
/// for process-wide globals.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    /// Client for the hosted auth/table provider.
    pub provider: Arc<Provider>,
    pub started_at: std::time::Instant,
}
