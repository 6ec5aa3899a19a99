pub mod handlers;
pub mod routes;

use std::sync::Arc;

use axum::Router;

use medbridge_domain::config::ServiceConfig;
use medbridge_domain::services::Services;

pub use routes::{create_app, create_app_with_state, StartupError};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub config: ServiceConfig,
}

impl AppState {
    pub fn new(services: Services, config: ServiceConfig) -> Self {
        Self {
            services: Arc::new(services),
            config,
        }
    }
}

/// Create the application router from the environment
pub async fn create_application() -> Result<Router, StartupError> {
    routes::create_app().await
}
