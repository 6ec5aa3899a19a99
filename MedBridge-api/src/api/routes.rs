use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Extension, Router,
};
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use medbridge_domain::config::{ExtractorConfig, ServiceConfig};
use medbridge_domain::database::{self, DatabaseError, DatabasePool};
use medbridge_domain::extraction::{ExtractionError, GeminiExtractor, MedicationExtractor};
use medbridge_domain::health::{HealthService, HealthServiceTrait};
use medbridge_domain::services::Services;

use super::handlers::{adherence, health, hospitals, intakes, notifications, prescriptions, tokens};
use super::AppState;
use crate::openapi::configure_swagger_routes;

/// Failures while wiring the application
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Database unavailable: {0}")]
    Database(#[from] DatabaseError),

    #[error("Extractor unavailable: {0}")]
    Extractor(#[from] ExtractionError),
}

/// Create the application router from the environment.
///
/// Uses the process-wide pool when it was initialised, otherwise an
/// in-memory database.
pub async fn create_app() -> Result<Router, StartupError> {
    debug!("Creating application router");

    let pool = match database::get_db_pool() {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Database pool not available ({}), using in-memory storage", e);
            DatabasePool::in_memory()?
        }
    };
    info!("Database: {}", pool.describe());

    let config = ServiceConfig::from_env();
    let extractor: Arc<dyn MedicationExtractor> = Arc::new(GeminiExtractor::new(ExtractorConfig::from_env())?);

    let services = Services::new(pool.clone(), extractor.clone(), config.clone());
    let health_service: Arc<dyn HealthServiceTrait> = Arc::new(HealthService::new(pool, extractor));

    health::initialize_server_start_time();
    debug!("Health check service initialized");

    Ok(create_app_with_state(AppState::new(services, config), health_service))
}

/// Build the router around existing state
pub fn create_app_with_state(state: AppState, health_service: Arc<dyn HealthServiceTrait>) -> Router {
    let body_limit = state.config.max_upload_bytes();

    let api_routes = Router::new()
        .route("/hospitals", get(hospitals::list_hospitals))
        .route("/intakes", get(intakes::list_intakes).post(intakes::create_intake))
        .route("/intakes/:id", get(intakes::get_intake).delete(intakes::delete_intake))
        .route("/intakes/:id/summary", get(intakes::get_intake_summary))
        .route("/intakes/:id/logs", get(tokens::get_access_logs))
        .route("/intakes/:id/token", get(tokens::get_token))
        .route("/intakes/:id/token/regenerate", post(tokens::regenerate_token))
        .route("/intakes/:id/token/qr.svg", get(tokens::get_token_qr))
        .route("/view/:token", get(tokens::view_summary))
        .route(
            "/prescriptions-with-meds/:device_id",
            get(prescriptions::list_prescriptions_with_medications),
        )
        .route("/symptom-history/:chief_complaint", get(prescriptions::get_symptom_history))
        // one parameter name per segment: the id is a device id except on /read
        .route("/notifications/:id", get(notifications::list_notifications))
        .route("/notifications/:id/read", post(notifications::mark_notification_read))
        .route("/notifications/:id/read-all", post(notifications::mark_all_notifications_read))
        .route(
            "/notifications/:id/settings",
            get(notifications::get_notification_settings).put(notifications::update_notification_settings),
        )
        .route("/adherence", post(adherence::record_adherence))
        .route("/adherence/:device_id/summary", get(adherence::get_adherence_summary));

    debug!("API routes configured");

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .layer(Extension(health_service));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let app = Router::new()
        .merge(public_routes)
        .nest("/api", api_routes)
        .with_state(state)
        .merge(configure_swagger_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    debug!("Router assembled");
    app
}
