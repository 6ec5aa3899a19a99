use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use medbridge_domain::entities::{AdherenceLog, AdherenceSummary, RecordAdherenceRequest};

use crate::api::AppState;
use crate::entities::ErrorResponse;

/// Record whether a scheduled dose was taken
#[utoipa::path(
    post,
    path = "/api/adherence",
    request_body = RecordAdherenceRequest,
    responses(
        (status = 201, description = "Adherence log stored", body = AdherenceLog),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "adherence"
)]
#[instrument(skip(state, request))]
pub async fn record_adherence(
    State(state): State<AppState>,
    Json(request): Json<RecordAdherenceRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let log = state.services.adherence.record(request).await?;
    info!("Recorded {} dose for medication {}", log.status, log.medication_id);
    Ok((StatusCode::CREATED, Json(log)))
}

#[utoipa::path(
    get,
    path = "/api/adherence/{device_id}/summary",
    params(("device_id" = String, Path, description = "Device id of the patient")),
    responses(
        (status = 200, description = "Adherence summary", body = AdherenceSummary),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "adherence"
)]
#[instrument(skip(state))]
pub async fn get_adherence_summary(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let summary = state.services.adherence.summary(&device_id).await?;
    Ok(Json(summary))
}
