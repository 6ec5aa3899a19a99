use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use medbridge_domain::entities::{PrescriptionWithMedications, SymptomHistory};

use crate::api::AppState;
use crate::entities::{DeviceQuery, ErrorResponse};

/// Stored prescriptions of a device with their medications
#[utoipa::path(
    get,
    path = "/api/prescriptions-with-meds/{device_id}",
    params(("device_id" = String, Path, description = "Device id of the patient")),
    responses(
        (status = 200, description = "Prescriptions, newest first", body = [PrescriptionWithMedications]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "prescriptions"
)]
#[instrument(skip(state))]
pub async fn list_prescriptions_with_medications(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let prescriptions = state
        .services
        .prescriptions
        .prescriptions_with_medications(&device_id)
        .await?;
    info!("Returning {} prescriptions", prescriptions.len());
    Ok(Json(prescriptions))
}

/// Visit and medication history for one chief complaint
#[utoipa::path(
    get,
    path = "/api/symptom-history/{chief_complaint}",
    params(
        ("chief_complaint" = String, Path, description = "Chief complaint"),
        DeviceQuery
    ),
    responses(
        (status = 200, description = "Symptom history", body = SymptomHistory),
        (status = 400, description = "deviceId missing", body = ErrorResponse),
        (status = 404, description = "No history for this complaint", body = ErrorResponse)
    ),
    tag = "prescriptions"
)]
#[instrument(skip(state))]
pub async fn get_symptom_history(
    State(state): State<AppState>,
    Path(chief_complaint): Path<String>,
    Query(query): Query<DeviceQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let device_id = query
        .device_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ErrorResponse::bad_request("deviceId is required"))?;

    match state
        .services
        .prescriptions
        .symptom_history(&device_id, &chief_complaint)
        .await?
    {
        Some(history) => Ok(Json(history)),
        None => Err(ErrorResponse::not_found("symptom history")),
    }
}
