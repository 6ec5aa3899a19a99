use std::collections::HashMap;

use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument, warn};

use medbridge_domain::entities::{Intake, IntakeCreated, IntakeSummary, UploadedDocument};

use crate::api::AppState;
use crate::entities::{intake_request_from_fields, DeviceQuery, ErrorResponse, IntakeForm, SuccessResponse, DOCUMENTS_FIELD};

/// List intakes, newest first
#[utoipa::path(
    get,
    path = "/api/intakes",
    params(DeviceQuery),
    responses(
        (status = 200, description = "Intakes, newest first", body = [Intake]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "intakes"
)]
#[instrument(skip(state))]
pub async fn list_intakes(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let intakes = state.services.intakes.list_intakes(query.device_id.as_deref()).await?;
    info!("Returning {} intakes", intakes.len());
    Ok(Json(intakes))
}

/// Submit an intake questionnaire with prescription photos
#[utoipa::path(
    post,
    path = "/api/intakes",
    request_body(content = IntakeForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Intake created with a share token", body = IntakeCreated),
        (status = 400, description = "Invalid questionnaire or documents", body = ErrorResponse),
        (status = 413, description = "Document too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "intakes"
)]
#[instrument(skip(state, multipart))]
pub async fn create_intake(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ErrorResponse> {
    let (fields, documents) = read_form(multipart).await?;
    let request = intake_request_from_fields(fields)?;

    info!("Creating intake with {} documents", documents.len());
    let created = state.services.intakes.create_intake(request, documents).await?;

    if !created.extraction_errors.is_empty() {
        warn!(
            "Intake {} stored with {} extraction errors",
            created.intake.id,
            created.extraction_errors.len()
        );
    }
    Ok((StatusCode::CREATED, Json(created)))
}

/// Split the multipart body into text fields and uploaded documents
async fn read_form(mut multipart: Multipart) -> Result<(HashMap<String, String>, Vec<UploadedDocument>), ErrorResponse> {
    let mut fields = HashMap::new();
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == DOCUMENTS_FIELD {
            documents.push(read_document(field).await?);
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            fields.insert(name, value);
        }
    }

    Ok((fields, documents))
}

async fn read_document(field: Field<'_>) -> Result<UploadedDocument, ErrorResponse> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;

    Ok(UploadedDocument {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ErrorResponse {
    let message = err.body_text();
    warn!("Rejected multipart body: {}", message);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorResponse::payload_too_large(&message)
    } else {
        ErrorResponse::bad_request(&message)
    }
}

/// Get one intake
#[utoipa::path(
    get,
    path = "/api/intakes/{id}",
    params(("id" = String, Path, description = "Intake id")),
    responses(
        (status = 200, description = "The intake", body = Intake),
        (status = 404, description = "Intake not found", body = ErrorResponse)
    ),
    tag = "intakes"
)]
#[instrument(skip(state))]
pub async fn get_intake(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, ErrorResponse> {
    let intake = state.services.intakes.get_intake(&id).await?;
    Ok(Json(intake))
}

/// Delete an intake and revoke its share tokens
#[utoipa::path(
    delete,
    path = "/api/intakes/{id}",
    params(("id" = String, Path, description = "Intake id")),
    responses(
        (status = 200, description = "Intake deleted", body = SuccessResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "intakes"
)]
#[instrument(skip(state))]
pub async fn delete_intake(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.intakes.delete_intake(&id).await?;
    info!("Deleted intake {}", id);
    Ok(Json(SuccessResponse::ok()))
}

/// Full summary of an intake for its owner
#[utoipa::path(
    get,
    path = "/api/intakes/{id}/summary",
    params(("id" = String, Path, description = "Intake id")),
    responses(
        (status = 200, description = "Intake summary", body = IntakeSummary),
        (status = 404, description = "Intake not found", body = ErrorResponse)
    ),
    tag = "intakes"
)]
#[instrument(skip(state))]
pub async fn get_intake_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let summary = state.services.intakes.get_summary(&id).await?;
    Ok(Json(summary))
}
