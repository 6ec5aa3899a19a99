use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use medbridge_domain::entities::Hospital;

use crate::api::AppState;
use crate::entities::{ErrorResponse, HospitalQuery};

/// List hospitals, optionally filtered by a search term
#[utoipa::path(
    get,
    path = "/api/hospitals",
    params(HospitalQuery),
    responses(
        (status = 200, description = "Matching hospitals", body = [Hospital]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "hospitals"
)]
#[instrument(skip(state))]
pub async fn list_hospitals(
    State(state): State<AppState>,
    Query(query): Query<HospitalQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Listing hospitals");
    let hospitals = state.services.hospitals.list(query.q.as_deref()).await?;
    Ok(Json(hospitals))
}
