use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use qrcode::{render::svg, QrCode};
use tracing::{error, info, instrument};

use medbridge_domain::entities::{AccessLog, IntakeSummary, TokenGrant};

use crate::api::AppState;
use crate::entities::ErrorResponse;

const QR_MIN_DIMENSION: u32 = 200;

/// Active share token of an intake, issuing one when none is usable
#[utoipa::path(
    get,
    path = "/api/intakes/{id}/token",
    params(("id" = String, Path, description = "Intake id")),
    responses(
        (status = 200, description = "Share token", body = TokenGrant),
        (status = 404, description = "Intake not found", body = ErrorResponse)
    ),
    tag = "tokens"
)]
#[instrument(skip(state))]
pub async fn get_token(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, ErrorResponse> {
    let grant = state.services.access.get_or_issue_token(&id).await?;
    Ok(Json(grant))
}

/// Revoke all share tokens of an intake and issue a new one
#[utoipa::path(
    post,
    path = "/api/intakes/{id}/token/regenerate",
    params(("id" = String, Path, description = "Intake id")),
    responses(
        (status = 200, description = "New share token", body = TokenGrant),
        (status = 404, description = "Intake not found", body = ErrorResponse)
    ),
    tag = "tokens"
)]
#[instrument(skip(state))]
pub async fn regenerate_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let grant = state.services.access.regenerate_token(&id).await?;
    info!("Regenerated share token for intake {}", id);
    Ok(Json(grant))
}

/// QR code of the share URL
#[utoipa::path(
    get,
    path = "/api/intakes/{id}/token/qr.svg",
    params(("id" = String, Path, description = "Intake id")),
    responses(
        (status = 200, description = "SVG image", content_type = "image/svg+xml", body = String),
        (status = 404, description = "Intake not found", body = ErrorResponse)
    ),
    tag = "tokens"
)]
#[instrument(skip(state))]
pub async fn get_token_qr(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, ErrorResponse> {
    let grant = state.services.access.get_or_issue_token(&id).await?;
    let image = render_qr_svg(&grant.share_url)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], image))
}

/// Render a URL as an SVG QR code
pub fn render_qr_svg(url: &str) -> Result<String, ErrorResponse> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| {
        error!("Failed to encode QR code: {}", e);
        ErrorResponse::internal_error()
    })?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build())
}

/// Clinician view of an intake opened through a share token
#[utoipa::path(
    get,
    path = "/api/view/{token}",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Intake summary", body = IntakeSummary),
        (status = 410, description = "Token expired or invalid", body = ErrorResponse)
    ),
    tag = "tokens"
)]
#[instrument(skip(state, token))]
pub async fn view_summary(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let summary = state.services.access.view_summary(&token).await?;
    info!("Shared summary of intake {} viewed", summary.intake.id);
    Ok(Json(summary))
}

/// Who opened an intake and when, newest first
#[utoipa::path(
    get,
    path = "/api/intakes/{id}/logs",
    params(("id" = String, Path, description = "Intake id")),
    responses(
        (status = 200, description = "Access logs", body = [AccessLog]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "tokens"
)]
#[instrument(skip(state))]
pub async fn get_access_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let logs = state.services.access.access_logs(&id).await?;
    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_code_is_svg() {
        let image = render_qr_svg("http://localhost:3000/view/abc123").unwrap();
        assert!(image.contains("<svg"));
        assert!(image.contains("</svg>"));
    }
}
