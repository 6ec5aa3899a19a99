use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use medbridge_domain::entities::{NotificationList, NotificationSettings, UpdateNotificationSettings};

use crate::api::AppState;
use crate::entities::{ErrorResponse, SuccessResponse};

/// Inbox of a device
#[utoipa::path(
    get,
    path = "/api/notifications/{device_id}",
    params(("device_id" = String, Path, description = "Device id of the patient")),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationList),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let list = state.services.notifications.list(&device_id).await?;
    Ok(Json(list))
}

/// Mark one notification as read
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = SuccessResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[instrument(skip(state))]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.notifications.mark_read(&id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Mark every notification of a device as read
#[utoipa::path(
    post,
    path = "/api/notifications/{device_id}/read-all",
    params(("device_id" = String, Path, description = "Device id of the patient")),
    responses(
        (status = 200, description = "Notifications marked read", body = SuccessResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[instrument(skip(state))]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let updated = state.services.notifications.mark_all_read(&device_id).await?;
    info!("Marked {} notifications read", updated);
    Ok(Json(SuccessResponse::updated(updated)))
}

#[utoipa::path(
    get,
    path = "/api/notifications/{device_id}/settings",
    params(("device_id" = String, Path, description = "Device id of the patient")),
    responses(
        (status = 200, description = "Notification settings", body = NotificationSettings),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[instrument(skip(state))]
pub async fn get_notification_settings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let settings = state.services.notifications.settings(&device_id).await?;
    Ok(Json(settings))
}

/// Change notification settings; absent fields are kept
#[utoipa::path(
    put,
    path = "/api/notifications/{device_id}/settings",
    params(("device_id" = String, Path, description = "Device id of the patient")),
    request_body = UpdateNotificationSettings,
    responses(
        (status = 200, description = "Updated settings", body = NotificationSettings),
        (status = 400, description = "Invalid body", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[instrument(skip(state))]
pub async fn update_notification_settings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(update): Json<UpdateNotificationSettings>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let settings = state.services.notifications.update_settings(&device_id, update).await?;
    Ok(Json(settings))
}
