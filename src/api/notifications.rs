//! Notification endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde_json::{Value, json};

use super::dto::{LimitParams, MarkReadRequest};
use crate::AppState;
use crate::auth::Viewer;
use crate::error::AppError;
use crate::service::{NotificationService, NotificationView};

/// GET /api/notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    let limit = state.config.feed.page_size(params.limit);
    let notifications = NotificationService::new(state.db.clone())
        .list(&viewer.id, limit)
        .await?;
    Ok(Json(notifications))
}

/// GET /api/notifications/unread_count
pub async fn get_unread_count(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Value>, AppError> {
    let count = NotificationService::new(state.db.clone())
        .unread_count(&viewer.id)
        .await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /api/notifications/read
pub async fn mark_read(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<Value>, AppError> {
    let updated = NotificationService::new(state.db.clone())
        .mark_read(&viewer.id, &request.ids)
        .await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}
