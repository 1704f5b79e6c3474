//! Debug endpoints (development only)

use axum::{extract::State, response::Json};

use super::users::build_user_service;
use crate::AppState;
use crate::error::AppError;
use crate::service::DebugSnapshot;

/// GET /api/debug/users
///
/// Served only when `debug.enabled` is set.
pub async fn debug_users(State(state): State<AppState>) -> Result<Json<DebugSnapshot>, AppError> {
    if !state.config.debug.enabled {
        return Err(AppError::NotFound);
    }

    Ok(Json(build_user_service(&state).debug_snapshot().await?))
}
