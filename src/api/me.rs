//! Viewer endpoints
//!
//! Everything under `/api/me` acts on the authenticated user.

use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use super::dto::{UpdateImageRequest, UpdateProfileRequest};
use super::users::build_user_service;
use crate::AppState;
use crate::auth::{CurrentUser, Viewer};
use crate::data::{UserSummary, UserWithFollowers};
use crate::error::AppError;
use crate::identity::IdentityProfile;
use crate::service::ProfileService;

/// GET /api/me
pub async fn get_me(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Value>, AppError> {
    let counts = ProfileService::new(state.db.clone())
        .counts(&viewer.id)
        .await?;
    Ok(Json(json!({ "user": viewer, "counts": counts })))
}

/// POST /api/me/sync
///
/// Mirrors the session's account into the local store.
pub async fn sync_me(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let profile = IdentityProfile::from(&session);
    let result = build_user_service(&state).sync(&profile).await?;

    Ok(Json(json!({
        "success": true,
        "created": result.created,
        "user": result.user,
    })))
}

/// GET /api/me/following
pub async fn get_my_following(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(build_user_service(&state).following(&viewer.id).await?))
}

/// GET /api/me/suggestions
pub async fn get_suggestions(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Vec<UserWithFollowers>>, AppError> {
    Ok(Json(
        build_user_service(&state).suggestions(&viewer.id).await?,
    ))
}

/// PATCH /api/me/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user = ProfileService::new(state.db.clone())
        .update(&viewer.id, request.into())
        .await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// PUT /api/me/image
pub async fn update_image(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<UpdateImageRequest>,
) -> Result<Json<Value>, AppError> {
    let update = build_user_service(&state)
        .update_image(&viewer, request.image_url)
        .await?;

    let mut body = json!({ "success": true, "user": update.user });
    if let Some(warning) = update.warning {
        body["warning"] = Value::String(warning);
    }
    Ok(Json(body))
}
