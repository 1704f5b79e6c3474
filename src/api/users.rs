//! User directory endpoints: search, follower lists, follow toggle

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{Value, json};

use super::dto::SearchParams;
use crate::AppState;
use crate::auth::Viewer;
use crate::data::{UserSummary, UserWithFollowers};
use crate::error::AppError;
use crate::service::UserService;

pub(super) fn build_user_service(state: &AppState) -> UserService {
    UserService::new(state.db.clone(), state.identity.clone())
}

/// GET /api/users/search?q=
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserWithFollowers>>, AppError> {
    let users = build_user_service(&state)
        .search(&params.q, state.config.search.max_results)
        .await?;
    Ok(Json(users))
}

/// GET /api/users/:id/followers
pub async fn get_followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(build_user_service(&state).followers(&id).await?))
}

/// GET /api/users/:id/following
pub async fn get_following(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(build_user_service(&state).following(&id).await?))
}

/// POST /api/users/:id/follow
pub async fn toggle_follow(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let toggle = build_user_service(&state)
        .toggle_follow(&viewer.id, &id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "following": toggle.following,
        "followers_count": toggle.followers_count,
    })))
}
