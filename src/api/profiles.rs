//! Public profile endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use super::dto::LimitParams;
use crate::AppState;
use crate::auth::MaybeViewer;
use crate::error::AppError;
use crate::service::{PostService, PostView, ProfileService, ProfileView};

/// GET /api/profiles/:username
pub async fn get_profile(
    State(state): State<AppState>,
    MaybeViewer(viewer): MaybeViewer,
    Path(username): Path<String>,
) -> Result<Json<ProfileView>, AppError> {
    let profile = ProfileService::new(state.db.clone())
        .get_by_username(&username, viewer.as_ref())
        .await?;
    Ok(Json(profile))
}

/// GET /api/profiles/:username/posts
pub async fn get_profile_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let limit = state.config.feed.page_size(params.limit);
    let posts = PostService::new(state.db.clone())
        .by_author(&username, limit)
        .await?;
    Ok(Json(posts))
}

/// GET /api/profiles/:username/likes
pub async fn get_profile_likes(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let limit = state.config.feed.page_size(params.limit);
    let posts = PostService::new(state.db.clone())
        .liked_by(&username, limit)
        .await?;
    Ok(Json(posts))
}
