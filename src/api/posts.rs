//! Post endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};

use super::dto::{CreateCommentRequest, CreatePostRequest, FeedParams};
use crate::AppState;
use crate::auth::Viewer;
use crate::data::{User, UserRef, UserSummary};
use crate::error::AppError;
use crate::service::{
    CommentView, MentionContext, MentionOutcome, MentionService, PostService, PostView,
};

fn build_post_service(state: &AppState) -> PostService {
    PostService::new(state.db.clone())
}

fn author_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id.clone(),
        username: user.username.clone(),
        name: user.name.clone(),
        image: user.image.clone(),
    }
}

/// Run mention fan-out after a write; failures are reported, not propagated
///
/// Returns the report together with the users that were mentioned.
async fn fan_out_mentions(
    state: &AppState,
    content: Option<&str>,
    mentioner_id: &str,
    context: &MentionContext,
) -> (Value, Vec<UserRef>) {
    let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
        let outcome = MentionOutcome::NoMentions;
        let report = json!({ "success": true, "message": outcome.message(), "outcome": outcome });
        return (report, vec![]);
    };

    match MentionService::new(state.db.clone())
        .process(content, mentioner_id, context)
        .await
    {
        Ok(outcome) => {
            let report =
                json!({ "success": true, "message": outcome.message(), "outcome": &outcome });
            let mentioned = match outcome {
                MentionOutcome::Created { mentioned, .. } => mentioned,
                _ => vec![],
            };
            (report, mentioned)
        }
        Err(error) => {
            tracing::error!(
                %error,
                mentioner_id,
                post_id = ?context.post_id,
                comment_id = ?context.comment_id,
                "Mention fan-out failed"
            );
            let report = json!({ "success": false, "error": "Failed to process mentions" });
            (report, vec![])
        }
    }
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Value>, AppError> {
    let limit = state.config.feed.page_size(params.limit);
    let posts = build_post_service(&state)
        .list_feed(limit, params.max_id.as_deref())
        .await?;

    Ok(Json(serde_json::to_value(posts).map_err(|e| AppError::Internal(e.into()))?))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let post = build_post_service(&state)
        .create(&viewer.id, request.content, request.image)
        .await?;

    let (mentions, mentioned) = fan_out_mentions(
        &state,
        post.content.as_deref(),
        &viewer.id,
        &MentionContext::post(&post.id),
    )
    .await;

    let view = PostView::fresh(post, author_summary(&viewer), mentioned);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "post": view, "mentions": mentions })),
    ))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let post = build_post_service(&state).get(&id).await?;
    Ok(Json(serde_json::to_value(post).map_err(|e| AppError::Internal(e.into()))?))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    build_post_service(&state).delete(&viewer.id, &id).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/posts/:id/like
pub async fn toggle_like(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let toggle = build_post_service(&state)
        .toggle_like(&viewer.id, &id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "liked": toggle.liked,
        "likes_count": toggle.likes_count,
    })))
}

/// POST /api/posts/:id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let comment = build_post_service(&state)
        .create_comment(&viewer.id, &id, &request.content)
        .await?;

    let (mentions, _) = fan_out_mentions(
        &state,
        Some(&comment.content),
        &viewer.id,
        &MentionContext::comment(&comment.post_id, &comment.id),
    )
    .await;

    let view = CommentView {
        id: comment.id,
        content: comment.content,
        created_at: comment.created_at,
        author: author_summary(&viewer),
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "comment": view, "mentions": mentions })),
    ))
}
