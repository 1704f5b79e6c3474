//! Mention endpoint

use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use super::dto::ProcessMentionsRequest;
use crate::AppState;
use crate::auth::Viewer;
use crate::error::AppError;
use crate::service::{MentionContext, MentionService};

/// POST /api/mentions
///
/// The mentioner is always the viewer, who must have authored the
/// referenced post or comment.
pub async fn process_mentions(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<ProcessMentionsRequest>,
) -> Result<Json<Value>, AppError> {
    let context = MentionContext {
        post_id: request.post_id,
        comment_id: request.comment_id,
    };

    let service = MentionService::new(state.db.clone());
    service.authorize_context(&viewer.id, &context).await?;
    let outcome = service
        .process(&request.content, &viewer.id, &context)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": outcome.message(),
        "outcome": outcome,
    })))
}
