//! API layer
//!
//! HTTP handlers for:
//! - Posts, comments, likes and mentions
//! - Users, profiles and the viewer's own account
//! - Notifications
//! - Identity-provider webhooks
//! - Metrics (Prometheus)

mod debug;
pub mod dto;
mod me;
mod mentions;
pub mod metrics;
mod notifications;
mod posts;
mod profiles;
mod users;
mod webhook;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use metrics::{metrics_router, track_http_metrics};

/// Create the JSON API router (mounted under `/api`)
///
/// Authentication is enforced by the `Viewer` / `CurrentUser` extractors in handlers.
pub fn api_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/:id", get(posts::get_post).delete(posts::delete_post))
        .route("/users/search", get(users::search_users))
        .route("/users/:id/followers", get(users::get_followers))
        .route("/users/:id/following", get(users::get_following))
        .route("/profiles/:username", get(profiles::get_profile))
        .route("/profiles/:username/posts", get(profiles::get_profile_posts))
        .route("/profiles/:username/likes", get(profiles::get_profile_likes))
        .route("/debug/users", get(debug::debug_users));

    let authenticated_routes = Router::new()
        .route("/posts/:id/like", post(posts::toggle_like))
        .route("/posts/:id/comments", post(posts::create_comment))
        .route("/mentions", post(mentions::process_mentions))
        .route("/users/:id/follow", post(users::toggle_follow))
        .route("/me", get(me::get_me))
        .route("/me/sync", post(me::sync_me))
        .route("/me/following", get(me::get_my_following))
        .route("/me/suggestions", get(me::get_suggestions))
        .route("/me/profile", axum::routing::patch(me::update_profile))
        .route("/me/image", axum::routing::put(me::update_image))
        .route("/notifications", get(notifications::get_notifications))
        .route(
            "/notifications/unread_count",
            get(notifications::get_unread_count),
        )
        .route("/notifications/read", post(notifications::mark_read));

    // Signed by the identity provider instead of a session
    let webhook_routes = Router::new()
        .route("/webhooks/identity", post(webhook::identity_webhook))
        .route("/webhook/clerk", post(webhook::identity_webhook));

    public_routes
        .merge(authenticated_routes)
        .merge(webhook_routes)
}
