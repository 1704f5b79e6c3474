//! Authentication middleware
//!
//! Protects routes that require authentication and resolves the
//! request's viewer (the synced local user behind a session).

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::Session;
use crate::AppState;
use crate::data::User;
use crate::error::AppError;

/// Cookie in which the identity provider's frontend SDK keeps its session token
pub const SESSION_COOKIE: &str = "__session";

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
}

fn session_from_parts(parts: &mut Parts, state: &AppState) -> Result<Session, AppError> {
    if let Some(session) = parts.extensions.get::<Session>().cloned() {
        return Ok(session);
    }

    let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
    let session = state.sessions.verify(&token)?;
    parts.extensions.insert(session.clone());

    Ok(session)
}

/// Middleware to require authentication
///
/// Extracts and verifies session from cookie or Authorization header.
/// Adds Session to request extensions if valid.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/metrics", ...)
///     .layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_headers(request.headers()).ok_or(AppError::Unauthorized)?;
    let session = state.sessions.verify(&token)?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Extractor for the verified session claims
///
/// Use where a local user may not exist yet (user sync).
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        session_from_parts(parts, &state).map(CurrentUser)
    }
}

/// Extractor for the request's viewer
///
/// Requires a valid session whose subject has a local mirror.
///
/// # Usage
/// ```ignore
/// async fn handler(Viewer(user): Viewer) -> impl IntoResponse {
///     format!("Hello, @{}", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Viewer(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(Viewer(user));
        }

        let state = AppState::from_ref(state);
        let session = session_from_parts(parts, &state)?;
        let user = state
            .db
            .get_user_by_external_id(&session.subject)
            .await?
            .ok_or_else(|| AppError::NotFoundWith("user not synced".to_string()))?;
        parts.extensions.insert(user.clone());

        Ok(Viewer(user))
    }
}

/// Optional viewer extractor
///
/// Returns None if not authenticated or not synced, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeViewer(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeViewer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Viewer::from_request_parts(parts, state).await {
            Ok(Viewer(user)) => Ok(MaybeViewer(Some(user))),
            Err(AppError::Database(error)) => {
                tracing::warn!(%error, "Failed to resolve optional viewer");
                Ok(MaybeViewer(None))
            }
            Err(_) => Ok(MaybeViewer(None)),
        }
    }
}
