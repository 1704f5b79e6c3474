//! Session authentication
//!
//! Handles:
//! - Verification of the identity provider's session tokens
//! - Authentication middleware and viewer extractors

mod middleware;
pub mod session;

pub use middleware::{CurrentUser, MaybeViewer, SESSION_COOKIE, Viewer, require_auth};
pub use session::{Session, SessionClaims, SessionVerifier};
