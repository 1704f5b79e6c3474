//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database and identity-provider operations.

mod mention;
mod notification;
mod post;
mod profile;
mod user;

pub use mention::{MentionContext, MentionOutcome, MentionService, extract_handles};
pub use notification::{NotificationService, NotificationView};
pub use post::{CommentView, LikeToggle, PostService, PostView};
pub use profile::{ProfileService, ProfileUpdate, ProfileView};
pub use user::{
    DebugSnapshot, FollowToggle, ImageUpdate, SyncResult, UserService, WebhookOutcome,
    reconcile_identity,
};
