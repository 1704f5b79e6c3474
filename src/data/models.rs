//! Data models
//!
//! Rust structs representing database entities and the read models
//! assembled from them. All entities use ULID for IDs and chrono for
//! timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// Local mirror of an identity-provider account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// Subject id assigned by the identity provider
    pub external_id: String,
    pub email: String,
    /// Unique public handle, referenced as `@username`
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal user identity used by batch lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRef {
    pub id: String,
    pub username: String,
}

/// Public user card (author lines, follower lists)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// User card with follower count (search results, suggestions)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserWithFollowers {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub followers_count: i64,
}

/// Relationship and content counters for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserCounts {
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
}

/// User row exposed by the debug endpoint
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DebugUser {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
}

// =============================================================================
// Posts and comments
// =============================================================================

/// A post authored by a local user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: Option<String>,
    /// Opaque image reference (hosted elsewhere)
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub post_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Post row joined with its author
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: String,
    pub content: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_id: String,
    pub author_username: String,
    pub author_name: Option<String>,
    pub author_image: Option<String>,
}

/// Comment row joined with its author
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: String,
    pub author_username: String,
    pub author_name: Option<String>,
    pub author_image: Option<String>,
}

/// Mentioned user of a post
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostMentionRow {
    pub post_id: String,
    pub user_id: String,
    pub username: String,
}

// =============================================================================
// Edges
// =============================================================================

/// Like (user, post), unique per pair
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

/// Follow edge (follower → following), unique per ordered pair
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Mentions and notifications
// =============================================================================

/// A user mentioned by another user, in a post or a comment
///
/// Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mention {
    pub id: String,
    /// Mentioned user
    pub user_id: String,
    pub mentioner_id: String,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Mention,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Comment => "COMMENT",
            Self::Follow => "FOLLOW",
            Self::Mention => "MENTION",
        }
    }
}

/// Notification for a user interaction
///
/// Only the `read` flag changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub user_id: String,
    /// Who triggered this notification
    pub creator_id: String,
    pub kind: NotificationKind,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build an unread notification stamped now
    pub fn new(
        kind: NotificationKind,
        recipient_id: &str,
        creator_id: &str,
        post_id: Option<&str>,
        comment_id: Option<&str>,
    ) -> Self {
        Self {
            id: EntityId::new().0,
            user_id: recipient_id.to_string(),
            creator_id: creator_id.to_string(),
            kind,
            post_id: post_id.map(str::to_string),
            comment_id: comment_id.map(str::to_string),
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Notification joined with its creator and referenced content
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub creator_id: String,
    pub creator_username: String,
    pub creator_name: Option<String>,
    pub creator_image: Option<String>,
    pub post_id: Option<String>,
    pub post_content: Option<String>,
    pub post_image: Option<String>,
    pub comment_id: Option<String>,
    pub comment_content: Option<String>,
}

// =============================================================================
// Patches
// =============================================================================

/// Identity-derived field changes for a mirrored user
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityPatch {
    pub email: Option<String>,
    pub username: Option<String>,
}

impl IdentityPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none()
    }
}

/// Profile fields edited by the user
///
/// Use `None` for omitted fields (no change), and `Some(None)` to clear a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub website: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.bio.is_none()
            && self.location.is_none()
            && self.website.is_none()
    }
}
