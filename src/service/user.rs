//! User service
//!
//! Mirrors identity-provider accounts into the local store and
//! handles the follow graph, search and suggestions.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::data::{
    Database, DebugUser, EntityId, Follow, IdentityPatch, Notification, NotificationKind, User,
    UserSummary, UserWithFollowers,
};
use crate::error::AppError;
use crate::identity::{IdentityEvent, IdentityProfile, IdentityProvider, email_local_part};

/// Users offered in "who to follow"
pub const SUGGESTION_COUNT: usize = 3;

/// Users sampled by the debug dump
pub const DEBUG_SAMPLE_SIZE: usize = 5;

/// Compute the identity-derived changes for an existing mirror
///
/// - `email` follows the provider whenever it differs.
/// - `username` follows the provider only while the stored handle is still
///   the email-derived default and the provider supplies a different one.
///
/// Profile fields edited locally are never part of the patch.
pub fn reconcile_identity(existing: &User, profile: &IdentityProfile) -> IdentityPatch {
    let mut patch = IdentityPatch::default();

    if profile.email != existing.email {
        patch.email = Some(profile.email.clone());
    }

    let has_default_username = existing.username == email_local_part(&existing.email)
        || existing.username == profile.email_local_part();
    if let Some(username) = profile.username.as_deref() {
        if has_default_username && username != existing.username {
            patch.username = Some(username.to_string());
        }
    }

    patch
}

/// Result of mirroring an account
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub user: User,
    pub created: bool,
}

/// What a webhook delivery did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Created,
    Updated,
    Deleted,
    AlreadyDeleted,
    Ignored,
}

impl WebhookOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Created => "User created successfully",
            Self::Updated => "User updated successfully",
            Self::Deleted | Self::AlreadyDeleted => "User deleted successfully",
            Self::Ignored => "Webhook received",
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::AlreadyDeleted => "already_deleted",
            Self::Ignored => "ignored",
        }
    }
}

/// New follow state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowToggle {
    pub following: bool,
    pub followers_count: i64,
}

/// Result of a profile image change
#[derive(Debug, Clone)]
pub struct ImageUpdate {
    pub user: User,
    /// Set when the identity provider could not be updated
    pub warning: Option<String>,
}

/// Debug dump of the user table
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub total_users: i64,
    pub user_samples: Vec<DebugUser>,
    pub database_provider: String,
}

/// User service
pub struct UserService {
    db: Arc<Database>,
    identity: Arc<dyn IdentityProvider>,
}

impl UserService {
    /// Create new user service
    pub fn new(db: Arc<Database>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { db, identity }
    }

    // =========================================================================
    // Identity mirroring
    // =========================================================================

    /// Create the local mirror of an account, or reconcile an existing one
    pub async fn sync(&self, profile: &IdentityProfile) -> Result<SyncResult, AppError> {
        if let Some(existing) = self.db.get_user_by_external_id(&profile.external_id).await? {
            let user = self.reconcile(existing, profile).await?;
            return Ok(SyncResult {
                user,
                created: false,
            });
        }

        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            external_id: profile.external_id.clone(),
            email: profile.email.clone(),
            username: profile.default_username(),
            name: profile.display_name(),
            bio: None,
            image: profile.image_url.clone(),
            location: None,
            website: None,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_user(&user).await?;

        crate::metrics::USERS_TOTAL.inc();
        tracing::info!(user_id = %user.id, username = %user.username, "User mirrored");

        Ok(SyncResult {
            user,
            created: true,
        })
    }

    async fn reconcile(&self, existing: User, profile: &IdentityProfile) -> Result<User, AppError> {
        let patch = reconcile_identity(&existing, profile);
        if patch.is_empty() {
            return Ok(existing);
        }

        self.db
            .apply_identity_patch(&existing.id, &patch, Utc::now())
            .await?;
        tracing::info!(
            user_id = %existing.id,
            email_changed = patch.email.is_some(),
            username_changed = patch.username.is_some(),
            "User reconciled with identity provider"
        );

        self.db
            .get_user(&existing.id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Apply a verified identity webhook event
    ///
    /// # Errors
    /// `AppError::NotFoundWith` for `user.updated` when no mirror exists
    pub async fn apply_event(&self, event: &IdentityEvent) -> Result<WebhookOutcome, AppError> {
        match event {
            IdentityEvent::UserCreated(profile) => {
                let result = self.sync(profile).await?;
                Ok(if result.created {
                    WebhookOutcome::Created
                } else {
                    WebhookOutcome::Updated
                })
            }
            IdentityEvent::UserUpdated(profile) => {
                let existing = self
                    .db
                    .get_user_by_external_id(&profile.external_id)
                    .await?
                    .ok_or_else(|| AppError::NotFoundWith("User not found".to_string()))?;
                self.reconcile(existing, profile).await?;
                Ok(WebhookOutcome::Updated)
            }
            IdentityEvent::UserDeleted { external_id } => {
                if self.db.delete_user_by_external_id(external_id).await? {
                    crate::metrics::USERS_TOTAL.dec();
                    tracing::info!(external_id = %external_id, "User mirror deleted");
                    Ok(WebhookOutcome::Deleted)
                } else {
                    Ok(WebhookOutcome::AlreadyDeleted)
                }
            }
            IdentityEvent::Other(event_type) => {
                tracing::debug!(event_type = %event_type, "Ignoring identity event");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Store a new profile image and push it to the identity provider
    ///
    /// A failed push is reported as a warning; the local change stays.
    pub async fn update_image(
        &self,
        viewer: &User,
        image_url: Option<String>,
    ) -> Result<ImageUpdate, AppError> {
        let image_url = image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        self.db
            .update_user_image(&viewer.id, image_url.as_deref(), Utc::now())
            .await?;

        let mut warning = None;
        if let Some(url) = image_url.as_deref() {
            if let Err(error) = self
                .identity
                .update_profile_image(&viewer.external_id, url)
                .await
            {
                tracing::warn!(user_id = %viewer.id, %error, "Failed to push profile image");
                warning = Some("Profile image saved, but the identity provider was not updated".to_string());
            }
        }

        let user = self
            .db
            .get_user(&viewer.id)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(ImageUpdate { user, warning })
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Follow the target, or unfollow if already following
    ///
    /// # Errors
    /// - `AppError::Validation` on self-follow
    /// - `AppError::NotFound` if the target does not exist
    pub async fn toggle_follow(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<FollowToggle, AppError> {
        if actor_id == target_id {
            return Err(AppError::Validation("You cannot follow yourself".to_string()));
        }
        self.db
            .get_user(target_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let following = if self.db.is_following(actor_id, target_id).await? {
            self.db.delete_follow(actor_id, target_id).await?;
            tracing::info!(actor_id, target_id, "Unfollowed");
            false
        } else {
            let follow = Follow {
                follower_id: actor_id.to_string(),
                following_id: target_id.to_string(),
                created_at: Utc::now(),
            };
            let notification =
                Notification::new(NotificationKind::Follow, target_id, actor_id, None, None);

            if self
                .db
                .insert_follow_with_notification(&follow, &notification)
                .await?
            {
                crate::metrics::record_notification(NotificationKind::Follow);
            }
            tracing::info!(actor_id, target_id, "Followed");
            true
        };

        let counts = self.db.get_user_counts(target_id).await?;
        Ok(FollowToggle {
            following,
            followers_count: counts.followers,
        })
    }

    /// Users following `user_id`
    pub async fn followers(&self, user_id: &str) -> Result<Vec<UserSummary>, AppError> {
        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)?;
        self.db.get_followers(user_id).await
    }

    /// Users `user_id` follows
    pub async fn following(&self, user_id: &str) -> Result<Vec<UserSummary>, AppError> {
        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)?;
        self.db.get_following(user_id).await
    }

    /// Random users the viewer does not follow yet
    pub async fn suggestions(&self, viewer_id: &str) -> Result<Vec<UserWithFollowers>, AppError> {
        self.db
            .get_suggested_users(viewer_id, SUGGESTION_COUNT)
            .await
    }

    // =========================================================================
    // Search / debug
    // =========================================================================

    /// Search users by handle or name; a blank query matches nothing
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<UserWithFollowers>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        self.db.search_users(query, limit).await
    }

    /// User count plus a small sample with counters
    pub async fn debug_snapshot(&self) -> Result<DebugSnapshot, AppError> {
        Ok(DebugSnapshot {
            total_users: self.db.count_users().await?,
            user_samples: self.db.sample_debug_users(DEBUG_SAMPLE_SIZE).await?,
            database_provider: self.db.backend_name().to_string(),
        })
    }
}
