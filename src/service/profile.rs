//! Profile service
//!
//! Public profile lookup and user-edited profile fields.

use serde::Serialize;
use std::sync::Arc;

use crate::data::{Database, ProfilePatch, User, UserCounts};
use crate::error::AppError;

const MAX_BIO_CHARS: usize = 500;
const MAX_FIELD_CHARS: usize = 100;

fn normalize_optional_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Profile fields as submitted; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

impl ProfileUpdate {
    /// Trim every present field; blank values clear the field
    pub fn into_patch(self) -> ProfilePatch {
        ProfilePatch {
            name: self.name.map(normalize_optional_text),
            bio: self.bio.map(normalize_optional_text),
            location: self.location.map(normalize_optional_text),
            website: self.website.map(normalize_optional_text),
        }
    }
}

fn check_length(field: &str, value: &Option<Option<String>>, max: usize) -> Result<(), AppError> {
    if let Some(Some(value)) = value {
        if value.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
    }
    Ok(())
}

/// Public profile with counters
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub counts: UserCounts,
    /// Whether the viewer follows this user; `false` without a viewer
    pub is_following: bool,
}

impl ProfileView {
    fn new(user: User, counts: UserCounts, is_following: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            bio: user.bio,
            image: user.image,
            location: user.location,
            website: user.website,
            created_at: user.created_at,
            counts,
            is_following,
        }
    }
}

/// Profile service
pub struct ProfileService {
    db: Arc<Database>,
}

impl ProfileService {
    /// Create new profile service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get a profile by handle
    ///
    /// # Errors
    /// `AppError::NotFound` if no user has this handle
    pub async fn get_by_username(
        &self,
        username: &str,
        viewer: Option<&User>,
    ) -> Result<ProfileView, AppError> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or(AppError::NotFound)?;
        let counts = self.db.get_user_counts(&user.id).await?;

        let is_following = match viewer {
            Some(viewer) if viewer.id != user.id => {
                self.db.is_following(&viewer.id, &user.id).await?
            }
            _ => false,
        };

        Ok(ProfileView::new(user, counts, is_following))
    }

    /// Counters for a user
    pub async fn counts(&self, user_id: &str) -> Result<UserCounts, AppError> {
        self.db.get_user_counts(user_id).await
    }

    /// Update the viewer's profile fields
    pub async fn update(&self, user_id: &str, update: ProfileUpdate) -> Result<User, AppError> {
        let patch = update.into_patch();

        check_length("name", &patch.name, MAX_FIELD_CHARS)?;
        check_length("bio", &patch.bio, MAX_BIO_CHARS)?;
        check_length("location", &patch.location, MAX_FIELD_CHARS)?;
        check_length("website", &patch.website, MAX_FIELD_CHARS)?;

        if !patch.is_empty() {
            let updated = self
                .db
                .patch_profile(user_id, &patch, chrono::Utc::now())
                .await?;
            if !updated {
                return Err(AppError::NotFound);
            }
            tracing::info!(user_id, "Profile updated");
        }

        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)
    }
}
