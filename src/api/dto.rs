//! Request DTOs
//!
//! Bodies and query strings accepted by the JSON API.

use serde::Deserialize;

use crate::service::ProfileUpdate;

/// Paging parameters for post lists
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<usize>,
    /// Return posts older than this ID
    pub max_id: Option<String>,
}

/// Limit-only paging
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

/// Explicit mention processing for an existing post or comment
#[derive(Debug, Deserialize)]
pub struct ProcessMentionsRequest {
    #[serde(default)]
    pub content: String,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
}

/// Profile edit; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            name: request.name,
            bio: request.bio,
            location: request.location,
            website: request.website,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateImageRequest {
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}
