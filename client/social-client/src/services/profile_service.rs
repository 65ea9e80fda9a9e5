use reqwest::multipart::{Form, Part};
use social_common::models::{AvatarUploadResponse, MessageResponse, PrivacyResponse, UpdateProfileRequest};
use social_common::{ApiClient, Profile, ServiceError, UserSummary};
use tracing::{info, warn};

use crate::error::ClientResult;

pub const PRIVATE_PROFILE: &str = "This profile is private.";

/// Profile reads and edits for the profile page
#[derive(Clone)]
pub struct ProfileService {
    api: ApiClient,
}

impl ProfileService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /profile/{id}`; a 403 means the profile is private to the viewer
    pub async fn get_profile(&self, user_id: &str) -> ClientResult<Profile> {
        match self.api.get::<Profile>(&format!("/profile/{user_id}")).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(ServiceError::NotFound(format!("profile {user_id}")).into()),
            Err(ServiceError::Authorization(_)) => {
                Err(ServiceError::Authorization(PRIVATE_PROFILE.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> ClientResult<()> {
        self.api.put::<_, MessageResponse>("/profile", update).await?;
        info!("Profile updated");
        Ok(())
    }

    /// Upload an avatar image; returns the stored path
    pub async fn upload_avatar(&self, file_name: &str, bytes: Vec<u8>) -> ClientResult<String> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(image_mime(file_name))
            .map_err(|e| ServiceError::InvalidRequest(format!("invalid avatar type: {e}")))?;
        let form = Form::new().part("avatar", part);

        let response = self
            .api
            .post_multipart::<AvatarUploadResponse>("/profile/avatar", form)
            .await?
            .ok_or_else(|| ServiceError::ExternalService("empty avatar upload response".into()))?;

        info!(avatar_path = %response.avatar_path, "Avatar uploaded");
        Ok(response.avatar_path)
    }

    /// Flip public/private; returns the new `is_public`
    pub async fn toggle_privacy(&self) -> ClientResult<bool> {
        let response = self
            .api
            .post_empty::<PrivacyResponse>("/profile/toggle-privacy")
            .await?
            .ok_or_else(|| ServiceError::ExternalService("empty privacy response".into()))?;
        Ok(response.is_public)
    }

    /// Every user; empty on failure
    pub async fn all_users(&self) -> Vec<UserSummary> {
        match self.api.get::<Vec<UserSummary>>("/users").await {
            Ok(users) => users.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Error fetching users");
                Vec::new()
            }
        }
    }
}

/// The backend only accepts JPEG, PNG and GIF avatars
fn image_mime(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
