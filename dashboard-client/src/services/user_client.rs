use crate::error::ApiError;
use crate::models::auth::ChangePasswordRequest;
use crate::models::{ProfileUpdate, UserProfile};
use crate::services::api_client::{ApiClient, ApiRequest, ME_PATH};
use std::sync::Arc;

const CHANGE_PASSWORD_PATH: &str = "/api/users/change_password/";

/// Operations on the logged-in user's own account.
pub struct UserClient {
    api: Arc<ApiClient>,
}

impl UserClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetch the current profile and refresh the cached copy with it.
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let profile: UserProfile = self.api.fetch_json(&ApiRequest::get(ME_PATH)).await?;
        self.api.store().set_profile(profile.clone()).await?;
        Ok(profile)
    }

    /// `PATCH` the profile. The server's answer replaces the cached copy.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::patch(ME_PATH).json(update)?;
        let profile: UserProfile = self.api.fetch_json(&request).await?;

        self.api.store().set_profile(profile.clone()).await?;
        tracing::info!(user_id = %profile.id, "Profile updated");
        Ok(profile)
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::post(CHANGE_PASSWORD_PATH).json(&ChangePasswordRequest {
            old_password,
            new_password,
        })?;
        self.api.execute(&request).await
    }
}
