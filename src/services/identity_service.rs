use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::services::google_auth::AccessTokenProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Deletes the sign-in identity. A missing user is `Error::NotFound`.
    async fn delete_identity(&self, uid: &str) -> Result<()>;
}

/// Identity deletion through the Identity Toolkit admin REST API.
#[derive(Clone)]
pub struct IdentityToolkitService {
    client: Client,
    auth: AccessTokenProvider,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl IdentityToolkitService {
    pub fn new(client: Client, auth: AccessTokenProvider, base_url: &str, project_id: &str) -> Self {
        Self {
            client,
            auth,
            endpoint: format!(
                "{}/v1/projects/{}/accounts:delete",
                base_url.trim_end_matches('/'),
                project_id
            ),
        }
    }
}

fn is_user_not_found(body: &str) -> bool {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|env| env.error.message.starts_with("USER_NOT_FOUND"))
        .unwrap_or(false)
}

#[async_trait]
impl IdentityAdmin for IdentityToolkitService {
    async fn delete_identity(&self, uid: &str) -> Result<()> {
        let mut req = self.client.post(&self.endpoint).json(&json!({ "localId": uid }));
        if let Some(token) = self.auth.bearer().await? {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if is_user_not_found(&body) {
            return Err(Error::NotFound(
                "The specified user does not exist in the identity store.".to_string(),
            ));
        }
        Err(Error::Internal(format!(
            "Identity deletion failed ({}): {}",
            status, body
        )))
    }
}
