use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::models::notification::{BatchResponse, MulticastMessage};
use crate::services::google_auth::AccessTokenProvider;

/// Largest token list a single multicast call may carry.
pub const MAX_MULTICAST_TOKENS: usize = 500;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Sends one message to every token. Per-token failures are reported in
    /// the response, not as an error.
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse>;
}

/// Push delivery through the FCM HTTP v1 API, one request per token.
#[derive(Clone)]
pub struct FcmPushService {
    client: Client,
    auth: AccessTokenProvider,
    endpoint: String,
}

impl FcmPushService {
    pub fn new(client: Client, auth: AccessTokenProvider, base_url: &str, project_id: &str) -> Self {
        Self {
            client,
            auth,
            endpoint: format!(
                "{}/v1/projects/{}/messages:send",
                base_url.trim_end_matches('/'),
                project_id
            ),
        }
    }
}

async fn send_one(
    client: Client,
    endpoint: String,
    bearer: Option<String>,
    body: serde_json::Value,
) -> std::result::Result<(), String> {
    let mut req = client.post(&endpoint).json(&body);
    if let Some(token) = bearer {
        req = req.bearer_auth(token);
    }
    match req.send().await {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(format!("{}: {}", status, text))
        }
        Err(e) => Err(e.to_string()),
    }
}

#[async_trait]
impl PushSender for FcmPushService {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse> {
        if message.tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(Error::InvalidArgument(format!(
                "Multicast carries {} tokens, the limit is {}",
                message.tokens.len(),
                MAX_MULTICAST_TOKENS
            )));
        }

        let bearer = self.auth.bearer().await?;
        let mut set = JoinSet::new();
        for token in &message.tokens {
            let body = json!({
                "message": {
                    "token": token,
                    "notification": message.notification,
                    "data": message.data,
                }
            });
            let client = self.client.clone();
            let endpoint = self.endpoint.clone();
            let bearer = bearer.clone();
            let token = token.clone();
            set.spawn(async move { (token, send_one(client, endpoint, bearer, body).await) });
        }

        let mut response = BatchResponse::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => response.success_count += 1,
                Ok((token, Err(reason))) => {
                    tracing::debug!(%reason, "Push delivery failed for one token");
                    response.failure_count += 1;
                    response.failed_tokens.push(token);
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Push delivery task aborted");
                    response.failure_count += 1;
                }
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationContent;

    #[test]
    fn endpoint_is_built_from_base_and_project() {
        let service = FcmPushService::new(
            Client::new(),
            AccessTokenProvider::unauthenticated(Client::new()),
            "http://localhost:9099/",
            "kadu-academy",
        );
        assert_eq!(
            service.endpoint,
            "http://localhost:9099/v1/projects/kadu-academy/messages:send"
        );
    }

    #[tokio::test]
    async fn rejects_oversized_batches_before_sending() {
        let service = FcmPushService::new(
            Client::new(),
            AccessTokenProvider::unauthenticated(Client::new()),
            "http://127.0.0.1:9",
            "kadu-academy",
        );
        let content = NotificationContent::published("T");
        let tokens = (0..=MAX_MULTICAST_TOKENS).map(|i| format!("tok-{}", i)).collect();
        let message = MulticastMessage::new("t", "T", &content, tokens);

        let err = service.send_multicast(&message).await.unwrap_err();
        assert_eq!(err.status_code(), "INVALID_ARGUMENT");
    }
}
