use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub async fn from_file(path: &str) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// OAuth access tokens for Google APIs, minted from a service-account key and
/// reused until shortly before expiry. Without a key every call goes out
/// unauthenticated, which is what the local emulators expect.
#[derive(Clone)]
pub struct AccessTokenProvider {
    client: Client,
    key: Option<Arc<ServiceAccountKey>>,
    cached: Arc<RwLock<Option<CachedToken>>>,
}

impl AccessTokenProvider {
    pub fn new(client: Client, key: Option<ServiceAccountKey>) -> Self {
        Self {
            client,
            key: key.map(Arc::new),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn unauthenticated(client: Client) -> Self {
        Self::new(client, None)
    }

    pub async fn bearer(&self) -> Result<Option<String>> {
        let Some(key) = &self.key else {
            return Ok(None);
        };

        let refresh_margin = Duration::seconds(60);
        if let Some(token) = self.cached.read().await.as_ref() {
            if token.expires_at - refresh_margin > Utc::now() {
                return Ok(Some(token.value.clone()));
            }
        }

        let mut guard = self.cached.write().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at - refresh_margin > Utc::now() {
                return Ok(Some(token.value.clone()));
            }
        }

        let fresh = self.exchange(key).await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(Some(value))
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<CachedToken> {
        let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let issued_at = Utc::now();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: token_uri,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(1)).timestamp(),
        };
        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
        )?;

        let resp = self
            .client
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = resp.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained Google access token");
        Ok(CachedToken {
            value: token.access_token,
            expires_at: issued_at + Duration::seconds(token.expires_in),
        })
    }
}
