use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use subtle::ConstantTimeEq;

use crate::config::get_config;
use crate::error::{Error, Result};

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Rejects event and scheduler calls that do not carry the shared secret,
/// ahead of any body extraction.
pub async fn require_webhook_secret(req: Request, next: Next) -> Result<Response> {
    verify_secret(req.headers(), &get_config().webhook_secret)?;
    Ok(next.run(req).await)
}

fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<()> {
    let Some(secret_hdr) = headers.get(WEBHOOK_SECRET_HEADER) else {
        return Err(Error::Unauthorized("missing_webhook_secret".into()));
    };
    let provided = secret_hdr
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_secret_header".into()))?;
    if ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid_webhook_secret".into()))
    }
}
