use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Identity of an authenticated caller. `sub` is the user's uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
}

pub fn decode_bearer(headers: &HeaderMap, secret: &str) -> Option<Claims> {
    let auth_header = headers.get(axum::http::header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) if !data.claims.sub.is_empty() => Some(data.claims),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = ?e, "Rejected bearer token");
            None
        }
    }
}

/// Attaches the caller's [`Claims`] when the request carries a valid bearer
/// token. Requests without one still reach the handler, which decides how an
/// anonymous caller is answered.
pub async fn attach_caller(mut req: Request, next: Next) -> Response {
    let config = crate::config::get_config();
    if let Some(claims) = decode_bearer(req.headers(), &config.jwt_secret) {
        req.extensions_mut().insert(claims);
    }
    next.run(req).await
}
