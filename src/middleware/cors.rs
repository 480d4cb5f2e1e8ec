use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The app and the admin panel call from arbitrary origins; only the verbs and
/// headers the callables use are allowed.
pub fn callable_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any)
}
