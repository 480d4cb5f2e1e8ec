pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod screen_channel;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use reqwest::Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    admin_service::AdminService,
    audience_service::AudienceResolver,
    google_auth::{AccessTokenProvider, ServiceAccountKey},
    identity_service::{IdentityAdmin, IdentityToolkitService},
    lifecycle_service::LifecycleSweeper,
    push_service::{FcmPushService, PushSender},
    test_event_service::TestEventService,
    test_service::{PgTestStore, TestStore},
    user_service::{PgUserDirectory, UserDirectory},
};

#[derive(Clone)]
pub struct AppState {
    pub sweeper: LifecycleSweeper,
    pub test_events: TestEventService,
    pub admin_service: AdminService,
}

impl AppState {
    pub fn from_backends(
        tests: Arc<dyn TestStore>,
        users: Arc<dyn UserDirectory>,
        push: Arc<dyn PushSender>,
        identity: Arc<dyn IdentityAdmin>,
    ) -> Self {
        let resolver = AudienceResolver::new(users.clone(), push);
        let sweeper = LifecycleSweeper::new(tests.clone(), resolver.clone());
        let test_events = TestEventService::new(resolver.clone());
        let admin_service = AdminService::new(tests, users, identity, resolver);

        Self {
            sweeper,
            test_events,
            admin_service,
        }
    }

    pub async fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let key = match &config.google_credentials_path {
            Some(path) => Some(ServiceAccountKey::from_file(path).await?),
            None => {
                tracing::warn!("GOOGLE_APPLICATION_CREDENTIALS not set; Google API calls go out unauthenticated");
                None
            }
        };
        let auth = AccessTokenProvider::new(http_client.clone(), key);

        let push = FcmPushService::new(
            http_client.clone(),
            auth.clone(),
            &config.fcm_base_url,
            &config.firebase_project_id,
        );
        let identity = IdentityToolkitService::new(
            http_client,
            auth,
            &config.identity_base_url,
            &config.firebase_project_id,
        );

        Ok(Self::from_backends(
            Arc::new(PgTestStore::new(pool.clone())),
            Arc::new(PgUserDirectory::new(pool)),
            Arc::new(push),
            Arc::new(identity),
        ))
    }
}

/// Routes of the service, grouped per surface, each with its own rate limit.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let callable_api = Router::new()
        .route(
            "/api/callable/sendScheduledTestNotification",
            post(routes::callable::send_scheduled_test_notification),
        )
        .route(
            "/api/callable/deleteUserAccount",
            post(routes::callable::delete_user_account),
        )
        .layer(axum::middleware::from_fn(middleware::auth::attach_caller))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::RateLimiter::new(config.callable_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let events_api = Router::new()
        .route(
            "/api/events/tests/:test_id/created",
            post(routes::events::handle_test_created),
        )
        .route(
            "/api/events/tests/:test_id/updated",
            post(routes::events::handle_test_updated),
        )
        .route(
            "/api/scheduler/publish-and-expire",
            post(routes::events::run_lifecycle_sweep),
        )
        .layer(axum::middleware::from_fn(
            middleware::webhook_secret::require_webhook_secret,
        ))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::RateLimiter::new(config.events_rps),
            middleware::rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(callable_api)
        .merge(events_api)
        .with_state(state)
}
