use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    dto::event_dto::{TestCreatedEvent, TestUpdatedEvent},
    error::Result,
    AppState,
};

pub async fn handle_test_created(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
    Json(event): Json<TestCreatedEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    let outcome = match state.test_events.on_test_created(&test_id, &event.data).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to handle creation of test {}", test_id);
            None
        }
    };

    (
        StatusCode::ACCEPTED,
        Json(json!({ "handled": true, "dispatch": outcome })),
    )
}

pub async fn handle_test_updated(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
    Json(event): Json<TestUpdatedEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    let outcome = match state
        .test_events
        .on_test_updated(&test_id, &event.before, &event.after)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to handle update of test {}", test_id);
            None
        }
    };

    (
        StatusCode::ACCEPTED,
        Json(json!({ "handled": true, "dispatch": outcome })),
    )
}

/// Timer trigger for an external scheduler. Unlike document events, a failed
/// sweep is reported back so the scheduler's own alerting sees it.
pub async fn run_lifecycle_sweep(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let report = state.sweeper.run_once(Utc::now()).await?;
    Ok(Json(json!({ "report": report })))
}
