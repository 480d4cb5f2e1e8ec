use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::{
    dto::callable_dto::{
        CallableAck, CallableRequest, CallableResponse, DeleteUserAccountRequest,
        SendScheduledTestNotificationRequest,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

/// An unreadable body is treated as an empty payload so the usual
/// authentication and validation order still decides the answer.
fn payload_or_default<T: Default>(body: std::result::Result<Json<CallableRequest<T>>, JsonRejection>) -> T {
    match body {
        Ok(Json(req)) => req.data,
        Err(rejection) => {
            tracing::debug!(%rejection, "Unreadable callable body");
            T::default()
        }
    }
}

#[axum::debug_handler]
pub async fn send_scheduled_test_notification(
    State(state): State<AppState>,
    caller: Option<Extension<Claims>>,
    body: std::result::Result<Json<CallableRequest<SendScheduledTestNotificationRequest>>, JsonRejection>,
) -> Result<Json<CallableResponse<CallableAck>>> {
    let caller = caller.map(|Extension(claims)| claims);
    let result = state
        .admin_service
        .send_scheduled_test_notification(caller.as_ref(), payload_or_default(body))
        .await?;
    Ok(Json(CallableResponse { result }))
}

#[axum::debug_handler]
pub async fn delete_user_account(
    State(state): State<AppState>,
    caller: Option<Extension<Claims>>,
    body: std::result::Result<Json<CallableRequest<DeleteUserAccountRequest>>, JsonRejection>,
) -> Result<Json<CallableResponse<CallableAck>>> {
    let caller = caller.map(|Extension(claims)| claims);
    let result = state
        .admin_service
        .delete_user_account(caller.as_ref(), payload_or_default(body))
        .await?;
    Ok(Json(CallableResponse { result }))
}
