use std::sync::Arc;

use tracing::{error, info, warn};

use crate::dto::callable_dto::{CallableAck, DeleteUserAccountRequest, SendScheduledTestNotificationRequest};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::notification::NotificationContent;
use crate::services::audience_service::AudienceResolver;
use crate::services::identity_service::IdentityAdmin;
use crate::services::test_service::TestStore;
use crate::services::user_service::UserDirectory;
use crate::utils::time::{format_ist, parse_iso8601};
use crate::utils::validation::validate;

/// Administrative callables. Every operation checks, in order: an
/// authenticated caller, a complete payload, then the caller's admin flag.
#[derive(Clone)]
pub struct AdminService {
    tests: Arc<dyn TestStore>,
    users: Arc<dyn UserDirectory>,
    identity: Arc<dyn IdentityAdmin>,
    resolver: AudienceResolver,
}

fn require_caller<'a>(caller: Option<&'a Claims>, function: &str) -> Result<&'a str> {
    match caller {
        Some(claims) if !claims.sub.is_empty() => Ok(claims.sub.as_str()),
        _ => {
            warn!("Callable function \"{}\" called by unauthenticated user.", function);
            Err(Error::Unauthenticated(
                "You must be logged in to access this function.".to_string(),
            ))
        }
    }
}

impl AdminService {
    pub fn new(
        tests: Arc<dyn TestStore>,
        users: Arc<dyn UserDirectory>,
        identity: Arc<dyn IdentityAdmin>,
        resolver: AudienceResolver,
    ) -> Self {
        Self {
            tests,
            users,
            identity,
            resolver,
        }
    }

    async fn require_admin(&self, caller_uid: &str) -> Result<()> {
        let caller = self.users.get_user(caller_uid).await.map_err(|e| {
            error!(error = ?e, "Error verifying admin status for user {}", caller_uid);
            Error::Internal("Failed to verify admin privileges.".to_string())
        })?;

        match caller {
            Some(user) if user.is_admin => Ok(()),
            _ => Err(Error::PermissionDenied(
                "Only administrators are authorized.".to_string(),
            )),
        }
    }

    pub async fn send_scheduled_test_notification(
        &self,
        caller: Option<&Claims>,
        req: SendScheduledTestNotificationRequest,
    ) -> Result<CallableAck> {
        let caller_uid = require_caller(caller, "sendScheduledTestNotification")?;

        let missing = "Missing testId, testTitle, or scheduledTime.";
        validate(&req, missing)?;
        let (Some(test_id), Some(test_title), Some(scheduled_time)) =
            (req.test_id, req.test_title, req.scheduled_time)
        else {
            return Err(Error::InvalidArgument(missing.to_string()));
        };
        let scheduled_at = parse_iso8601(&scheduled_time).map_err(|_| {
            Error::InvalidArgument("scheduledTime must be an ISO-8601 date-time.".to_string())
        })?;

        self.require_admin(caller_uid).await.map_err(|e| {
            if matches!(e, Error::PermissionDenied(_)) {
                warn!(
                    "Non-admin user {} attempted to send a scheduled test notification.",
                    caller_uid
                );
            }
            e
        })?;

        let test = self
            .tests
            .get_test(&test_id)
            .await
            .map_err(|e| {
                error!(error = ?e, "Error loading test {}", test_id);
                Error::Internal("Failed to load test.".to_string())
            })?
            .ok_or_else(|| Error::NotFound("Test not found.".to_string()))?;

        let content = NotificationContent::upcoming(&test_title, &format_ist(Some(scheduled_at)));
        self.resolver
            .notify(&test_id, &test, &content)
            .await
            .map_err(|e| Error::Internal(format!("Failed to send notifications: {}", e)))?;

        Ok(CallableAck::ok(format!(
            "Scheduled test notifications sent for test {}.",
            test_id
        )))
    }

    /// Deletes the identity first, then the directory record. The two stores
    /// are not updated atomically: if the second step fails the identity is
    /// already gone and the inconsistency is only logged.
    pub async fn delete_user_account(
        &self,
        caller: Option<&Claims>,
        req: DeleteUserAccountRequest,
    ) -> Result<CallableAck> {
        let caller_uid = require_caller(caller, "deleteUserAccount")?;

        let missing = "The target user ID to delete is missing.";
        validate(&req, missing)?;
        let Some(target_uid) = req.uid else {
            return Err(Error::InvalidArgument(missing.to_string()));
        };

        self.require_admin(caller_uid).await.map_err(|e| {
            if matches!(e, Error::PermissionDenied(_)) {
                warn!(
                    "Non-admin user {} attempted to delete user {}. Access denied.",
                    caller_uid, target_uid
                );
            }
            e
        })?;

        match self.identity.delete_identity(&target_uid).await {
            Ok(()) => info!("Successfully deleted user identity: {}", target_uid),
            Err(Error::NotFound(msg)) => {
                warn!("Identity for user {} does not exist", target_uid);
                return Err(Error::NotFound(msg));
            }
            Err(e) => {
                error!(error = ?e, "Error during user deletion process for user {}", target_uid);
                return Err(Error::Internal(format!(
                    "Failed to delete user account due to an internal error: {}",
                    e
                )));
            }
        }

        match self.users.delete_user(&target_uid).await {
            Ok(existed) => {
                info!(
                    existed,
                    "Successfully deleted user profile record: {}", target_uid
                );
            }
            Err(e) => {
                error!(
                    error = ?e,
                    inconsistent = true,
                    "Identity for user {} was deleted but the profile record was not",
                    target_uid
                );
                return Err(Error::Internal(format!(
                    "Failed to delete user account due to an internal error: {}",
                    e
                )));
            }
        }

        Ok(CallableAck::ok(format!(
            "User {} deleted successfully.",
            target_uid
        )))
    }
}
