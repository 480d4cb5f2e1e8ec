use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of a callable invocation: the arguments travel under `data`.
#[derive(Debug, Deserialize)]
pub struct CallableRequest<T> {
    #[serde(default)]
    pub data: T,
}

/// Successful callables answer with their value under `result`.
#[derive(Debug, Serialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableAck {
    pub success: bool,
    pub message: String,
}

impl CallableAck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SendScheduledTestNotificationRequest {
    #[validate(required, length(min = 1))]
    pub test_id: Option<String>,
    #[validate(required, length(min = 1))]
    pub test_title: Option<String>,
    #[validate(required, length(min = 1))]
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DeleteUserAccountRequest {
    #[validate(required, length(min = 1))]
    pub uid: Option<String>,
}
