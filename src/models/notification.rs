use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewlyPublished,
    NewlyScheduled,
    ScheduledToPublished,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewlyPublished => "newly_published",
            NotificationType::NewlyScheduled => "newly_scheduled",
            NotificationType::ScheduledToPublished => "scheduled_to_published",
        }
    }
}

/// What to tell the audience about a test; the recipients are resolved later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub kind: NotificationType,
}

impl NotificationContent {
    pub fn published(test_title: &str) -> Self {
        Self {
            title: "New Test Published!".to_string(),
            body: format!("The test \"{}\" is now available.", test_title),
            kind: NotificationType::NewlyPublished,
        }
    }

    pub fn scheduled(test_title: &str, release_at: &str) -> Self {
        Self {
            title: "New Test Scheduled!".to_string(),
            body: format!(
                "The test \"{}\" is scheduled to be released on {}.",
                test_title, release_at
            ),
            kind: NotificationType::NewlyScheduled,
        }
    }

    pub fn went_live(test_title: &str) -> Self {
        Self {
            title: "Test is now live!".to_string(),
            body: format!(
                "The scheduled test \"{}\" is now available. Good luck!",
                test_title
            ),
            kind: NotificationType::ScheduledToPublished,
        }
    }

    pub fn upcoming(test_title: &str, scheduled_for: &str) -> Self {
        Self {
            title: "Upcoming Test Scheduled!".to_string(),
            body: format!(
                "The test \"{}\" has been scheduled for {}.",
                test_title, scheduled_for
            ),
            kind: NotificationType::NewlyScheduled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushData {
    #[serde(rename = "testId")]
    pub test_id: String,
    #[serde(rename = "testTitle")]
    pub test_title: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

/// One multicast dispatch: the same notification to many device tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastMessage {
    pub notification: PushNotification,
    pub data: PushData,
    pub tokens: Vec<String>,
}

impl MulticastMessage {
    pub fn new(test_id: &str, test_title: &str, content: &NotificationContent, tokens: Vec<String>) -> Self {
        Self {
            notification: PushNotification {
                title: content.title.clone(),
                body: content.body.clone(),
            },
            data: PushData {
                test_id: test_id.to_string(),
                test_title: test_title.to_string(),
                kind: content.kind,
            },
            tokens,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub failed_tokens: Vec<String>,
}

impl BatchResponse {
    pub fn merge(&mut self, other: BatchResponse) {
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.failed_tokens.extend(other.failed_tokens);
    }
}
