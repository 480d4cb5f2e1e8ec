use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::models::notification::{BatchResponse, MulticastMessage, NotificationContent};
use crate::models::test::Test;
use crate::models::user::{User, STUDENT_TYPE_COLLEGE, STUDENT_TYPE_KADU_ACADEMY};
use crate::services::push_service::{PushSender, MAX_MULTICAST_TOKENS};
use crate::services::user_service::UserDirectory;

/// Who a test is announced to. Built from the test's flags with a priority
/// chain: paid college, then paid Kadu Academy, then free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudiencePolicy {
    /// College students, optionally narrowed by branch and year.
    College {
        branches: Vec<String>,
        years: Vec<String>,
    },
    /// Kadu Academy students, optionally narrowed by course.
    KaduAcademy { courses: Vec<String> },
    /// Users who have not registered for a paid plan.
    Free,
    /// The test targets nobody.
    Unassigned,
}

impl AudiencePolicy {
    pub fn for_test(test: &Test) -> Self {
        if test.is_paid_college {
            AudiencePolicy::College {
                branches: test.allowed_branches.clone(),
                years: test.allowed_years.clone(),
            }
        } else if test.is_paid_kadu_academy {
            AudiencePolicy::KaduAcademy {
                courses: test.allowed_courses.clone(),
            }
        } else if test.is_free {
            AudiencePolicy::Free
        } else {
            AudiencePolicy::Unassigned
        }
    }

    /// In-memory form of the directory filter. Empty allow-lists do not restrict.
    pub fn admits(&self, user: &User) -> bool {
        if user.is_denied {
            return false;
        }
        match self {
            AudiencePolicy::College { branches, years } => {
                user.is_student_type(STUDENT_TYPE_COLLEGE)
                    && overlaps(branches, &user.branches)
                    && overlaps(years, &user.years)
            }
            AudiencePolicy::KaduAcademy { courses } => {
                user.is_student_type(STUDENT_TYPE_KADU_ACADEMY) && overlaps(courses, &user.courses)
            }
            AudiencePolicy::Free => !user.is_registered,
            AudiencePolicy::Unassigned => false,
        }
    }
}

fn overlaps(allowed: &[String], held: &[String]) -> bool {
    allowed.is_empty() || held.iter().any(|h| allowed.contains(h))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    NoAudience,
    NoRecipients,
    NoTokens,
    Sent {
        success_count: usize,
        failure_count: usize,
    },
}

/// Resolves a test's audience from the user directory and multicasts to it.
#[derive(Clone)]
pub struct AudienceResolver {
    users: Arc<dyn UserDirectory>,
    push: Arc<dyn PushSender>,
}

impl AudienceResolver {
    pub fn new(users: Arc<dyn UserDirectory>, push: Arc<dyn PushSender>) -> Self {
        Self { users, push }
    }

    #[instrument(skip(self, test, content), fields(kind = content.kind.as_str()))]
    pub async fn notify(
        &self,
        test_id: &str,
        test: &Test,
        content: &NotificationContent,
    ) -> Result<DispatchOutcome> {
        let policy = AudiencePolicy::for_test(test);
        if policy == AudiencePolicy::Unassigned {
            info!("Test {} has no target audience defined. Skipping notifications.", test_id);
            return Ok(DispatchOutcome::NoAudience);
        }

        let users = self.users.find_audience(&policy).await.map_err(|e| {
            tracing::error!(error = ?e, "Error resolving audience for test {}", test_id);
            e
        })?;
        if users.is_empty() {
            info!("No users found for notification for test {}.", test_id);
            return Ok(DispatchOutcome::NoRecipients);
        }

        let tokens = collect_tokens(&users);
        if tokens.is_empty() {
            info!("No valid push tokens found for notification for test {}.", test_id);
            return Ok(DispatchOutcome::NoTokens);
        }

        let mut total = BatchResponse::default();
        for chunk in tokens.chunks(MAX_MULTICAST_TOKENS) {
            let message = MulticastMessage::new(test_id, &test.title, content, chunk.to_vec());
            let response = self.push.send_multicast(&message).await.map_err(|e| {
                tracing::error!(error = ?e, "Error sending notifications for test {}", test_id);
                e
            })?;
            total.merge(response);
        }

        if total.failure_count > 0 {
            warn!(
                failed_tokens = ?total.failed_tokens,
                "{} notification(s) for test {} were not delivered",
                total.failure_count,
                test_id
            );
        }
        info!(
            "Successfully sent {} test notifications for test {}. Failures: {}",
            total.success_count, test_id, total.failure_count
        );

        Ok(DispatchOutcome::Sent {
            success_count: total.success_count,
            failure_count: total.failure_count,
        })
    }
}

fn collect_tokens(users: &[User]) -> Vec<String> {
    users
        .iter()
        .filter_map(|u| u.push_token().map(str::to_string))
        .collect()
}
