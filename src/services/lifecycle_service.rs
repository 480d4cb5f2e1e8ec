use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::error::{Error, Result};
use crate::models::notification::NotificationContent;
use crate::models::test::Test;
use crate::services::audience_service::AudienceResolver;
use crate::services::test_service::{TestStore, Transition};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepPlan {
    pub transitions: Vec<Transition>,
    pub newly_published: Vec<Test>,
    pub published_count: usize,
    pub expired_count: usize,
}

impl SweepPlan {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub published: usize,
    pub expired: usize,
    pub notified: usize,
    pub notification_failures: usize,
}

/// Decides the transitions for one sweep. Drafts that are already past their
/// global expiry go straight to archived instead of being published.
pub fn plan_sweep(now: DateTime<Utc>, due_for_publish: Vec<Test>, due_for_expiry: Vec<Test>) -> SweepPlan {
    let mut plan = SweepPlan::default();

    for test in due_for_publish {
        if !test.is_publish_due(now) {
            continue;
        }
        if test.is_expired(now) {
            info!(
                "Skipping publish: test {} is due to publish but has already globally expired. Archiving instead.",
                test.id
            );
            plan.transitions.push(Transition::Archive {
                test_id: test.id.clone(),
            });
            plan.expired_count += 1;
        } else {
            info!("Publishing test: {} - \"{}\"", test.id, test.title);
            plan.transitions.push(Transition::Publish {
                test_id: test.id.clone(),
            });
            plan.published_count += 1;
            plan.newly_published.push(test);
        }
    }

    for test in due_for_expiry {
        if test.is_archived || !test.is_published || !test.is_expired(now) {
            continue;
        }
        info!("Expiring/archiving test: {} - \"{}\"", test.id, test.title);
        plan.transitions.push(Transition::Archive {
            test_id: test.id.clone(),
        });
        plan.expired_count += 1;
    }

    plan
}

/// The scheduled publish/expire pass over test records.
#[derive(Clone)]
pub struct LifecycleSweeper {
    tests: Arc<dyn TestStore>,
    resolver: AudienceResolver,
}

impl LifecycleSweeper {
    pub fn new(tests: Arc<dyn TestStore>, resolver: AudienceResolver) -> Self {
        Self { tests, resolver }
    }

    #[instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let due_for_publish = self.tests.due_for_publish(now).await.unwrap_or_else(|e| {
            error!(error = ?e, "Error querying for tests to publish");
            Vec::new()
        });
        let due_for_expiry = self.tests.due_for_expiry(now).await.unwrap_or_else(|e| {
            error!(error = ?e, "Error querying for tests to expire");
            Vec::new()
        });

        let plan = plan_sweep(now, due_for_publish, due_for_expiry);
        if plan.is_empty() {
            info!("No tests to publish or expire at this time.");
            return Ok(SweepReport::default());
        }

        let applied = self
            .tests
            .commit_transitions(&plan.transitions, now)
            .await
            .map_err(|e| {
                error!(error = ?e, "Error committing batch updates");
                Error::Internal("Failed to commit batch updates for scheduled tests.".to_string())
            })?;

        let mut report = SweepReport::default();
        for transition in &applied {
            match transition {
                Transition::Publish { .. } => report.published += 1,
                Transition::Archive { .. } => report.expired += 1,
            }
        }
        info!(
            "Batch commit successful. Published {} test(s), Expired/Archived {} test(s).",
            report.published, report.expired
        );

        let went_live = plan.newly_published.iter().filter(|test| {
            applied.contains(&Transition::Publish {
                test_id: test.id.clone(),
            })
        });
        for test in went_live {
            let content = NotificationContent::went_live(&test.title);
            match self.resolver.notify(&test.id, test, &content).await {
                Ok(_) => report.notified += 1,
                Err(e) => {
                    error!(error = ?e, "Failed to send publish notifications for test {}", test.id);
                    report.notification_failures += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::BatchResponse;
    use crate::services::push_service::MockPushSender;
    use crate::services::test_service::MockTestStore;
    use crate::services::user_service::MockUserDirectory;
    use crate::models::user::User;
    use chrono::Duration;

    fn draft(id: &str, publish_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> Test {
        Test {
            id: id.to_string(),
            title: format!("Test {}", id),
            is_free: true,
            scheduled_publish_time: Some(publish_at),
            global_expiry_time: expires_at,
            ..Default::default()
        }
    }

    fn published(id: &str, expires_at: DateTime<Utc>) -> Test {
        Test {
            id: id.to_string(),
            title: format!("Test {}", id),
            is_published: true,
            global_expiry_time: Some(expires_at),
            ..Default::default()
        }
    }

    fn sweeper(tests: MockTestStore, users: MockUserDirectory, push: MockPushSender) -> LifecycleSweeper {
        LifecycleSweeper::new(
            Arc::new(tests),
            AudienceResolver::new(Arc::new(users), Arc::new(push)),
        )
    }

    #[test]
    fn expired_draft_is_archived_not_published() {
        let now = Utc::now();
        let plan = plan_sweep(
            now,
            vec![draft("a", now - Duration::hours(2), Some(now - Duration::hours(1)))],
            vec![],
        );

        assert_eq!(plan.transitions, vec![Transition::Archive { test_id: "a".into() }]);
        assert_eq!(plan.expired_count, 1);
        assert_eq!(plan.published_count, 0);
        assert!(plan.newly_published.is_empty());
    }

    #[test]
    fn live_draft_is_published_and_queued_for_notification() {
        let now = Utc::now();
        let plan = plan_sweep(
            now,
            vec![draft("a", now - Duration::minutes(1), Some(now + Duration::days(1)))],
            vec![],
        );

        assert_eq!(plan.transitions, vec![Transition::Publish { test_id: "a".into() }]);
        assert_eq!(plan.published_count, 1);
        assert_eq!(plan.newly_published.len(), 1);
    }

    #[test]
    fn draft_without_expiry_is_published() {
        let now = Utc::now();
        let plan = plan_sweep(now, vec![draft("a", now, None)], vec![]);
        assert_eq!(plan.transitions, vec![Transition::Publish { test_id: "a".into() }]);
    }

    #[test]
    fn expiry_exactly_now_counts_as_expired() {
        let now = Utc::now();
        let plan = plan_sweep(now, vec![], vec![published("p", now)]);
        assert_eq!(plan.transitions, vec![Transition::Archive { test_id: "p".into() }]);
    }

    #[test]
    fn records_not_yet_due_are_ignored() {
        let now = Utc::now();
        let plan = plan_sweep(
            now,
            vec![draft("a", now + Duration::minutes(5), None)],
            vec![published("p", now + Duration::minutes(5))],
        );
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn nothing_due_means_no_writes_and_no_sends() {
        let mut tests = MockTestStore::new();
        tests.expect_due_for_publish().returning(|_| Ok(vec![]));
        tests.expect_due_for_expiry().returning(|_| Ok(vec![]));
        tests.expect_commit_transitions().never();
        let mut users = MockUserDirectory::new();
        users.expect_find_audience().never();
        let mut push = MockPushSender::new();
        push.expect_send_multicast().never();

        let report = sweeper(tests, users, push).run_once(Utc::now()).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn publishes_then_notifies_exactly_once() {
        let now = Utc::now();
        let due = draft("a", now - Duration::minutes(1), Some(now + Duration::days(1)));

        let mut tests = MockTestStore::new();
        tests
            .expect_due_for_publish()
            .returning(move |_| Ok(vec![due.clone()]));
        tests.expect_due_for_expiry().returning(|_| Ok(vec![]));
        tests
            .expect_commit_transitions()
            .times(1)
            .withf(|transitions, _| transitions == [Transition::Publish { test_id: "a".into() }])
            .returning(|transitions, _| Ok(transitions.to_vec()));

        let mut users = MockUserDirectory::new();
        users.expect_find_audience().times(1).returning(|_| {
            Ok(vec![User {
                id: "u1".into(),
                fcm_token: Some("tok".into()),
                ..Default::default()
            }])
        });
        let mut push = MockPushSender::new();
        push.expect_send_multicast()
            .times(1)
            .withf(|message| {
                message.data.test_id == "a" && message.notification.title == "Test is now live!"
            })
            .returning(|_| {
                Ok(BatchResponse {
                    success_count: 1,
                    ..Default::default()
                })
            });

        let report = sweeper(tests, users, push).run_once(now).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                published: 1,
                expired: 0,
                notified: 1,
                notification_failures: 0
            }
        );
    }

    #[tokio::test]
    async fn commit_failure_fails_the_sweep_without_notifying() {
        let now = Utc::now();
        let due = draft("a", now - Duration::minutes(1), None);

        let mut tests = MockTestStore::new();
        tests
            .expect_due_for_publish()
            .returning(move |_| Ok(vec![due.clone()]));
        tests.expect_due_for_expiry().returning(|_| Ok(vec![]));
        tests
            .expect_commit_transitions()
            .returning(|_, _| Err(Error::Internal("connection reset".into())));
        let mut users = MockUserDirectory::new();
        users.expect_find_audience().never();
        let push = MockPushSender::new();

        let err = sweeper(tests, users, push).run_once(now).await.unwrap_err();
        assert_eq!(err.status_code(), "INTERNAL");
    }

    #[tokio::test]
    async fn one_failed_notification_does_not_block_the_next() {
        let now = Utc::now();
        let first = draft("a", now - Duration::minutes(2), None);
        let second = draft("b", now - Duration::minutes(1), None);

        let mut tests = MockTestStore::new();
        tests
            .expect_due_for_publish()
            .returning(move |_| Ok(vec![first.clone(), second.clone()]));
        tests.expect_due_for_expiry().returning(|_| Ok(vec![]));
        tests.expect_commit_transitions().returning(|transitions, _| Ok(transitions.to_vec()));

        let mut users = MockUserDirectory::new();
        users.expect_find_audience().times(2).returning(|_| {
            Ok(vec![User {
                id: "u1".into(),
                fcm_token: Some("tok".into()),
                ..Default::default()
            }])
        });
        let mut push = MockPushSender::new();
        push.expect_send_multicast().times(2).returning(|message| {
            if message.data.test_id == "a" {
                Err(Error::Internal("push unavailable".into()))
            } else {
                Ok(BatchResponse {
                    success_count: 1,
                    ..Default::default()
                })
            }
        });

        let report = sweeper(tests, users, push).run_once(now).await.unwrap();
        assert_eq!(report.published, 2);
        assert_eq!(report.notified, 1);
        assert_eq!(report.notification_failures, 1);
    }

    #[tokio::test]
    async fn publish_already_applied_elsewhere_is_not_announced_again() {
        let now = Utc::now();
        let first = draft("a", now - Duration::minutes(2), None);
        let second = draft("b", now - Duration::minutes(1), None);

        let mut tests = MockTestStore::new();
        tests
            .expect_due_for_publish()
            .returning(move |_| Ok(vec![first.clone(), second.clone()]));
        tests.expect_due_for_expiry().returning(|_| Ok(vec![]));
        tests
            .expect_commit_transitions()
            .times(1)
            .returning(|_, _| Ok(vec![Transition::Publish { test_id: "b".into() }]));

        let mut users = MockUserDirectory::new();
        users.expect_find_audience().times(1).returning(|_| {
            Ok(vec![User {
                id: "u1".into(),
                fcm_token: Some("tok".into()),
                ..Default::default()
            }])
        });
        let mut push = MockPushSender::new();
        push.expect_send_multicast()
            .times(1)
            .withf(|message| message.data.test_id == "b")
            .returning(|_| {
                Ok(BatchResponse {
                    success_count: 1,
                    ..Default::default()
                })
            });

        let report = sweeper(tests, users, push).run_once(now).await.unwrap();
        assert_eq!(report.published, 1);
        assert_eq!(report.notified, 1);
    }

    #[tokio::test]
    async fn sweep_that_loses_every_race_sends_nothing() {
        let now = Utc::now();
        let due = draft("a", now - Duration::minutes(1), None);

        let mut tests = MockTestStore::new();
        tests
            .expect_due_for_publish()
            .returning(move |_| Ok(vec![due.clone()]));
        tests.expect_due_for_expiry().returning(|_| Ok(vec![]));
        tests.expect_commit_transitions().returning(|_, _| Ok(vec![]));
        let mut users = MockUserDirectory::new();
        users.expect_find_audience().never();
        let mut push = MockPushSender::new();
        push.expect_send_multicast().never();

        let report = sweeper(tests, users, push).run_once(now).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn failed_publish_query_still_expires() {
        let now = Utc::now();
        let stale = published("p", now - Duration::minutes(1));

        let mut tests = MockTestStore::new();
        tests
            .expect_due_for_publish()
            .returning(|_| Err(Error::Internal("query timeout".into())));
        tests
            .expect_due_for_expiry()
            .returning(move |_| Ok(vec![stale.clone()]));
        tests
            .expect_commit_transitions()
            .times(1)
            .withf(|transitions, _| transitions == [Transition::Archive { test_id: "p".into() }])
            .returning(|transitions, _| Ok(transitions.to_vec()));

        let report = sweeper(tests, MockUserDirectory::new(), MockPushSender::new())
            .run_once(now)
            .await
            .unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.notified, 0);
    }
}
