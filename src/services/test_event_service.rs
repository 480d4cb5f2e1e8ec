use tracing::info;

use crate::error::Result;
use crate::models::notification::NotificationContent;
use crate::models::test::Test;
use crate::services::audience_service::{AudienceResolver, DispatchOutcome};
use crate::utils::time::format_ist;

/// Reactions to document changes on the test collection.
#[derive(Clone)]
pub struct TestEventService {
    resolver: AudienceResolver,
}

impl TestEventService {
    pub fn new(resolver: AudienceResolver) -> Self {
        Self { resolver }
    }

    /// A newly created test is announced if it is already live or scheduled.
    /// Drafts are left alone.
    pub async fn on_test_created(&self, test_id: &str, test: &Test) -> Result<Option<DispatchOutcome>> {
        if test.is_published {
            info!("New test \"{}\" published immediately. Sending notifications.", test.title);
            let content = NotificationContent::published(&test.title);
            return self.resolver.notify(test_id, test, &content).await.map(Some);
        }

        if test.scheduled_publish_time.is_some() {
            info!("New test \"{}\" scheduled. Sending notification.", test.title);
            let release_at = format_ist(test.scheduled_publish_time);
            let content = NotificationContent::scheduled(&test.title, &release_at);
            return self.resolver.notify(test_id, test, &content).await.map(Some);
        }

        info!("New test \"{}\" is a draft. No notification sent.", test.title);
        Ok(None)
    }

    /// Covers a manual "publish now": only the unpublished → published edge
    /// triggers a notification.
    pub async fn on_test_updated(
        &self,
        test_id: &str,
        before: &Test,
        after: &Test,
    ) -> Result<Option<DispatchOutcome>> {
        if before.is_published || !after.is_published {
            return Ok(None);
        }

        info!("Test \"{}\" manually published. Sending notifications.", after.title);
        let content = NotificationContent::published(&after.title);
        self.resolver.notify(test_id, after, &content).await.map(Some)
    }
}
