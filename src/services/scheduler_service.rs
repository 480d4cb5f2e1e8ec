use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::services::lifecycle_service::LifecycleSweeper;

/// Registers the publish/expire sweep on a cron schedule and starts it.
/// A failed cycle is logged; the next tick runs as usual.
pub async fn start_lifecycle_scheduler(sweeper: LifecycleSweeper, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| Error::Internal(format!("Failed to create scheduler: {:?}", e)))?;

    let job = Job::new_async(schedule, move |_id, _scheduler| {
        let sweeper = sweeper.clone();
        Box::pin(async move {
            match sweeper.run_once(Utc::now()).await {
                Ok(report) => info!(
                    published = report.published,
                    expired = report.expired,
                    notified = report.notified,
                    notification_failures = report.notification_failures,
                    "Lifecycle sweep finished"
                ),
                Err(e) => error!(error = ?e, "Lifecycle sweep failed"),
            }
        })
    })
    .map_err(|e| Error::Config(format!("Invalid sweep schedule {:?}: {:?}", schedule, e)))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| Error::Internal(format!("Failed to register sweep job: {:?}", e)))?;
    scheduler
        .start()
        .await
        .map_err(|e| Error::Internal(format!("Failed to start scheduler: {:?}", e)))?;

    info!("Lifecycle sweep scheduled with cron {:?}", schedule);
    Ok(scheduler)
}
