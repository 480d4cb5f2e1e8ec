use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::test::Test;

const TEST_COLUMNS: &str = r#"
    id, title, is_free, is_paid_college, is_paid_kadu_academy,
    allowed_branches, allowed_years, allowed_courses,
    scheduled_publish_time, global_expiry_time, publish_time,
    is_published, is_archived
"#;

/// A single lifecycle write applied by the sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Draft becomes published; the schedule is cleared and the publish time stamped.
    Publish { test_id: String },
    /// Draft or published record becomes archived.
    Archive { test_id: String },
}

impl Transition {
    pub fn test_id(&self) -> &str {
        match self {
            Transition::Publish { test_id } | Transition::Archive { test_id } => test_id,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestStore: Send + Sync {
    async fn get_test(&self, test_id: &str) -> Result<Option<Test>>;

    /// Drafts whose scheduled publish time has elapsed.
    async fn due_for_publish(&self, now: DateTime<Utc>) -> Result<Vec<Test>>;

    /// Published, non-archived records whose global expiry has elapsed.
    async fn due_for_expiry(&self, now: DateTime<Utc>) -> Result<Vec<Test>>;

    /// Applies the transitions in one atomic write and returns the ones that
    /// took effect. A transition whose record already left the expected state
    /// (another sweep got there first) is skipped, not an error.
    async fn commit_transitions(
        &self,
        transitions: &[Transition],
        now: DateTime<Utc>,
    ) -> Result<Vec<Transition>>;
}

#[derive(Clone)]
pub struct PgTestStore {
    pool: PgPool,
}

impl PgTestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TestStore for PgTestStore {
    async fn get_test(&self, test_id: &str) -> Result<Option<Test>> {
        let test = sqlx::query_as::<_, Test>(&format!(
            "SELECT {} FROM tests WHERE id = $1",
            TEST_COLUMNS
        ))
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(test)
    }

    async fn due_for_publish(&self, now: DateTime<Utc>) -> Result<Vec<Test>> {
        let tests = sqlx::query_as::<_, Test>(&format!(
            r#"
            SELECT {} FROM tests
            WHERE is_published = FALSE
              AND is_archived = FALSE
              AND scheduled_publish_time <= $1
            ORDER BY scheduled_publish_time ASC
            "#,
            TEST_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(tests)
    }

    async fn due_for_expiry(&self, now: DateTime<Utc>) -> Result<Vec<Test>> {
        let tests = sqlx::query_as::<_, Test>(&format!(
            r#"
            SELECT {} FROM tests
            WHERE is_published = TRUE
              AND is_archived = FALSE
              AND global_expiry_time <= $1
            ORDER BY global_expiry_time ASC
            "#,
            TEST_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(tests)
    }

    async fn commit_transitions(
        &self,
        transitions: &[Transition],
        now: DateTime<Utc>,
    ) -> Result<Vec<Transition>> {
        let mut tx = self.pool.begin().await?;
        let mut applied = Vec::with_capacity(transitions.len());

        for transition in transitions {
            let result = match transition {
                Transition::Publish { test_id } => {
                    sqlx::query(
                        r#"
                        UPDATE tests
                        SET is_published = TRUE,
                            publish_time = $2,
                            scheduled_publish_time = NULL,
                            updated_at = $2
                        WHERE id = $1
                          AND is_published = FALSE
                          AND is_archived = FALSE
                        "#,
                    )
                    .bind(test_id)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?
                }
                Transition::Archive { test_id } => {
                    sqlx::query(
                        r#"
                        UPDATE tests
                        SET is_published = FALSE,
                            is_archived = TRUE,
                            updated_at = $2
                        WHERE id = $1
                          AND is_archived = FALSE
                        "#,
                    )
                    .bind(test_id)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?
                }
            };

            if result.rows_affected() == 1 {
                applied.push(transition.clone());
            } else {
                tracing::info!(
                    "Skipping {:?}: test {} is no longer in the expected state",
                    transition,
                    transition.test_id()
                );
            }
        }

        tx.commit().await?;
        Ok(applied)
    }
}
