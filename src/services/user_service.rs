use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::Result;
use crate::models::user::{User, STUDENT_TYPE_COLLEGE, STUDENT_TYPE_KADU_ACADEMY};
use crate::services::audience_service::AudiencePolicy;

const USER_COLUMNS: &str = r#"
    id, student_type, branches, years, courses,
    is_approved_by_admin_college_student, is_approved_by_admin_kadu_academy,
    is_denied, is_registered, is_admin, fcm_token
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<Option<User>>;

    /// Users admitted by the policy. Denied users are never returned.
    async fn find_audience(&self, policy: &AudiencePolicy) -> Result<Vec<User>>;

    /// Returns whether a record existed.
    async fn delete_user(&self, uid: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn audience_query(policy: &AudiencePolicy) -> Option<QueryBuilder<'_, Postgres>> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM users WHERE is_denied = FALSE",
        USER_COLUMNS
    ));

    match policy {
        AudiencePolicy::College { branches, years } => {
            qb.push(" AND student_type = ").push_bind(STUDENT_TYPE_COLLEGE);
            if !branches.is_empty() {
                qb.push(" AND branches && ").push_bind(branches);
            }
            if !years.is_empty() {
                qb.push(" AND years && ").push_bind(years);
            }
        }
        AudiencePolicy::KaduAcademy { courses } => {
            qb.push(" AND student_type = ").push_bind(STUDENT_TYPE_KADU_ACADEMY);
            if !courses.is_empty() {
                qb.push(" AND courses && ").push_bind(courses);
            }
        }
        AudiencePolicy::Free => {
            qb.push(" AND is_registered = FALSE");
        }
        AudiencePolicy::Unassigned => return None,
    }

    qb.push(" ORDER BY id");
    Some(qb)
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user(&self, uid: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_audience(&self, policy: &AudiencePolicy) -> Result<Vec<User>> {
        let Some(mut qb) = audience_query(policy) else {
            return Ok(Vec::new());
        };
        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn delete_user(&self, uid: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
