use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STUDENT_TYPE_COLLEGE: &str = "college";
pub const STUDENT_TYPE_KADU_ACADEMY: &str = "kadu_academy";

/// Directory record of an app user. Owned by the mobile app; this service only
/// reads it (and deletes it on an admin request).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub student_type: Option<String>,
    pub branches: Vec<String>,
    pub years: Vec<String>,
    pub courses: Vec<String>,
    pub is_approved_by_admin_college_student: bool,
    pub is_approved_by_admin_kadu_academy: bool,
    pub is_denied: bool,
    pub is_registered: bool,
    pub is_admin: bool,
    pub fcm_token: Option<String>,
}

impl User {
    pub fn push_token(&self) -> Option<&str> {
        self.fcm_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn is_student_type(&self, student_type: &str) -> bool {
        self.student_type.as_deref() == Some(student_type)
    }
}
