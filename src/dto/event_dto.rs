use serde::Deserialize;

use crate::models::test::Test;

/// Document-created trigger: the new snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCreatedEvent {
    pub data: Test,
}

/// Document-updated trigger: snapshots before and after the write.
#[derive(Debug, Clone, Deserialize)]
pub struct TestUpdatedEvent {
    pub before: Test,
    pub after: Test,
}
