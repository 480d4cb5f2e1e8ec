pub mod admin_service;
pub mod audience_service;
pub mod google_auth;
pub mod identity_service;
pub mod lifecycle_service;
pub mod push_service;
pub mod scheduler_service;
pub mod test_event_service;
pub mod test_service;
pub mod user_service;
