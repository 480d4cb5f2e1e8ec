use validator::Validate;

use crate::error::{Error, Result};

/// Validates a callable payload, replacing field-level detail with the
/// caller-facing message.
pub fn validate<T: Validate>(val: &T, message: &str) -> Result<()> {
    val.validate().map_err(|errors| {
        tracing::debug!(%errors, "payload failed validation");
        Error::InvalidArgument(message.to_string())
    })
}
