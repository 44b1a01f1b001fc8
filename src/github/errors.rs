//! Mapping from octocrab failures onto the engine's error taxonomy.

use crate::errors::SobaError;

/// 404 → NotFound, 401/403 → Permission, 422 → Validation, 429/5xx →
/// Transient. Anything below the HTTP layer is treated as transient so the
/// watchers retry it on the next tick.
pub fn map_octocrab(err: octocrab::Error, operation: &str) -> SobaError {
    let mapped = match &err {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            let message = source.message.clone();
            match status {
                404 => SobaError::not_found(message),
                401 | 403 => SobaError::permission(message),
                422 => SobaError::validation(message),
                429 => SobaError::transient(message),
                500..=599 => SobaError::transient(message),
                _ => SobaError::internal(message).with_context("status", status),
            }
        }
        octocrab::Error::Serde { .. }
        | octocrab::Error::Json { .. }
        | octocrab::Error::Uri { .. }
        | octocrab::Error::UriParse { .. } => SobaError::internal(err.to_string()),
        _ => SobaError::transient(err.to_string()),
    };
    mapped.with_context("operation", operation)
}
