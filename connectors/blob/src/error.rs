//! `object_store` error classification.

use tidewire_types::ConnectorError;

/// Errors that another attempt cannot fix are fatal: the object, the
/// credentials or the request itself is wrong. Everything else (transport
/// failures, throttling, server errors surfaced as `Generic`) is recoverable.
pub(crate) fn classify(err: &object_store::Error) -> ConnectorError {
    use object_store::Error;

    let message = format!("Failed to insert blob: {err}");
    match err {
        Error::NotFound { .. } => ConnectorError::schema("NOT_FOUND", message),
        Error::PermissionDenied { .. } | Error::Unauthenticated { .. } => {
            ConnectorError::auth("ACCESS_DENIED", message)
        }
        Error::InvalidPath { .. } => ConnectorError::data("INVALID_PATH", message),
        Error::NotSupported { .. } | Error::NotImplemented => {
            ConnectorError::config("NOT_SUPPORTED", message)
        }
        _ => ConnectorError::backend("UPLOAD_FAILED", message),
    }
}
