//! Structured error model for connector operations.
//!
//! Every failure that leaves a backend adapter is a [`ConnectorError`] of
//! exactly one [`ErrorKind`]. The kind is the only thing the retry machinery
//! acts on; category, code and details exist for operators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether retrying an operation can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input, configuration or backend state is invalid. Retrying fails identically.
    Fatal,
    /// Plausibly transient. The connection may be broken and should be rebuilt.
    Recoverable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fatal => "fatal",
            Self::Recoverable => "recoverable",
        };
        f.write_str(s)
    }
}

/// Broad classification of a connector error, for operator-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid or missing connector configuration.
    Config,
    /// Authentication failure.
    Auth,
    /// Malformed query.
    Query,
    /// Invalid record content or missing required field.
    Data,
    /// Schema, table or object not found or incompatible.
    Schema,
    /// Connection lost or could not be established.
    Connection,
    /// Transient network error.
    Network,
    /// Request or connect timeout.
    Timeout,
    /// Transient backend-side error (deadlock, overload, shutdown).
    Backend,
    /// Internal connector error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Auth => "auth",
            Self::Query => "query",
            Self::Data => "data",
            Self::Schema => "schema",
            Self::Connection => "connection",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Backend => "backend",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Transaction commit state at the time of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    /// Error occurred before any commit attempt.
    BeforeCommit,
    /// Commit was attempted but outcome is unknown.
    AfterCommitUnknown,
}

/// Structured error from a connector operation.
///
/// Construct via kind-specific factory methods (e.g. [`ConnectorError::config`]
/// is always fatal, [`ConnectorError::connection`] is always recoverable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{kind}/{category}] {code}: {message}")]
pub struct ConnectorError {
    pub kind: ErrorKind,
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_state: Option<CommitState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConnectorError {
    fn new(
        kind: ErrorKind,
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            category,
            code: code.into(),
            message: message.into(),
            commit_state: None,
            details: None,
        }
    }

    /// Generic fatal error, categorized as internal.
    #[must_use]
    pub fn fatal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, ErrorCategory::Internal, code, message)
    }

    /// Generic recoverable error, categorized as connection loss.
    #[must_use]
    pub fn recoverable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Recoverable, ErrorCategory::Connection, code, message)
    }

    /// Configuration error (fatal).
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, ErrorCategory::Config, code, message)
    }

    /// Authentication error (fatal).
    #[must_use]
    pub fn auth(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, ErrorCategory::Auth, code, message)
    }

    /// Malformed query (fatal).
    #[must_use]
    pub fn query(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, ErrorCategory::Query, code, message)
    }

    /// Invalid record content (fatal).
    #[must_use]
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, ErrorCategory::Data, code, message)
    }

    /// Schema mismatch or missing table (fatal).
    #[must_use]
    pub fn schema(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, ErrorCategory::Schema, code, message)
    }

    /// Internal connector error (fatal).
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, ErrorCategory::Internal, code, message)
    }

    /// Lost or unavailable connection (recoverable).
    #[must_use]
    pub fn connection(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Recoverable, ErrorCategory::Connection, code, message)
    }

    /// Transient network error (recoverable).
    #[must_use]
    pub fn network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Recoverable, ErrorCategory::Network, code, message)
    }

    /// Timeout (recoverable).
    #[must_use]
    pub fn timeout(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Recoverable, ErrorCategory::Timeout, code, message)
    }

    /// Transient backend-side error (recoverable).
    #[must_use]
    pub fn backend(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Recoverable, ErrorCategory::Backend, code, message)
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Fatal
    }

    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.kind == ErrorKind::Recoverable
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Record transaction commit state at time of error.
    ///
    /// Informational only: an `AfterCommitUnknown` recoverable error is still
    /// retried, and the retry may duplicate the write.
    #[must_use]
    pub fn with_commit_state(mut self, state: CommitState) -> Self {
        self.commit_state = Some(state);
        self
    }
}
