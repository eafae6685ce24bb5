//! Error taxonomy shared by every layer.

use std::fmt;

/// Coarse classification of a failure, independent of the layer that raised it.
///
/// Callers use the kind to pick a retry policy: only `VersionMismatch` (and,
/// at the caller's discretion, `Dependency`) is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A state change outside the transition table. Always a logic error.
    InvalidTransition,
    /// Optimistic-concurrency conflict; retry with a fresh read.
    VersionMismatch,
    /// Unknown identifier.
    NotFound,
    /// Business-rule or input violation.
    Validation,
    /// Failure propagated from a collaborator (acquirer, persistence).
    Dependency,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::VersionMismatch | ErrorKind::Dependency)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::VersionMismatch => "version_mismatch",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Dependency => "dependency",
        };
        f.write_str(s)
    }
}
