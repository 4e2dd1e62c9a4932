//! Error types shared by every layer of the crate.

use thiserror::Error;

/// Closed set of failure kinds surfaced to callers.
///
/// `NotFound` covers both a missing object and a stale handle unless
/// [`VfsConfig::report_stale`](crate::VfsConfig::report_stale) is set, in
/// which case generation mismatches surface as `Stale`.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VfsErrorKind {
    #[error("no such entry")]
    NotFound,
    #[error("stale object handle")]
    Stale,
    #[error("not a directory")]
    NotDir,
    #[error("is a directory")]
    IsDir,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("directory not empty")]
    DirNotEmpty,
    #[error("name too long")]
    NameTooLong,
    #[error("invalid input")]
    InvalidInput,
    #[error("permission denied")]
    PermissionDenied,
    /// The session was not opened with the access an operation needs.
    #[error("bad handle")]
    BadHandle,
    #[error("operation not supported")]
    NotSupported,
    /// A directory kept being invalidated past the configured retry bound.
    #[error("directory iteration retry limit exceeded")]
    RetryLimit,
    /// Opaque failure reported by the object store. Never interpreted here.
    #[error("storage error (code {0})")]
    Storage(i32),
}

/// An error kind together with the operation that produced it.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("{context}: {kind}")]
pub struct VfsError {
    kind: VfsErrorKind,
    context: &'static str,
}

impl VfsError {
    pub const fn new(kind: VfsErrorKind, context: &'static str) -> Self {
        Self { kind, context }
    }

    pub fn kind(&self) -> VfsErrorKind {
        self.kind
    }

    pub fn context(&self) -> &'static str {
        self.context
    }

    /// Re-label the error with an outer operation, keeping the kind.
    pub fn with_context(self, context: &'static str) -> Self {
        Self { context, ..self }
    }
}

pub type VfsResult<T> = Result<T, VfsError>;
