//! VFS → POSIX errno translation.
//!
//! This is the single source of truth for mapping `inogen-core` error kinds
//! to errno values. Callers must not duplicate this mapping elsewhere.

use inogen_core::{VfsError, VfsErrorKind};

/// Convert a VFS error to an errno value (single source of truth).
pub fn vfs_error_to_errno(err: &VfsError) -> i32 {
    vfs_error_kind_to_errno(err.kind())
}

/// Convert a VFS error kind to an errno value.
///
/// Store failures carry their own code through unchanged; a non-positive
/// code has no errno meaning and becomes `EIO`.
pub fn vfs_error_kind_to_errno(kind: VfsErrorKind) -> i32 {
    match kind {
        VfsErrorKind::NotFound => libc::ENOENT,
        VfsErrorKind::Stale => libc::ESTALE,
        VfsErrorKind::NotDir => libc::ENOTDIR,
        VfsErrorKind::IsDir => libc::EISDIR,
        VfsErrorKind::AlreadyExists => libc::EEXIST,
        VfsErrorKind::DirNotEmpty => libc::ENOTEMPTY,
        VfsErrorKind::NameTooLong => libc::ENAMETOOLONG,
        VfsErrorKind::InvalidInput => libc::EINVAL,
        VfsErrorKind::PermissionDenied => libc::EACCES,
        VfsErrorKind::BadHandle => libc::EBADF,
        VfsErrorKind::NotSupported => libc::ENOTSUP,
        VfsErrorKind::RetryLimit => libc::EAGAIN,
        VfsErrorKind::Storage(code) if code > 0 => code,
        VfsErrorKind::Storage(_) => libc::EIO,
    }
}

/// Classify an errno reported by a syscall-backed store.
///
/// Values with a dedicated kind map onto it; anything else is kept opaque
/// as `Storage(errno)`.
pub fn errno_to_vfs_error_kind(errno: i32) -> VfsErrorKind {
    match errno {
        libc::ENOENT => VfsErrorKind::NotFound,
        libc::ESTALE => VfsErrorKind::Stale,
        libc::ENOTDIR => VfsErrorKind::NotDir,
        libc::EISDIR => VfsErrorKind::IsDir,
        libc::EEXIST => VfsErrorKind::AlreadyExists,
        libc::ENOTEMPTY => VfsErrorKind::DirNotEmpty,
        libc::ENAMETOOLONG => VfsErrorKind::NameTooLong,
        libc::EINVAL => VfsErrorKind::InvalidInput,
        libc::EACCES | libc::EPERM => VfsErrorKind::PermissionDenied,
        libc::EBADF => VfsErrorKind::BadHandle,
        libc::ENOTSUP => VfsErrorKind::NotSupported,
        other => VfsErrorKind::Storage(other),
    }
}

/// Stable string name for a VFS error kind (logging only).
pub fn vfs_error_kind_str(kind: VfsErrorKind) -> &'static str {
    match kind {
        VfsErrorKind::NotFound => "not_found",
        VfsErrorKind::Stale => "stale",
        VfsErrorKind::NotDir => "not_dir",
        VfsErrorKind::IsDir => "is_dir",
        VfsErrorKind::AlreadyExists => "already_exists",
        VfsErrorKind::DirNotEmpty => "dir_not_empty",
        VfsErrorKind::NameTooLong => "name_too_long",
        VfsErrorKind::InvalidInput => "invalid_input",
        VfsErrorKind::PermissionDenied => "permission_denied",
        VfsErrorKind::BadHandle => "bad_handle",
        VfsErrorKind::NotSupported => "not_supported",
        VfsErrorKind::RetryLimit => "retry_limit",
        VfsErrorKind::Storage(_) => "storage",
    }
}
