//! POSIX marshalling for `inogen-core`: errno values, `open(2)` flags and
//! `stat`/`statvfs` records.

mod errno;
mod open_flags;
mod stat;

pub use errno::{
    errno_to_vfs_error_kind, vfs_error_kind_str, vfs_error_kind_to_errno, vfs_error_to_errno,
};
pub use open_flags::{posix_open_to_vfs_flags, vfs_flags_to_posix_open};
pub use stat::{setattr_from_stat, stat_to_libc, statvfs_to_libc};

#[cfg(test)]
mod tests;
