//! POSIX `open(2)` flags ↔ VFS `OpenFlags` translation.
//!
//! This module is the only place that should translate `O_*` flags into
//! `inogen-core` flags. Callers must not duplicate this logic.

use inogen_core::OpenFlags;

/// Convert `open(2)` flags into VFS flags.
///
/// The access mode is decoded from `O_ACCMODE`; `O_DSYNC` and `O_RSYNC` are
/// folded into `SYNC`. Flags with no VFS counterpart are ignored.
pub fn posix_open_to_vfs_flags(oflags: libc::c_int) -> OpenFlags {
    let mut flags = match oflags & libc::O_ACCMODE {
        libc::O_WRONLY => OpenFlags::WRITE,
        libc::O_RDWR => OpenFlags::READ | OpenFlags::WRITE,
        _ => OpenFlags::READ,
    };

    let table = [
        (libc::O_CREAT, OpenFlags::CREATE),
        (libc::O_EXCL, OpenFlags::EXCL),
        (libc::O_TRUNC, OpenFlags::TRUNC),
        (libc::O_APPEND, OpenFlags::APPEND),
        (libc::O_DIRECTORY, OpenFlags::DIRECTORY),
        (libc::O_NOFOLLOW, OpenFlags::NOFOLLOW),
        (libc::O_SYNC, OpenFlags::SYNC),
        (libc::O_DSYNC, OpenFlags::SYNC),
    ];
    for (bit, flag) in table {
        if oflags & bit == bit {
            flags |= flag;
        }
    }
    flags
}

/// Convert VFS flags back into `open(2)` flags.
pub fn vfs_flags_to_posix_open(flags: OpenFlags) -> libc::c_int {
    let mut oflags = if flags.contains(OpenFlags::READ | OpenFlags::WRITE) {
        libc::O_RDWR
    } else if flags.contains(OpenFlags::WRITE) {
        libc::O_WRONLY
    } else {
        libc::O_RDONLY
    };

    let table = [
        (OpenFlags::CREATE, libc::O_CREAT),
        (OpenFlags::EXCL, libc::O_EXCL),
        (OpenFlags::TRUNC, libc::O_TRUNC),
        (OpenFlags::APPEND, libc::O_APPEND),
        (OpenFlags::DIRECTORY, libc::O_DIRECTORY),
        (OpenFlags::NOFOLLOW, libc::O_NOFOLLOW),
        (OpenFlags::SYNC, libc::O_SYNC),
    ];
    for (flag, bit) in table {
        if flags.contains(flag) {
            oflags |= bit;
        }
    }
    oflags
}
