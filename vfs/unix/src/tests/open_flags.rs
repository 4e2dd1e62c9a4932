use crate::{posix_open_to_vfs_flags, vfs_flags_to_posix_open};
use inogen_core::OpenFlags;
use pretty_assertions::assert_eq;

#[test]
fn translates_basic_open_flags() {
    let flags = posix_open_to_vfs_flags(
        libc::O_RDWR | libc::O_CREAT | libc::O_EXCL | libc::O_TRUNC | libc::O_APPEND,
    );

    assert_eq!(
        flags,
        OpenFlags::READ
            | OpenFlags::WRITE
            | OpenFlags::CREATE
            | OpenFlags::EXCL
            | OpenFlags::TRUNC
            | OpenFlags::APPEND
    );
}

#[test]
fn decodes_access_mode() {
    assert_eq!(posix_open_to_vfs_flags(libc::O_RDONLY), OpenFlags::READ);
    assert_eq!(posix_open_to_vfs_flags(libc::O_WRONLY), OpenFlags::WRITE);
    assert_eq!(
        posix_open_to_vfs_flags(libc::O_RDONLY | libc::O_DIRECTORY | libc::O_NOFOLLOW),
        OpenFlags::READ | OpenFlags::DIRECTORY | OpenFlags::NOFOLLOW
    );
}

#[test]
fn maps_dsync_to_sync() {
    let flags = posix_open_to_vfs_flags(libc::O_WRONLY | libc::O_DSYNC);
    assert!(flags.contains(OpenFlags::SYNC));
}

#[test]
fn converts_back_to_posix() {
    let oflags = vfs_flags_to_posix_open(OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNC);
    assert_eq!(oflags & libc::O_ACCMODE, libc::O_WRONLY);
    assert_eq!(oflags & libc::O_CREAT, libc::O_CREAT);
    assert_eq!(oflags & libc::O_TRUNC, libc::O_TRUNC);
    assert_eq!(oflags & libc::O_EXCL, 0);

    let oflags = vfs_flags_to_posix_open(OpenFlags::READ | OpenFlags::WRITE);
    assert_eq!(oflags & libc::O_ACCMODE, libc::O_RDWR);
}
