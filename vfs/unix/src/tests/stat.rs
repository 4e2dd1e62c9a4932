use crate::{setattr_from_stat, stat_to_libc, statvfs_to_libc};
use inogen_core::{AttrMask, FileType, ObjectId, Stat, StatVfs, Timespec};
use pretty_assertions::assert_eq;

fn sample() -> Stat {
    Stat {
        dev: 7,
        id: ObjectId::new(42),
        file_type: FileType::RegularFile,
        perm: 0o640,
        nlink: 2,
        uid: 1000,
        gid: 100,
        rdev: 0,
        size: 5000,
        blksize: 4096,
        blocks: 10,
        atime: Timespec::new(1_700_000_000, 5),
        mtime: Timespec::new(1_700_000_100, 6),
        ctime: Timespec::new(1_700_000_200, 7),
    }
}

#[test]
fn fills_libc_stat() {
    let out = stat_to_libc(&sample());
    assert_eq!(out.st_ino as u64, 42);
    assert_eq!(out.st_mode as u32, libc::S_IFREG as u32 | 0o640);
    assert_eq!(out.st_nlink as u64, 2);
    assert_eq!(out.st_uid, 1000);
    assert_eq!(out.st_size as u64, 5000);
    assert_eq!(out.st_mtime as i64, 1_700_000_100);
    assert_eq!(out.st_mtime_nsec as i64, 6);
}

#[test]
fn fills_libc_statvfs() {
    let out = statvfs_to_libc(&StatVfs {
        bsize: 4096,
        blocks: 100,
        bfree: 60,
        namemax: 255,
        ..Default::default()
    });
    assert_eq!(out.f_bsize as u64, 4096);
    assert_eq!(out.f_blocks as u64, 100);
    assert_eq!(out.f_bfree as u64, 60);
    assert_eq!(out.f_namemax as u64, 255);
}

#[test]
fn setattr_keeps_only_masked_fields() {
    let raw = stat_to_libc(&sample());
    let set = setattr_from_stat(&raw, 0b1 | 0b1_0000 | 0x8000_0000);
    assert_eq!(set.mask, AttrMask::MODE | AttrMask::MTIME);
    assert_eq!(set.perm, 0o640);
    assert_eq!(set.mtime, Timespec::new(1_700_000_100, 6));
}
