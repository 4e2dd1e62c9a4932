//! `stat`/`statvfs` marshalling.

use inogen_core::{AttrMask, SetAttr, Stat, StatVfs, Timespec};

pub fn stat_to_libc(stat: &Stat) -> libc::stat {
    // SAFETY: `libc::stat` is plain old data; all-zero is a valid value and
    // covers platform-private padding fields.
    let mut out: libc::stat = unsafe { std::mem::zeroed() };
    out.st_dev = stat.dev as _;
    out.st_ino = stat.id.get() as _;
    out.st_mode = stat.mode() as _;
    out.st_nlink = stat.nlink as _;
    out.st_uid = stat.uid;
    out.st_gid = stat.gid;
    out.st_rdev = stat.rdev as _;
    out.st_size = stat.size as _;
    out.st_blksize = stat.blksize as _;
    out.st_blocks = stat.blocks as _;
    out.st_atime = stat.atime.secs as _;
    out.st_atime_nsec = stat.atime.nanos as _;
    out.st_mtime = stat.mtime.secs as _;
    out.st_mtime_nsec = stat.mtime.nanos as _;
    out.st_ctime = stat.ctime.secs as _;
    out.st_ctime_nsec = stat.ctime.nanos as _;
    out
}

pub fn statvfs_to_libc(stat: &StatVfs) -> libc::statvfs {
    // SAFETY: as above, `libc::statvfs` is plain old data.
    let mut out: libc::statvfs = unsafe { std::mem::zeroed() };
    out.f_bsize = stat.bsize as _;
    out.f_frsize = stat.frsize as _;
    out.f_blocks = stat.blocks as _;
    out.f_bfree = stat.bfree as _;
    out.f_bavail = stat.bavail as _;
    out.f_files = stat.files as _;
    out.f_ffree = stat.ffree as _;
    out.f_favail = stat.favail as _;
    out.f_fsid = stat.fsid as _;
    out.f_flag = stat.flag as _;
    out.f_namemax = stat.namemax as _;
    out
}

/// Build a [`SetAttr`] from a `stat` record and a mask of fields to apply.
///
/// The mask uses [`AttrMask`] bit positions: mode, uid, gid, atime, mtime
/// and size from bit 0 upwards. Unknown bits are dropped.
pub fn setattr_from_stat(stat: &libc::stat, mask: u32) -> SetAttr {
    SetAttr {
        mask: AttrMask::from_bits_truncate(mask),
        perm: stat.st_mode as u32 & 0o7777,
        uid: stat.st_uid,
        gid: stat.st_gid,
        atime: Timespec::new(stat.st_atime as i64, stat.st_atime_nsec as u32),
        mtime: Timespec::new(stat.st_mtime as i64, stat.st_mtime_nsec as u32),
        size: stat.st_size as u64,
    }
}
