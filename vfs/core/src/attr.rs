//! POSIX-shaped attribute records.

use crate::{ObjectId, VfsGid, VfsUid};
use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    RegularFile,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
}

impl FileType {
    /// The `S_IFMT` bits for this type.
    pub const fn mode_bits(self) -> u32 {
        match self {
            FileType::Fifo => 0o010000,
            FileType::CharDevice => 0o020000,
            FileType::Directory => 0o040000,
            FileType::BlockDevice => 0o060000,
            FileType::RegularFile => 0o100000,
            FileType::Symlink => 0o120000,
            FileType::Socket => 0o140000,
        }
    }

    pub fn is_dir(self) -> bool {
        self == FileType::Directory
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timespec {
    pub secs: i64,
    pub nanos: u32,
}

impl Timespec {
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stat {
    pub dev: u64,
    pub id: ObjectId,
    pub file_type: FileType,
    /// Permission bits only; see [`Stat::mode`] for the combined value.
    pub perm: u32,
    pub nlink: u64,
    pub uid: VfsUid,
    pub gid: VfsGid,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u32,
    pub blocks: u64,
    pub atime: Timespec,
    pub mtime: Timespec,
    pub ctime: Timespec,
}

impl Stat {
    /// `st_mode`: type bits or'ed with permission bits.
    pub fn mode(&self) -> u32 {
        self.file_type.mode_bits() | (self.perm & 0o7777)
    }
}

bitflags! {
    /// Which fields of a [`SetAttr`] are to be applied.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrMask: u32 {
        const MODE = 1 << 0;
        const UID = 1 << 1;
        const GID = 1 << 2;
        const ATIME = 1 << 3;
        const MTIME = 1 << 4;
        const SIZE = 1 << 5;
    }
}

/// Partial attribute update. Fields outside `mask` are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetAttr {
    pub mask: AttrMask,
    pub perm: u32,
    pub uid: VfsUid,
    pub gid: VfsGid,
    pub atime: Timespec,
    pub mtime: Timespec,
    pub size: u64,
}

impl SetAttr {
    pub fn perm(mut self, perm: u32) -> Self {
        self.mask |= AttrMask::MODE;
        self.perm = perm;
        self
    }

    pub fn owner(mut self, uid: VfsUid, gid: VfsGid) -> Self {
        self.mask |= AttrMask::UID | AttrMask::GID;
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn times(mut self, atime: Timespec, mtime: Timespec) -> Self {
        self.mask |= AttrMask::ATIME | AttrMask::MTIME;
        self.atime = atime;
        self.mtime = mtime;
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.mask |= AttrMask::SIZE;
        self.size = size;
        self
    }
}

/// Filesystem-wide statistics (`statvfs`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatVfs {
    pub bsize: u64,
    pub frsize: u64,
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub favail: u64,
    pub fsid: u64,
    pub flag: u64,
    pub namemax: u64,
}
