use smallvec::SmallVec;

pub type VfsUid = u32;
pub type VfsGid = u32;

#[derive(Clone, Debug)]
pub struct VfsConfig {
    /// Longest name accepted on input or returned from a directory read.
    pub max_name_len: usize,
    /// How many times one directory iteration call may be invalidated
    /// before it gives up with `RetryLimit`.
    pub max_invalidate_retries: u32,
    /// Report generation mismatches as `Stale` instead of `NotFound`.
    pub report_stale: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            max_name_len: 255,
            max_invalidate_retries: 64,
            report_stale: false,
        }
    }
}

/// Caller identity, passed unchanged to every store call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub uid: VfsUid,
    pub gid: VfsGid,
    pub groups: SmallVec<[VfsGid; 8]>,
}

impl Credentials {
    pub fn new(uid: VfsUid, gid: VfsGid) -> Self {
        Self {
            uid,
            gid,
            groups: SmallVec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(0, 0)
    }

    pub fn is_root(&self) -> bool {
        self.uid == 0
    }

    pub fn in_group(&self, gid: VfsGid) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }
}
