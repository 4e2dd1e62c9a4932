use inogen_core::{Credentials, FileType, Generation, ObjectId, Stat, Timespec, VfsGid, VfsUid};
use slab::Slab;
use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

/// Directory positions 0 and 1 are `.` and `..`; children start here.
pub(crate) const FIRST_CHILD_POSITION: u64 = 2;

pub(crate) type Key = usize;

pub(crate) fn key_of(id: ObjectId) -> Option<Key> {
    id.get().checked_sub(1).map(|key| key as Key)
}

pub(crate) fn id_of(key: Key) -> ObjectId {
    ObjectId::new(key as u64 + 1)
}

pub(crate) fn now() -> Timespec {
    let since = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Timespec::new(since.as_secs() as i64, since.subsec_nanos())
}

#[derive(Debug)]
pub(crate) struct DirSlot {
    pub(crate) name: Vec<u8>,
    pub(crate) key: Key,
}

#[derive(Debug)]
pub(crate) struct DirNode {
    pub(crate) parent: Key,
    /// Children ordered by their directory position.
    pub(crate) entries: BTreeMap<u64, DirSlot>,
    pub(crate) by_name: HashMap<Vec<u8>, u64>,
    next_position: u64,
}

impl DirNode {
    pub(crate) fn new(parent: Key) -> Self {
        Self {
            parent,
            entries: BTreeMap::new(),
            by_name: HashMap::new(),
            next_position: FIRST_CHILD_POSITION,
        }
    }

    pub(crate) fn get(&self, name: &[u8]) -> Option<Key> {
        let position = self.by_name.get(name)?;
        self.entries.get(position).map(|slot| slot.key)
    }

    /// Positions only grow, so a saved cursor resumes after every entry it
    /// has already passed.
    pub(crate) fn insert(&mut self, name: &[u8], key: Key) {
        let position = self.next_position;
        self.next_position += 1;
        self.by_name.insert(name.to_vec(), position);
        self.entries.insert(
            position,
            DirSlot {
                name: name.to_vec(),
                key,
            },
        );
    }

    pub(crate) fn remove(&mut self, name: &[u8]) -> Option<Key> {
        let position = self.by_name.remove(name)?;
        self.entries.remove(&position).map(|slot| slot.key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    File(Vec<u8>),
    Directory(DirNode),
    Symlink(Vec<u8>),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) generation: Generation,
    pub(crate) perm: u32,
    pub(crate) uid: VfsUid,
    pub(crate) gid: VfsGid,
    pub(crate) nlink: u64,
    /// Live references handed out and not yet released.
    pub(crate) refs: u64,
    pub(crate) atime: Timespec,
    pub(crate) mtime: Timespec,
    pub(crate) ctime: Timespec,
    pub(crate) attr_dir: Option<Key>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(
        generation: Generation,
        cred: &Credentials,
        perm: u32,
        kind: NodeKind,
    ) -> Self {
        let time = now();
        let nlink = match kind {
            NodeKind::Directory(_) => 2,
            _ => 1,
        };
        Self {
            generation,
            perm: perm & 0o7777,
            uid: cred.uid,
            gid: cred.gid,
            nlink,
            refs: 0,
            atime: time,
            mtime: time,
            ctime: time,
            attr_dir: None,
            kind,
        }
    }

    pub(crate) fn file_type(&self) -> FileType {
        match self.kind {
            NodeKind::File(_) => FileType::RegularFile,
            NodeKind::Directory(_) => FileType::Directory,
            NodeKind::Symlink(_) => FileType::Symlink,
        }
    }

    pub(crate) fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::File(data) => data.len() as u64,
            NodeKind::Directory(dir) => dir.entries.len() as u64 + FIRST_CHILD_POSITION,
            NodeKind::Symlink(target) => target.len() as u64,
        }
    }

    pub(crate) fn dir(&self) -> Option<&DirNode> {
        match &self.kind {
            NodeKind::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub(crate) fn dir_mut(&mut self) -> Option<&mut DirNode> {
        match &mut self.kind {
            NodeKind::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub(crate) fn touch(&mut self) {
        let time = now();
        self.mtime = time;
        self.ctime = time;
    }

    pub(crate) fn stat(&self, key: Key, dev: u64, block_size: u32) -> Stat {
        let size = self.size();
        Stat {
            dev,
            id: id_of(key),
            file_type: self.file_type(),
            perm: self.perm,
            nlink: self.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            size,
            blksize: block_size,
            blocks: size.div_ceil(512),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }

    /// Owner, group and other permission bits, with root passing every check.
    pub(crate) fn permits(&self, cred: &Credentials, read: bool, write: bool, exec: bool) -> bool {
        if cred.is_root() {
            return true;
        }
        let bits = if cred.uid == self.uid {
            self.perm >> 6
        } else if cred.in_group(self.gid) {
            self.perm >> 3
        } else {
            self.perm
        };
        (!read || bits & 0o4 != 0) && (!write || bits & 0o2 != 0) && (!exec || bits & 0o1 != 0)
    }
}

/// Object table. Slab keys are recycled, generations never are.
#[derive(Debug)]
pub(crate) struct Table {
    pub(crate) nodes: Slab<Node>,
    last_generation: u64,
}

impl Table {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Slab::new(),
            last_generation: 0,
        }
    }

    pub(crate) fn next_generation(&mut self) -> Generation {
        self.last_generation += 1;
        Generation::new(self.last_generation)
    }

    pub(crate) fn insert(&mut self, node: Node) -> Key {
        self.nodes.insert(node)
    }

    pub(crate) fn get(&self, key: Key) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Drop one name of `key`. The object goes away once it has neither
    /// names nor live references.
    pub(crate) fn unlink(&mut self, key: Key) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.nlink = match node.kind {
            NodeKind::Directory(_) => 0,
            _ => node.nlink.saturating_sub(1),
        };
        self.reap(key);
    }

    /// Free `key` if it is unreachable, along with anything only it holds:
    /// its attribute directory and, for attribute directories, their values.
    pub(crate) fn reap(&mut self, key: Key) {
        let unreachable = self
            .nodes
            .get(key)
            .is_some_and(|node| node.nlink == 0 && node.refs == 0);
        if !unreachable {
            return;
        }
        let node = self.nodes.remove(key);
        if let Some(attr_dir) = node.attr_dir {
            self.unlink(attr_dir);
        }
        if let NodeKind::Directory(dir) = node.kind {
            for slot in dir.entries.into_values() {
                self.unlink(slot.key);
            }
        }
    }

    pub(crate) fn used_blocks(&self, block_size: u32) -> u64 {
        self.nodes
            .iter()
            .map(|(_, node)| match &node.kind {
                NodeKind::File(data) => (data.len() as u64).div_ceil(block_size as u64),
                _ => 0,
            })
            .sum()
    }
}
