use crate::config::MemStoreConfig;
use crate::node::{DirNode, FIRST_CHILD_POSITION, Key, Node, NodeKind, Table, id_of, key_of, now};
use crate::stats::{Accounting, StoreOp};
use inogen_core::{
    AccessMask, AttrMask, Credentials, LiveObject, NewObject, ObjectId, ObjectStore, RawDirBatch,
    RawDirEntry, RemoveKind, SetAttr, Stat, StatVfs, VfsError, VfsErrorKind, VfsName, VfsNameBuf,
    VfsResult,
};
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

const ROOT_KEY: Key = 0;

/// In-memory [`ObjectStore`].
///
/// Objects live in a slab whose keys double as object ids, so deleting an
/// object and creating another one typically reuses the id; every new
/// object gets a fresh generation from a single counter. An object is freed
/// once it has no names left and no live references, so unlinked objects
/// stay readable through references taken before the unlink.
///
/// Every entry point is counted and can be made to fail once with
/// [`MemStore::fail_next`].
#[derive(Debug)]
pub struct MemStore {
    table: RwLock<Table>,
    config: MemStoreConfig,
    accounting: Accounting,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(MemStoreConfig::default())
    }
}

impl MemStore {
    pub fn new(config: MemStoreConfig) -> Self {
        let mut table = Table::new();
        let generation = table.next_generation();
        let root = table.insert(Node::new(
            generation,
            &Credentials::root(),
            0o755,
            NodeKind::Directory(DirNode::new(ROOT_KEY)),
        ));
        debug_assert_eq!(root, ROOT_KEY);
        Self {
            table: RwLock::new(table),
            config,
            accounting: Accounting::default(),
        }
    }

    pub fn config(&self) -> &MemStoreConfig {
        &self.config
    }

    /// Number of times `op` was invoked since creation or the last reset.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.accounting.calls(op)
    }

    /// Clear call counts, the raw read log and the reference tally.
    pub fn reset_calls(&self) {
        self.accounting.reset();
    }

    /// Make the next call to `op` fail with `Storage(code)`.
    pub fn fail_next(&self, op: StoreOp, code: i32) {
        self.accounting.arm(op, code);
    }

    /// Cursor of every raw directory read, in call order.
    pub fn raw_reads(&self) -> Vec<u64> {
        self.accounting.raw_reads()
    }

    /// Consistency scopes entered and not yet exited.
    pub fn scope_depth(&self) -> usize {
        self.accounting.scope_depth()
    }

    /// Live references currently outstanding across all objects.
    pub fn live_refs(&self) -> u64 {
        self.table.read().nodes.iter().map(|(_, node)| node.refs).sum()
    }

    /// Live references handed out since creation, released or not.
    pub fn refs_taken(&self) -> usize {
        self.accounting.refs_taken()
    }

    /// Objects currently allocated, including unlinked ones still referenced.
    pub fn object_count(&self) -> usize {
        self.table.read().nodes.len()
    }

    fn begin(&self, op: StoreOp, context: &'static str) -> VfsResult<()> {
        match self.accounting.record(op) {
            Some(code) => {
                debug!("injected failure in {:?}: code {}", op, code);
                Err(VfsError::new(VfsErrorKind::Storage(code), context))
            }
            None => Ok(()),
        }
    }

    fn take_ref(
        &self,
        table: &mut Table,
        key: Key,
        context: &'static str,
    ) -> VfsResult<LiveObject> {
        let node = table
            .get_mut(key)
            .ok_or(VfsError::new(VfsErrorKind::NotFound, context))?;
        node.refs += 1;
        self.accounting.took_ref();
        Ok(LiveObject::new(id_of(key), node.generation, node.file_type()))
    }

    fn check_capacity(&self, table: &Table, context: &'static str) -> VfsResult<()> {
        if table.nodes.len() as u64 >= self.config.total_files {
            return Err(VfsError::new(VfsErrorKind::Storage(libc::ENOSPC), context));
        }
        Ok(())
    }

    /// Resize file data at `key` to `len` bytes, refusing to exceed capacity.
    fn resize(
        &self,
        table: &mut Table,
        key: Key,
        len: u64,
        context: &'static str,
    ) -> VfsResult<()> {
        let block_size = self.config.block_size as u64;
        let current = match table.get(key).map(|node| &node.kind) {
            Some(NodeKind::File(data)) => data.len() as u64,
            _ => return Err(VfsError::new(VfsErrorKind::InvalidInput, context)),
        };
        if len > current {
            let used = table.used_blocks(self.config.block_size);
            let grown = len.div_ceil(block_size) - current.div_ceil(block_size);
            if used + grown > self.config.total_blocks {
                return Err(VfsError::new(VfsErrorKind::Storage(libc::ENOSPC), context));
            }
        }
        let len = usize::try_from(len)
            .map_err(|_| VfsError::new(VfsErrorKind::InvalidInput, context))?;
        if let Some(NodeKind::File(data)) = table.get_mut(key).map(|node| &mut node.kind) {
            data.resize(len, 0);
        }
        Ok(())
    }
}

fn locate<'t>(
    table: &'t Table,
    object: &LiveObject,
    context: &'static str,
) -> VfsResult<(Key, &'t Node)> {
    key_of(object.id())
        .and_then(|key| table.get(key).map(|node| (key, node)))
        .filter(|(_, node)| node.generation == object.generation())
        .ok_or(VfsError::new(VfsErrorKind::NotFound, context))
}

/// Locate a directory the caller wants to search (`write == false`) or
/// modify (`write == true`).
fn locate_dir<'t>(
    table: &'t Table,
    cred: &Credentials,
    dir: &LiveObject,
    write: bool,
    context: &'static str,
) -> VfsResult<(Key, &'t Node, &'t DirNode)> {
    let (key, node) = locate(table, dir, context)?;
    let entries = node
        .dir()
        .ok_or(VfsError::new(VfsErrorKind::NotDir, context))?;
    if !node.permits(cred, false, write, true) {
        return Err(VfsError::new(VfsErrorKind::PermissionDenied, context));
    }
    Ok((key, node, entries))
}

fn update(table: &mut Table, key: Key, apply: impl FnOnce(&mut Node)) {
    if let Some(node) = table.get_mut(key) {
        apply(node);
    }
}

impl ObjectStore for MemStore {
    fn root_id(&self) -> ObjectId {
        id_of(ROOT_KEY)
    }

    fn enter(&self) -> VfsResult<()> {
        self.begin(StoreOp::Enter, "mem.enter")?;
        self.accounting.enter_scope();
        Ok(())
    }

    fn exit(&self) {
        self.accounting.exit_scope();
    }

    fn acquire(&self, id: ObjectId) -> VfsResult<LiveObject> {
        self.begin(StoreOp::Acquire, "mem.acquire")?;
        let mut table = self.table.write();
        let key = key_of(id)
            .filter(|key| table.get(*key).is_some_and(|node| node.nlink > 0))
            .ok_or(VfsError::new(VfsErrorKind::NotFound, "mem.acquire"))?;
        self.take_ref(&mut table, key, "mem.acquire")
    }

    fn release(&self, object: LiveObject) {
        let _ = self.accounting.record(StoreOp::Release);
        let mut table = self.table.write();
        let key = match locate(&table, &object, "mem.release") {
            Ok((key, node)) if node.refs > 0 => key,
            _ => {
                warn!("release of unreferenced object {}", object.id());
                return;
            }
        };
        update(&mut table, key, |node| node.refs -= 1);
        table.reap(key);
    }

    fn lookup_child(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        name: VfsName<'_>,
    ) -> VfsResult<LiveObject> {
        self.begin(StoreOp::LookupChild, "mem.lookup_child")?;
        let mut table = self.table.write();
        let (key, _, entries) = locate_dir(&table, cred, dir, false, "mem.lookup_child")?;
        let child = match name.as_bytes() {
            b"." => key,
            b".." => entries.parent,
            bytes => entries
                .get(bytes)
                .ok_or(VfsError::new(VfsErrorKind::NotFound, "mem.lookup_child"))?,
        };
        self.take_ref(&mut table, child, "mem.lookup_child")
    }

    fn create_child(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        name: VfsName<'_>,
        new: NewObject<'_>,
    ) -> VfsResult<LiveObject> {
        const CONTEXT: &str = "mem.create_child";
        self.begin(StoreOp::CreateChild, CONTEXT)?;
        let mut table = self.table.write();
        let (dir_key, _, entries) = locate_dir(&table, cred, dir, true, CONTEXT)?;
        if name.is_dot_or_dotdot() || entries.get(name.as_bytes()).is_some() {
            return Err(VfsError::new(VfsErrorKind::AlreadyExists, CONTEXT));
        }
        self.check_capacity(&table, CONTEXT)?;

        let (kind, perm) = match new {
            NewObject::File { perm } => (NodeKind::File(Vec::new()), perm),
            NewObject::Directory { perm } => (NodeKind::Directory(DirNode::new(dir_key)), perm),
            NewObject::Symlink { target } => (NodeKind::Symlink(target.to_vec()), 0o777),
        };
        let is_dir = matches!(kind, NodeKind::Directory(_));
        let generation = table.next_generation();
        let key = table.insert(Node::new(generation, cred, perm, kind));
        update(&mut table, dir_key, |parent| {
            if is_dir {
                parent.nlink += 1;
            }
            parent.touch();
            if let Some(entries) = parent.dir_mut() {
                entries.insert(name.as_bytes(), key);
            }
        });
        trace!("created object {} generation {}", id_of(key), generation);
        self.take_ref(&mut table, key, CONTEXT)
    }

    fn link(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        target: &LiveObject,
        name: VfsName<'_>,
    ) -> VfsResult<()> {
        const CONTEXT: &str = "mem.link";
        self.begin(StoreOp::Link, CONTEXT)?;
        let mut table = self.table.write();
        let (dir_key, _, entries) = locate_dir(&table, cred, dir, true, CONTEXT)?;
        if name.is_dot_or_dotdot() || entries.get(name.as_bytes()).is_some() {
            return Err(VfsError::new(VfsErrorKind::AlreadyExists, CONTEXT));
        }
        let (target_key, target_node) = locate(&table, target, CONTEXT)?;
        if target_node.dir().is_some() {
            return Err(VfsError::new(VfsErrorKind::IsDir, CONTEXT));
        }
        if target_node.nlink == 0 {
            return Err(VfsError::new(VfsErrorKind::NotFound, CONTEXT));
        }

        update(&mut table, dir_key, |parent| {
            parent.touch();
            if let Some(entries) = parent.dir_mut() {
                entries.insert(name.as_bytes(), target_key);
            }
        });
        update(&mut table, target_key, |node| {
            node.nlink += 1;
            node.ctime = now();
        });
        Ok(())
    }

    fn remove(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        name: VfsName<'_>,
        kind: RemoveKind,
    ) -> VfsResult<()> {
        const CONTEXT: &str = "mem.remove";
        self.begin(StoreOp::Remove, CONTEXT)?;
        let mut table = self.table.write();
        let (dir_key, _, entries) = locate_dir(&table, cred, dir, true, CONTEXT)?;
        if name.is_dot_or_dotdot() {
            return Err(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT));
        }
        let child_key = entries
            .get(name.as_bytes())
            .ok_or(VfsError::new(VfsErrorKind::NotFound, CONTEXT))?;
        let child_dir = table.get(child_key).and_then(Node::dir);
        match (kind, child_dir) {
            (RemoveKind::File, Some(_)) => {
                return Err(VfsError::new(VfsErrorKind::IsDir, CONTEXT));
            }
            (RemoveKind::Directory, None) => {
                return Err(VfsError::new(VfsErrorKind::NotDir, CONTEXT));
            }
            (RemoveKind::Directory, Some(child)) if !child.is_empty() => {
                return Err(VfsError::new(VfsErrorKind::AlreadyExists, CONTEXT));
            }
            _ => {}
        }

        update(&mut table, dir_key, |parent| {
            if kind == RemoveKind::Directory {
                parent.nlink -= 1;
            }
            parent.touch();
            if let Some(entries) = parent.dir_mut() {
                entries.remove(name.as_bytes());
            }
        });
        update(&mut table, child_key, |node| node.ctime = now());
        table.unlink(child_key);
        Ok(())
    }

    fn rename(
        &self,
        cred: &Credentials,
        from_dir: &LiveObject,
        from_name: VfsName<'_>,
        to_dir: &LiveObject,
        to_name: VfsName<'_>,
    ) -> VfsResult<()> {
        const CONTEXT: &str = "mem.rename";
        self.begin(StoreOp::Rename, CONTEXT)?;
        let mut table = self.table.write();
        if from_name.is_dot_or_dotdot() || to_name.is_dot_or_dotdot() {
            return Err(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT));
        }
        let (from_key, _, from_entries) = locate_dir(&table, cred, from_dir, true, CONTEXT)?;
        let (to_key, _, to_entries) = locate_dir(&table, cred, to_dir, true, CONTEXT)?;
        let source = from_entries
            .get(from_name.as_bytes())
            .ok_or(VfsError::new(VfsErrorKind::NotFound, CONTEXT))?;
        let source_is_dir = table.get(source).is_some_and(|node| node.dir().is_some());

        let replaced = to_entries.get(to_name.as_bytes());
        if let Some(target) = replaced {
            if target == source {
                return Ok(());
            }
            match (source_is_dir, table.get(target).and_then(Node::dir)) {
                (true, None) => return Err(VfsError::new(VfsErrorKind::NotDir, CONTEXT)),
                (false, Some(_)) => return Err(VfsError::new(VfsErrorKind::IsDir, CONTEXT)),
                (true, Some(entries)) if !entries.is_empty() => {
                    return Err(VfsError::new(VfsErrorKind::DirNotEmpty, CONTEXT));
                }
                _ => {}
            }
        }
        if source_is_dir {
            // A directory cannot move underneath itself.
            let mut cursor = to_key;
            loop {
                if cursor == source {
                    return Err(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT));
                }
                match table.get(cursor).and_then(Node::dir) {
                    Some(entries) if cursor != ROOT_KEY => cursor = entries.parent,
                    _ => break,
                }
            }
        }

        if let Some(target) = replaced {
            update(&mut table, to_key, |parent| {
                if source_is_dir {
                    parent.nlink -= 1;
                }
                if let Some(entries) = parent.dir_mut() {
                    entries.remove(to_name.as_bytes());
                }
            });
            table.unlink(target);
        }
        update(&mut table, from_key, |parent| {
            if source_is_dir {
                parent.nlink -= 1;
            }
            parent.touch();
            if let Some(entries) = parent.dir_mut() {
                entries.remove(from_name.as_bytes());
            }
        });
        update(&mut table, to_key, |parent| {
            if source_is_dir {
                parent.nlink += 1;
            }
            parent.touch();
            if let Some(entries) = parent.dir_mut() {
                entries.insert(to_name.as_bytes(), source);
            }
        });
        update(&mut table, source, |node| {
            node.ctime = now();
            if let Some(entries) = node.dir_mut() {
                entries.parent = to_key;
            }
        });
        Ok(())
    }

    fn read_link(&self, _cred: &Credentials, object: &LiveObject) -> VfsResult<Vec<u8>> {
        self.begin(StoreOp::ReadLink, "mem.read_link")?;
        let table = self.table.read();
        match &locate(&table, object, "mem.read_link")?.1.kind {
            NodeKind::Symlink(target) => Ok(target.clone()),
            _ => Err(VfsError::new(VfsErrorKind::InvalidInput, "mem.read_link")),
        }
    }

    fn read_dir_raw(
        &self,
        _cred: &Credentials,
        dir: &LiveObject,
        cursor: u64,
    ) -> VfsResult<RawDirBatch> {
        const CONTEXT: &str = "mem.read_dir_raw";
        self.begin(StoreOp::ReadDirRaw, CONTEXT)?;
        self.accounting.log_raw_read(cursor);
        let table = self.table.read();
        let (key, node) = locate(&table, dir, CONTEXT)?;
        let entries = node
            .dir()
            .ok_or(VfsError::new(VfsErrorKind::NotDir, CONTEXT))?;

        let dots = [(0, &b"."[..], key), (1, &b".."[..], entries.parent)];
        let children = entries
            .entries
            .range(cursor.max(FIRST_CHILD_POSITION)..)
            .map(|(position, slot)| (*position, slot.name.as_slice(), slot.key));
        let mut items = dots
            .into_iter()
            .filter(|(position, _, _)| *position >= cursor)
            .chain(children)
            .filter_map(|(position, name, key)| {
                let file_type = table.get(key)?.file_type();
                Some((position, name, key, file_type))
            })
            .peekable();

        let mut batch = RawDirBatch::default();
        let mut collected: SmallVec<[RawDirEntry; 8]> = SmallVec::new();
        while collected.len() < self.config.readdir_batch.max(1) {
            let Some((position, name, key, file_type)) = items.next() else {
                break;
            };
            let next = items.peek().map_or(position + 1, |(next, ..)| *next);
            collected.push(RawDirEntry {
                name: VfsNameBuf::new(name),
                id: id_of(key),
                file_type,
                offset: position,
                next,
            });
        }
        batch.eof = items.peek().is_none();
        batch.entries = collected;
        Ok(batch)
    }

    fn get_attributes(&self, _cred: &Credentials, object: &LiveObject) -> VfsResult<Stat> {
        self.begin(StoreOp::GetAttributes, "mem.get_attributes")?;
        let table = self.table.read();
        let (key, node) = locate(&table, object, "mem.get_attributes")?;
        Ok(node.stat(key, self.config.fsid, self.config.block_size))
    }

    fn set_attributes(
        &self,
        cred: &Credentials,
        object: &LiveObject,
        set: &SetAttr,
    ) -> VfsResult<Stat> {
        const CONTEXT: &str = "mem.set_attributes";
        self.begin(StoreOp::SetAttributes, CONTEXT)?;
        let mut table = self.table.write();
        let (key, node) = locate(&table, object, CONTEXT)?;
        let owner = cred.is_root() || cred.uid == node.uid;

        if set.mask.contains(AttrMask::MODE) && !owner {
            return Err(VfsError::new(VfsErrorKind::PermissionDenied, CONTEXT));
        }
        if set.mask.contains(AttrMask::UID) && set.uid != node.uid && !cred.is_root() {
            return Err(VfsError::new(VfsErrorKind::PermissionDenied, CONTEXT));
        }
        if set.mask.contains(AttrMask::GID)
            && set.gid != node.gid
            && !(cred.is_root() || (owner && cred.in_group(set.gid)))
        {
            return Err(VfsError::new(VfsErrorKind::PermissionDenied, CONTEXT));
        }
        if set.mask.intersects(AttrMask::ATIME | AttrMask::MTIME)
            && !owner
            && !node.permits(cred, false, true, false)
        {
            return Err(VfsError::new(VfsErrorKind::PermissionDenied, CONTEXT));
        }
        if set.mask.contains(AttrMask::SIZE) {
            match node.kind {
                NodeKind::Directory(_) => {
                    return Err(VfsError::new(VfsErrorKind::IsDir, CONTEXT));
                }
                NodeKind::Symlink(_) => {
                    return Err(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT));
                }
                NodeKind::File(_) => {}
            }
            if !node.permits(cred, false, true, false) {
                return Err(VfsError::new(VfsErrorKind::PermissionDenied, CONTEXT));
            }
            self.resize(&mut table, key, set.size, CONTEXT)?;
        }

        let time = now();
        let node = table
            .get_mut(key)
            .ok_or(VfsError::new(VfsErrorKind::NotFound, CONTEXT))?;
        if set.mask.contains(AttrMask::MODE) {
            node.perm = set.perm & 0o7777;
        }
        if set.mask.contains(AttrMask::UID) {
            node.uid = set.uid;
        }
        if set.mask.contains(AttrMask::GID) {
            node.gid = set.gid;
        }
        if set.mask.contains(AttrMask::ATIME) {
            node.atime = set.atime;
        }
        if set.mask.contains(AttrMask::MTIME) {
            node.mtime = set.mtime;
        } else if set.mask.contains(AttrMask::SIZE) {
            node.mtime = time;
        }
        node.ctime = time;
        Ok(node.stat(key, self.config.fsid, self.config.block_size))
    }

    fn access(&self, cred: &Credentials, object: &LiveObject, mask: AccessMask) -> VfsResult<()> {
        self.begin(StoreOp::Access, "mem.access")?;
        let table = self.table.read();
        let (_, node) = locate(&table, object, "mem.access")?;
        if node.permits(
            cred,
            mask.contains(AccessMask::READ),
            mask.contains(AccessMask::WRITE),
            mask.contains(AccessMask::EXEC),
        ) {
            Ok(())
        } else {
            Err(VfsError::new(VfsErrorKind::PermissionDenied, "mem.access"))
        }
    }

    fn open(
        &self,
        _cred: &Credentials,
        object: &LiveObject,
        _flags: inogen_core::OpenFlags,
    ) -> VfsResult<()> {
        self.begin(StoreOp::Open, "mem.open")?;
        locate(&self.table.read(), object, "mem.open").map(|_| ())
    }

    fn close(
        &self,
        _cred: &Credentials,
        object: &LiveObject,
        _flags: inogen_core::OpenFlags,
    ) -> VfsResult<()> {
        self.begin(StoreOp::Close, "mem.close")?;
        locate(&self.table.read(), object, "mem.close").map(|_| ())
    }

    fn read(
        &self,
        _cred: &Credentials,
        object: &LiveObject,
        offset: u64,
        buf: &mut [u8],
    ) -> VfsResult<usize> {
        self.begin(StoreOp::Read, "mem.read")?;
        let table = self.table.read();
        let data = match &locate(&table, object, "mem.read")?.1.kind {
            NodeKind::File(data) => data,
            NodeKind::Directory(_) => return Err(VfsError::new(VfsErrorKind::IsDir, "mem.read")),
            NodeKind::Symlink(_) => {
                return Err(VfsError::new(VfsErrorKind::InvalidInput, "mem.read"));
            }
        };
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }

    fn write(
        &self,
        _cred: &Credentials,
        object: &LiveObject,
        offset: u64,
        buf: &[u8],
    ) -> VfsResult<usize> {
        const CONTEXT: &str = "mem.write";
        self.begin(StoreOp::Write, CONTEXT)?;
        let mut table = self.table.write();
        let (key, node) = locate(&table, object, CONTEXT)?;
        let size = node.size();
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT))?;
        if end > size {
            self.resize(&mut table, key, end, CONTEXT)?;
        }
        let node = table
            .get_mut(key)
            .ok_or(VfsError::new(VfsErrorKind::NotFound, CONTEXT))?;
        let NodeKind::File(data) = &mut node.kind else {
            return Err(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT));
        };
        let start = offset as usize;
        data[start..start + buf.len()].copy_from_slice(buf);
        node.touch();
        Ok(buf.len())
    }

    fn zero_range(
        &self,
        _cred: &Credentials,
        object: &LiveObject,
        offset: u64,
        len: u64,
    ) -> VfsResult<()> {
        const CONTEXT: &str = "mem.zero_range";
        self.begin(StoreOp::ZeroRange, CONTEXT)?;
        let mut table = self.table.write();
        let (key, node) = locate(&table, object, CONTEXT)?;
        let size = node.size();
        let end = offset
            .checked_add(len)
            .ok_or(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT))?;
        if end > size {
            self.resize(&mut table, key, end, CONTEXT)?;
        }
        let node = table
            .get_mut(key)
            .ok_or(VfsError::new(VfsErrorKind::NotFound, CONTEXT))?;
        let NodeKind::File(data) = &mut node.kind else {
            return Err(VfsError::new(VfsErrorKind::InvalidInput, CONTEXT));
        };
        let end = end.min(size) as usize;
        let start = (offset as usize).min(end);
        data[start..end].fill(0);
        node.touch();
        Ok(())
    }

    fn attr_dir(
        &self,
        cred: &Credentials,
        object: &LiveObject,
        create: bool,
    ) -> VfsResult<Option<LiveObject>> {
        const CONTEXT: &str = "mem.attr_dir";
        self.begin(StoreOp::AttrDir, CONTEXT)?;
        let mut table = self.table.write();
        let (key, node) = locate(&table, object, CONTEXT)?;
        if let Some(attr_dir) = node.attr_dir {
            return self.take_ref(&mut table, attr_dir, CONTEXT).map(Some);
        }
        if !create {
            return Ok(None);
        }
        if !(cred.is_root() || cred.uid == node.uid || node.permits(cred, false, true, false)) {
            return Err(VfsError::new(VfsErrorKind::PermissionDenied, CONTEXT));
        }
        self.check_capacity(&table, CONTEXT)?;

        let owner = Credentials::new(node.uid, node.gid);
        let generation = table.next_generation();
        let attr_dir = table.insert(Node::new(
            generation,
            &owner,
            0o777,
            NodeKind::Directory(DirNode::new(key)),
        ));
        update(&mut table, key, |node| node.attr_dir = Some(attr_dir));
        self.take_ref(&mut table, attr_dir, CONTEXT).map(Some)
    }

    fn statfs(&self) -> VfsResult<StatVfs> {
        self.begin(StoreOp::Statfs, "mem.statfs")?;
        let table = self.table.read();
        let used_blocks = table.used_blocks(self.config.block_size);
        let free_blocks = self.config.total_blocks.saturating_sub(used_blocks);
        let free_files = self
            .config
            .total_files
            .saturating_sub(table.nodes.len() as u64);
        Ok(StatVfs {
            bsize: self.config.block_size as u64,
            frsize: self.config.block_size as u64,
            blocks: self.config.total_blocks,
            bfree: free_blocks,
            bavail: free_blocks,
            files: self.config.total_files,
            ffree: free_files,
            favail: free_files,
            fsid: self.config.fsid,
            flag: 0,
            namemax: 255,
        })
    }
}
