//! Handle-based filesystem facade.
//!
//! Every operation that takes an [`ObjectHandle`] resolves it with a
//! generation check first, runs inside the store's consistency scope, and
//! mints any handle it returns while the new object's reference is still
//! held. References are [`LiveRef`] guards, so each one is released exactly
//! once whichever way the operation exits.

use crate::dir::{DirCursor, DirEngine, DirIterControl, DirIterEntry, DirIterOutcome};
use crate::dir::{DirEntry, ReadDirBatch, ReadDirOutcome};
use crate::registry::HandleRegistry;
use crate::store::{LiveObject, LiveRef, NewObject, ObjectStore, OpScope, RemoveKind};
use crate::{
    AccessMask, Credentials, DirIterFlags, FileType, ObjectHandle, OpenFlags, Session, SetAttr,
    Stat, StatVfs, VfsConfig, VfsError, VfsErrorKind, VfsName, VfsNameBuf, VfsResult,
};
use std::sync::Arc;
use tracing::debug;

/// Result of [`Filesystem::open_at`].
#[derive(Debug)]
pub struct OpenOutcome {
    pub session: Session,
    pub handle: ObjectHandle,
    /// The name did not exist and was created by this call.
    pub created: bool,
}

#[derive(Clone)]
pub struct Filesystem {
    registry: HandleRegistry,
    config: Arc<VfsConfig>,
}

impl Filesystem {
    pub fn new(store: Arc<dyn ObjectStore>, config: VfsConfig) -> Self {
        let config = Arc::new(config);
        Self {
            registry: HandleRegistry::new(store, config.clone()),
            config,
        }
    }

    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self::new(store, VfsConfig::default())
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    fn store(&self) -> &Arc<dyn ObjectStore> {
        self.registry.store()
    }

    pub fn root(&self) -> VfsResult<ObjectHandle> {
        let _scope = self.scope()?;
        let root = self.registry.resolve_root()?;
        Ok(HandleRegistry::mint(&root))
    }

    pub fn statfs(&self) -> VfsResult<StatVfs> {
        let _scope = self.scope()?;
        self.store().statfs()
    }

    pub fn lookup(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        name: &[u8],
    ) -> VfsResult<(ObjectHandle, FileType)> {
        let name = self.name(name, "fs.lookup")?;
        debug!("lookup: parent={} name={:?}", parent, name);
        let _scope = self.scope()?;
        let dir = self.resolve_dir(parent, "fs.lookup")?;
        let child = self.adopt(self.store().lookup_child(cred, &dir, name)?);
        Ok((HandleRegistry::mint(&child), child.file_type()))
    }

    /// Look `name` up relative to an open directory session.
    pub fn lookup_at(
        &self,
        session: &Session,
        name: &[u8],
    ) -> VfsResult<(ObjectHandle, FileType)> {
        let name = self.name(name, "fs.lookup_at")?;
        debug!("lookup_at: dir={} name={:?}", session.handle(), name);
        require_dir(session.live(), "fs.lookup_at")?;
        let _scope = self.scope()?;
        let child = self.adopt(self.store().lookup_child(
            session.credentials(),
            session.live(),
            name,
        )?);
        Ok((HandleRegistry::mint(&child), child.file_type()))
    }

    pub fn access(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
        mask: AccessMask,
    ) -> VfsResult<()> {
        debug!("access: {} mask={:?}", handle, mask);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        self.store().access(cred, &live, mask)
    }

    pub fn open(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
        flags: OpenFlags,
    ) -> VfsResult<Session> {
        debug!("open: {} flags={:?}", handle, flags);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        self.open_live(cred, live, flags, true)
    }

    /// Open `name` in `parent`, creating a regular file when it is missing
    /// and `flags` has `CREATE`.
    pub fn open_at(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        name: &[u8],
        flags: OpenFlags,
        perm: u32,
    ) -> VfsResult<OpenOutcome> {
        let name = self.name(name, "fs.open_at")?;
        debug!("open_at: parent={} name={:?} flags={:?}", parent, name, flags);
        let _scope = self.scope()?;
        let dir = self.resolve_dir(parent, "fs.open_at")?;

        let (live, created) = match self.store().lookup_child(cred, &dir, name) {
            Ok(object) => {
                let live = self.adopt(object);
                if flags.contains(OpenFlags::CREATE | OpenFlags::EXCL) {
                    return Err(VfsError::new(VfsErrorKind::AlreadyExists, "fs.open_at"));
                }
                (live, false)
            }
            Err(err)
                if err.kind() == VfsErrorKind::NotFound && flags.contains(OpenFlags::CREATE) =>
            {
                let object = self
                    .store()
                    .create_child(cred, &dir, name, NewObject::File { perm })?;
                (self.adopt(object), true)
            }
            Err(err) => return Err(err),
        };
        drop(dir);

        let handle = HandleRegistry::mint(&live);
        let session = self.open_live(cred, live, flags, !created)?;
        Ok(OpenOutcome {
            session,
            handle,
            created,
        })
    }

    pub fn open_dir(&self, cred: &Credentials, handle: ObjectHandle) -> VfsResult<Session> {
        self.open(cred, handle, OpenFlags::READ | OpenFlags::DIRECTORY)
    }

    pub fn close(&self, session: Session) -> VfsResult<()> {
        session.close()
    }

    pub fn close_dir(&self, session: Session) -> VfsResult<()> {
        self.close(session)
    }

    pub fn create(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        name: &[u8],
        perm: u32,
    ) -> VfsResult<ObjectHandle> {
        self.create_child(cred, parent, name, NewObject::File { perm }, "fs.create")
    }

    pub fn mkdir(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        name: &[u8],
        perm: u32,
    ) -> VfsResult<ObjectHandle> {
        self.create_child(cred, parent, name, NewObject::Directory { perm }, "fs.mkdir")
    }

    pub fn symlink(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        name: &[u8],
        target: &[u8],
    ) -> VfsResult<ObjectHandle> {
        if target.is_empty() {
            return Err(VfsError::new(VfsErrorKind::InvalidInput, "fs.symlink"));
        }
        self.create_child(cred, parent, name, NewObject::Symlink { target }, "fs.symlink")
    }

    pub fn read_link(&self, cred: &Credentials, handle: ObjectHandle) -> VfsResult<Vec<u8>> {
        debug!("read_link: {}", handle);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        if live.file_type() != FileType::Symlink {
            return Err(VfsError::new(VfsErrorKind::InvalidInput, "fs.read_link"));
        }
        self.store().read_link(cred, &live)
    }

    pub fn link(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        target: ObjectHandle,
        name: &[u8],
    ) -> VfsResult<()> {
        let name = self.name(name, "fs.link")?;
        debug!("link: parent={} target={} name={:?}", parent, target, name);
        let _scope = self.scope()?;
        let dir = self.resolve_dir(parent, "fs.link")?;
        let target = self.registry.resolve(target)?;
        if target.file_type() == FileType::Directory {
            return Err(VfsError::new(VfsErrorKind::IsDir, "fs.link"));
        }
        self.store().link(cred, &dir, &target, name)
    }

    pub fn unlink(&self, cred: &Credentials, parent: ObjectHandle, name: &[u8]) -> VfsResult<()> {
        let name = self.name(name, "fs.unlink")?;
        debug!("unlink: parent={} name={:?}", parent, name);
        let _scope = self.scope()?;
        let dir = self.resolve_dir(parent, "fs.unlink")?;
        self.store().remove(cred, &dir, name, RemoveKind::File)
    }

    pub fn rmdir(&self, cred: &Credentials, parent: ObjectHandle, name: &[u8]) -> VfsResult<()> {
        let name = self.name(name, "fs.rmdir")?;
        debug!("rmdir: parent={} name={:?}", parent, name);
        let _scope = self.scope()?;
        let dir = self.resolve_dir(parent, "fs.rmdir")?;
        self.store()
            .remove(cred, &dir, name, RemoveKind::Directory)
            .map_err(|err| match err.kind() {
                VfsErrorKind::AlreadyExists => VfsError::new(VfsErrorKind::DirNotEmpty, "fs.rmdir"),
                _ => err,
            })
    }

    pub fn rename(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        name: &[u8],
        new_parent: ObjectHandle,
        new_name: &[u8],
    ) -> VfsResult<()> {
        let name = self.name(name, "fs.rename")?;
        let new_name = self.name(new_name, "fs.rename")?;
        debug!(
            "rename: {}/{:?} -> {}/{:?}",
            parent, name, new_parent, new_name
        );
        let _scope = self.scope()?;
        let from_dir = self.resolve_dir(parent, "fs.rename")?;
        let to_dir = self.resolve_dir(new_parent, "fs.rename")?;
        self.store()
            .rename(cred, &from_dir, name, &to_dir, new_name)
    }

    pub fn truncate(&self, cred: &Credentials, handle: ObjectHandle, size: u64) -> VfsResult<()> {
        debug!("truncate: {} size={}", handle, size);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        if live.file_type() == FileType::Directory {
            return Err(VfsError::new(VfsErrorKind::IsDir, "fs.truncate"));
        }
        self.store()
            .set_attributes(cred, &live, &SetAttr::default().size(size))?;
        Ok(())
    }

    pub fn get_attributes(&self, cred: &Credentials, handle: ObjectHandle) -> VfsResult<Stat> {
        debug!("get_attributes: {}", handle);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        self.store().get_attributes(cred, &live)
    }

    /// Apply the fields of `set` selected by its mask and return the new
    /// attributes.
    pub fn set_attributes(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
        set: &SetAttr,
    ) -> VfsResult<Stat> {
        debug!("set_attributes: {} mask={:?}", handle, set.mask);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        if set.mask.is_empty() {
            return self.store().get_attributes(cred, &live);
        }
        self.store().set_attributes(cred, &live, set)
    }

    /// Read up to `max` entries starting at `cursor`.
    pub fn read_dir(
        &self,
        session: &Session,
        cursor: DirCursor,
        flags: DirIterFlags,
        max: usize,
    ) -> VfsResult<ReadDirBatch> {
        debug!("read_dir: {} cursor={:?} max={}", session.handle(), cursor, max);
        require_dir(session.live(), "fs.read_dir")?;
        let _scope = self.scope()?;
        DirEngine::new(&self.registry, session.credentials(), session.live())
            .collect(cursor, flags, max)
    }

    /// Fill `entries` starting at `cursor`. If the directory ends before the
    /// slice is full, the slot after the last entry gets an empty name and
    /// the returned cursor is [`DirCursor::START`].
    pub fn read_dir_into(
        &self,
        session: &Session,
        cursor: DirCursor,
        flags: DirIterFlags,
        entries: &mut [DirEntry],
    ) -> VfsResult<ReadDirOutcome> {
        debug!(
            "read_dir_into: {} cursor={:?} slots={}",
            session.handle(),
            cursor,
            entries.len()
        );
        require_dir(session.live(), "fs.read_dir_into")?;
        let _scope = self.scope()?;
        DirEngine::new(&self.registry, session.credentials(), session.live())
            .fill(cursor, flags, entries)
    }

    /// Visit entries starting at `cursor` until the end of the directory or
    /// until `visit` stops or fails.
    pub fn iterate_dir<F>(
        &self,
        session: &Session,
        cursor: DirCursor,
        flags: DirIterFlags,
        visit: F,
    ) -> VfsResult<DirIterOutcome>
    where
        F: FnMut(&DirIterEntry<'_>) -> VfsResult<DirIterControl>,
    {
        debug!(
            "iterate_dir: {} cursor={:?} flags={:?}",
            session.handle(),
            cursor,
            flags
        );
        require_dir(session.live(), "fs.iterate_dir")?;
        let _scope = self.scope()?;
        DirEngine::new(&self.registry, session.credentials(), session.live())
            .iterate(cursor, flags, visit)
    }

    pub fn list_xattrs(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
    ) -> VfsResult<Vec<VfsNameBuf>> {
        let mut names = Vec::new();
        self.iterate_xattrs(cred, handle, |name| {
            names.push(name.to_buf());
            Ok(())
        })?;
        Ok(names)
    }

    pub fn iterate_xattrs<F>(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
        mut visit: F,
    ) -> VfsResult<()>
    where
        F: FnMut(VfsName<'_>) -> VfsResult<()>,
    {
        debug!("iterate_xattrs: {}", handle);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        let Some(attrs) = self.store().attr_dir(cred, &live, false)? else {
            return Ok(());
        };
        let attrs = self.adopt(attrs);
        DirEngine::new(&self.registry, cred, &attrs).iterate(
            DirCursor::START,
            DirIterFlags::SKIP_DOTS,
            |entry| {
                visit(entry.name)?;
                Ok(DirIterControl::Continue)
            },
        )?;
        Ok(())
    }

    pub fn get_xattr(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
        key: &[u8],
    ) -> VfsResult<Vec<u8>> {
        let key = self.name(key, "fs.get_xattr")?;
        debug!("get_xattr: {} key={:?}", handle, key);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        let Some(attrs) = self.store().attr_dir(cred, &live, false)? else {
            return Err(VfsError::new(VfsErrorKind::NotFound, "fs.get_xattr"));
        };
        let attrs = self.adopt(attrs);
        let value = self.adopt(self.store().lookup_child(cred, &attrs, key)?);
        let size = self.store().get_attributes(cred, &value)?.size;

        let mut buf = value_buffer(size, "fs.get_xattr")?;
        let mut filled = 0;
        while filled < buf.len() {
            let read = self
                .store()
                .read(cred, &value, filled as u64, &mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn set_xattr(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
        key: &[u8],
        value: &[u8],
    ) -> VfsResult<()> {
        let key = self.name(key, "fs.set_xattr")?;
        debug!("set_xattr: {} key={:?} len={}", handle, key, value.len());
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        let Some(attrs) = self.store().attr_dir(cred, &live, true)? else {
            return Err(VfsError::new(VfsErrorKind::NotSupported, "fs.set_xattr"));
        };
        let attrs = self.adopt(attrs);
        let slot = match self.store().lookup_child(cred, &attrs, key) {
            Ok(object) => self.adopt(object),
            Err(err) if err.kind() == VfsErrorKind::NotFound => self.adopt(
                self.store()
                    .create_child(cred, &attrs, key, NewObject::File { perm: 0o660 })?,
            ),
            Err(err) => return Err(err),
        };
        self.store()
            .set_attributes(cred, &slot, &SetAttr::default().size(0))?;
        let mut written = 0;
        while written < value.len() {
            let count = self
                .store()
                .write(cred, &slot, written as u64, &value[written..])?;
            if count == 0 {
                return Err(VfsError::new(VfsErrorKind::Storage(0), "fs.set_xattr"));
            }
            written += count;
        }
        Ok(())
    }

    pub fn remove_xattr(
        &self,
        cred: &Credentials,
        handle: ObjectHandle,
        key: &[u8],
    ) -> VfsResult<()> {
        let key = self.name(key, "fs.remove_xattr")?;
        debug!("remove_xattr: {} key={:?}", handle, key);
        let _scope = self.scope()?;
        let live = self.registry.resolve(handle)?;
        let Some(attrs) = self.store().attr_dir(cred, &live, false)? else {
            return Err(VfsError::new(VfsErrorKind::NotFound, "fs.remove_xattr"));
        };
        let attrs = self.adopt(attrs);
        self.store().remove(cred, &attrs, key, RemoveKind::File)
    }

    fn create_child(
        &self,
        cred: &Credentials,
        parent: ObjectHandle,
        name: &[u8],
        new: NewObject<'_>,
        context: &'static str,
    ) -> VfsResult<ObjectHandle> {
        let name = self.name(name, context)?;
        debug!("{}: parent={} name={:?}", context, parent, name);
        let _scope = self.scope()?;
        let dir = self.resolve_dir(parent, context)?;
        let child = self.adopt(self.store().create_child(cred, &dir, name, new)?);
        Ok(HandleRegistry::mint(&child))
    }

    fn open_live(
        &self,
        cred: &Credentials,
        live: LiveRef,
        flags: OpenFlags,
        check_access: bool,
    ) -> VfsResult<Session> {
        let is_dir = live.file_type() == FileType::Directory;
        if flags.contains(OpenFlags::DIRECTORY) && !is_dir {
            return Err(VfsError::new(VfsErrorKind::NotDir, "fs.open"));
        }
        if is_dir && flags.intersects(OpenFlags::WRITE | OpenFlags::TRUNC | OpenFlags::APPEND) {
            return Err(VfsError::new(VfsErrorKind::IsDir, "fs.open"));
        }
        if check_access {
            let mask = AccessMask::from_open_flags(flags);
            if !mask.is_empty() {
                self.store().access(cred, &live, mask)?;
            }
        }

        self.store().open(cred, &live, flags)?;
        if flags.contains(OpenFlags::TRUNC) && flags.contains(OpenFlags::WRITE) {
            if let Err(err) = self
                .store()
                .set_attributes(cred, &live, &SetAttr::default().size(0))
            {
                let _ = self.store().close(cred, &live, flags);
                return Err(err);
            }
        }
        Ok(Session::new(live, flags, cred.clone()))
    }

    fn resolve_dir(&self, handle: ObjectHandle, context: &'static str) -> VfsResult<LiveRef> {
        let live = self.registry.resolve(handle)?;
        require_dir(&live, context)?;
        Ok(live)
    }

    fn adopt(&self, object: LiveObject) -> LiveRef {
        LiveRef::adopt(self.store(), object)
    }

    fn scope(&self) -> VfsResult<OpScope<'_>> {
        OpScope::enter(&**self.store())
    }

    fn name<'n>(&self, bytes: &'n [u8], context: &'static str) -> VfsResult<VfsName<'n>> {
        VfsName::new(bytes, self.config.max_name_len).map_err(|err| err.with_context(context))
    }
}

fn require_dir(live: &LiveRef, context: &'static str) -> VfsResult<()> {
    if live.file_type() != FileType::Directory {
        return Err(VfsError::new(VfsErrorKind::NotDir, context));
    }
    Ok(())
}

/// Zeroed buffer for a value of `size` bytes as reported by the store.
fn value_buffer(size: u64, context: &'static str) -> VfsResult<Vec<u8>> {
    let invalid = || VfsError::new(VfsErrorKind::InvalidInput, context);
    let len = usize::try_from(size).map_err(|_| invalid())?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| invalid())?;
    buf.resize(len, 0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_buffer_matches_reported_size() {
        let buf = value_buffer(12, "test").unwrap();
        assert_eq!(buf, vec![0; 12]);
    }

    #[test]
    fn unrepresentable_value_size_is_rejected() {
        let err = value_buffer(u64::MAX, "fs.get_xattr").unwrap_err();
        assert_eq!(err.kind(), VfsErrorKind::InvalidInput);
        assert_eq!(err.context(), "fs.get_xattr");
    }
}
