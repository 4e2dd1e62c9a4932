//! Object store interface.
//!
//! The store owns the object table, its reference counts and the actual
//! data. This crate only ever reaches it by numeric [`ObjectId`] and through
//! [`LiveObject`] tokens the store hands out. Every token returned by
//! [`ObjectStore::acquire`], [`ObjectStore::lookup_child`],
//! [`ObjectStore::create_child`] or [`ObjectStore::attr_dir`] counts as one
//! live reference and must be given back through [`ObjectStore::release`]
//! exactly once; [`LiveRef`] does that on drop.

use crate::{
    AccessMask, Credentials, FileType, Generation, ObjectHandle, ObjectId, OpenFlags, SetAttr,
    Stat, StatVfs, VfsName, VfsNameBuf, VfsResult,
};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A live reference handed out by a store.
///
/// Deliberately neither `Clone` nor `Copy`: each value is one reference.
#[derive(Debug, PartialEq, Eq)]
pub struct LiveObject {
    id: ObjectId,
    generation: Generation,
    file_type: FileType,
}

impl LiveObject {
    /// Only stores construct these, and only when taking a reference.
    pub fn new(id: ObjectId, generation: Generation, file_type: FileType) -> Self {
        Self {
            id,
            generation,
            file_type,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Generation of the object as of when the reference was taken.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }
}

/// What to create in [`ObjectStore::create_child`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewObject<'a> {
    File { perm: u32 },
    Directory { perm: u32 },
    Symlink { target: &'a [u8] },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveKind {
    /// Any non-directory.
    File,
    /// An empty directory. A non-empty one fails with `AlreadyExists`.
    Directory,
}

/// One entry of a raw directory read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDirEntry {
    pub name: VfsNameBuf,
    pub id: ObjectId,
    pub file_type: FileType,
    /// Position of this entry; reading from here returns it again.
    pub offset: u64,
    /// Position of the entry after this one.
    pub next: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawDirBatch {
    pub entries: SmallVec<[RawDirEntry; 8]>,
    /// No entries exist past the last one in `entries`.
    pub eof: bool,
}

pub trait ObjectStore: Send + Sync + 'static {
    /// Well-known id of the filesystem root.
    fn root_id(&self) -> ObjectId;

    /// Enter the store's consistency scope for one public operation.
    fn enter(&self) -> VfsResult<()> {
        Ok(())
    }

    /// Leave the scope entered by a successful [`ObjectStore::enter`].
    fn exit(&self) {}

    /// Take a reference to the object at `id`. `NotFound` if there is none.
    fn acquire(&self, id: ObjectId) -> VfsResult<LiveObject>;

    fn release(&self, object: LiveObject);

    fn lookup_child(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        name: VfsName<'_>,
    ) -> VfsResult<LiveObject>;

    /// Create `name` in `dir`; `AlreadyExists` if the name is taken.
    fn create_child(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        name: VfsName<'_>,
        new: NewObject<'_>,
    ) -> VfsResult<LiveObject>;

    fn link(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        target: &LiveObject,
        name: VfsName<'_>,
    ) -> VfsResult<()>;

    fn remove(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        name: VfsName<'_>,
        kind: RemoveKind,
    ) -> VfsResult<()>;

    fn rename(
        &self,
        cred: &Credentials,
        from_dir: &LiveObject,
        from_name: VfsName<'_>,
        to_dir: &LiveObject,
        to_name: VfsName<'_>,
    ) -> VfsResult<()>;

    fn read_link(&self, cred: &Credentials, object: &LiveObject) -> VfsResult<Vec<u8>>;

    /// Read entries starting at position `cursor`.
    fn read_dir_raw(
        &self,
        cred: &Credentials,
        dir: &LiveObject,
        cursor: u64,
    ) -> VfsResult<RawDirBatch>;

    fn get_attributes(&self, cred: &Credentials, object: &LiveObject) -> VfsResult<Stat>;

    fn set_attributes(
        &self,
        cred: &Credentials,
        object: &LiveObject,
        set: &SetAttr,
    ) -> VfsResult<Stat>;

    fn access(&self, cred: &Credentials, object: &LiveObject, mask: AccessMask) -> VfsResult<()>;

    fn open(&self, _cred: &Credentials, _object: &LiveObject, _flags: OpenFlags) -> VfsResult<()> {
        Ok(())
    }

    fn close(&self, _cred: &Credentials, _object: &LiveObject, _flags: OpenFlags) -> VfsResult<()> {
        Ok(())
    }

    fn read(
        &self,
        cred: &Credentials,
        object: &LiveObject,
        offset: u64,
        buf: &mut [u8],
    ) -> VfsResult<usize>;

    fn write(
        &self,
        cred: &Credentials,
        object: &LiveObject,
        offset: u64,
        buf: &[u8],
    ) -> VfsResult<usize>;

    /// Turn `[offset, offset + len)` into zeroes without changing the size,
    /// except that a range running past the end extends the file.
    fn zero_range(
        &self,
        cred: &Credentials,
        object: &LiveObject,
        offset: u64,
        len: u64,
    ) -> VfsResult<()>;

    /// The hidden directory holding `object`'s extended attributes.
    /// `Ok(None)` when it does not exist and `create` is false.
    fn attr_dir(
        &self,
        cred: &Credentials,
        object: &LiveObject,
        create: bool,
    ) -> VfsResult<Option<LiveObject>>;

    fn statfs(&self) -> VfsResult<StatVfs>;
}

/// Scoped live reference: releases itself exactly once on drop.
pub struct LiveRef {
    store: Arc<dyn ObjectStore>,
    object: Option<LiveObject>,
}

impl LiveRef {
    /// Take ownership of a reference the store just handed out.
    pub fn adopt(store: &Arc<dyn ObjectStore>, object: LiveObject) -> Self {
        Self {
            store: store.clone(),
            object: Some(object),
        }
    }

    pub fn object(&self) -> &LiveObject {
        // Only `Drop` empties the slot.
        self.object
            .as_ref()
            .expect("live reference used after release")
    }

    pub fn id(&self) -> ObjectId {
        self.object().id()
    }

    pub fn generation(&self) -> Generation {
        self.object().generation()
    }

    pub fn file_type(&self) -> FileType {
        self.object().file_type()
    }

    pub fn handle(&self) -> ObjectHandle {
        ObjectHandle::new(self.id(), self.generation())
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

impl std::ops::Deref for LiveRef {
    type Target = LiveObject;

    fn deref(&self) -> &LiveObject {
        self.object()
    }
}

impl Drop for LiveRef {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            self.store.release(object);
        }
    }
}

impl fmt::Debug for LiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveRef")
            .field("object", &self.object)
            .finish()
    }
}

/// Store consistency scope held for the duration of one public operation.
pub(crate) struct OpScope<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> OpScope<'a> {
    pub(crate) fn enter(store: &'a dyn ObjectStore) -> VfsResult<Self> {
        store.enter()?;
        Ok(Self { store })
    }
}

impl Drop for OpScope<'_> {
    fn drop(&mut self) {
        self.store.exit();
    }
}
