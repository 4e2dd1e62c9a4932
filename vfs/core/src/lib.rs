//! Handle-based object filesystem layer.
//!
//! Callers hold [`ObjectHandle`]s, an object id paired with the generation it
//! had when the handle was issued. Every operation checks that generation
//! against the live object before touching it, so a handle to a deleted and
//! reused slot fails instead of silently reaching the new occupant.

mod attr;
mod context;
mod dir;
mod error;
mod flags;
mod fs;
mod ids;
mod name;
mod registry;
mod session;
mod store;

pub use attr::{AttrMask, FileType, SetAttr, Stat, StatVfs, Timespec};
pub use context::{Credentials, VfsConfig, VfsGid, VfsUid};
pub use dir::{
    DirCursor, DirEntry, DirIterControl, DirIterEntry, DirIterOutcome, DirStream, DirStreamState,
    ReadDirBatch, ReadDirOutcome,
};
pub use error::{VfsError, VfsErrorKind, VfsResult};
pub use flags::{AccessMask, DirIterFlags, OpenFlags};
pub use fs::{Filesystem, OpenOutcome};
pub use ids::{Generation, ObjectHandle, ObjectId};
pub use name::{VfsName, VfsNameBuf};
pub use registry::HandleRegistry;
pub use session::{HandleAccess, Session};
pub use store::{LiveObject, LiveRef, NewObject, ObjectStore, RawDirBatch, RawDirEntry, RemoveKind};
