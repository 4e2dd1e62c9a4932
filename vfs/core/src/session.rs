//! Open sessions.

use crate::store::{LiveRef, OpScope};
use crate::{
    AccessMask, Credentials, FileType, ObjectHandle, OpenFlags, Stat, VfsError, VfsErrorKind,
    VfsResult,
};
use bitflags::bitflags;
use std::fmt;
use tracing::{debug, warn};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct HandleAccess: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

impl HandleAccess {
    pub fn from_open_flags(flags: OpenFlags) -> Self {
        let mask = AccessMask::from_open_flags(flags);
        let mut access = HandleAccess::empty();
        if mask.contains(AccessMask::READ) {
            access |= HandleAccess::READ;
        }
        if mask.contains(AccessMask::WRITE) {
            access |= HandleAccess::WRITE;
        }
        access
    }
}

/// An object opened for I/O.
///
/// Holds one live reference from open until close. [`Session::close`]
/// consumes the session; dropping it unclosed closes it as well.
pub struct Session {
    live: LiveRef,
    handle: ObjectHandle,
    flags: OpenFlags,
    access: HandleAccess,
    cred: Credentials,
    closed: bool,
}

impl Session {
    pub(crate) fn new(live: LiveRef, flags: OpenFlags, cred: Credentials) -> Self {
        Self {
            handle: live.handle(),
            access: HandleAccess::from_open_flags(flags),
            live,
            flags,
            cred,
            closed: false,
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn file_type(&self) -> FileType {
        self.live.file_type()
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn credentials(&self) -> &Credentials {
        &self.cred
    }

    pub(crate) fn live(&self) -> &LiveRef {
        &self.live
    }

    pub fn stat(&self) -> VfsResult<Stat> {
        debug!("stat: {}", self.handle);
        let _scope = OpScope::enter(&**self.live.store())?;
        self.live.store().get_attributes(&self.cred, &self.live)
    }

    pub fn read(&self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        debug!("read: {} offset={} len={}", self.handle, offset, buf.len());
        self.require_file("session.read")?;
        self.require_access(HandleAccess::READ, "session.read")?;
        let _scope = OpScope::enter(&**self.live.store())?;
        self.live.store().read(&self.cred, &self.live, offset, buf)
    }

    /// Read until `buf` is full or the end of the object.
    pub fn read_exact_at(&self, mut offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let mut total = 0;
        while total < buf.len() {
            let read = self.read(offset, &mut buf[total..])?;
            if read == 0 {
                break;
            }
            total += read;
            offset += read as u64;
        }
        Ok(total)
    }

    /// Write at `offset`, or at the end of the object for `APPEND` sessions.
    pub fn write(&self, offset: u64, buf: &[u8]) -> VfsResult<usize> {
        debug!("write: {} offset={} len={}", self.handle, offset, buf.len());
        self.require_file("session.write")?;
        self.require_access(HandleAccess::WRITE, "session.write")?;
        let store = self.live.store();
        let _scope = OpScope::enter(&**store)?;
        let offset = if self.flags.contains(OpenFlags::APPEND) {
            let size = store.get_attributes(&self.cred, &self.live)?.size;
            size.checked_add(offset).ok_or_else(|| {
                VfsError::new(VfsErrorKind::InvalidInput, "session.write")
            })?
        } else {
            offset
        };
        store.write(&self.cred, &self.live, offset, buf)
    }

    pub fn zero(&self, offset: u64, len: u64) -> VfsResult<()> {
        debug!("zero: {} offset={} len={}", self.handle, offset, len);
        self.require_file("session.zero")?;
        self.require_access(HandleAccess::WRITE, "session.zero")?;
        let _scope = OpScope::enter(&**self.live.store())?;
        self.live
            .store()
            .zero_range(&self.cred, &self.live, offset, len)
    }

    pub fn close(mut self) -> VfsResult<()> {
        debug!("close: {}", self.handle);
        self.closed = true;
        self.close_in_store()
        // The live reference is released when `self` drops.
    }

    fn close_in_store(&self) -> VfsResult<()> {
        let store = self.live.store();
        let _scope = OpScope::enter(&**store)?;
        store.close(&self.cred, &self.live, self.flags)
    }

    fn require_file(&self, context: &'static str) -> VfsResult<()> {
        if self.file_type() == FileType::Directory {
            return Err(VfsError::new(VfsErrorKind::IsDir, context));
        }
        Ok(())
    }

    fn require_access(&self, access: HandleAccess, context: &'static str) -> VfsResult<()> {
        if self.access.contains(access) {
            Ok(())
        } else {
            Err(VfsError::new(VfsErrorKind::BadHandle, context))
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.close_in_store() {
                warn!("implicit close of {} failed: {}", self.handle, err);
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("flags", &self.flags)
            .finish()
    }
}
