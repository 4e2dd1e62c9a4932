//! Single path component names.
//!
//! Names are raw bytes: the store decides nothing about encoding. A valid
//! name is non-empty, contains neither `/` nor NUL, and fits within
//! [`VfsConfig::max_name_len`](crate::VfsConfig::max_name_len).

use crate::{VfsError, VfsErrorKind, VfsResult};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VfsName<'a>(&'a [u8]);

impl<'a> VfsName<'a> {
    /// Validate `bytes` as a single component no longer than `max_len`.
    pub fn new(bytes: &'a [u8], max_len: usize) -> VfsResult<Self> {
        if bytes.is_empty() || bytes.iter().any(|b| *b == b'/' || *b == 0) {
            return Err(VfsError::new(VfsErrorKind::InvalidInput, "name.validate"));
        }
        if bytes.len() > max_len {
            return Err(VfsError::new(VfsErrorKind::NameTooLong, "name.validate"));
        }
        Ok(Self(bytes))
    }

    /// Wrap bytes a store already vouches for (e.g. its own directory entries).
    pub const fn from_store(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `.` or `..`
    pub fn is_dot_or_dotdot(&self) -> bool {
        matches!(self.0, b"." | b"..")
    }

    pub fn to_buf(&self) -> VfsNameBuf {
        VfsNameBuf(self.0.to_vec())
    }
}

impl fmt::Debug for VfsName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.0))
    }
}

/// Owned name. An empty `VfsNameBuf` is the end-of-batch sentinel written by
/// [`Filesystem::read_dir_into`](crate::Filesystem::read_dir_into).
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VfsNameBuf(Vec<u8>);

impl VfsNameBuf {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_name(&self) -> VfsName<'_> {
        VfsName(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn set(&mut self, bytes: &[u8]) {
        self.0.clear();
        self.0.extend_from_slice(bytes);
    }
}

impl fmt::Debug for VfsNameBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_name().fmt(f)
    }
}

impl From<&str> for VfsNameBuf {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl PartialEq<&str> for VfsNameBuf {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_separators_and_nul() {
        assert_eq!(
            VfsName::new(b"a/b", 255).unwrap_err().kind(),
            VfsErrorKind::InvalidInput
        );
        assert_eq!(
            VfsName::new(b"a\0b", 255).unwrap_err().kind(),
            VfsErrorKind::InvalidInput
        );
        assert_eq!(
            VfsName::new(b"", 255).unwrap_err().kind(),
            VfsErrorKind::InvalidInput
        );
    }

    #[test]
    fn enforces_length_bound() {
        let long = vec![b'x'; 256];
        assert_eq!(
            VfsName::new(&long, 255).unwrap_err().kind(),
            VfsErrorKind::NameTooLong
        );
        assert!(VfsName::new(&long[..255], 255).is_ok());
    }

    #[test]
    fn recognises_dot_entries() {
        assert!(VfsName::from_store(b".").is_dot_or_dotdot());
        assert!(VfsName::from_store(b"..").is_dot_or_dotdot());
        assert!(!VfsName::from_store(b"...").is_dot_or_dotdot());
        assert!(!VfsName::from_store(b".hidden").is_dot_or_dotdot());
    }
}
