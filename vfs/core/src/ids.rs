//! Core identifier types.

use std::fmt;

/// Store-defined object identity.
///
/// An id is stable for the lifetime of the object it names, but the store
/// may hand the same id to a new object once the old one is gone. Pair it
/// with a [`Generation`] (see [`ObjectHandle`]) to detect that reuse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-slot generation counter.
///
/// Assigned by the store when an object is created; strictly greater than
/// the generation of any earlier object that occupied the same id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Generation(u64);

impl Generation {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Storable, revalidatable reference to a filesystem object.
///
/// Two handles denote the same live object iff both fields are equal. A
/// handle is never mutated; it goes stale when its object is deleted and
/// the id is later reused, which resolution detects through the generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    pub id: ObjectId,
    pub generation: Generation,
}

impl ObjectHandle {
    #[inline]
    pub const fn new(id: ObjectId, generation: Generation) -> Self {
        Self { id, generation }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.generation)
    }
}
