//! Directory iteration engine.
//!
//! Iteration is cursor based and holds nothing between calls: each call
//! starts from the caller's [`DirCursor`], reads raw entries from the store,
//! optionally resolves every entry to learn its generation and attributes,
//! and hands the result to a visitor. When the store reports the end of the
//! directory the returned cursor is reset to [`DirCursor::START`] and `eof`
//! is set, so completion never has to be inferred from the cursor value.

use crate::registry::HandleRegistry;
use crate::store::{LiveObject, RawDirEntry};
use crate::{
    Credentials, DirIterFlags, FileType, Filesystem, Generation, ObjectHandle, ObjectId, Session,
    Stat, VfsError, VfsErrorKind, VfsName, VfsNameBuf, VfsResult,
};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

/// Opaque resumable position within a directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirCursor(u64);

impl DirCursor {
    pub const START: DirCursor = DirCursor(0);

    pub const fn new(position: u64) -> Self {
        Self(position)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: VfsNameBuf,
    pub handle: ObjectHandle,
    pub file_type: FileType,
    pub attributes: Option<Stat>,
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            name: VfsNameBuf::default(),
            handle: ObjectHandle::default(),
            file_type: FileType::RegularFile,
            attributes: None,
        }
    }
}

/// Entry passed to an iteration visitor.
#[derive(Clone, Debug)]
pub struct DirIterEntry<'a> {
    pub name: VfsName<'a>,
    pub id: ObjectId,
    pub file_type: FileType,
    /// Present when iterating with `GENERATION` or `ATTRIBUTES`.
    pub generation: Option<Generation>,
    pub attributes: Option<Stat>,
    /// Position of this entry in the directory.
    pub offset: u64,
    /// The store reported nothing after this entry.
    pub last: bool,
}

impl DirIterEntry<'_> {
    pub fn handle(&self) -> Option<ObjectHandle> {
        self.generation
            .map(|generation| ObjectHandle::new(self.id, generation))
    }
}

/// Visitor verdict for one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirIterControl {
    Continue,
    /// The directory changed under the visitor: start over from the cursor
    /// the call was given.
    Invalidate,
    /// End the call without consuming this entry.
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirIterOutcome {
    pub cursor: DirCursor,
    pub eof: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadDirOutcome {
    /// Number of leading slots written.
    pub filled: usize,
    pub cursor: DirCursor,
    pub eof: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadDirBatch {
    pub entries: SmallVec<[DirEntry; 16]>,
    pub cursor: DirCursor,
    pub eof: bool,
}

pub(crate) struct DirEngine<'a> {
    registry: &'a HandleRegistry,
    cred: &'a Credentials,
    dir: &'a LiveObject,
}

impl<'a> DirEngine<'a> {
    pub(crate) fn new(
        registry: &'a HandleRegistry,
        cred: &'a Credentials,
        dir: &'a LiveObject,
    ) -> Self {
        Self { registry, cred, dir }
    }

    pub(crate) fn iterate<F>(
        &self,
        cursor: DirCursor,
        flags: DirIterFlags,
        mut visit: F,
    ) -> VfsResult<DirIterOutcome>
    where
        F: FnMut(&DirIterEntry<'_>) -> VfsResult<DirIterControl>,
    {
        let store = self.registry.store();
        let max_retries = self.registry.config().max_invalidate_retries;
        let start = cursor.get();
        let mut position = start;
        let mut retries = 0u32;

        'read: loop {
            trace!("read_dir_raw: dir={} position={}", self.dir.id(), position);
            let batch = store.read_dir_raw(self.cred, self.dir, position)?;
            let count = batch.entries.len();

            for (index, raw) in batch.entries.iter().enumerate() {
                if flags.contains(DirIterFlags::SKIP_DOTS) && raw.name.as_name().is_dot_or_dotdot()
                {
                    position = raw.next;
                    continue;
                }

                let last = batch.eof && index + 1 == count;
                let Some(entry) = self.describe(raw, flags, last)? else {
                    position = raw.next;
                    continue;
                };
                match visit(&entry)? {
                    DirIterControl::Continue => position = raw.next,
                    DirIterControl::Invalidate => {
                        retries += 1;
                        if retries > max_retries {
                            warn!(
                                "directory {} invalidated {} times reading from {}, giving up",
                                self.dir.id(),
                                retries,
                                start
                            );
                            return Err(VfsError::new(VfsErrorKind::RetryLimit, "dir.iterate"));
                        }
                        debug!(
                            "directory {} invalidated at position {}, reading again from {}",
                            self.dir.id(),
                            raw.offset,
                            start
                        );
                        position = start;
                        continue 'read;
                    }
                    DirIterControl::Stop => {
                        return Ok(DirIterOutcome {
                            cursor: DirCursor(raw.offset),
                            eof: false,
                        });
                    }
                }
            }

            if batch.eof || count == 0 {
                return Ok(DirIterOutcome {
                    cursor: DirCursor::START,
                    eof: true,
                });
            }
        }
    }

    /// Fill leading slots of `entries`. When the directory ends first, the
    /// name of the slot after the last one written is cleared.
    pub(crate) fn fill(
        &self,
        cursor: DirCursor,
        flags: DirIterFlags,
        entries: &mut [DirEntry],
    ) -> VfsResult<ReadDirOutcome> {
        let mut filled = 0;
        let outcome = self.iterate(cursor, flags | DirIterFlags::GENERATION, |entry| {
            let Some(slot) = entries.get_mut(filled) else {
                return Ok(DirIterControl::Stop);
            };
            store_entry(slot, entry);
            filled += 1;
            Ok(DirIterControl::Continue)
        })?;

        if let Some(sentinel) = entries.get_mut(filled) {
            sentinel.name.clear();
        }
        Ok(ReadDirOutcome {
            filled,
            cursor: outcome.cursor,
            eof: outcome.eof,
        })
    }

    pub(crate) fn collect(
        &self,
        cursor: DirCursor,
        flags: DirIterFlags,
        max: usize,
    ) -> VfsResult<ReadDirBatch> {
        let mut entries: SmallVec<[DirEntry; 16]> = SmallVec::new();
        let outcome = self.iterate(cursor, flags | DirIterFlags::GENERATION, |entry| {
            if entries.len() == max {
                return Ok(DirIterControl::Stop);
            }
            let mut slot = DirEntry::default();
            store_entry(&mut slot, entry);
            entries.push(slot);
            Ok(DirIterControl::Continue)
        })?;
        Ok(ReadDirBatch {
            entries,
            cursor: outcome.cursor,
            eof: outcome.eof,
        })
    }

    fn describe<'r>(
        &self,
        raw: &'r RawDirEntry,
        flags: DirIterFlags,
        last: bool,
    ) -> VfsResult<Option<DirIterEntry<'r>>> {
        let max_name_len = self.registry.config().max_name_len;
        if raw.name.len() > max_name_len {
            return Err(VfsError::new(VfsErrorKind::NameTooLong, "dir.entry"));
        }

        let mut entry = DirIterEntry {
            name: raw.name.as_name(),
            id: raw.id,
            file_type: raw.file_type,
            generation: None,
            attributes: None,
            offset: raw.offset,
            last,
        };
        if flags.intersects(DirIterFlags::GENERATION | DirIterFlags::ATTRIBUTES) {
            // The entry carries no generation of its own, so the live one is
            // read out rather than checked. An entry removed since the raw
            // read is skipped.
            let live = match self.registry.resolve_unchecked(raw.id) {
                Ok(live) => live,
                Err(err) if err.kind() == VfsErrorKind::NotFound => {
                    debug!("dir entry {} vanished during listing", raw.id);
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };
            entry.generation = Some(HandleRegistry::mint(&live).generation);
            entry.file_type = live.file_type();
            if flags.contains(DirIterFlags::ATTRIBUTES) {
                entry.attributes = Some(self.registry.store().get_attributes(self.cred, &live)?);
            }
        }
        Ok(Some(entry))
    }
}

fn store_entry(slot: &mut DirEntry, entry: &DirIterEntry<'_>) {
    slot.name.set(entry.name.as_bytes());
    slot.handle = ObjectHandle::new(entry.id, entry.generation.unwrap_or_default());
    slot.file_type = entry.file_type;
    slot.attributes = entry.attributes;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirStreamState {
    #[default]
    Idle,
    Iterating,
    Done,
}

/// Caller-side iteration state over repeated [`Filesystem::read_dir_into`]
/// calls. Reading again after `Done` starts over from the first entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirStream {
    cursor: DirCursor,
    state: DirStreamState,
    flags: DirIterFlags,
}

impl DirStream {
    pub fn new(flags: DirIterFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    pub fn state(&self) -> DirStreamState {
        self.state
    }

    pub fn cursor(&self) -> DirCursor {
        self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.state == DirStreamState::Done
    }

    /// Fill `entries` with the next batch and return how many were written.
    pub fn read(
        &mut self,
        fs: &Filesystem,
        session: &Session,
        entries: &mut [DirEntry],
    ) -> VfsResult<usize> {
        if self.state == DirStreamState::Done {
            self.cursor = DirCursor::START;
        }
        self.state = DirStreamState::Iterating;

        let outcome = fs.read_dir_into(session, self.cursor, self.flags, entries)?;
        self.cursor = outcome.cursor;
        if outcome.eof {
            self.state = DirStreamState::Done;
        }
        Ok(outcome.filled)
    }
}
