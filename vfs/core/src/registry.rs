//! Conversion between stored [`ObjectHandle`]s and live store references.
//!
//! Checking and minting are separate operations on purpose: [`HandleRegistry::resolve`]
//! compares a caller's generation against the live one, [`HandleRegistry::mint`]
//! reads the live one out. [`HandleRegistry::resolve_unchecked`] skips the
//! comparison and is reserved for the root and for ids taken straight from
//! a directory entry, where no caller-held generation exists yet.

use crate::store::{LiveRef, ObjectStore};
use crate::{ObjectHandle, ObjectId, VfsConfig, VfsError, VfsErrorKind, VfsResult};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct HandleRegistry {
    store: Arc<dyn ObjectStore>,
    config: Arc<VfsConfig>,
}

impl HandleRegistry {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<VfsConfig>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// Resolve `handle`, refusing any object whose generation differs.
    ///
    /// A missing object and a stale handle both yield `NotFound` unless the
    /// config asks for `Stale` to be reported separately.
    pub fn resolve(&self, handle: ObjectHandle) -> VfsResult<LiveRef> {
        let live = self.acquire(handle.id, "registry.resolve")?;
        if live.generation() != handle.generation {
            debug!(
                "stale handle {}: live generation is {}",
                handle,
                live.generation()
            );
            let kind = if self.config.report_stale {
                VfsErrorKind::Stale
            } else {
                VfsErrorKind::NotFound
            };
            // `live` drops here and gives its reference back.
            return Err(VfsError::new(kind, "registry.resolve"));
        }
        Ok(live)
    }

    /// Resolve `id` without a generation check.
    pub fn resolve_unchecked(&self, id: ObjectId) -> VfsResult<LiveRef> {
        self.acquire(id, "registry.resolve_unchecked")
    }

    pub fn resolve_root(&self) -> VfsResult<LiveRef> {
        self.resolve_unchecked(self.store.root_id())
    }

    /// Package the id and current generation of a held reference.
    pub fn mint(live: &LiveRef) -> ObjectHandle {
        live.handle()
    }

    fn acquire(&self, id: ObjectId, context: &'static str) -> VfsResult<LiveRef> {
        let object = self.store.acquire(id).map_err(|err| match err.kind() {
            VfsErrorKind::NotFound => VfsError::new(VfsErrorKind::NotFound, context),
            _ => err,
        })?;
        Ok(LiveRef::adopt(&self.store, object))
    }
}
