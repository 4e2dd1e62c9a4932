use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store entry points, for call accounting and fault injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Enter,
    Acquire,
    Release,
    LookupChild,
    CreateChild,
    Link,
    Remove,
    Rename,
    ReadLink,
    ReadDirRaw,
    GetAttributes,
    SetAttributes,
    Access,
    Open,
    Close,
    Read,
    Write,
    ZeroRange,
    AttrDir,
    Statfs,
}

#[derive(Debug, Default)]
pub(crate) struct Accounting {
    calls: Mutex<HashMap<StoreOp, usize>>,
    faults: Mutex<HashMap<StoreOp, i32>>,
    raw_reads: Mutex<Vec<u64>>,
    scope_depth: AtomicUsize,
    refs_taken: AtomicUsize,
}

impl Accounting {
    /// Count a call to `op` and hand back an injected failure code if one
    /// was armed for it.
    pub(crate) fn record(&self, op: StoreOp) -> Option<i32> {
        *self.calls.lock().entry(op).or_default() += 1;
        self.faults.lock().remove(&op)
    }

    pub(crate) fn calls(&self, op: StoreOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub(crate) fn arm(&self, op: StoreOp, code: i32) {
        self.faults.lock().insert(op, code);
    }

    pub(crate) fn log_raw_read(&self, cursor: u64) {
        self.raw_reads.lock().push(cursor);
    }

    pub(crate) fn raw_reads(&self) -> Vec<u64> {
        self.raw_reads.lock().clone()
    }

    pub(crate) fn reset(&self) {
        self.calls.lock().clear();
        self.raw_reads.lock().clear();
        self.refs_taken.store(0, Ordering::SeqCst);
    }

    pub(crate) fn enter_scope(&self) {
        self.scope_depth.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn exit_scope(&self) {
        self.scope_depth.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn took_ref(&self) {
        self.refs_taken.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn refs_taken(&self) -> usize {
        self.refs_taken.load(Ordering::SeqCst)
    }

    pub(crate) fn scope_depth(&self) -> usize {
        self.scope_depth.load(Ordering::SeqCst)
    }
}
