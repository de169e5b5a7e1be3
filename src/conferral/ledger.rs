//! Dedup/transfer ledger: the set of record keys currently consumed by a
//! confirmed match

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::types::RecordKey;

/// Set of record keys reserved by confirmed matches.
///
/// The ledger is the only genuinely shared mutable state in the core, so
/// all mutation goes through a single mutex. It is a pure set abstraction:
/// it does not know why a key was reserved; the conferral session pairs
/// reservation with `ConferredItem` creation and removal.
///
/// Cloning the handle shares the underlying set, so a session and its
/// matchers can observe the same reservations.
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    reserved: Arc<Mutex<HashSet<RecordKey>>>,
}

impl DedupLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a key. Returns `false` when the key is already reserved: of
    /// two racing confirmation attempts, exactly one sees `true`.
    pub fn reserve(&self, key: &RecordKey) -> bool {
        self.reserved.lock().unwrap().insert(key.clone())
    }

    /// Release a key. Releasing an unreserved key is a no-op.
    pub fn release(&self, key: &RecordKey) {
        self.reserved.lock().unwrap().remove(key);
    }

    /// Whether a key is currently reserved
    pub fn is_reserved(&self, key: &RecordKey) -> bool {
        self.reserved.lock().unwrap().contains(key)
    }

    /// Number of currently reserved keys
    pub fn reserved_count(&self) -> usize {
        self.reserved.lock().unwrap().len()
    }
}
