//! Request record storage for the sliding-window limiter.
//!
//! # Locking
//! - `ShardedStore`: per-shard locks via `DashMap`. Two requests for the same
//!   key serialize on that key's shard; unrelated keys rarely contend.
//! - `GlobalLockStore`: one `Mutex` around the whole map. Every request
//!   serializes on it, which makes it a contention point under load.
//!
//! Either way `with_record` gives the closure exclusive access to one record
//! for its whole duration, so read-prune-append is atomic per key.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::governance::ClientKey;

/// Timestamps of admitted requests for one client, in admission order.
///
/// Admission order is not always timestamp order: a request stamped earlier
/// can reach the record after a later one. Nothing here relies on the queue
/// being sorted.
#[derive(Debug, Clone, Default)]
pub struct RequestRecord {
    admitted: VecDeque<Instant>,
}

impl RequestRecord {
    /// Drop every timestamp at or before `now - window`.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        self.admitted
            .retain(|at| now.saturating_duration_since(*at) < window);
    }

    pub fn push(&mut self, at: Instant) {
        self.admitted.push_back(at);
    }

    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }

    pub fn oldest(&self) -> Option<Instant> {
        self.admitted.iter().min().copied()
    }
}

/// Shared map of client key to request record.
pub trait RecordStore: Send + Sync + Debug {
    /// Run `f` with exclusive access to the key's record, creating it if absent.
    fn with_record(&self, key: &ClientKey, f: &mut dyn FnMut(&mut RequestRecord));

    /// Keep only the records for which `keep` returns true.
    fn retain(&self, keep: &mut dyn FnMut(&mut RequestRecord) -> bool);

    /// Number of records currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct ShardedStore {
    records: DashMap<ClientKey, RequestRecord>,
}

impl ShardedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for ShardedStore {
    fn with_record(&self, key: &ClientKey, f: &mut dyn FnMut(&mut RequestRecord)) {
        if let Some(mut record) = self.records.get_mut(key) {
            f(&mut *record);
            return;
        }
        let mut record = self.records.entry(key.clone()).or_default();
        f(&mut *record);
    }

    fn retain(&self, keep: &mut dyn FnMut(&mut RequestRecord) -> bool) {
        self.records.retain(|_, record| keep(record));
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Default)]
pub struct GlobalLockStore {
    records: Mutex<HashMap<ClientKey, RequestRecord>>,
}

impl GlobalLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientKey, RequestRecord>> {
        // Records stay consistent across a panicking closure.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordStore for GlobalLockStore {
    fn with_record(&self, key: &ClientKey, f: &mut dyn FnMut(&mut RequestRecord)) {
        let mut records = self.lock();
        let record = records.entry(key.clone()).or_default();
        f(record);
    }

    fn retain(&self, keep: &mut dyn FnMut(&mut RequestRecord) -> bool) {
        self.lock().retain(|_, record| keep(record));
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_boundary_is_expired() {
        let start = Instant::now();
        let window = Duration::from_secs(60);
        let mut record = RequestRecord::default();
        record.push(start);
        record.push(start + Duration::from_secs(1));

        record.prune(start + Duration::from_secs(59), window);
        assert_eq!(record.len(), 2);

        record.prune(start + window, window);
        assert_eq!(record.len(), 1);
        assert_eq!(record.oldest(), Some(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_prune_drops_expired_entries_behind_live_ones() {
        let start = Instant::now();
        let window = Duration::from_secs(60);
        let mut record = RequestRecord::default();
        record.push(start + Duration::from_secs(5));
        record.push(start);

        record.prune(start + window, window);
        assert_eq!(record.len(), 1);
        assert_eq!(record.oldest(), Some(start + Duration::from_secs(5)));
    }

    fn exercise(store: &dyn RecordStore) {
        let now = Instant::now();
        let a = ClientKey::from("a");
        let b = ClientKey::from("b");

        store.with_record(&a, &mut |r| r.push(now));
        store.with_record(&a, &mut |r| r.push(now));
        store.with_record(&b, &mut |_| {});
        assert_eq!(store.len(), 2);

        let mut seen = 0;
        store.with_record(&a, &mut |r| seen = r.len());
        assert_eq!(seen, 2);

        store.retain(&mut |r| !r.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sharded_store() {
        exercise(&ShardedStore::new());
    }

    #[test]
    fn test_global_lock_store() {
        exercise(&GlobalLockStore::new());
    }
}
