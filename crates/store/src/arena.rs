//! Per-key lock arena with published snapshots.
//!
//! Writers serialize on a per-key `tokio::sync::Mutex`; unrelated keys never
//! contend. When a writer's guard drops, the value is published as an
//! immutable snapshot so readers never block and never observe a value
//! mid-mutation. What a snapshot holds is up to the value's [`Publish`] impl.

use std::fmt::Display;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use furlough_core::ledger::LedgerError;
use furlough_core::workflow::WorkflowError;
use furlough_shared::LeaveConfig;

/// Lock acquisition settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// How long one attempt waits for the key.
    pub timeout: Duration,
    /// Extra attempts after the first timeout.
    pub max_retries: u32,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(250),
            max_retries: 3,
        }
    }
}

impl From<&LeaveConfig> for LockSettings {
    fn from(config: &LeaveConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.lock_timeout_ms),
            max_retries: config.max_lock_retries,
        }
    }
}

/// The key stayed locked through every attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Key {key} is locked by another writer after {attempts} attempts")]
pub struct ContentionError {
    /// The contended key.
    pub key: String,
    /// Attempts made.
    pub attempts: u32,
}

impl From<ContentionError> for LedgerError {
    fn from(_: ContentionError) -> Self {
        Self::ConcurrentModification
    }
}

impl From<ContentionError> for WorkflowError {
    fn from(_: ContentionError) -> Self {
        Self::Ledger(LedgerError::ConcurrentModification)
    }
}

/// A value that can publish a read-only snapshot of itself.
pub trait Publish {
    /// What readers see.
    type Snapshot;

    /// Builds the snapshot after a write. `previous` is the snapshot it
    /// replaces, so unchanged parts can be shared instead of copied.
    fn publish(&self, previous: Option<&Self::Snapshot>) -> Self::Snapshot;
}

impl Publish for () {
    type Snapshot = ();

    fn publish(&self, _previous: Option<&()>) {}
}

/// Arena of independently locked values.
pub struct LockArena<K, V: Publish> {
    cells: DashMap<K, Arc<Mutex<V>>>,
    published: Arc<DashMap<K, Arc<V::Snapshot>>>,
    settings: LockSettings,
}

impl<K, V> LockArena<K, V>
where
    K: Eq + Hash + Copy + Display,
    V: Publish,
{
    /// Creates an empty arena.
    #[must_use]
    pub fn new(settings: LockSettings) -> Self {
        Self {
            cells: DashMap::new(),
            published: Arc::new(DashMap::new()),
            settings,
        }
    }

    /// Latest published value for `key`.
    #[must_use]
    pub fn snapshot(&self, key: &K) -> Option<Arc<V::Snapshot>> {
        self.published.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Latest published value of every key.
    #[must_use]
    pub fn snapshots(&self) -> Vec<Arc<V::Snapshot>> {
        self.published
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the arena holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Inserts and publishes `value` unless `key` already exists.
    ///
    /// Returns false if the key was present.
    pub fn insert(&self, key: K, value: V) -> bool {
        match self.cells.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                self.published.insert(key, Arc::new(value.publish(None)));
                vacant.insert(Arc::new(Mutex::new(value)));
                true
            }
        }
    }

    /// Locks an existing key. Returns `Ok(None)` if the key is unknown.
    pub async fn lock(&self, key: K) -> Result<Option<ArenaGuard<K, V>>, ContentionError> {
        let Some(cell) = self.cells.get(&key).map(|entry| Arc::clone(entry.value())) else {
            return Ok(None);
        };
        self.acquire(key, cell).await.map(Some)
    }

    /// Locks `key`, creating it with `init` first if needed.
    pub async fn lock_or_insert_with(
        &self,
        key: K,
        init: impl FnOnce() -> V,
    ) -> Result<ArenaGuard<K, V>, ContentionError> {
        let cell = Arc::clone(
            self.cells
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(init())))
                .value(),
        );
        self.acquire(key, cell).await
    }

    async fn acquire(&self, key: K, cell: Arc<Mutex<V>>) -> Result<ArenaGuard<K, V>, ContentionError> {
        let attempts = self.settings.max_retries + 1;
        for attempt in 1..=attempts {
            if let Ok(guard) = tokio::time::timeout(self.settings.timeout, Arc::clone(&cell).lock_owned()).await {
                return Ok(ArenaGuard {
                    key,
                    guard,
                    published: Arc::clone(&self.published),
                });
            }
            tracing::warn!(%key, attempt, "key contended, retrying lock");
        }
        Err(ContentionError {
            key: key.to_string(),
            attempts,
        })
    }
}

/// Exclusive access to one key; publishes the value when dropped.
pub struct ArenaGuard<K, V>
where
    K: Eq + Hash + Copy,
    V: Publish,
{
    key: K,
    guard: OwnedMutexGuard<V>,
    published: Arc<DashMap<K, Arc<V::Snapshot>>>,
}

impl<K, V> ArenaGuard<K, V>
where
    K: Eq + Hash + Copy,
    V: Publish,
{
    /// The locked key.
    pub fn key(&self) -> K {
        self.key
    }
}

impl<K, V> Deref for ArenaGuard<K, V>
where
    K: Eq + Hash + Copy,
    V: Publish,
{
    type Target = V;

    fn deref(&self) -> &V {
        &self.guard
    }
}

impl<K, V> DerefMut for ArenaGuard<K, V>
where
    K: Eq + Hash + Copy,
    V: Publish,
{
    fn deref_mut(&mut self) -> &mut V {
        &mut self.guard
    }
}

impl<K, V> Drop for ArenaGuard<K, V>
where
    K: Eq + Hash + Copy,
    V: Publish,
{
    fn drop(&mut self) {
        let previous = self.published.get(&self.key).map(|entry| Arc::clone(entry.value()));
        let snapshot = self.guard.publish(previous.as_deref());
        self.published.insert(self.key, Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Publish for Vec<u32> {
        type Snapshot = Self;

        fn publish(&self, _previous: Option<&Self>) -> Self {
            self.clone()
        }
    }

    /// Snapshot that records how much of the previous one it reused.
    struct Counter(u32);

    impl Publish for Counter {
        type Snapshot = (u32, Option<u32>);

        fn publish(&self, previous: Option<&(u32, Option<u32>)>) -> (u32, Option<u32>) {
            (self.0, previous.map(|(value, _)| *value))
        }
    }

    fn arena() -> LockArena<u32, Vec<u32>> {
        LockArena::new(LockSettings {
            timeout: Duration::from_millis(20),
            max_retries: 1,
        })
    }

    #[tokio::test]
    async fn test_insert_publishes_snapshot() {
        let arena = arena();
        assert!(arena.insert(1, vec![1]));
        assert!(!arena.insert(1, vec![2]));
        assert_eq!(*arena.snapshot(&1).unwrap(), vec![1]);
        assert_eq!(arena.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_updates_after_guard_drops() {
        let arena = arena();
        {
            let mut guard = arena.lock_or_insert_with(7, Vec::new).await.unwrap();
            guard.push(42);
            // Readers still see the previous value while the writer holds the lock.
            assert!(arena.snapshot(&7).is_none());
        }
        assert_eq!(*arena.snapshot(&7).unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn test_publish_sees_previous_snapshot() {
        let arena: LockArena<u32, Counter> = LockArena::new(LockSettings::default());
        assert!(arena.insert(1, Counter(10)));
        assert_eq!(*arena.snapshot(&1).unwrap(), (10, None));
        {
            let mut guard = arena.lock(1).await.unwrap().unwrap();
            guard.0 = 11;
        }
        assert_eq!(*arena.snapshot(&1).unwrap(), (11, Some(10)));
    }

    #[tokio::test]
    async fn test_unknown_key_locks_to_none() {
        let arena = arena();
        assert!(arena.lock(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_contention_times_out() {
        let arena = arena();
        let _held = arena.lock_or_insert_with(1, Vec::new).await.unwrap();
        let Err(err) = arena.lock(1).await else {
            panic!("expected the held key to time out");
        };
        assert_eq!(err.attempts, 2);
        assert_eq!(LedgerError::from(err), LedgerError::ConcurrentModification);
    }

    #[tokio::test]
    async fn test_unrelated_keys_do_not_contend() {
        let arena = arena();
        let _held = arena.lock_or_insert_with(1, Vec::new).await.unwrap();
        assert!(arena.lock_or_insert_with(2, Vec::new).await.is_ok());
    }
}
