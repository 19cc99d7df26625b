//! Process-wide lock registry serializing installs per target path.
//!
//! Every install attempt locks the `{directory, binary name}` pair it is
//! about to mutate. The version is deliberately not part of the key: two
//! requests for different versions of the same tool that resolve to the
//! same physical binary path must serialize against each other, otherwise
//! their temp-file/rename sequences would interleave on one target file.
//!
//! Locks are process-local by design. Installers running in separate
//! processes (or on separate machines sharing a network filesystem) are
//! not coordinated by this registry; the atomic-rename discipline limits
//! the damage there to an orphaned temp file, never a corrupt binary.
//!
//! Holders keep the lock for the whole decision-and-install sequence,
//! including the network transfer, so waiters block for network-bound
//! durations. That is intended: the waiter's first action after acquiring
//! is to re-observe on-disk state the previous holder just wrote, which
//! usually turns its install into a skip.

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Identity of the physical install target a lock protects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    /// Install directory the binary lives in.
    pub dir: PathBuf,
    /// Platform-adjusted binary file name inside that directory.
    pub binary_name: String,
}

/// Registry of per-target install locks.
///
/// Cloning is cheap and every clone shares the same lock table; one
/// registry instance (or its clones) must serve the whole process for the
/// serialization guarantee to hold.
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    slots: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

/// RAII guard for one acquired install lock.
///
/// Dropping the guard releases the lock and prunes the registry slot when
/// no other task is waiting on it. There is no manual release API.
#[derive(Debug)]
pub struct InstallGuard {
    key: LockKey,
    slots: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
    // Taken in Drop: released before the slot is pruned.
    permit: Option<OwnedMutexGuard<()>>,
}

impl LockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the install lock for `key`, waiting behind any holder.
    ///
    /// Acquisition order is FIFO per key via the fairness of
    /// `tokio::sync::Mutex`, which gives the total ordering of install
    /// attempts per target.
    pub async fn acquire(&self, key: LockKey) -> InstallGuard {
        let slot = {
            // Entry guard must drop before the await below or a second
            // acquire on the same shard would deadlock the map.
            let entry = self.slots.entry(key.clone()).or_default();
            Arc::clone(entry.value())
        };

        debug!(dir = %key.dir.display(), binary = %key.binary_name, "waiting for install lock");
        let permit = slot.lock_owned().await;
        debug!(dir = %key.dir.display(), binary = %key.binary_name, "install lock acquired");

        InstallGuard {
            key,
            slots: Arc::clone(&self.slots),
            permit: Some(permit),
        }
    }

    /// Number of live lock slots, including currently-unheld ones not yet
    /// pruned.
    #[cfg(test)]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        // Release first so a queued waiter can proceed. Every waiter holds
        // its own Arc to the slot, so strong_count == 1 means nobody is
        // queued; `remove_if` evaluates that under the shard lock, so a
        // concurrent acquire either keeps the slot alive or finds it gone
        // and creates a fresh one. No waiter ends up on a removed mutex.
        self.permit.take();
        self.slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::sync::Barrier;

    fn key(dir: &str, binary: &str) -> LockKey {
        LockKey {
            dir: PathBuf::from(dir),
            binary_name: binary.to_string(),
        }
    }

    #[tokio::test]
    async fn test_same_key_serializes() {
        let registry = LockRegistry::new();
        let barrier = Arc::new(Barrier::new(2));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                let _guard = registry.acquire(key("/tools/kite/latest", "kite")).await;
                tokio::time::sleep(Duration::from_millis(100)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Two 100ms critical sections on one key cannot overlap.
        assert!(
            start.elapsed() >= Duration::from_millis(180),
            "critical sections overlapped: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let registry = LockRegistry::new();
        let barrier = Arc::new(Barrier::new(2));
        let start = Instant::now();

        let mut handles = Vec::new();
        for name in ["kite", "glider"] {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            let name = name.to_string();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                let _guard = registry.acquire(key("/tools/shared", &name)).await;
                tokio::time::sleep(Duration::from_millis(150)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(
            start.elapsed() < Duration::from_millis(290),
            "distinct keys contended: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_version_is_not_part_of_the_key() {
        // Same dir and binary name always collide, whatever version the
        // request asked for; the key type simply has nowhere to put one.
        assert_eq!(key("/tools/kite/latest", "kite"), key("/tools/kite/latest", "kite"));
    }

    #[tokio::test]
    async fn test_slots_pruned_after_release() {
        let registry = LockRegistry::new();

        {
            let _guard = registry.acquire(key("/tools/kite/2.7.0", "kite")).await;
            assert_eq!(registry.slot_count(), 1);
        }
        assert_eq!(registry.slot_count(), 0);

        // Reacquisition after pruning works on a fresh slot.
        let _guard = registry.acquire(key("/tools/kite/2.7.0", "kite")).await;
        assert_eq!(registry.slot_count(), 1);
    }

    #[tokio::test]
    async fn test_waiter_keeps_slot_alive_across_release() {
        let registry = LockRegistry::new();
        let k = key("/tools/kite/latest", "kite");

        let guard = registry.acquire(k.clone()).await;
        let waiter = {
            let registry = registry.clone();
            let k = k.clone();
            tokio::spawn(async move {
                let _guard = registry.acquire(k).await;
            })
        };

        // Let the waiter queue up on the slot before releasing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(guard);

        waiter.await.unwrap();
        assert_eq!(registry.slot_count(), 0);
    }
}
