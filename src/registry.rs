//! Index-addressed chunk registry
//!
//! Collectors on every worker thread insert open chunk handles here. The
//! slot vector and its length live behind one `parking_lot::Mutex`, so a
//! grow and the write that follows it form a single critical section: two
//! workers discovering adjacent high indices can never observe a stale
//! length.
//!
//! After the collection barrier the registry is unwrapped with
//! [`ChunkRegistry::into_slots`] and read without locking.

use crate::chunk::ChunkHandle;
use crate::config::DuplicatePolicy;
use crate::error::{ChunkError, ChunkResult};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// Shared table of open chunk handles keyed by index
#[derive(Debug)]
pub struct ChunkRegistry {
    slots: Mutex<Vec<Option<ChunkHandle>>>,
    policy: DuplicatePolicy,
    max_index: Option<u64>,
    duplicates: AtomicU64,
}

impl ChunkRegistry {
    pub fn new(policy: DuplicatePolicy, max_index: Option<u64>) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            policy,
            max_index,
            duplicates: AtomicU64::new(0),
        }
    }

    /// Register `handle` at `index`
    ///
    /// Grows the table to `index + 1` slots if needed; a growth the allocator
    /// refuses yields [`ChunkError::RegistryTooLarge`] instead of aborting. Under
    /// [`DuplicatePolicy::LastWins`] an occupant is replaced (and closed) and
    /// its path returned; under [`DuplicatePolicy::Reject`] the occupant stays
    /// and the new handle is refused.
    pub fn insert(&self, index: u64, handle: ChunkHandle) -> ChunkResult<Option<PathBuf>> {
        if let Some(max) = self.max_index.filter(|&max| index > max) {
            return Err(ChunkError::IndexOutOfRange {
                index,
                max,
                path: handle.path().to_path_buf(),
            });
        }
        let too_large = || ChunkError::RegistryTooLarge {
            index,
            path: handle.path().to_path_buf(),
        };
        let slot = usize::try_from(index).map_err(|_| too_large())?;

        let mut slots = self.slots.lock();
        if slot >= slots.len() {
            let additional = slot - slots.len() + 1;
            slots.try_reserve_exact(additional).map_err(|_| too_large())?;
            slots.resize_with(slot + 1, || None);
        }

        if let Some(existing) = &slots[slot] {
            if self.policy == DuplicatePolicy::Reject {
                return Err(ChunkError::DuplicateChunk {
                    index,
                    existing: existing.path().to_path_buf(),
                    duplicate: handle.path().to_path_buf(),
                });
            }
        }

        let displaced = slots[slot].replace(handle).map(|old| old.into_parts().1);
        drop(slots);

        match &displaced {
            Some(old) => {
                self.duplicates.fetch_add(1, Ordering::Relaxed);
                warn!(index, replaced = %old.display(), "Duplicate chunk index, keeping latest");
            }
            None => trace!(index, "Chunk registered"),
        }

        Ok(displaced)
    }

    /// Number of slots allocated so far (highest index seen plus one)
    pub fn snapshot_length(&self) -> usize {
        self.slots.lock().len()
    }

    /// Number of populated slots
    pub fn occupied(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// Number of handles replaced by a later one with the same index
    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Take the slots once every writer is gone
    pub fn into_slots(self) -> Vec<Option<ChunkHandle>> {
        self.slots.into_inner()
    }
}
