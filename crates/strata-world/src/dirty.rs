//! Mesh-dirty bookkeeping: the logical clock, edit invalidation and the
//! per-frame dirty snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use strata_voxel::{CHUNK_WIDTH, Chunk, ChunkCoord, LocalPos};

use crate::store::ResidentChunk;

/// Monotonic logical clock used to stamp clean → dirty transitions.
///
/// Starts at 1 so freshly created chunks (stamped 0) sort as oldest.
#[derive(Debug)]
pub struct DirtyClock {
    next: AtomicU64,
}

impl DirtyClock {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh timestamp, strictly greater than all previous ones.
    pub fn tick(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The timestamp the next [`tick`](Self::tick) will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for DirtyClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Dirty-state transitions for chunks owned by the store.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    clock: DirtyClock,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `chunk` dirty. Idempotent: only the clean → dirty transition
    /// consumes a timestamp.
    pub fn mark_dirty(&self, chunk: &mut Chunk) -> bool {
        if chunk.is_dirty() {
            return false;
        }
        chunk.mark_dirty(self.clock.tick())
    }

    /// Chunks whose meshes may show the tile at `local` in `home`.
    ///
    /// The home chunk always comes first. An edit on the x or z border adds the
    /// one neighbor across that face; chunks span the full height, so y never
    /// reaches a neighbor.
    pub fn invalidated_by_edit(home: ChunkCoord, local: LocalPos) -> Vec<ChunkCoord> {
        let last = CHUNK_WIDTH - 1;
        let mut dirty = vec![home];
        if local.x == 0 {
            dirty.push(home.offset(-1, 0));
        }
        if local.x == last {
            dirty.push(home.offset(1, 0));
        }
        if local.z == 0 {
            dirty.push(home.offset(0, -1));
        }
        if local.z == last {
            dirty.push(home.offset(0, 1));
        }
        dirty
    }

    /// Point-in-time set of dirty chunks for one scheduling pass.
    pub fn collect_dirty(resident: &[ResidentChunk]) -> Vec<ResidentChunk> {
        resident
            .iter()
            .filter(|chunk| chunk.read().is_dirty())
            .cloned()
            .collect()
    }

    pub fn clock(&self) -> &DirtyClock {
        &self.clock
    }
}
