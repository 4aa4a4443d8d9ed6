//! Chunk streaming around the viewer with hysteresis and a per-frame budget.
//!
//! Chunks within `load_radius` (Chebyshev, in chunks) of the viewer are
//! requested nearest first; resident chunks beyond `unload_radius` are unloaded
//! without blocking. The band between the two radii keeps chunks at the edge
//! from being unloaded and reloaded as the viewer wobbles across a border.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashSet;
use strata_voxel::ChunkCoord;

use crate::store::{ChunkState, ChunkStore};

/// Radii and budget for [`ChunkStreamer`].
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Chunks within this radius around the viewer are loaded.
    pub load_radius: u32,
    /// Chunks beyond this radius are unloaded. Must be > `load_radius`.
    pub unload_radius: u32,
    /// Maximum number of load requests per frame.
    pub loads_per_frame: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            load_radius: 4,
            unload_radius: 6,
            loads_per_frame: 8,
        }
    }
}

/// Min-heap of chunks awaiting a load request, nearest first.
#[derive(Debug, Default)]
pub struct ChunkLoadQueue {
    queue: BinaryHeap<Reverse<(u64, ChunkCoord)>>,
    queued: FxHashSet<ChunkCoord>,
}

impl ChunkLoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `coord` with its squared distance to the viewer.
    /// Coordinates already queued are ignored.
    pub fn enqueue(&mut self, coord: ChunkCoord, dist_sq: u64) {
        if self.queued.insert(coord) {
            self.queue.push(Reverse((dist_sq, coord)));
        }
    }

    /// Nearest queued chunk.
    pub fn dequeue(&mut self) -> Option<(u64, ChunkCoord)> {
        while let Some(Reverse((dist_sq, coord))) = self.queue.pop() {
            if self.queued.remove(&coord) {
                return Some((dist_sq, coord));
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }
}

/// What one streaming frame did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StreamTickResult {
    /// Load tasks dispatched this frame.
    pub requested: u32,
    /// Chunks unloaded this frame.
    pub unloaded: u32,
}

/// Keeps the store's resident set centered on the viewer.
#[derive(Debug)]
pub struct ChunkStreamer {
    config: StreamConfig,
    load_queue: ChunkLoadQueue,
    /// Viewer chunk the queued distances were measured from.
    queued_for: Option<ChunkCoord>,
}

impl ChunkStreamer {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            load_queue: ChunkLoadQueue::new(),
            queued_for: None,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn load_queue(&self) -> &ChunkLoadQueue {
        &self.load_queue
    }

    /// Runs one frame of streaming for a viewer standing in `viewer`.
    pub fn tick(&mut self, viewer: ChunkCoord, store: &ChunkStore) -> StreamTickResult {
        let mut result = StreamTickResult::default();

        // Queue keys are distances to the old viewer chunk. Everything still
        // wanted is re-queued below.
        if self.queued_for != Some(viewer) {
            self.load_queue.clear();
            self.queued_for = Some(viewer);
        }

        let radius = self.config.load_radius as i32;
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coord = viewer.offset(dx, dz);
                if store.state(coord) == ChunkState::Absent {
                    self.load_queue.enqueue(coord, viewer.distance_sq(coord));
                }
            }
        }

        while result.requested < self.config.loads_per_frame {
            let Some((_, coord)) = self.load_queue.dequeue() else {
                break;
            };
            if store.request_load(coord) {
                result.requested += 1;
            }
        }

        let distant: Vec<ChunkCoord> = store
            .resident_chunks()
            .iter()
            .map(|resident| resident.coord)
            .filter(|&coord| viewer.chebyshev_distance(coord) > self.config.unload_radius)
            .collect();
        if !distant.is_empty() {
            store.unload(&distant, false);
            result.unloaded = distant.len() as u32;
        }

        if result.requested > 0 || result.unloaded > 0 {
            tracing::debug!(
                "Streaming around {:?}: {} requested, {} unloaded, {} queued",
                viewer,
                result.requested,
                result.unloaded,
                self.load_queue.len()
            );
        }
        result
    }
}
