//! Frame-budgeted mesh rebuilds.
//!
//! Each frame the scheduler receives the dirty snapshot from the chunk store,
//! orders it and rebuilds at most `max_per_frame` chunks. Ordering is
//! `(outside frustum, squared chunk distance, dirtied_at, key)`, so visible
//! nearby chunks go first and ties go to whichever became dirty earliest.
//! There is no starvation guard: a far invisible chunk can wait as long as
//! closer chunks keep getting dirtied.

use glam::Vec3;
use rustc_hash::FxHashMap;
use strata_voxel::{Chunk, ChunkCoord, RenderLayer};
use strata_world::ResidentChunk;

use crate::frustum::{Frustum, chunk_aabb};
use crate::mesher::{ChunkMesh, ChunkMesher, TileSource};

/// Outcome of one [`RebuildScheduler::schedule`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Chunks rebuilt this frame, in priority order.
    pub rebuilt: Vec<ChunkCoord>,
    /// Dirty chunks left for a later frame.
    pub deferred: usize,
}

/// Latest geometry per chunk and layer.
#[derive(Default)]
pub struct MeshCache {
    meshes: FxHashMap<ChunkCoord, [ChunkMesh; 2]>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coord: ChunkCoord, layer: RenderLayer) -> Option<&ChunkMesh> {
        self.meshes.get(&coord).map(|layers| &layers[layer.index()])
    }

    fn insert(&mut self, coord: ChunkCoord, layers: [ChunkMesh; 2]) {
        self.meshes.insert(coord, layers);
    }

    /// Drops meshes of chunks for which `is_resident` returns `false`.
    /// Returns the number of chunks evicted.
    pub fn evict(&mut self, mut is_resident: impl FnMut(ChunkCoord) -> bool) -> usize {
        let before = self.meshes.len();
        self.meshes.retain(|&coord, _| is_resident(coord));
        before - self.meshes.len()
    }

    /// Number of chunks with cached geometry.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Total quads across all cached chunks and layers.
    pub fn total_quads(&self) -> usize {
        self.meshes
            .values()
            .flat_map(|layers| layers.iter())
            .map(ChunkMesh::quad_count)
            .sum()
    }
}

type PriorityKey = (bool, u64, u64, u64);

/// Rebuilds dirty chunks under a per-frame budget.
pub struct RebuildScheduler {
    max_per_frame: usize,
    mesher: Box<dyn ChunkMesher>,
    cache: MeshCache,
}

impl RebuildScheduler {
    pub fn new(mesher: Box<dyn ChunkMesher>, max_per_frame: usize) -> Self {
        Self {
            max_per_frame,
            mesher,
            cache: MeshCache::new(),
        }
    }

    pub fn max_per_frame(&self) -> usize {
        self.max_per_frame
    }

    pub fn set_max_per_frame(&mut self, max_per_frame: usize) {
        self.max_per_frame = max_per_frame;
    }

    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut MeshCache {
        &mut self.cache
    }

    /// Orders `dirty` by priority and rebuilds the first `max_per_frame` entries.
    ///
    /// `viewer` is a world-space position. Chunks that were cleaned since the
    /// snapshot was taken are skipped without using budget.
    pub fn schedule(
        &mut self,
        dirty: Vec<ResidentChunk>,
        viewer: Vec3,
        frustum: &Frustum,
        world: &dyn TileSource,
    ) -> RebuildReport {
        let viewer_chunk = ChunkCoord::containing(viewer.x.floor() as i32, viewer.z.floor() as i32);

        let mut queue: Vec<(PriorityKey, ResidentChunk)> = dirty
            .into_iter()
            .filter_map(|entry| {
                let dirtied_at = entry.read().dirtied_at()?;
                let key = Self::priority(entry.coord, dirtied_at, viewer_chunk, frustum);
                Some((key, entry))
            })
            .collect();
        queue.sort_unstable_by_key(|(key, _)| *key);

        let budget = self.max_per_frame.min(queue.len());
        let mut report = RebuildReport {
            rebuilt: Vec::with_capacity(budget),
            deferred: queue.len() - budget,
        };

        for (_, entry) in queue.into_iter().take(budget) {
            // Held for the whole build so a concurrent mark_dirty lands after
            // clear_dirty instead of being swallowed by it.
            let mut chunk = entry.write();
            self.rebuild(&mut chunk, world);
            report.rebuilt.push(entry.coord);
        }

        tracing::trace!(
            "Rebuilt {} chunks, {} deferred, {} cached",
            report.rebuilt.len(),
            report.deferred,
            self.cache.len()
        );
        report
    }

    /// Regenerates both render layers of `chunk` and leaves the dirty state.
    pub fn rebuild(&mut self, chunk: &mut Chunk, world: &dyn TileSource) {
        let layers = RenderLayer::ALL.map(|layer| {
            let mesh = self.mesher.build(chunk, world, layer);
            chunk.record_layer_build(layer, mesh.quad_count() as u32);
            mesh
        });
        chunk.clear_dirty();
        self.cache.insert(chunk.coord(), layers);
    }

    fn priority(coord: ChunkCoord, dirtied_at: u64, viewer: ChunkCoord, frustum: &Frustum) -> PriorityKey {
        let hidden = !frustum.is_visible(&chunk_aabb(coord));
        (hidden, coord.distance_sq(viewer), dirtied_at, coord.key())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use glam::Vec3;
    use strata_voxel::{TileRegistry, TileTypeId};

    use super::*;
    use crate::mesher::CulledMesher;

    struct Void;

    impl TileSource for Void {
        fn tile(&self, _x: i32, _y: i32, _z: i32) -> TileTypeId {
            TileTypeId::AIR
        }
    }

    fn scheduler(max_per_frame: usize) -> RebuildScheduler {
        let (registry, _) = TileRegistry::standard().expect("standard registry");
        RebuildScheduler::new(Box::new(CulledMesher::new(Arc::new(registry))), max_per_frame)
    }

    fn dirty_chunk(coord: ChunkCoord, dirtied_at: u64) -> ResidentChunk {
        let mut chunk = Chunk::new(coord);
        chunk.clear_dirty();
        chunk.mark_dirty(dirtied_at);
        ResidentChunk {
            coord,
            chunk: Arc::new(RwLock::new(chunk)),
        }
    }

    /// Eye above the origin chunk looking along −Z.
    fn frustum_toward_neg_z() -> Frustum {
        Frustum::from_camera(
            Vec3::new(8.0, 40.0, 8.0),
            Vec3::NEG_Z,
            70f32.to_radians(),
            16.0 / 9.0,
            0.1,
            512.0,
        )
    }

    fn viewer() -> Vec3 {
        Vec3::new(8.0, 40.0, 8.0)
    }

    #[test]
    fn test_budget_limits_rebuilds() {
        let mut scheduler = scheduler(8);
        let chunks: Vec<ResidentChunk> = (0..50)
            .map(|i| dirty_chunk(ChunkCoord::new(i % 10 - 5, i / 10 - 5), i as u64 + 1))
            .collect();

        let report = scheduler.schedule(chunks.clone(), viewer(), &frustum_toward_neg_z(), &Void);
        assert_eq!(report.rebuilt.len(), 8);
        assert_eq!(report.deferred, 42);

        let still_dirty = chunks.iter().filter(|c| c.read().is_dirty()).count();
        assert_eq!(still_dirty, 42, "unbuilt chunks stay dirty for next frame");
        for coord in &report.rebuilt {
            let chunk = chunks.iter().find(|c| c.coord == *coord).expect("rebuilt chunk in input");
            assert!(!chunk.read().is_dirty());
            assert_eq!(chunk.read().layer(RenderLayer::Lit).built_version, Some(0));
        }
    }

    #[test]
    fn test_deferred_chunks_rebuild_next_frame() {
        let mut scheduler = scheduler(8);
        let chunks: Vec<ResidentChunk> = (0..12).map(|i| dirty_chunk(ChunkCoord::new(i, 0), 1)).collect();
        let frustum = frustum_toward_neg_z();

        let first = scheduler.schedule(chunks.clone(), viewer(), &frustum, &Void);
        let second = scheduler.schedule(chunks.clone(), viewer(), &frustum, &Void);
        assert_eq!(first.rebuilt.len(), 8);
        assert_eq!(second.rebuilt.len(), 4, "already clean chunks are skipped");
        assert_eq!(second.deferred, 0);
        assert!(chunks.iter().all(|c| !c.read().is_dirty()));
    }

    #[test]
    fn test_visible_before_invisible() {
        let mut scheduler = scheduler(1);
        // Behind the viewer (+Z) but closer, versus ahead (−Z) and farther.
        let behind = dirty_chunk(ChunkCoord::new(0, 3), 1);
        let ahead = dirty_chunk(ChunkCoord::new(0, -4), 1);
        let report = scheduler.schedule(vec![behind, ahead], viewer(), &frustum_toward_neg_z(), &Void);
        assert_eq!(report.rebuilt, vec![ChunkCoord::new(0, -4)]);
    }

    #[test]
    fn test_closer_before_farther() {
        let mut scheduler = scheduler(1);
        let far = dirty_chunk(ChunkCoord::new(0, -6), 1);
        let near = dirty_chunk(ChunkCoord::new(0, -2), 5);
        let report = scheduler.schedule(vec![far, near], viewer(), &frustum_toward_neg_z(), &Void);
        assert_eq!(report.rebuilt, vec![ChunkCoord::new(0, -2)]);
    }

    #[test]
    fn test_older_before_newer_at_equal_distance() {
        let mut scheduler = scheduler(1);
        let newer = dirty_chunk(ChunkCoord::new(-1, -3), 9);
        let older = dirty_chunk(ChunkCoord::new(1, -3), 2);
        let report = scheduler.schedule(vec![newer, older], viewer(), &frustum_toward_neg_z(), &Void);
        assert_eq!(report.rebuilt, vec![ChunkCoord::new(1, -3)]);
    }

    #[test]
    fn test_rebuild_populates_cache_per_layer() {
        let mut scheduler = scheduler(4);
        let (_, tiles) = TileRegistry::standard().expect("standard registry");
        let entry = dirty_chunk(ChunkCoord::new(0, -1), 1);
        entry.write().set(1, 1, 1, tiles.stone);

        scheduler.schedule(vec![entry.clone()], viewer(), &frustum_toward_neg_z(), &Void);
        let lit = scheduler.cache().get(entry.coord, RenderLayer::Lit).expect("lit mesh");
        assert_eq!(lit.quad_count(), 6);
        let unlit = scheduler.cache().get(entry.coord, RenderLayer::Unlit).expect("unlit mesh");
        assert!(unlit.is_empty());
        assert_eq!(entry.read().layer(RenderLayer::Lit).quad_count, 6);
        assert_eq!(entry.read().layer(RenderLayer::Lit).built_version, Some(1));
    }

    #[test]
    fn test_evict_drops_unloaded() {
        let mut scheduler = scheduler(4);
        let keep = dirty_chunk(ChunkCoord::new(0, 0), 1);
        let gone = dirty_chunk(ChunkCoord::new(1, 0), 1);
        scheduler.schedule(vec![keep, gone], viewer(), &frustum_toward_neg_z(), &Void);
        assert_eq!(scheduler.cache().len(), 2);

        let evicted = scheduler.cache_mut().evict(|coord| coord == ChunkCoord::new(0, 0));
        assert_eq!(evicted, 1);
        assert!(scheduler.cache().get(ChunkCoord::new(1, 0), RenderLayer::Lit).is_none());
    }
}
