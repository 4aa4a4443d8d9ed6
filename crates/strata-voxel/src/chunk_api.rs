//! Resident chunk: tile data plus the mesh-dirty state machine and per-layer build state.
//!
//! [`Chunk`] wraps [`ChunkData`] with bounds-checked access using `i32` local
//! coordinates. Out-of-bounds reads return air and out-of-bounds writes are
//! ignored with a warning log.

use crate::chunk::{CHUNK_HEIGHT, CHUNK_WIDTH, ChunkData};
use crate::coords::ChunkCoord;
use crate::registry::TileTypeId;

/// Geometry layers a chunk is rebuilt into.
///
/// Faces of lit tiles go to [`RenderLayer::Lit`], shadowed ones to
/// [`RenderLayer::Unlit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    /// Faces drawn at full brightness.
    Lit = 0,
    /// Faces drawn darkened.
    Unlit = 1,
}

impl RenderLayer {
    /// Both layers, in rebuild order.
    pub const ALL: [RenderLayer; 2] = [RenderLayer::Lit, RenderLayer::Unlit];

    /// Index into per-layer arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// What the last rebuild of one layer produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerMeshState {
    /// Chunk version the layer was built from, `None` if never built.
    pub built_version: Option<u64>,
    /// Number of quads emitted by the last build.
    pub quad_count: u32,
}

/// A chunk owned by the chunk store.
///
/// The mesh-dirty flag follows a two-state machine: entering dirty from clean
/// records a logical timestamp; [`Chunk::clear_dirty`] leaves dirty and clears it.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    data: ChunkData,
    dirtied_at: Option<u64>,
    save_dirty: bool,
    version: u64,
    layers: [LayerMeshState; 2],
}

impl Chunk {
    /// Creates an air-filled chunk at `coord`.
    ///
    /// The chunk starts mesh-dirty at timestamp 0 since it has never been built.
    pub fn new(coord: ChunkCoord) -> Self {
        Self::from_data(coord, ChunkData::new_air())
    }

    /// Wraps existing tile data (e.g. read back from disk).
    pub fn from_data(coord: ChunkCoord, data: ChunkData) -> Self {
        Self {
            coord,
            data,
            dirtied_at: Some(0),
            save_dirty: false,
            version: 0,
            layers: [LayerMeshState::default(); 2],
        }
    }

    /// The chunk's grid coordinate.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the tile at local `(x, y, z)`, or air when out of bounds.
    pub fn get(&self, x: i32, y: i32, z: i32) -> TileTypeId {
        match Self::checked(x, y, z) {
            Some((x, y, z)) => self.data.get(x, y, z),
            None => TileTypeId::AIR,
        }
    }

    /// Stores `tile` at local `(x, y, z)` and returns the previous tile.
    ///
    /// Version and save-dirty state only change when the stored value changes.
    /// Mesh dirtiness is left to the caller, which knows about neighbors.
    /// Out-of-bounds writes are ignored and return `None`.
    pub fn set(&mut self, x: i32, y: i32, z: i32, tile: TileTypeId) -> Option<TileTypeId> {
        let Some((lx, ly, lz)) = Self::checked(x, y, z) else {
            tracing::warn!("Chunk::set out of bounds: ({}, {}, {})", x, y, z);
            return None;
        };
        let old = self.data.set(lx, ly, lz, tile);
        if old != tile {
            self.version += 1;
            self.save_dirty = true;
        }
        Some(old)
    }

    /// Marks the mesh dirty. Returns `true` on the clean → dirty transition,
    /// which is the only time `now` is recorded.
    pub fn mark_dirty(&mut self, now: u64) -> bool {
        if self.dirtied_at.is_some() {
            return false;
        }
        self.dirtied_at = Some(now);
        true
    }

    /// Leaves the dirty state, clearing both flag and timestamp.
    pub fn clear_dirty(&mut self) {
        self.dirtied_at = None;
    }

    /// Whether the chunk's geometry is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirtied_at.is_some()
    }

    /// Timestamp of the last clean → dirty transition.
    pub fn dirtied_at(&self) -> Option<u64> {
        self.dirtied_at
    }

    /// Whether tiles changed since the chunk was loaded or last saved.
    pub fn is_save_dirty(&self) -> bool {
        self.save_dirty
    }

    /// Clears the save-dirty flag after a successful hand-off to persistence.
    pub fn clear_save_dirty(&mut self) {
        self.save_dirty = false;
    }

    /// Monotonic counter bumped by every effective tile change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Build state of `layer`.
    pub fn layer(&self, layer: RenderLayer) -> LayerMeshState {
        self.layers[layer.index()]
    }

    /// Records the result of rebuilding `layer` from the current tiles.
    pub fn record_layer_build(&mut self, layer: RenderLayer, quad_count: u32) {
        self.layers[layer.index()] = LayerMeshState {
            built_version: Some(self.version),
            quad_count,
        };
    }

    /// Read access to the raw tile data.
    pub fn data(&self) -> &ChunkData {
        &self.data
    }

    /// Mutable access to the raw tile data.
    ///
    /// Bypasses versioning; intended for generation before the chunk is published.
    pub fn data_mut(&mut self) -> &mut ChunkData {
        &mut self.data
    }

    fn checked(x: i32, y: i32, z: i32) -> Option<(usize, usize, usize)> {
        let in_range = (0..CHUNK_WIDTH as i32).contains(&x)
            && (0..CHUNK_HEIGHT as i32).contains(&y)
            && (0..CHUNK_WIDTH as i32).contains(&z);
        in_range.then_some((x as usize, y as usize, z as usize))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_chunk() -> Chunk {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0));
        chunk.clear_dirty();
        chunk
    }

    #[test]
    fn test_new_chunk_starts_dirty() {
        let chunk = Chunk::new(ChunkCoord::new(2, 3));
        assert!(chunk.is_dirty());
        assert_eq!(chunk.layer(RenderLayer::Lit).built_version, None);
    }

    #[test]
    fn test_mark_dirty_only_stamps_on_transition() {
        let mut chunk = clean_chunk();
        assert!(chunk.mark_dirty(10));
        assert!(!chunk.mark_dirty(20));
        assert_eq!(chunk.dirtied_at(), Some(10));

        chunk.clear_dirty();
        assert!(!chunk.is_dirty());
        assert_eq!(chunk.dirtied_at(), None);

        assert!(chunk.mark_dirty(30));
        assert_eq!(chunk.dirtied_at(), Some(30));
    }

    #[test]
    fn test_set_same_value_keeps_version() {
        let mut chunk = clean_chunk();
        assert_eq!(chunk.set(1, 1, 1, TileTypeId(3)), Some(TileTypeId::AIR));
        assert_eq!(chunk.version(), 1);
        assert_eq!(chunk.set(1, 1, 1, TileTypeId(3)), Some(TileTypeId(3)));
        assert_eq!(chunk.version(), 1);
        assert!(chunk.is_save_dirty());
        assert!(!chunk.is_dirty(), "tile writes leave mesh dirtiness to the store");
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut chunk = clean_chunk();
        assert_eq!(chunk.set(16, 0, 0, TileTypeId(1)), None);
        assert_eq!(chunk.set(0, -1, 0, TileTypeId(1)), None);
        assert_eq!(chunk.set(0, 0, CHUNK_WIDTH as i32, TileTypeId(1)), None);
        assert_eq!(chunk.get(-1, 0, 0), TileTypeId::AIR);
        assert_eq!(chunk.get(0, CHUNK_HEIGHT as i32, 0), TileTypeId::AIR);
        assert_eq!(chunk.version(), 0);
    }

    #[test]
    fn test_record_layer_build_tracks_version() {
        let mut chunk = clean_chunk();
        chunk.set(0, 0, 0, TileTypeId(1));
        chunk.record_layer_build(RenderLayer::Lit, 6);
        let state = chunk.layer(RenderLayer::Lit);
        assert_eq!(state.built_version, Some(1));
        assert_eq!(state.quad_count, 6);
        assert_eq!(chunk.layer(RenderLayer::Unlit), LayerMeshState::default());
    }
}
