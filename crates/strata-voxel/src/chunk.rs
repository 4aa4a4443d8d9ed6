//! Flat tile storage for one 16×64×16 chunk column.

use serde::{Deserialize, Serialize};

use crate::registry::TileTypeId;

/// Side length of a chunk along X and Z, in blocks.
pub const CHUNK_WIDTH: usize = 16;

/// Height of a chunk (and of the world) in blocks.
pub const CHUNK_HEIGHT: usize = 64;

/// Number of tiles in a chunk.
pub const CHUNK_VOLUME: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_WIDTH;

static_assertions::const_assert!(CHUNK_WIDTH.is_power_of_two());
static_assertions::const_assert!(CHUNK_HEIGHT <= u16::MAX as usize);

/// Uncompressed tile array for a single chunk.
///
/// Tiles are laid out Y-major (`(y * 16 + z) * 16 + x`) so a horizontal slice is
/// contiguous, which keeps column fills and serialization cache-friendly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkData {
    tiles: Vec<TileTypeId>,
}

impl ChunkData {
    /// Creates a chunk filled entirely with `fill`.
    pub fn new(fill: TileTypeId) -> Self {
        Self {
            tiles: vec![fill; CHUNK_VOLUME],
        }
    }

    /// Creates a chunk filled with air.
    pub fn new_air() -> Self {
        Self::new(TileTypeId::AIR)
    }

    /// Builds chunk data from a raw tile vector.
    ///
    /// Returns `None` if the vector is not exactly [`CHUNK_VOLUME`] long.
    pub fn from_tiles(tiles: Vec<TileTypeId>) -> Option<Self> {
        (tiles.len() == CHUNK_VOLUME).then_some(Self { tiles })
    }

    /// Returns the tile at `(x, y, z)`. Each coordinate must be in range.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> TileTypeId {
        self.tiles[Self::linear_index(x, y, z)]
    }

    /// Stores `tile` at `(x, y, z)` and returns the tile that was there.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, tile: TileTypeId) -> TileTypeId {
        std::mem::replace(&mut self.tiles[Self::linear_index(x, y, z)], tile)
    }

    /// Sets `y_range` of column `(x, z)` to `tile`. The range is clamped to the chunk height.
    pub fn fill_column(&mut self, x: usize, z: usize, y_range: std::ops::Range<usize>, tile: TileTypeId) {
        let end = y_range.end.min(CHUNK_HEIGHT);
        for y in y_range.start.min(end)..end {
            self.tiles[Self::linear_index(x, y, z)] = tile;
        }
    }

    /// Iterates over all tiles in storage order.
    pub fn tiles(&self) -> &[TileTypeId] {
        &self.tiles
    }

    /// Returns `true` if every tile is air.
    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(|t| *t == TileTypeId::AIR)
    }

    /// Returns `true` if `(x, y, z)` lies inside a chunk.
    #[inline]
    pub fn in_bounds(x: usize, y: usize, z: usize) -> bool {
        x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_WIDTH
    }

    #[inline]
    fn linear_index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(Self::in_bounds(x, y, z), "({x}, {y}, {z}) outside chunk");
        (y * CHUNK_WIDTH + z) * CHUNK_WIDTH + x
    }
}

impl Default for ChunkData {
    fn default() -> Self {
        Self::new_air()
    }
}
