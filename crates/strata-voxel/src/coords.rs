//! Chunk-grid coordinates and world ↔ chunk-local conversions.

use serde::{Deserialize, Serialize};

use crate::chunk::{CHUNK_HEIGHT, CHUNK_WIDTH};

/// Identifies a chunk column in the horizontal chunk grid.
///
/// The world is one chunk tall, so only `x` and `z` vary. Chunk `(x, z)` covers
/// world blocks `[x * 16, x * 16 + 16)` × `[z * 16, z * 16 + 16)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Z coordinate.
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Packs the coordinate into a single map key: `x << 32 | z & 0xFFFF_FFFF`.
    ///
    /// Bijective over every `(i32, i32)` pair; [`ChunkCoord::from_key`] inverts it.
    pub const fn key(self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.z as u32 as u64)
    }

    /// Recovers the coordinate packed by [`ChunkCoord::key`].
    pub const fn from_key(key: u64) -> Self {
        Self {
            x: (key >> 32) as u32 as i32,
            z: key as u32 as i32,
        }
    }

    /// Returns the chunk containing the world block column `(world_x, world_z)`.
    pub fn containing(world_x: i32, world_z: i32) -> Self {
        Self {
            x: world_x.div_euclid(CHUNK_WIDTH as i32),
            z: world_z.div_euclid(CHUNK_WIDTH as i32),
        }
    }

    /// Returns the chunk offset by `(dx, dz)` chunks.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            z: self.z.wrapping_add(dz),
        }
    }

    /// World coordinates of the chunk's minimum block corner `(x, z)`.
    pub fn origin(self) -> (i32, i32) {
        (
            self.x.wrapping_mul(CHUNK_WIDTH as i32),
            self.z.wrapping_mul(CHUNK_WIDTH as i32),
        )
    }

    /// The eight chunks sharing an edge or a corner with this one.
    pub fn horizontal_neighbors(self) -> [ChunkCoord; 8] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(-1, 1),
            self.offset(0, 1),
            self.offset(1, 1),
        ]
    }

    /// Chebyshev (ring) distance in chunks.
    pub fn chebyshev_distance(self, other: ChunkCoord) -> u32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dz = (self.z as i64 - other.z as i64).unsigned_abs();
        dx.max(dz) as u32
    }

    /// Squared Euclidean distance in chunks.
    pub fn distance_sq(self, other: ChunkCoord) -> u64 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dz = (self.z as i64 - other.z as i64).unsigned_abs();
        dx * dx + dz * dz
    }
}

/// A block position inside one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalPos {
    /// `0..CHUNK_WIDTH`
    pub x: usize,
    /// `0..CHUNK_HEIGHT`
    pub y: usize,
    /// `0..CHUNK_WIDTH`
    pub z: usize,
}

/// Splits an absolute block coordinate into its owning chunk and local position.
///
/// Returns `None` when `y` is outside the world's vertical extent.
pub fn split_world(x: i32, y: i32, z: i32) -> Option<(ChunkCoord, LocalPos)> {
    if y < 0 || y >= CHUNK_HEIGHT as i32 {
        return None;
    }
    let coord = ChunkCoord::containing(x, z);
    let local = LocalPos {
        x: x.rem_euclid(CHUNK_WIDTH as i32) as usize,
        y: y as usize,
        z: z.rem_euclid(CHUNK_WIDTH as i32) as usize,
    };
    Some((coord, local))
}
