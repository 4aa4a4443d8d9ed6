//! Chunk geometry and the frame-budgeted rebuild scheduler.
//!
//! Vertex emission is a plain culled-face mesher; the interesting part is
//! [`RebuildScheduler`], which decides which dirty chunks get rebuilt this frame.

mod frustum;
mod mesher;
mod scheduler;

pub use frustum::{Aabb, Frustum, chunk_aabb};
pub use mesher::{ChunkMesh, ChunkMesher, CulledMesher, MeshVertex, TileSource};
pub use scheduler::{MeshCache, RebuildReport, RebuildScheduler};
