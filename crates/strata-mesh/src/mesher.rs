//! Culled-face chunk meshing.
//!
//! Every non-air tile emits one quad per face whose neighbor does not hide it
//! (see [`TileRegistry::should_render_face`]). Faces on the chunk border look
//! the neighbor up through a [`TileSource`] so seams against loaded chunks are
//! culled too.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use strata_voxel::{CHUNK_HEIGHT, CHUNK_WIDTH, Chunk, Face, RenderLayer, TileRegistry, TileTypeId};
use strata_world::ChunkStore;

/// GPU vertex for chunk geometry. Positions are chunk-local.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Tile type for material lookup.
    pub tile: u32,
}

static_assertions::assert_eq_size!(MeshVertex, [u8; 36]);

/// Vertex and index buffers for one render layer of one chunk.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
    pub vertices: Vec<MeshVertex>,
    /// Triangle list, 6 indices per quad.
    pub indices: Vec<u32>,
    /// Face of each emitted quad.
    pub faces: Vec<Face>,
}

impl ChunkMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the unit quad covering `face` of the tile at local `(x, y, z)`.
    pub fn push_quad(&mut self, face: Face, (x, y, z): (usize, usize, usize), tile: TileTypeId) {
        let (layer_axis, u_axis, v_axis) = face.sweep_axes();
        let local = [x as f32, y as f32, z as f32];
        let layer_pos = if face.is_positive() {
            local[layer_axis] + 1.0
        } else {
            local[layer_axis]
        };
        let (u, v) = (local[u_axis], local[v_axis]);

        let corners = [(u, v), (u + 1.0, v), (u + 1.0, v + 1.0), (u, v + 1.0)];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let normal = face.normal();
        let base = self.vertices.len() as u32;

        for (&(cu, cv), uv) in corners.iter().zip(uvs) {
            let mut position = [0.0_f32; 3];
            position[layer_axis] = layer_pos;
            position[u_axis] = cu;
            position[v_axis] = cv;
            self.vertices.push(MeshVertex {
                position,
                normal,
                uv,
                tile: u32::from(tile.0),
            });
        }

        // CCW from outside for positive faces, reversed for negative ones.
        if face.is_positive() {
            self.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        } else {
            self.indices
                .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }
        self.faces.push(face);
    }

    pub fn quad_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Number of quads facing `face`.
    pub fn count_faces(&self, face: Face) -> usize {
        self.faces.iter().filter(|&&f| f == face).count()
    }
}

/// Tile lookups outside the chunk being meshed, in absolute coordinates.
pub trait TileSource {
    /// Tile at `(x, y, z)`, air if unknown.
    fn tile(&self, x: i32, y: i32, z: i32) -> TileTypeId;

    /// Whether the face of the tile at `(x, y, z)` pointing along `face` is lit.
    fn is_lit(&self, _x: i32, _y: i32, _z: i32, _face: Face) -> bool {
        true
    }
}

impl TileSource for ChunkStore {
    fn tile(&self, x: i32, y: i32, z: i32) -> TileTypeId {
        self.get_tile(x, y, z)
    }
}

/// Turns the tile contents of a chunk into geometry for one render layer.
pub trait ChunkMesher: Send + Sync {
    /// Builds `layer` for `chunk`. The chunk itself must not be looked up
    /// through `world`, the caller may hold its lock.
    fn build(&self, chunk: &Chunk, world: &dyn TileSource, layer: RenderLayer) -> ChunkMesh;
}

/// One quad per exposed face, no merging.
pub struct CulledMesher {
    registry: Arc<TileRegistry>,
}

impl CulledMesher {
    pub fn new(registry: Arc<TileRegistry>) -> Self {
        Self { registry }
    }

    fn neighbor(chunk: &Chunk, world: &dyn TileSource, (x, y, z): (i32, i32, i32)) -> TileTypeId {
        let width = CHUNK_WIDTH as i32;
        if !(0..CHUNK_HEIGHT as i32).contains(&y) {
            return TileTypeId::AIR;
        }
        if (0..width).contains(&x) && (0..width).contains(&z) {
            return chunk.get(x, y, z);
        }
        let (ox, oz) = chunk.coord().origin();
        world.tile(ox + x, y, oz + z)
    }
}

impl ChunkMesher for CulledMesher {
    fn build(&self, chunk: &Chunk, world: &dyn TileSource, layer: RenderLayer) -> ChunkMesh {
        let mut mesh = ChunkMesh::new();
        if chunk.data().is_empty() {
            return mesh;
        }
        let (ox, oz) = chunk.coord().origin();

        for y in 0..CHUNK_HEIGHT {
            for z in 0..CHUNK_WIDTH {
                for x in 0..CHUNK_WIDTH {
                    let tile = chunk.data().get(x, y, z);
                    if tile == TileTypeId::AIR {
                        continue;
                    }
                    let (lx, ly, lz) = (x as i32, y as i32, z as i32);
                    for face in Face::ALL {
                        let (dx, dy, dz) = face.offset();
                        let neighbor = Self::neighbor(chunk, world, (lx + dx, ly + dy, lz + dz));
                        if !self.registry.should_render_face(tile, neighbor) {
                            continue;
                        }
                        let lit = world.is_lit(ox + lx, ly, oz + lz, face);
                        let target = if lit { RenderLayer::Lit } else { RenderLayer::Unlit };
                        if target == layer {
                            mesh.push_quad(face, (x, y, z), tile);
                        }
                    }
                }
            }
        }
        mesh
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
