//! Fills freshly created chunks.

use std::sync::Arc;

use strata_voxel::{CHUNK_HEIGHT, CHUNK_WIDTH, Chunk, StandardTiles};

use crate::structure::{StructurePlacer, StructureTemplate};
use crate::surface::SurfaceSampler;

/// Deterministic content for a chunk that has no saved data.
///
/// Implementations must be pure functions of their configuration and the
/// chunk coordinate: they run on worker threads in arbitrary order.
pub trait ChunkGenerator: Send + Sync {
    /// Write the chunk's initial tiles in place.
    fn generate(&self, chunk: &mut Chunk);
}

/// Layered stone/dirt/grass columns from a [`SurfaceSampler`], decorated with
/// trees and bushes.
pub struct TerrainGenerator {
    seed: u64,
    tiles: StandardTiles,
    surface: Arc<dyn SurfaceSampler>,
    placer: StructurePlacer,
}

impl TerrainGenerator {
    /// Create a generator with the standard tree and bush templates.
    pub fn new(seed: u64, tiles: StandardTiles, surface: Arc<dyn SurfaceSampler>) -> Self {
        let templates = vec![
            StructureTemplate::tree(tiles.log, tiles.leaves),
            StructureTemplate::bush(tiles.bush),
        ];
        let placer = StructurePlacer::new(seed, templates, Arc::clone(&surface));
        Self {
            seed,
            tiles,
            surface,
            placer,
        }
    }

    /// Replace the structure placer (e.g. different templates or density).
    pub fn with_placer(mut self, placer: StructurePlacer) -> Self {
        self.placer = placer;
        self
    }

    pub fn placer(&self) -> &StructurePlacer {
        &self.placer
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn generate(&self, chunk: &mut Chunk) {
        let (ox, oz) = chunk.coord().origin();
        let data = chunk.data_mut();
        for lz in 0..CHUNK_WIDTH {
            for lx in 0..CHUNK_WIDTH {
                let surface = self
                    .surface
                    .find_surface(self.seed, ox + lx as i32, oz + lz as i32)
                    .clamp(0, CHUNK_HEIGHT as i32 - 1) as usize;
                let stone_top = surface.saturating_sub(3);
                data.fill_column(lx, lz, 0..stone_top, self.tiles.stone);
                data.fill_column(lx, lz, stone_top..surface, self.tiles.dirt);
                data.set(lx, surface, lz, self.tiles.grass);
            }
        }

        let written = self.placer.apply(chunk);
        tracing::trace!("Generated chunk {:?} ({} structure tiles)", chunk.coord(), written);
    }
}
