//! Deterministic world content: chunk seeds, surface heights, structure placement,
//! and the terrain generator that fills freshly created chunks.

mod generator;
mod seed;
mod structure;
mod surface;

pub use generator::{ChunkGenerator, TerrainGenerator};
pub use seed::{chunk_rng, chunk_seed};
pub use structure::{
    DEFAULT_PLACEMENT_CHANCE, MAX_PLACEMENT_ATTEMPTS, StructurePlacement, StructurePlacer, StructureTemplate,
    TemplateBlock, resolve_overlaps,
};
pub use surface::{FlatSurface, HeightmapParams, NoiseSurface, SurfaceSampler};
