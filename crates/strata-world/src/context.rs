//! Startup wiring for a world: registry, generator and persistence, built once
//! and handed to the components that need them.

use std::path::PathBuf;
use std::sync::Arc;

use strata_terrain::{ChunkGenerator, HeightmapParams, NoiseSurface, SurfaceSampler, TerrainGenerator};
use strata_voxel::{RegistryError, StandardTiles, TileRegistry};

use crate::persistence::{ChunkPersistence, FilePersistence, NullPersistence};
use crate::store::ChunkStore;

/// Errors raised while assembling a world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The tile registry could not be built.
    #[error("tile registry: {0}")]
    Registry(#[from] RegistryError),
    /// A worker thread could not be spawned.
    #[error("failed to start chunk workers: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Everything a [`ChunkStore`] is built from.
#[derive(Clone)]
pub struct WorldContext {
    pub seed: u64,
    pub registry: Arc<TileRegistry>,
    pub tiles: StandardTiles,
    pub surface: Arc<dyn SurfaceSampler>,
    pub generator: Arc<dyn ChunkGenerator>,
    pub persistence: Arc<dyn ChunkPersistence>,
}

impl WorldContext {
    /// Standard tiles and noise terrain for `seed`, saving under `save_dir`
    /// (or nowhere when `None`).
    pub fn standard(seed: u64, save_dir: Option<PathBuf>) -> Result<Self, WorldError> {
        let (registry, tiles) = TileRegistry::standard()?;
        let surface: Arc<dyn SurfaceSampler> = Arc::new(NoiseSurface::new(seed, HeightmapParams::default()));
        let generator = Arc::new(TerrainGenerator::new(seed, tiles, Arc::clone(&surface)));
        let persistence: Arc<dyn ChunkPersistence> = match save_dir {
            Some(dir) => Arc::new(FilePersistence::new(dir)),
            None => Arc::new(NullPersistence),
        };
        tracing::info!("World context ready (seed {:#x}, {} tile types)", seed, registry.len());
        Ok(Self {
            seed,
            registry: Arc::new(registry),
            tiles,
            surface,
            generator,
            persistence,
        })
    }

    /// Swap the persistence backend.
    pub fn with_persistence(mut self, persistence: Arc<dyn ChunkPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    /// Swap the generator.
    pub fn with_generator(mut self, generator: Arc<dyn ChunkGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Build a store with `worker_threads` background workers.
    pub fn create_store(&self, worker_threads: usize) -> Result<ChunkStore, WorldError> {
        Ok(ChunkStore::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.generator),
            Arc::clone(&self.persistence),
            worker_threads,
        )?)
    }
}
