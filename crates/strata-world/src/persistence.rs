//! Load/save collaborators for chunk tile data.
//!
//! Persistence runs on the store's worker threads, never on the caller's.
//! `Ok(None)` from [`ChunkPersistence::load`] means "no saved data, generate it".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;
use strata_voxel::{ChunkCoord, ChunkData, ChunkSerError};

/// Errors produced by persistence backends.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem failure.
    #[error("chunk I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Saved bytes could not be decoded.
    #[error("chunk data is corrupt: {0}")]
    Decode(#[from] ChunkSerError),
}

/// Storage backend for chunk tile data.
pub trait ChunkPersistence: Send + Sync {
    /// Saved data for `coord`, or `None` if the chunk was never saved.
    fn load(&self, coord: ChunkCoord) -> Result<Option<ChunkData>, PersistenceError>;

    /// Stores `data` for `coord`, replacing any earlier save.
    fn save(&self, coord: ChunkCoord, data: &ChunkData) -> Result<(), PersistenceError>;
}

/// One `c.<x>.<z>.chunk` file per chunk in a save directory.
#[derive(Clone, Debug)]
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    /// Use `dir` as the save directory. It is created on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `coord`.
    pub fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.dir.join(format!("c.{}.{}.chunk", coord.x, coord.z))
    }
}

impl ChunkPersistence for FilePersistence {
    fn load(&self, coord: ChunkCoord) -> Result<Option<ChunkData>, PersistenceError> {
        let bytes = match std::fs::read(self.chunk_path(coord)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(ChunkData::deserialize(&bytes)?))
    }

    /// Writes to a temporary sibling and renames it over the target, so a crash
    /// mid-write never leaves a truncated chunk behind.
    fn save(&self, coord: ChunkCoord, data: &ChunkData) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.chunk_path(coord);
        let tmp = path.with_extension("chunk.tmp");
        std::fs::write(&tmp, data.serialize())?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Never has saved data and discards saves.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPersistence;

impl ChunkPersistence for NullPersistence {
    fn load(&self, _coord: ChunkCoord) -> Result<Option<ChunkData>, PersistenceError> {
        Ok(None)
    }

    fn save(&self, _coord: ChunkCoord, _data: &ChunkData) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// In-process store, for tools and tests that want saves to survive an unload
/// without touching disk.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    chunks: Mutex<FxHashMap<ChunkCoord, ChunkData>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the saved data for `coord`.
    pub fn get(&self, coord: ChunkCoord) -> Option<ChunkData> {
        self.lock().get(&coord).cloned()
    }

    /// Seeds saved data directly.
    pub fn insert(&self, coord: ChunkCoord, data: ChunkData) {
        self.lock().insert(coord, data);
    }

    /// Number of saved chunks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<ChunkCoord, ChunkData>> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChunkPersistence for MemoryPersistence {
    fn load(&self, coord: ChunkCoord) -> Result<Option<ChunkData>, PersistenceError> {
        Ok(self.get(coord))
    }

    fn save(&self, coord: ChunkCoord, data: &ChunkData) -> Result<(), PersistenceError> {
        self.insert(coord, data.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_voxel::TileTypeId;

    use super::*;

    fn sample_data() -> ChunkData {
        let mut data = ChunkData::new_air();
        data.fill_column(3, 4, 0..12, TileTypeId(2));
        data.set(15, 63, 0, TileTypeId(5));
        data
    }

    #[test]
    fn test_file_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path().join("world"));
        let coord = ChunkCoord::new(-3, 7);

        assert!(persistence.load(coord).unwrap().is_none(), "nothing saved yet");

        persistence.save(coord, &sample_data()).unwrap();
        assert!(persistence.chunk_path(coord).ends_with("c.-3.7.chunk"));
        assert_eq!(persistence.load(coord).unwrap(), Some(sample_data()));
        assert!(!persistence.chunk_path(coord).with_extension("chunk.tmp").exists());
    }

    #[test]
    fn test_file_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path());
        let coord = ChunkCoord::new(0, 0);

        persistence.save(coord, &ChunkData::new_air()).unwrap();
        persistence.save(coord, &sample_data()).unwrap();
        assert_eq!(persistence.load(coord).unwrap(), Some(sample_data()));
    }

    #[test]
    fn test_corrupt_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path());
        let coord = ChunkCoord::new(1, 1);
        std::fs::write(persistence.chunk_path(coord), b"garbage").unwrap();

        let err = persistence.load(coord).unwrap_err();
        assert!(matches!(err, PersistenceError::Decode(_)), "{err}");
    }

    #[test]
    fn test_null_persistence_forgets() {
        let coord = ChunkCoord::new(0, 0);
        NullPersistence.save(coord, &sample_data()).unwrap();
        assert!(NullPersistence.load(coord).unwrap().is_none());
    }

    #[test]
    fn test_memory_persistence_keeps_saves() {
        let persistence = MemoryPersistence::new();
        let coord = ChunkCoord::new(9, -9);
        assert!(persistence.is_empty());
        persistence.save(coord, &sample_data()).unwrap();
        assert_eq!(persistence.load(coord).unwrap(), Some(sample_data()));
        assert_eq!(persistence.len(), 1);
    }
}
