//! Chunk residency for the Strata client.
//!
//! [`ChunkStore`] owns the coordinate → chunk map and moves chunks between the
//! absent, pending and resident states on a background worker pool. Tile edits
//! go through the store so dirty propagation and listener notification happen
//! in one place. [`ChunkStreamer`] keeps the resident set centered on the viewer.

mod context;
mod dirty;
mod persistence;
mod store;
mod streaming;

pub use context::{WorldContext, WorldError};
pub use dirty::{DirtyClock, DirtyTracker};
pub use persistence::{ChunkPersistence, FilePersistence, MemoryPersistence, NullPersistence, PersistenceError};
pub use store::{ChunkState, ChunkStore, ResidentChunk, SharedChunk, StoreStats};
pub use streaming::{ChunkLoadQueue, ChunkStreamer, StreamConfig, StreamTickResult};
