//! Tile storage for the streamed block world: chunk coordinates, chunk data with
//! dirty/mesh state, the capability-based tile registry, and edit notification.

pub mod chunk;
pub mod chunk_api;
pub mod chunk_serial;
pub mod coords;
pub mod events;
pub mod face;
pub mod registry;

pub use chunk::{CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, ChunkData};
pub use chunk_api::{Chunk, LayerMeshState, RenderLayer};
pub use chunk_serial::ChunkSerError;
pub use coords::{ChunkCoord, LocalPos, split_world};
pub use events::{ListenerId, TileChangedEvent, TileEventBuffer, WorldListener};
pub use face::Face;
pub use registry::{
    BushTile, GrassTile, LeafTile, RegistryError, SolidTile, StandardTiles, TileBehavior, TileDef,
    TileRegistry, TileRegistryBuilder, TileTypeId, TileWorld,
};
