//! Tile type registry: maps compact [`TileTypeId`] values to [`TileDef`] records.
//!
//! Each tile type is a plain data record plus a [`TileBehavior`] handle for the
//! handful of per-type hooks (random tick, face selection, destruction). The
//! registry is assembled once with [`TileRegistryBuilder`] and is immutable
//! afterwards. Air is always ID 0.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact identifier stored in every tile cell (2 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileTypeId(pub u16);

impl TileTypeId {
    /// The empty tile.
    pub const AIR: TileTypeId = TileTypeId(0);
}

/// Absolute-coordinate world handle that tile behaviors act on.
pub trait TileWorld {
    /// Tile at `(x, y, z)`, air when the position is not loaded.
    fn tile(&self, x: i32, y: i32, z: i32) -> TileTypeId;

    /// Writes a tile; returns `true` if the stored value changed.
    fn set_tile(&self, x: i32, y: i32, z: i32, tile: TileTypeId) -> bool;
}

/// Per-type hooks. Every method has a default so plain tiles need no code.
pub trait TileBehavior: Send + Sync {
    /// Called for randomly selected positions of this tile type.
    fn tick(&self, _world: &dyn TileWorld, _pos: (i32, i32, i32), _registry: &TileRegistry, _rng: &mut dyn RngCore) {}

    /// Whether the face of a tile of this type shared with `neighbor` is drawn.
    fn should_render_face(&self, registry: &TileRegistry, _this: TileTypeId, neighbor: TileTypeId) -> bool {
        !registry.blocks_light(neighbor)
    }

    /// Called after a tile of this type has been removed from the world.
    fn on_destroy(&self, _world: &dyn TileWorld, _pos: (i32, i32, i32)) {}
}

/// Full descriptor for a tile type.
#[derive(Clone)]
pub struct TileDef {
    /// Human-readable name (e.g. "stone", "grass").
    pub name: String,
    /// Whether rays and entities stop at this tile.
    pub solid: bool,
    /// Whether the tile occludes light and hides neighboring faces.
    pub blocks_light: bool,
    /// Per-type hooks.
    pub behavior: Arc<dyn TileBehavior>,
}

impl TileDef {
    /// A solid, light-blocking tile with default behavior.
    pub fn opaque(name: &str) -> Self {
        Self {
            name: name.to_string(),
            solid: true,
            blocks_light: true,
            behavior: Arc::new(SolidTile),
        }
    }
}

impl fmt::Debug for TileDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileDef")
            .field("name", &self.name)
            .field("solid", &self.solid)
            .field("blocks_light", &self.blocks_light)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur during tile type registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with the same name has already been registered.
    #[error("duplicate tile type name: {0}")]
    DuplicateName(String),
    /// All 65 536 slots have been consumed.
    #[error("tile type registry is full (max 65536 types)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Behaviors
// ---------------------------------------------------------------------------

/// Default behavior for inert tiles.
#[derive(Debug, Default)]
pub struct SolidTile;

impl TileBehavior for SolidTile {}

/// Grass dies back to dirt once something light-blocking sits on top of it.
#[derive(Debug)]
pub struct GrassTile {
    /// Tile grass decays into.
    pub dirt: TileTypeId,
}

impl TileBehavior for GrassTile {
    fn tick(&self, world: &dyn TileWorld, (x, y, z): (i32, i32, i32), registry: &TileRegistry, _rng: &mut dyn RngCore) {
        if registry.blocks_light(world.tile(x, y + 1, z)) {
            world.set_tile(x, y, z, self.dirt);
        }
    }
}

/// Leaves hide the faces they share with other leaves.
#[derive(Debug, Default)]
pub struct LeafTile;

impl TileBehavior for LeafTile {
    fn should_render_face(&self, registry: &TileRegistry, this: TileTypeId, neighbor: TileTypeId) -> bool {
        neighbor != this && !registry.blocks_light(neighbor)
    }
}

/// Small plant that pops off when its supporting ground disappears.
#[derive(Debug)]
pub struct BushTile {
    /// Tiles a bush may stand on.
    pub soil: Vec<TileTypeId>,
}

impl TileBehavior for BushTile {
    fn tick(&self, world: &dyn TileWorld, (x, y, z): (i32, i32, i32), _registry: &TileRegistry, _rng: &mut dyn RngCore) {
        if !self.soil.contains(&world.tile(x, y - 1, z)) {
            world.set_tile(x, y, z, TileTypeId::AIR);
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Mutable registration phase. Call [`TileRegistryBuilder::build`] to freeze.
pub struct TileRegistryBuilder {
    types: Vec<TileDef>,
    name_to_id: HashMap<String, TileTypeId>,
}

impl TileRegistryBuilder {
    /// Starts a registry with air pre-registered as ID 0.
    pub fn new() -> Self {
        let air = TileDef {
            name: "air".to_string(),
            solid: false,
            blocks_light: false,
            behavior: Arc::new(SolidTile),
        };
        let mut name_to_id = HashMap::new();
        name_to_id.insert(air.name.clone(), TileTypeId::AIR);
        Self {
            types: vec![air],
            name_to_id,
        }
    }

    /// Registers a tile type and returns its ID (assigned sequentially from 1).
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is taken,
    /// [`RegistryError::RegistryFull`] once all IDs are used.
    pub fn register(&mut self, def: TileDef) -> Result<TileTypeId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.types.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }
        let id = TileTypeId(self.types.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.types.push(def);
        Ok(id)
    }

    /// Freezes the registry.
    pub fn build(self) -> TileRegistry {
        TileRegistry {
            types: self.types,
            name_to_id: self.name_to_id,
        }
    }
}

impl Default for TileRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// IDs of the built-in tile set returned by [`TileRegistry::standard`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StandardTiles {
    pub air: TileTypeId,
    pub stone: TileTypeId,
    pub dirt: TileTypeId,
    pub grass: TileTypeId,
    pub log: TileTypeId,
    pub leaves: TileTypeId,
    pub bush: TileTypeId,
}

/// Immutable arena of tile definitions where `index == TileTypeId.0`.
pub struct TileRegistry {
    types: Vec<TileDef>,
    name_to_id: HashMap<String, TileTypeId>,
}

impl TileRegistry {
    /// The built-in tile set.
    pub fn standard() -> Result<(Self, StandardTiles), RegistryError> {
        let mut builder = TileRegistryBuilder::new();
        let stone = builder.register(TileDef::opaque("stone"))?;
        let dirt = builder.register(TileDef::opaque("dirt"))?;
        let grass = builder.register(TileDef {
            behavior: Arc::new(GrassTile { dirt }),
            ..TileDef::opaque("grass")
        })?;
        let log = builder.register(TileDef::opaque("log"))?;
        let leaves = builder.register(TileDef {
            name: "leaves".to_string(),
            solid: true,
            blocks_light: false,
            behavior: Arc::new(LeafTile),
        })?;
        let bush = builder.register(TileDef {
            name: "bush".to_string(),
            solid: false,
            blocks_light: false,
            behavior: Arc::new(BushTile {
                soil: vec![grass, dirt],
            }),
        })?;
        let ids = StandardTiles {
            air: TileTypeId::AIR,
            stone,
            dirt,
            grass,
            log,
            leaves,
            bush,
        };
        Ok((builder.build(), ids))
    }

    /// Definition for `id`, or `None` if the ID was never registered.
    pub fn get(&self, id: TileTypeId) -> Option<&TileDef> {
        self.types.get(id.0 as usize)
    }

    /// ID for a named type.
    pub fn lookup_by_name(&self, name: &str) -> Option<TileTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Number of registered types, air included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }

    /// Solid tiles stop rays. Unknown IDs are treated like air.
    pub fn is_solid(&self, id: TileTypeId) -> bool {
        self.get(id).is_some_and(|def| def.solid)
    }

    /// Light-blocking tiles hide adjacent faces. Unknown IDs are treated like air.
    pub fn blocks_light(&self, id: TileTypeId) -> bool {
        self.get(id).is_some_and(|def| def.blocks_light)
    }

    /// Behavior handle for `id`, if registered.
    pub fn behavior(&self, id: TileTypeId) -> Option<&Arc<dyn TileBehavior>> {
        self.get(id).map(|def| &def.behavior)
    }

    /// Whether the face of `this` that touches `neighbor` should be drawn.
    pub fn should_render_face(&self, this: TileTypeId, neighbor: TileTypeId) -> bool {
        match self.behavior(this) {
            Some(behavior) => behavior.should_render_face(self, this, neighbor),
            None => false,
        }
    }
}

impl fmt::Debug for TileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileRegistry").field("types", &self.types).finish()
    }
}
