//! Seeded placement of multi-block structures that may straddle chunk borders.
//!
//! Every chunk derives its own candidate placements from its seed alone. To
//! write a chunk, the placer gathers candidates from all chunks close enough to
//! reach it, drops overlapping candidates with an order-independent rule, and
//! writes the survivors that intersect the chunk. Two chunks that share a
//! cluster of candidates therefore agree on which one survives, whatever order
//! they are generated in.

use std::sync::Arc;

use rand::Rng;
use rustc_hash::FxHashSet;
use strata_voxel::{CHUNK_HEIGHT, CHUNK_WIDTH, Chunk, ChunkCoord, TileTypeId};

use crate::seed::chunk_rng;
use crate::surface::SurfaceSampler;

/// Default probability of each further placement attempt in a chunk.
pub const DEFAULT_PLACEMENT_CHANCE: f64 = 0.5;

/// Upper bound on placement attempts per chunk.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 32;

/// One tile of a template, relative to the template's minimum corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemplateBlock {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub tile: TileTypeId,
}

/// A multi-block feature with a fixed bounding box.
#[derive(Clone, Debug)]
pub struct StructureTemplate {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub blocks: Vec<TemplateBlock>,
}

impl StructureTemplate {
    /// A 5×7×5 tree: five logs topped by a rounded crown.
    pub fn tree(log: TileTypeId, leaves: TileTypeId) -> Self {
        let mut blocks = Vec::new();
        for dy in 0..5 {
            blocks.push(TemplateBlock { dx: 2, dy, dz: 2, tile: log });
        }
        for dy in 3..5 {
            for dx in 0..5 {
                for dz in 0..5 {
                    let corner = (dx == 0 || dx == 4) && (dz == 0 || dz == 4);
                    let trunk = dx == 2 && dz == 2;
                    if !corner && !trunk {
                        blocks.push(TemplateBlock { dx, dy, dz, tile: leaves });
                    }
                }
            }
        }
        for dx in 1..4 {
            for dz in 1..4 {
                blocks.push(TemplateBlock { dx, dy: 5, dz, tile: leaves });
            }
        }
        for (dx, dz) in [(2, 2), (1, 2), (3, 2), (2, 1), (2, 3)] {
            blocks.push(TemplateBlock { dx, dy: 6, dz, tile: leaves });
        }
        Self {
            name: "tree".to_string(),
            width: 5,
            height: 7,
            depth: 5,
            blocks,
        }
    }

    /// A single bush tile.
    pub fn bush(bush: TileTypeId) -> Self {
        Self {
            name: "bush".to_string(),
            width: 1,
            height: 1,
            depth: 1,
            blocks: vec![TemplateBlock { dx: 0, dy: 0, dz: 0, tile: bush }],
        }
    }

    /// Largest extent along any axis.
    pub fn max_dimension(&self) -> i32 {
        self.width.max(self.height).max(self.depth)
    }
}

/// A template instantiated at a world origin (its bounding-box minimum corner).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StructurePlacement {
    /// Index into the placer's template list.
    pub template: usize,
    /// Minimum corner `(x0, y0, z0)` in world block coordinates.
    pub origin: (i32, i32, i32),
    /// Bounding box size `(width, height, depth)`.
    pub size: (i32, i32, i32),
}

impl StructurePlacement {
    /// Exclusive maximum corner.
    pub fn max(&self) -> (i32, i32, i32) {
        (
            self.origin.0 + self.size.0,
            self.origin.1 + self.size.1,
            self.origin.2 + self.size.2,
        )
    }

    /// AABB overlap on all three axes.
    pub fn intersects(&self, other: &StructurePlacement) -> bool {
        let (a_max, b_max) = (self.max(), other.max());
        self.origin.0 < b_max.0
            && other.origin.0 < a_max.0
            && self.origin.1 < b_max.1
            && other.origin.1 < a_max.1
            && self.origin.2 < b_max.2
            && other.origin.2 < a_max.2
    }

    /// Whether the footprint covers any column of `coord`.
    pub fn intersects_chunk(&self, coord: ChunkCoord) -> bool {
        let (ox, oz) = coord.origin();
        let max = self.max();
        let width = CHUNK_WIDTH as i32;
        self.origin.0 < ox + width && ox < max.0 && self.origin.2 < oz + width && oz < max.2
    }

    /// Total order used to pick the survivor of an overlap.
    pub fn priority_key(&self) -> (i32, i32, i32, usize) {
        (self.origin.0, self.origin.1, self.origin.2, self.template)
    }
}

/// Deterministic structure scattering for one world seed.
pub struct StructurePlacer {
    world_seed: u64,
    templates: Vec<StructureTemplate>,
    surface: Arc<dyn SurfaceSampler>,
    placement_chance: f64,
}

impl StructurePlacer {
    /// Create a placer for `templates`.
    pub fn new(world_seed: u64, templates: Vec<StructureTemplate>, surface: Arc<dyn SurfaceSampler>) -> Self {
        Self {
            world_seed,
            templates,
            surface,
            placement_chance: DEFAULT_PLACEMENT_CHANCE,
        }
    }

    /// Override the per-attempt placement probability (clamped to `[0, 1]`).
    pub fn with_placement_chance(mut self, chance: f64) -> Self {
        self.placement_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn templates(&self) -> &[StructureTemplate] {
        &self.templates
    }

    pub fn world_seed(&self) -> u64 {
        self.world_seed
    }

    /// Candidate placements seeded by `coord`, before overlap resolution.
    ///
    /// A pure function of `(world_seed, coord)`. Each accepted attempt draws a
    /// template and an anchor column inside the chunk; the structure stands one
    /// block above the surface at the anchor, centered on it.
    pub fn placements_for_chunk(&self, coord: ChunkCoord) -> Vec<StructurePlacement> {
        let mut placements = Vec::new();
        if self.templates.is_empty() {
            return placements;
        }

        let mut rng = chunk_rng(self.world_seed, coord);
        let (ox, oz) = coord.origin();
        let width = CHUNK_WIDTH as i32;

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            if !rng.random_bool(self.placement_chance) {
                break;
            }
            let template_index = rng.random_range(0..self.templates.len());
            let anchor_x = ox + rng.random_range(0..width);
            let anchor_z = oz + rng.random_range(0..width);

            let template = &self.templates[template_index];
            let y0 = self.surface.find_surface(self.world_seed, anchor_x, anchor_z) + 1;
            placements.push(StructurePlacement {
                template: template_index,
                origin: (anchor_x - template.width / 2, y0, anchor_z - template.depth / 2),
                size: (template.width, template.height, template.depth),
            });
        }

        placements
    }

    /// How many chunks away a candidate can originate and still reach a chunk.
    pub fn search_radius(&self) -> i32 {
        let max_dimension = self
            .templates
            .iter()
            .map(StructureTemplate::max_dimension)
            .max()
            .unwrap_or(0);
        (max_dimension + CHUNK_WIDTH as i32 - 1) / CHUNK_WIDTH as i32
    }

    /// Candidates from every chunk within [`search_radius`](Self::search_radius).
    pub fn gather(&self, coord: ChunkCoord) -> Vec<StructurePlacement> {
        let radius = self.search_radius();
        let mut gathered = Vec::new();
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                gathered.extend(self.placements_for_chunk(coord.offset(dx, dz)));
            }
        }
        gathered
    }

    /// Surviving placements that actually touch `coord`.
    pub fn placements_intersecting(&self, coord: ChunkCoord) -> Vec<StructurePlacement> {
        let mut survivors = resolve_overlaps(&self.gather(coord));
        survivors.retain(|placement| placement.intersects_chunk(coord));
        survivors
    }

    /// Writes the structures that touch the chunk, clipped to it, over air only.
    ///
    /// Returns the number of tiles written.
    pub fn apply(&self, chunk: &mut Chunk) -> usize {
        let placements = self.placements_intersecting(chunk.coord());
        self.apply_placements(chunk, &placements)
    }

    /// Writes `placements` into `chunk`, clipped to it, over air only.
    /// Placements are taken as given, without overlap resolution.
    pub fn apply_placements(&self, chunk: &mut Chunk, placements: &[StructurePlacement]) -> usize {
        let (ox, oz) = chunk.coord().origin();
        let mut written = 0;

        for placement in placements {
            let Some(template) = self.templates.get(placement.template) else {
                continue;
            };
            let (x0, y0, z0) = placement.origin;
            for block in &template.blocks {
                let lx = x0 + block.dx - ox;
                let y = y0 + block.dy;
                let lz = z0 + block.dz - oz;
                if !local_in_bounds(lx, y, lz) {
                    continue;
                }
                let data = chunk.data_mut();
                let (lx, y, lz) = (lx as usize, y as usize, lz as usize);
                if data.get(lx, y, lz) == TileTypeId::AIR {
                    data.set(lx, y, lz, block.tile);
                    written += 1;
                }
            }
        }

        written
    }
}

/// Drops every placement that intersects another placement with a smaller
/// [`priority_key`](StructurePlacement::priority_key).
///
/// The result does not depend on input order and is sorted by origin.
pub fn resolve_overlaps(placements: &[StructurePlacement]) -> Vec<StructurePlacement> {
    let mut unique: Vec<StructurePlacement> = placements
        .iter()
        .copied()
        .collect::<FxHashSet<_>>()
        .into_iter()
        .collect();
    unique.sort_by_key(StructurePlacement::priority_key);

    unique
        .iter()
        .enumerate()
        .filter(|(i, placement)| !unique[..*i].iter().any(|earlier| earlier.intersects(placement)))
        .map(|(_, placement)| *placement)
        .collect()
}

fn local_in_bounds(x: i32, y: i32, z: i32) -> bool {
    (0..CHUNK_WIDTH as i32).contains(&x)
        && (0..CHUNK_HEIGHT as i32).contains(&y)
        && (0..CHUNK_WIDTH as i32).contains(&z)
}

#[cfg(test)]
mod tests {
    use strata_voxel::TileRegistry;

    use super::*;
    use crate::surface::FlatSurface;

    fn placement(x: i32, y: i32, z: i32, width: i32) -> StructurePlacement {
        StructurePlacement {
            template: 0,
            origin: (x, y, z),
            size: (width, width, width),
        }
    }

    fn placer(seed: u64) -> StructurePlacer {
        let (_, tiles) = TileRegistry::standard().unwrap();
        StructurePlacer::new(
            seed,
            vec![
                StructureTemplate::tree(tiles.log, tiles.leaves),
                StructureTemplate::bush(tiles.bush),
            ],
            Arc::new(FlatSurface(20)),
        )
    }

    #[test]
    fn test_placements_are_deterministic() {
        let a = placer(1234);
        let b = placer(1234);
        for x in -3..3 {
            for z in -3..3 {
                let coord = ChunkCoord::new(x, z);
                assert_eq!(a.placements_for_chunk(coord), b.placements_for_chunk(coord));
            }
        }
    }

    #[test]
    fn test_placements_vary_with_seed_and_chunk() {
        let a = placer(1);
        let all: Vec<_> = (0..16)
            .map(|x| a.placements_for_chunk(ChunkCoord::new(x, 0)))
            .collect();
        assert!(
            all.windows(2).any(|pair| pair[0] != pair[1]),
            "neighboring chunks should not all share one placement list"
        );
    }

    #[test]
    fn test_placement_anchor_inside_chunk_and_above_surface() {
        let placer = placer(99);
        for x in -4..4 {
            let coord = ChunkCoord::new(x, 2 * x);
            for p in placer.placements_for_chunk(coord) {
                let template = &placer.templates()[p.template];
                let anchor = (p.origin.0 + template.width / 2, p.origin.2 + template.depth / 2);
                assert_eq!(ChunkCoord::containing(anchor.0, anchor.1), coord);
                assert_eq!(p.origin.1, 21);
                assert_eq!(p.size, (template.width, template.height, template.depth));
            }
        }
    }

    #[test]
    fn test_zero_chance_places_nothing() {
        let placer = placer(5).with_placement_chance(0.0);
        assert!(placer.placements_for_chunk(ChunkCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn test_attempts_are_capped() {
        let placer = placer(5).with_placement_chance(1.0);
        assert_eq!(
            placer.placements_for_chunk(ChunkCoord::new(0, 0)).len(),
            MAX_PLACEMENT_ATTEMPTS as usize
        );
    }

    #[test]
    fn test_search_radius_covers_largest_template() {
        assert_eq!(placer(0).search_radius(), 1);
        let (_, tiles) = TileRegistry::standard().unwrap();
        let bushes = StructurePlacer::new(0, vec![StructureTemplate::bush(tiles.bush)], Arc::new(FlatSurface(0)));
        assert_eq!(bushes.search_radius(), 1);
        let none = StructurePlacer::new(0, Vec::new(), Arc::new(FlatSurface(0)));
        assert_eq!(none.search_radius(), 0);
    }

    #[test]
    fn test_overlap_keeps_smallest_origin_in_any_order() {
        let a = placement(0, 0, 0, 5);
        let b = placement(3, 0, 0, 5);
        assert!(a.intersects(&b));
        assert_eq!(resolve_overlaps(&[a, b]), vec![a]);
        assert_eq!(resolve_overlaps(&[b, a]), vec![a]);
    }

    #[test]
    fn test_disjoint_placements_all_survive() {
        let a = placement(0, 0, 0, 5);
        let b = placement(5, 0, 0, 5);
        let c = placement(0, 10, 0, 5);
        assert!(!a.intersects(&b), "touching boxes do not overlap");
        assert_eq!(resolve_overlaps(&[c, b, a]), vec![a, c, b]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let a = placement(1, 2, 3, 4);
        assert_eq!(resolve_overlaps(&[a, a, a]), vec![a]);
    }

    #[test]
    fn test_neighbors_agree_on_shared_structures() {
        let placer = placer(31337);
        for x in -4..4 {
            let left = ChunkCoord::new(x, 0);
            let right = left.offset(1, 0);
            let from_left: Vec<_> = placer
                .placements_intersecting(left)
                .into_iter()
                .filter(|p| p.intersects_chunk(right))
                .collect();
            let from_right: Vec<_> = placer
                .placements_intersecting(right)
                .into_iter()
                .filter(|p| p.intersects_chunk(left))
                .collect();
            assert_eq!(from_left, from_right, "chunks {left:?} and {right:?} disagree");
        }
    }

    #[test]
    fn test_apply_clips_to_chunk_and_skips_solid() {
        let (_, tiles) = TileRegistry::standard().unwrap();
        let placer = StructurePlacer::new(
            0,
            vec![StructureTemplate::tree(tiles.log, tiles.leaves)],
            Arc::new(FlatSurface(20)),
        );
        // Trunk on world column (0, 7): only the dx >= 2 half reaches chunk (0, 0).
        let tree = StructurePlacement {
            template: 0,
            origin: (-2, 21, 5),
            size: (5, 7, 5),
        };

        let mut chunk = Chunk::new(ChunkCoord::new(0, 0));
        chunk.data_mut().set(0, 22, 7, tiles.stone);
        let written = placer.apply_placements(&mut chunk, &[tree]);

        // 5 logs + 24 + 6 + 4 leaves in the dx >= 2 half, minus the stone.
        assert_eq!(written, 38);
        assert_eq!(chunk.data().get(0, 21, 7), tiles.log);
        assert_eq!(chunk.data().get(0, 22, 7), tiles.stone, "existing tiles are kept");
        assert_eq!(chunk.data().get(0, 23, 7), tiles.log);
        assert_eq!(chunk.data().get(1, 24, 7), tiles.leaves);
        assert_eq!(chunk.data().get(2, 24, 6), tiles.leaves);
        assert_eq!(chunk.data().get(2, 24, 5), TileTypeId::AIR, "crown corner");
        assert_eq!(chunk.data().get(0, 27, 7), tiles.leaves, "crown tip");
        assert_eq!(chunk.data().get(15, 24, 7), TileTypeId::AIR, "no wrap-around");
        for y in 0..21 {
            assert_eq!(chunk.data().get(0, y, 7), TileTypeId::AIR, "nothing below the surface");
        }
    }

    #[test]
    fn test_apply_ignores_placements_outside_chunk() {
        let (_, tiles) = TileRegistry::standard().unwrap();
        let placer = StructurePlacer::new(0, vec![StructureTemplate::bush(tiles.bush)], Arc::new(FlatSurface(20)));
        let outside = StructurePlacement {
            template: 0,
            origin: (16, 21, 3),
            size: (1, 1, 1),
        };
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0));
        assert_eq!(placer.apply_placements(&mut chunk, &[outside]), 0);
        assert!(chunk.data().is_empty());
    }
}
