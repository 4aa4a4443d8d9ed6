//! Voxel raycasting using the DDA (Amanatides & Woo) algorithm.
//!
//! The ray visits every block boundary it crosses, in order, and stops at the
//! first solid block. All arithmetic is plain `f32` with a fixed evaluation
//! order, so identical inputs select identical blocks.

use glam::{IVec3, Vec3};
use strata_voxel::Face;
use strata_world::ChunkStore;

/// Default reach of the observer, in blocks.
pub const MAX_REACH_DISTANCE: f32 = 5.0;

/// Default ceiling on boundary crossings per ray.
pub const MAX_RAY_STEPS: u32 = 256;

/// Solidity lookup by absolute block coordinate.
pub trait BlockAccess {
    /// Whether the block at `(x, y, z)` stops rays. Unloaded blocks are not solid.
    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool;
}

impl BlockAccess for ChunkStore {
    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        ChunkStore::is_solid(self, x, y, z)
    }
}

/// How a ray ended up at its block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitKind {
    /// The ray entered the block through `face`.
    Block,
    /// The origin was already inside a solid block.
    Inside,
}

/// The first solid block along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitResult {
    pub kind: HitKind,
    /// Integer coordinate of the hit block.
    pub block: IVec3,
    /// Face the ray entered through. [`Face::Bottom`] for [`HitKind::Inside`].
    pub face: Face,
    /// Exact point where the ray crossed into the block.
    pub point: Vec3,
    /// Squared distance from the origin to `point`.
    pub distance_sq: f32,
}

impl HitResult {
    /// The block on the outside of the hit face, where a new block would go.
    pub fn adjacent(&self) -> IVec3 {
        let (dx, dy, dz) = self.face.offset();
        self.block + IVec3::new(dx, dy, dz)
    }

    pub fn distance(&self) -> f32 {
        self.distance_sq.sqrt()
    }
}

/// Unit view direction for an observer. Yaw 0 looks along −Z and grows
/// towards −X; positive pitch looks up. Angles are in radians.
pub fn look_direction(yaw: f32, pitch: f32) -> Vec3 {
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
}

/// Casts a ray with the default step ceiling.
///
/// Returns the first solid block within `max_distance` of `origin`, or `None`.
/// A zero-length `direction` only hits the block the origin is inside.
pub fn raycast(origin: Vec3, direction: Vec3, max_distance: f32, world: &dyn BlockAccess) -> Option<HitResult> {
    raycast_with_limit(origin, direction, max_distance, MAX_RAY_STEPS, world)
}

/// Casts a ray that gives up after `max_steps` boundary crossings.
pub fn raycast_with_limit(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    max_steps: u32,
    world: &dyn BlockAccess,
) -> Option<HitResult> {
    let start = origin.floor();
    let mut block = start.as_ivec3();

    if world.is_solid(block.x, block.y, block.z) {
        return Some(HitResult {
            kind: HitKind::Inside,
            block,
            face: Face::Bottom,
            point: origin,
            distance_sq: 0.0,
        });
    }

    let dir = direction.try_normalize()?;
    let step = IVec3::new(step_of(dir.x), step_of(dir.y), step_of(dir.z));
    let sub = origin - start;

    // Distance along the ray to cross one full block on each axis.
    let delta = Vec3::new(safe_inv(dir.x.abs()), safe_inv(dir.y.abs()), safe_inv(dir.z.abs()));

    // Distance along the ray to the first boundary on each axis.
    let mut side = Vec3::new(
        first_boundary(sub.x, dir.x, delta.x),
        first_boundary(sub.y, dir.y, delta.y),
        first_boundary(sub.z, dir.z, delta.z),
    );

    for _ in 0..max_steps {
        let (t, face) = if side.x < side.y && side.x < side.z {
            let t = side.x;
            side.x += delta.x;
            block.x += step.x;
            (t, if step.x > 0 { Face::West } else { Face::East })
        } else if side.y < side.z {
            let t = side.y;
            side.y += delta.y;
            block.y += step.y;
            (t, if step.y > 0 { Face::Bottom } else { Face::Top })
        } else {
            let t = side.z;
            side.z += delta.z;
            block.z += step.z;
            (t, if step.z > 0 { Face::North } else { Face::South })
        };

        if t > max_distance {
            return None;
        }

        if world.is_solid(block.x, block.y, block.z) {
            return Some(HitResult {
                kind: HitKind::Block,
                block,
                face,
                point: origin + dir * t,
                distance_sq: t * t,
            });
        }
    }

    None
}

fn step_of(component: f32) -> i32 {
    if component > 0.0 {
        1
    } else if component < 0.0 {
        -1
    } else {
        0
    }
}

/// `1 / x`, or `f32::MAX` when `x` is effectively zero.
fn safe_inv(x: f32) -> f32 {
    if x < f32::EPSILON { f32::MAX } else { 1.0 / x }
}

fn first_boundary(sub: f32, dir_component: f32, delta: f32) -> f32 {
    if dir_component > 0.0 {
        (1.0 - sub) * delta
    } else if dir_component < 0.0 {
        sub * delta
    } else {
        f32::MAX
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Default)]
    struct TestWorld {
        solid: HashSet<(i32, i32, i32)>,
    }

    impl TestWorld {
        fn set_solid(&mut self, x: i32, y: i32, z: i32) {
            self.solid.insert((x, y, z));
        }

        /// Hollow 10×10×10 room: floor at y = 0, ceiling at y = 11, walls at 0 and 11.
        fn room() -> Self {
            let mut world = Self::default();
            for a in 0..=11 {
                for b in 0..=11 {
                    world.set_solid(a, 0, b);
                    world.set_solid(a, 11, b);
                    world.set_solid(0, a, b);
                    world.set_solid(11, a, b);
                    world.set_solid(a, b, 0);
                    world.set_solid(a, b, 11);
                }
            }
            world
        }
    }

    impl BlockAccess for TestWorld {
        fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
            self.solid.contains(&(x, y, z))
        }
    }

    #[test]
    fn test_looking_down_at_floor() {
        let world = TestWorld::room();
        let origin = Vec3::new(5.5, 4.0, 5.5);
        let hit = raycast(origin, Vec3::NEG_Y, MAX_REACH_DISTANCE, &world).expect("floor in reach");

        assert_eq!(hit.kind, HitKind::Block);
        assert_eq!(hit.block, IVec3::new(5, 0, 5));
        assert_eq!(hit.face, Face::Top);
        assert_eq!(hit.face.index(), 1);
        assert!((hit.distance_sq - 9.0).abs() < 1e-4, "distance_sq = {}", hit.distance_sq);
        assert!((hit.point - Vec3::new(5.5, 1.0, 5.5)).length() < 1e-4);
        assert_eq!(hit.adjacent(), IVec3::new(5, 1, 5));
    }

    #[test]
    fn test_floor_out_of_reach_misses() {
        let world = TestWorld::room();
        let origin = Vec3::new(5.5, 9.5, 5.5);
        assert!(raycast(origin, Vec3::NEG_Y, MAX_REACH_DISTANCE, &world).is_none());
    }

    #[test]
    fn test_open_air_misses() {
        let world = TestWorld::default();
        let dir = look_direction(0.3, -0.2);
        assert!(raycast(Vec3::new(0.5, 20.0, 0.5), dir, MAX_REACH_DISTANCE, &world).is_none());
    }

    #[test]
    fn test_zero_direction_misses() {
        let world = TestWorld::room();
        assert!(raycast(Vec3::new(5.5, 5.5, 5.5), Vec3::ZERO, MAX_REACH_DISTANCE, &world).is_none());
    }

    #[test]
    fn test_origin_inside_solid() {
        let mut world = TestWorld::default();
        world.set_solid(2, 3, 4);
        let origin = Vec3::new(2.25, 3.5, 4.75);
        let hit = raycast(origin, Vec3::X, MAX_REACH_DISTANCE, &world).expect("inside solid");
        assert_eq!(hit.kind, HitKind::Inside);
        assert_eq!(hit.block, IVec3::new(2, 3, 4));
        assert_eq!(hit.face, Face::Bottom);
        assert_eq!(hit.distance_sq, 0.0);
        assert_eq!(hit.point, origin);
    }

    #[test]
    fn test_inside_solid_with_zero_direction() {
        let mut world = TestWorld::default();
        world.set_solid(-1, 0, 2);
        let hit = raycast(Vec3::new(-0.5, 0.5, 2.5), Vec3::ZERO, MAX_REACH_DISTANCE, &world)
            .expect("origin block is solid");
        assert_eq!(hit.kind, HitKind::Inside);
        assert_eq!(hit.block, IVec3::new(-1, 0, 2));
        assert_eq!(hit.face, Face::Bottom);
    }

    #[test]
    fn test_face_for_each_step_direction() {
        let cases = [
            (Vec3::X, IVec3::new(3, 0, 0), Face::West),
            (Vec3::NEG_X, IVec3::new(-3, 0, 0), Face::East),
            (Vec3::Y, IVec3::new(0, 3, 0), Face::Bottom),
            (Vec3::NEG_Y, IVec3::new(0, -3, 0), Face::Top),
            (Vec3::Z, IVec3::new(0, 0, 3), Face::North),
            (Vec3::NEG_Z, IVec3::new(0, 0, -3), Face::South),
        ];
        for (dir, target, face) in cases {
            let mut world = TestWorld::default();
            world.set_solid(target.x, target.y, target.z);
            let hit = raycast(Vec3::splat(0.5), dir, 10.0, &world).expect("target in reach");
            assert_eq!(hit.block, target, "{dir:?}");
            assert_eq!(hit.face, face, "{dir:?}");
            assert!((hit.distance() - 2.5).abs() < 1e-4, "{dir:?}");
            assert_eq!(hit.adjacent(), target - dir.as_ivec3(), "{dir:?}");
        }
    }

    #[test]
    fn test_negative_coordinates() {
        let mut world = TestWorld::default();
        world.set_solid(-4, -1, -7);
        let origin = Vec3::new(-3.5, 1.5, -6.5);
        let dir = Vec3::new(-0.5, -2.0, -0.5);
        let hit = raycast(origin, dir, 10.0, &world).expect("hit below");
        assert_eq!(hit.block, IVec3::new(-4, -1, -7));
        assert_eq!(hit.face, Face::Top);
    }

    #[test]
    fn test_diagonal_visits_every_crossed_block() {
        // A diagonal in the XZ plane must not slip between two blocks that
        // share only an edge with its path.
        let mut world = TestWorld::default();
        world.set_solid(1, 0, 0);
        let origin = Vec3::new(0.5, 0.5, 0.2);
        let dir = Vec3::new(1.0, 0.0, 1.0);
        let hit = raycast(origin, dir, 10.0, &world).expect("crosses x boundary first");
        assert_eq!(hit.block, IVec3::new(1, 0, 0));
        assert_eq!(hit.face, Face::West);
    }

    #[test]
    fn test_step_ceiling() {
        let mut world = TestWorld::default();
        world.set_solid(5, 0, 0);
        let origin = Vec3::new(0.5, 0.5, 0.5);
        assert!(raycast_with_limit(origin, Vec3::X, 100.0, 4, &world).is_none());
        assert!(raycast_with_limit(origin, Vec3::X, 100.0, 5, &world).is_some());
    }

    #[test]
    fn test_deterministic() {
        let world = TestWorld::room();
        let origin = Vec3::new(3.3, 6.1, 7.9);
        let dir = look_direction(1.1, -0.7);
        let a = raycast(origin, dir, MAX_REACH_DISTANCE, &world);
        let b = raycast(origin, dir, MAX_REACH_DISTANCE, &world);
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn test_look_direction_axes() {
        assert!((look_direction(0.0, 0.0) - Vec3::NEG_Z).length() < 1e-6);
        assert!((look_direction(0.0, std::f32::consts::FRAC_PI_2) - Vec3::Y).length() < 1e-6);
        assert!((look_direction(std::f32::consts::FRAC_PI_2, 0.0) - Vec3::NEG_X).length() < 1e-6);
        assert!((look_direction(0.7, -0.3).length() - 1.0).abs() < 1e-6);
    }
}
