//! Per-chunk seed derivation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::ChunkCoord;

/// Derive the structure seed for a chunk from the world seed.
///
/// `world_seed ^ (cx * 341873128712 + cz * 132897987541)` in wrapping `i64`
/// arithmetic. This is a plain linear mix, so neighboring chunks share
/// correlated low-order bits. Saved worlds depend on the exact values: do not
/// swap in a stronger hash.
pub fn chunk_seed(world_seed: u64, coord: ChunkCoord) -> u64 {
    let mix = (coord.x as i64)
        .wrapping_mul(341_873_128_712)
        .wrapping_add((coord.z as i64).wrapping_mul(132_897_987_541));
    world_seed ^ mix as u64
}

/// Deterministic RNG for a chunk: identical sequence for the same
/// `(world_seed, coord)` on every thread and platform.
pub fn chunk_rng(world_seed: u64, coord: ChunkCoord) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(chunk_seed(world_seed, coord))
}
