//! Terrain surface heights.
//!
//! The structure placer and the generator only need `find_surface`; how the
//! height is produced is up to the [`SurfaceSampler`] implementation.

use noise::{NoiseFn, Perlin};
use strata_voxel::CHUNK_HEIGHT;

/// Pure `(seed, x, z) -> y` query for the topmost solid block of a column.
pub trait SurfaceSampler: Send + Sync {
    /// Y of the surface block at world column `(world_x, world_z)`.
    fn find_surface(&self, seed: u64, world_x: i32, world_z: i32) -> i32;
}

/// Configuration for multi-octave fBm noise used for the surface.
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves. Default: 2.0.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves. Default: 0.5.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per block. Default: 0.01.
    pub base_frequency: f64,
    /// Amplitude of the first octave in blocks. Default: 10.0.
    pub amplitude: f64,
    /// Height the noise is centered on. Default: 24.
    pub base_height: i32,
    /// Blocks kept free above the highest possible surface so structures fit.
    pub headroom: i32,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.01,
            amplitude: 10.0,
            base_height: 24,
            headroom: 12,
        }
    }
}

/// Fractal Brownian motion over Perlin noise, rounded and clamped into the chunk
/// height.
pub struct NoiseSurface {
    seed: u64,
    noise: Perlin,
    params: HeightmapParams,
}

impl NoiseSurface {
    /// Create a sampler, caching the noise table for `seed`.
    pub fn new(seed: u64, params: HeightmapParams) -> Self {
        Self {
            seed,
            noise: Perlin::new(seed as u32),
            params,
        }
    }

    /// Raw fBm value at a world column, before rounding and clamping.
    pub fn sample(&self, seed: u64, x: f64, z: f64) -> f64 {
        if seed == self.seed {
            fbm(&self.noise, &self.params, x, z)
        } else {
            fbm(&Perlin::new(seed as u32), &self.params, x, z)
        }
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

impl SurfaceSampler for NoiseSurface {
    fn find_surface(&self, seed: u64, world_x: i32, world_z: i32) -> i32 {
        let raw = self.sample(seed, world_x as f64, world_z as f64);
        let max = (CHUNK_HEIGHT as i32 - 1 - self.params.headroom).max(1);
        (self.params.base_height + raw.round() as i32).clamp(1, max)
    }
}

fn fbm(noise: &Perlin, params: &HeightmapParams, x: f64, z: f64) -> f64 {
    let mut total = 0.0;
    let mut frequency = params.base_frequency;
    let mut amplitude = params.amplitude;

    for _ in 0..params.octaves {
        total += noise.get([x * frequency, z * frequency]) * amplitude;
        frequency *= params.lacunarity;
        amplitude *= params.persistence;
    }

    total
}

/// Constant-height surface.
#[derive(Clone, Copy, Debug)]
pub struct FlatSurface(pub i32);

impl SurfaceSampler for FlatSurface {
    fn find_surface(&self, _seed: u64, _world_x: i32, _world_z: i32) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_surface_deterministic() {
        let a = NoiseSurface::new(42, HeightmapParams::default());
        let b = NoiseSurface::new(42, HeightmapParams::default());
        for x in -20..20 {
            for z in (-200..200).step_by(37) {
                assert_eq!(a.find_surface(42, x, z), b.find_surface(42, x, z));
            }
        }
    }

    #[test]
    fn test_uncached_seed_matches_dedicated_sampler() {
        let cached = NoiseSurface::new(7, HeightmapParams::default());
        let other = NoiseSurface::new(1, HeightmapParams::default());
        for x in (0..500).step_by(17) {
            assert_eq!(other.find_surface(7, x, -x), cached.find_surface(7, x, -x));
        }
    }

    #[test]
    fn test_surface_stays_in_bounds() {
        let params = HeightmapParams {
            amplitude: 500.0,
            ..Default::default()
        };
        let headroom = params.headroom;
        let surface = NoiseSurface::new(3, params);
        for x in (-1000..1000).step_by(13) {
            let y = surface.find_surface(3, x, x / 2);
            assert!(y >= 1, "surface {y} below floor");
            assert!(y <= CHUNK_HEIGHT as i32 - 1 - headroom, "surface {y} leaves no headroom");
        }
    }

    #[test]
    fn test_flat_surface() {
        assert_eq!(FlatSurface(20).find_surface(99, -5, 1000), 20);
    }
}
