//! Headless client loop: streams terrain around a walking observer, edits the
//! block under the crosshair and keeps chunk geometry up to date.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p strata-demo -- --frames 300 --seed 42`.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_config::{CliArgs, Config};
use strata_mesh::{CulledMesher, Frustum, RebuildScheduler};
use strata_raycast::{HitKind, look_direction, raycast_with_limit};
use strata_voxel::{ChunkCoord, RenderLayer, TileEventBuffer};
use strata_world::{ChunkStore, ChunkStreamer, StreamConfig, WorldContext};
use tracing::{debug, error, info};

const FRAME_TIME: Duration = Duration::from_millis(16);
const EYE_HEIGHT: f32 = 1.7;
const WALK_SPEED: f32 = 0.25;
const RANDOM_TICKS_PER_CHUNK: u32 = 3;
const EDIT_INTERVAL: u32 = 10;
const REPORT_INTERVAL: u32 = 30;

/// Position and orientation of the observer.
struct Observer {
    position: Vec3,
    yaw: f32,
    pitch: f32,
}

impl Observer {
    fn eye(&self) -> Vec3 {
        self.position + Vec3::new(0.0, EYE_HEIGHT, 0.0)
    }

    fn forward(&self) -> Vec3 {
        look_direction(self.yaw, self.pitch)
    }

    fn chunk(&self) -> ChunkCoord {
        ChunkCoord::containing(self.position.x.floor() as i32, self.position.z.floor() as i32)
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(Config::default_dir);
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let log_dir = config_dir.join(&config.debug.log_dir);
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config, &config_dir, args.frames) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, config_dir: &std::path::Path, frames: u32) -> Result<(), strata_world::WorldError> {
    let save_dir = config_dir.join(&config.world.save_dir);
    let context = WorldContext::standard(config.world.seed, Some(save_dir.clone()))?;
    let workers = config.streaming.resolved_worker_threads();
    let store = context.create_store(workers)?;
    info!("Saving chunks to {}, {} workers", save_dir.display(), workers);

    let events = Arc::new(TileEventBuffer::new());
    store.add_listener(events.clone());

    let mut streamer = ChunkStreamer::new(StreamConfig {
        load_radius: config.streaming.load_radius,
        unload_radius: config.streaming.unload_radius,
        loads_per_frame: config.streaming.loads_per_frame,
    });
    let mut scheduler = RebuildScheduler::new(
        Box::new(CulledMesher::new(Arc::clone(&context.registry))),
        config.render.max_rebuilds_per_frame,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(config.world.seed);

    let mut observer = Observer {
        position: Vec3::new(8.5, 0.0, 8.5),
        yaw: -std::f32::consts::FRAC_PI_2,
        pitch: -0.6,
    };

    let started = Instant::now();
    let mut total_rebuilt = 0usize;
    let mut edits = 0u32;

    for frame in 0..frames {
        // Walk along +X on the terrain surface, slowly turning.
        observer.position.x += WALK_SPEED;
        observer.yaw += 0.01;
        let ground = context.surface.find_surface(
            config.world.seed,
            observer.position.x.floor() as i32,
            observer.position.z.floor() as i32,
        );
        observer.position.y = ground as f32 + 1.0;

        let stream = streamer.tick(observer.chunk(), &store);
        if stream.requested > 0 || stream.unloaded > 0 {
            debug!(
                "Frame {}: {} loads requested, {} chunks unloaded",
                frame, stream.requested, stream.unloaded
            );
        }

        if frame % EDIT_INTERVAL == 0 && interact(&observer, &store, &context, config, frame) {
            edits += 1;
        }

        store.random_tick(&mut rng, RANDOM_TICKS_PER_CHUNK);

        let frustum = Frustum::from_camera(
            observer.eye(),
            observer.forward(),
            config.render.fov_degrees.to_radians(),
            16.0 / 9.0,
            0.1,
            config.render.view_distance,
        );
        let report = scheduler.schedule(store.dirty_chunks(), observer.eye(), &frustum, &store);
        total_rebuilt += report.rebuilt.len();
        scheduler.cache_mut().evict(|coord| store.is_loaded(coord));

        let changed = events.read().len();
        events.swap();

        if frame % REPORT_INTERVAL == 0 {
            let lit = store
                .resident_chunks()
                .iter()
                .filter_map(|c| scheduler.cache().get(c.coord, RenderLayer::Lit))
                .count();
            info!(
                "Frame {}: {} resident, {} meshed ({} lit), {} deferred, {} tile events",
                frame,
                store.resident_count(),
                scheduler.cache().len(),
                lit,
                report.deferred,
                changed
            );
        }

        std::thread::sleep(FRAME_TIME);
    }

    info!(
        "Ran {} frames in {:.2?}: {} rebuilds, {} edits, {} quads cached",
        frames,
        started.elapsed(),
        total_rebuilt,
        edits,
        scheduler.cache().total_quads()
    );

    store.unload_all(true);
    let stats = store.stats();
    info!(
        "Store stats: {} loads, {} generated, {} from disk, {} saved, {} save failures, {} late publishes dropped, {} failed loads",
        stats.loads_dispatched,
        stats.generated,
        stats.loaded_from_disk,
        stats.saves_completed,
        stats.save_failures,
        stats.late_publishes_dropped,
        stats.loads_failed
    );
    Ok(())
}

/// Casts from the observer's eye and alternates between breaking the target
/// block and placing stone against it. Returns `true` if the world changed.
fn interact(observer: &Observer, store: &ChunkStore, context: &WorldContext, config: &Config, frame: u32) -> bool {
    let Some(hit) = raycast_with_limit(
        observer.eye(),
        observer.forward(),
        config.interaction.max_reach_distance,
        config.interaction.max_ray_steps,
        store,
    ) else {
        return false;
    };
    if hit.kind == HitKind::Inside {
        return false;
    }

    let place = (frame / EDIT_INTERVAL) % 2 == 1;
    let changed = if place {
        let target = hit.adjacent();
        store.set_tile(target.x, target.y, target.z, context.tiles.stone)
    } else {
        store.destroy_tile(hit.block.x, hit.block.y, hit.block.z)
    };
    debug!(
        "Frame {}: {} at {} (face {}, {:.2} away) -> {}",
        frame,
        if place { "place" } else { "break" },
        hit.block,
        hit.face.index(),
        hit.distance(),
        changed
    );
    changed
}
