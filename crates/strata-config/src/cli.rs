//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata client command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Strata voxel client")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Chunk load radius around the viewer.
    #[arg(long)]
    pub load_radius: Option<u32>,

    /// Maximum chunk mesh rebuilds per frame.
    #[arg(long)]
    pub max_rebuilds: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory chunks are saved to.
    #[arg(long)]
    pub save_dir: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to simulate before exiting.
    #[arg(long, default_value_t = 120)]
    pub frames: u32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    ///
    /// Raising the load radius past the unload radius also raises the unload
    /// radius so the hysteresis band never inverts.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(radius) = args.load_radius {
            self.streaming.load_radius = radius;
            self.streaming.unload_radius = self.streaming.unload_radius.max(radius + 1);
        }
        if let Some(max) = args.max_rebuilds {
            self.render.max_rebuilds_per_frame = max;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref dir) = args.save_dir {
            self.world.save_dir = dir.clone();
        }
    }
}
