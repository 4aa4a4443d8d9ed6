//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World identity and storage.
    pub world: WorldConfig,
    /// Chunk streaming around the viewer.
    pub streaming: StreamingConfig,
    /// Mesh rebuild budget and view volume.
    pub render: RenderConfig,
    /// Block selection.
    pub interaction: InteractionConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for terrain and structure placement.
    pub seed: u64,
    /// Directory holding one file per saved chunk.
    pub save_dir: String,
}

/// Streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunks within this Chebyshev radius of the viewer are loaded.
    pub load_radius: u32,
    /// Chunks beyond this radius are unloaded. Kept above `load_radius` so
    /// chunks at the edge do not thrash.
    pub unload_radius: u32,
    /// Maximum load requests issued per frame.
    pub loads_per_frame: u32,
    /// Background load/save threads (0 = one less than the CPU count).
    pub worker_threads: usize,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Hard cap on chunk mesh rebuilds per frame.
    pub max_rebuilds_per_frame: usize,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Far plane distance in blocks.
    pub view_distance: f32,
}

/// Interaction configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InteractionConfig {
    /// Maximum distance at which blocks can be selected.
    pub max_reach_distance: f32,
    /// Step ceiling for the selection ray.
    pub max_ray_steps: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for log files.
    pub log_dir: String,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            save_dir: "saves/world".to_string(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_radius: 4,
            unload_radius: 6,
            loads_per_frame: 8,
            worker_threads: 0,
        }
    }
}

impl StreamingConfig {
    /// Worker count with `0` resolved against the machine's CPU count.
    pub fn resolved_worker_threads(&self) -> usize {
        match self.worker_threads {
            0 => num_cpus::get().saturating_sub(1).max(1),
            n => n,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_rebuilds_per_frame: 8,
            fov_degrees: 70.0,
            view_distance: 256.0,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_reach_distance: 5.0,
            max_ray_steps: 256,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory for the client, falling back to the working
    /// directory when the platform has none.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("strata"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// if it does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let config = Self::read(&path)?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes `config.ron` into `config_dir`, creating the directory.
    /// A config that fails [`Config::validate`] is not written.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let path = config_dir.join(CONFIG_FILE);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .struct_names(false);
        let serialized = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, serialized).map_err(write_err)
    }

    /// Re-reads `config.ron`. Returns the new config only if it differs from
    /// `self`; a file that fails validation is an error and `self` stays in use.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        fresh.validate()?;
        log::info!("Config reloaded with changes");
        Ok(Some(fresh))
    }

    /// Checks cross-field constraints the types cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let streaming = &self.streaming;
        if streaming.unload_radius <= streaming.load_radius {
            return Err(ConfigError::Invalid(format!(
                "unload_radius ({}) must exceed load_radius ({})",
                streaming.unload_radius, streaming.load_radius
            )));
        }
        if self.render.max_rebuilds_per_frame == 0 {
            return Err(ConfigError::Invalid("max_rebuilds_per_frame must be at least 1".to_string()));
        }
        if !(self.interaction.max_reach_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_reach_distance must be positive, got {}",
                self.interaction.max_reach_distance
            )));
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("load_radius: 4"));
        assert!(ron_str.contains("max_rebuilds_per_frame: 8"));
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(world: (seed: 7), render: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.save_dir, "saves/world");
        assert_eq!(config.streaming, StreamingConfig::default());
        assert_eq!(config.interaction, InteractionConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_unload_radius_exceeds_load_radius() {
        let streaming = StreamingConfig::default();
        assert!(streaming.unload_radius > streaming.load_radius);
    }

    #[test]
    fn test_worker_threads_resolution() {
        let mut streaming = StreamingConfig::default();
        assert!(streaming.resolved_worker_threads() >= 1);
        streaming.worker_threads = 3;
        assert_eq!(streaming.resolved_worker_threads(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.seed = 99;
        config.streaming.load_radius = 10;
        config.streaming.unload_radius = 12;
        config.debug.log_level = "trace".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.render.max_rebuilds_per_frame = 2;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.render.max_rebuilds_per_frame), Some(2));
        assert!(modified.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_inverted_radii_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "(streaming: (load_radius: 8, unload_radius: 8))",
        )
        .unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_rebuild_budget_rejected() {
        let mut config = Config::default();
        config.render.max_rebuilds_per_frame = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reload_keeps_current_on_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "(interaction: (max_reach_distance: -1.0))",
        )
        .unwrap();
        assert!(config.reload(dir.path()).is_err());
    }

    #[test]
    fn test_save_rejects_inverted_radii() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.streaming.load_radius = 10;
        let err = config.save(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
        assert!(!dir.path().join(CONFIG_FILE).exists(), "nothing written");
    }
}
