//! Configuration sections with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Quadtree shape and resolution.
    pub terrain: TerrainConfig,
    /// Height noise.
    pub noise: NoiseConfig,
    /// Generation worker pool.
    pub scheduler: SchedulerConfig,
    /// Floating-origin rebasing.
    pub origin: OriginConfig,
    /// Six-face planet layout.
    pub planet: PlanetConfig,
    /// Scripted viewer flight.
    pub viewer: ViewerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Quadtree configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Quads per patch edge.
    pub detail: u32,
    /// Patches at or below this edge length never subdivide.
    pub min_patch_size: f64,
    /// Split when `distance² <= split_factor * size²`.
    pub split_factor: f64,
    /// Edge length of the flat root patch.
    pub root_size: f64,
    /// Patches at or below this size carry collision indices.
    pub collision_patch_size: f64,
}

/// Height noise configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    /// Noise seed.
    pub seed: u32,
    /// Number of fBm octaves.
    pub octaves: u32,
    /// Wavelength of the first octave.
    pub period: f64,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Altitude at noise value 0.
    pub altitude_base: f64,
    /// Altitude at noise value 1.
    pub altitude_high: f64,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker threads; `None` picks one per core minus two, `Some(0)` builds inline.
    pub worker_threads: Option<usize>,
    /// Maximum generations queued or running.
    pub max_in_flight: usize,
}

/// Floating-origin configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OriginConfig {
    /// Rebase once the viewer is this far from the origin.
    pub rebase_threshold: f64,
}

/// Planet layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Use six cube-face quadtrees around a sphere instead of one flat patch.
    pub enabled: bool,
    /// Sphere radius at altitude 0.
    pub radius: f64,
}

/// Scripted viewer flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Starting position.
    pub start: [f64; 3],
    /// Velocity in units per second.
    pub velocity: [f64; 3],
    /// Number of frames to simulate.
    pub frames: u32,
    /// Simulated seconds per frame.
    pub frame_dt: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write JSON logs to the log directory (debug builds only).
    pub json_log_file: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            detail: 16,
            min_patch_size: 200.0,
            split_factor: 8.0,
            root_size: 204_800.0,
            collision_patch_size: 200.0,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 9,
            period: 2000.0,
            persistence: 0.5,
            lacunarity: 2.0,
            altitude_base: 0.0,
            altitude_high: 500.0,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_in_flight: 64,
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            rebase_threshold: 10_000.0,
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 100_000.0,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 600.0, 0.0],
            velocity: [0.0, 0.0, -250.0],
            frames: 600,
            frame_dt: 1.0 / 60.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_log_file: true,
        }
    }
}

/// Platform config directory for this tool, e.g. `~/.config/quadsphere`.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("quadsphere"))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(config_path).map_err(|source| ConfigError::ReadError {
                path: config_path.to_path_buf(),
                source,
            })?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Reject values no terrain can be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if self.terrain.detail < 1 {
            return invalid("terrain.detail", "must be at least 1");
        }
        if !(self.terrain.min_patch_size > 0.0) {
            return invalid("terrain.min_patch_size", "must be positive");
        }
        if !(self.terrain.split_factor > 0.0) {
            return invalid("terrain.split_factor", "must be positive");
        }
        if !(self.terrain.root_size > 0.0) {
            return invalid("terrain.root_size", "must be positive");
        }
        if !(self.noise.period > 0.0) {
            return invalid("noise.period", "must be positive");
        }
        if self.noise.altitude_high < self.noise.altitude_base {
            return invalid("noise.altitude_high", "must not be below altitude_base");
        }
        if self.planet.enabled && !(self.planet.radius > 0.0) {
            return invalid("planet.radius", "must be positive");
        }
        if !(self.viewer.frame_dt > 0.0) {
            return invalid("viewer.frame_dt", "must be positive");
        }
        Ok(())
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
        assert!(ron_str.contains("detail: 16"));
        assert!(ron_str.contains("octaves: 9"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.scheduler.worker_threads = Some(3);
        config.viewer.start = [1.0, 2.0, 3.0];
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(terrain: (detail: 8), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.terrain.detail, 8);
        assert_eq!(config.terrain.min_patch_size, 200.0);
        assert_eq!(config.noise, NoiseConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.terrain.detail = 32;
        config.planet.enabled = true;
        config.debug.log_level = "trace".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let config = Config::load_or_create(&nested).unwrap();
        assert_eq!(config, Config::default());
        assert!(nested.join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.noise.seed = 1234;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().noise.seed, 1234);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_reload_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::default().reload(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_invalid_ron_produces_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_names_field() {
        let mut config = Config::default();
        config.terrain.detail = 0;
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "terrain.detail"),
            other => panic!("expected invalid detail, got {other:?}"),
        }

        let mut config = Config::default();
        config.noise.altitude_high = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "noise.altitude_high",
                ..
            })
        ));
    }
}
