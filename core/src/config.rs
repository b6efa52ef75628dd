//! Configuration management (`config.toml`)
//!
//! All pacing constants are configuration rather than hard-coded invariants:
//! the catch-up cap and the per-step ceiling trade audio burst size against
//! worst-case tick latency.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::clock::ClockConfig;

/// Host configuration.
///
/// Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Throttling clock settings
    #[serde(default)]
    pub clock: ClockConfig,
    /// Audio buffering settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Emulation core and ROM locations
    #[serde(default)]
    pub core: CoreConfig,
    /// Driver scheduling settings
    #[serde(default)]
    pub driver: DriverConfig,
}

/// Audio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sink sample rate; the core must already emit at this rate (default: 48000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Ring buffer slots in stereo frames, rounded up to a power of two (default: 16384)
    #[serde(default = "default_ring_capacity_frames")]
    pub ring_capacity_frames: usize,
    /// Capacity of the lane into the audio callback in samples (default: 32768)
    #[serde(default = "default_lane_capacity_samples")]
    pub lane_capacity_samples: usize,
    /// Start with audio muted (default: false)
    #[serde(default)]
    pub muted: bool,
}

/// Emulation core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Path to the core's WASM module (default: lib.wasm)
    #[serde(default = "default_wasm_path")]
    pub wasm_path: PathBuf,
    /// Name of the exported linear memory (default: moonbit.memory)
    #[serde(default = "default_memory_export")]
    pub memory_export: String,
    /// Directory holding preinstalled ROMs (default: roms)
    #[serde(default = "default_rom_dir")]
    pub rom_dir: PathBuf,
    /// Largest ROM accepted, in bytes (default: 8 MiB)
    #[serde(default = "default_max_rom_bytes")]
    pub max_rom_bytes: usize,
}

/// Driver scheduling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Start in throttled (wall-clock paced) mode (default: true)
    #[serde(default = "default_true")]
    pub throttle: bool,
    /// Longest wait for commands between throttled ticks, in microseconds (default: 1000)
    #[serde(default = "default_idle_wait_micros")]
    pub idle_wait_micros: u64,
}

impl DriverConfig {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_micros(self.idle_wait_micros)
    }
}

fn default_sample_rate() -> u32 {
    48_000
}
fn default_ring_capacity_frames() -> usize {
    16_384
}
fn default_lane_capacity_samples() -> usize {
    32_768
}

fn default_wasm_path() -> PathBuf {
    PathBuf::from("lib.wasm")
}
fn default_memory_export() -> String {
    "moonbit.memory".to_string()
}
fn default_rom_dir() -> PathBuf {
    PathBuf::from("roms")
}
fn default_max_rom_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_true() -> bool {
    true
}
fn default_idle_wait_micros() -> u64 {
    1_000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            ring_capacity_frames: default_ring_capacity_frames(),
            lane_capacity_samples: default_lane_capacity_samples(),
            muted: false,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            wasm_path: default_wasm_path(),
            memory_export: default_memory_export(),
            rom_dir: default_rom_dir(),
            max_rom_bytes: default_max_rom_bytes(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            throttle: default_true(),
            idle_wait_micros: default_idle_wait_micros(),
        }
    }
}

/// Configuration could not be loaded or is unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Reject values the pacing loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.m_cycle_nanos == 0 {
            return Err(ConfigError::Invalid("clock.m_cycle_nanos must be > 0".into()));
        }
        if self.clock.max_cycles_per_step == 0 || self.clock.max_cycles_per_step > i32::MAX as u32
        {
            return Err(ConfigError::Invalid(format!(
                "clock.max_cycles_per_step must be between 1 and {}",
                i32::MAX
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::Invalid("audio.sample_rate must be > 0".into()));
        }
        if self.audio.ring_capacity_frames < 2 {
            return Err(ConfigError::Invalid(
                "audio.ring_capacity_frames must be at least 2".into(),
            ));
        }
        // One slot stays empty, so the ring must exceed the largest tick batch
        let burst = self.max_tick_audio_frames();
        if self.audio.ring_capacity_frames as u64 <= burst {
            return Err(ConfigError::Invalid(format!(
                "audio.ring_capacity_frames ({}) must exceed the {} frames one catch-up tick can produce",
                self.audio.ring_capacity_frames, burst
            )));
        }
        Ok(())
    }

    /// Most audio frames a single tick can stage: a full catch-up window at
    /// the sink rate.
    pub fn max_tick_audio_frames(&self) -> u64 {
        let frames = u128::from(self.clock.max_catchup_nanos) * u128::from(self.audio.sample_rate);
        u64::try_from(frames.div_ceil(1_000_000_000)).unwrap_or(u64::MAX)
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Linux: `~/.config/lunaboy`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "lunaboy", "lunaboy")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Load and validate configuration from `path`.
///
/// A missing file yields the defaults; an unreadable or malformed one is an error.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from the platform configuration directory.
pub fn load() -> Result<Config, ConfigError> {
    match config_dir() {
        Some(dir) => load_from(&dir.join("config.toml")),
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.clock.m_cycle_nanos, 953);
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.audio.ring_capacity_frames, 16_384);
        assert_eq!(config.core.memory_export, "moonbit.memory");
        assert!(config.driver.throttle);
        assert!(config.validate().is_ok());
    }

    // =============================================================
    // TOML deserialization tests
    // =============================================================

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialize_partial_clock() {
        let toml_str = r#"
[clock]
max_catchup_nanos = 100000000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.clock.max_catchup_nanos, 100_000_000);
        assert_eq!(config.clock.max_cycles_per_step, 8_192); // default
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_config_serialize_roundtrip() {
        let mut config = Config::default();
        config.driver.throttle = false;
        config.audio.muted = true;
        config.core.rom_dir = PathBuf::from("/srv/roms");

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    // =============================================================
    // Validation tests
    // =============================================================

    #[test]
    fn test_validate_rejects_zero_cycle_length() {
        let mut config = Config::default();
        config.clock.m_cycle_nanos = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_step_ceiling() {
        let mut config = Config::default();
        config.clock.max_cycles_per_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tiny_ring() {
        let mut config = Config::default();
        config.audio.ring_capacity_frames = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ring_smaller_than_tick_burst() {
        let mut config = Config::default();
        assert_eq!(config.max_tick_audio_frames(), 12_000);
        assert!(config.validate().is_ok());

        // A full second of catch-up at 48 kHz no longer fits in 16384 frames
        config.clock.max_catchup_nanos = 1_000_000_000;
        assert_eq!(config.max_tick_audio_frames(), 48_000);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.audio.ring_capacity_frames = 65_536;
        assert!(config.validate().is_ok());
    }

    // =============================================================
    // File loading tests
    // =============================================================

    #[test]
    fn test_load_from_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[driver]\nthrottle = false\nidle_wait_micros = 250\n").unwrap();

        let config = load_from(&path).unwrap();
        assert!(!config.driver.throttle);
        assert_eq!(config.driver.idle_wait(), Duration::from_micros(250));
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[clock\nm_cycle_nanos = ").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_from_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[audio]\nsample_rate = 0\n").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Invalid(_))));
    }
}
