//! Rune Motion configuration system
//!
//! This crate loads engine and driver settings from `motion.toml`, with
//! environment variables taking precedence over the file.
//!
//! ```toml
//! [engine]
//! precision = 3
//! default_setter = "attribute"
//!
//! [timing]
//! delay = 100.0
//! duration = { millis = 600.0 }
//! iterations = { type = "count", count = 2.0 }
//! direction = "alternate"
//! fill = "both"
//! easing = "ease-in-out"
//!
//! [driver]
//! target = "stage"
//! frame_interval_ms = 16.0
//! max_frames = 240
//! keyframes = '{ "opacity": [0, 1] }'
//! ```

use rune_anim::{EasingInput, EffectDuration, EffectTimingOptions, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "motion.toml";

/// Main configuration structure for Rune Motion
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MotionConfig {
    /// Engine-wide settings (number precision, default setter)
    pub engine: EngineConfig,
    /// Default timing applied to animations started by the driver
    pub timing: EffectTimingOptions,
    /// Frame driver settings
    pub driver: DriverConfig,
}

/// Frame driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Target the driver animates
    pub target: String,
    /// Simulated time between frames in milliseconds
    pub frame_interval_ms: f64,
    /// Stop after this many frames even if the animation is still running
    pub max_frames: u32,
    /// Playback rate applied before playing
    pub playback_rate: f64,
    /// Keyframes as JSON (list or columnar form)
    pub keyframes: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            target: "stage".to_string(),
            frame_interval_ms: 16.0,
            max_frames: 600,
            playback_rate: 1.0,
            keyframes: r#"{ "opacity": [0, 1] }"#.to_string(),
        }
    }
}

fn env_flag<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

impl MotionConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the motion.toml configuration file
    ///
    /// # Returns
    /// * `Ok(MotionConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (motion.toml in the
    /// current directory) or return default configuration if it is missing
    /// or invalid
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Unparseable values are ignored.
    pub fn merge_with_env(&mut self) {
        // Engine settings
        if let Some(precision) = env_flag::<u32>("MOTION_PRECISION") {
            self.engine.precision = precision;
        }
        if let Some(setter) = env_flag("MOTION_DEFAULT_SETTER") {
            self.engine.default_setter = setter;
        }

        // Timing settings
        if let Some(duration) = env_flag::<f64>("MOTION_DURATION_MS") {
            self.timing.duration = Some(EffectDuration::Millis(duration));
        }
        if let Some(delay) = env_flag::<f64>("MOTION_DELAY_MS") {
            self.timing.delay = Some(delay);
        }
        if let Ok(easing) = std::env::var("MOTION_EASING") {
            self.timing.easing = Some(EasingInput::Name(easing));
        }

        // Driver settings
        if let Ok(target) = std::env::var("MOTION_TARGET") {
            self.driver.target = target;
        }
        if let Some(interval) = env_flag::<f64>("MOTION_FRAME_INTERVAL_MS") {
            self.driver.frame_interval_ms = interval;
        }
        if let Some(rate) = env_flag::<f64>("MOTION_PLAYBACK_RATE") {
            self.driver.playback_rate = rate;
        }
        if let Ok(keyframes) = std::env::var("MOTION_KEYFRAMES") {
            self.driver.keyframes = keyframes;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from motion.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
