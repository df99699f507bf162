//! # Pipeline Configuration
//!
//! Settings that shape the GPU-side layout of a scene: how many frames may be
//! in flight, the device's minimum dynamic-offset alignment, how many cameras
//! view the scene, and whether the shadow pass gets its own frame replica.
//! Also carries the debug-check policy and the default log level.

use serde::{Serialize, Deserialize};
use crate::config::{Config, ConfigError};

/// Smallest supported frames-in-flight count
pub const MIN_FRAMES_IN_FLIGHT: u32 = 2;

/// Largest supported frames-in-flight count
pub const MAX_FRAMES_IN_FLIGHT: u32 = 8;

/// When the O(n) consistency checks run
///
/// Covers the hierarchy search that rejects duplicate entities on insertion
/// and the verification of caller-supplied parent hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugChecks {
    /// Run in every build
    Always,
    /// Run only when `debug_assertions` are enabled
    #[default]
    DebugBuildsOnly,
    /// Never run
    Never,
}

impl DebugChecks {
    /// Whether checks are active for the current build
    pub const fn enabled(self) -> bool {
        match self {
            Self::Always => true,
            Self::DebugBuildsOnly => cfg!(debug_assertions),
            Self::Never => false,
        }
    }
}

/// Configuration for scene layout and frame replication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of frame slots the GPU buffers are replicated over
    pub frames_in_flight: u32,
    /// Device minimum offset alignment in bytes (power of two)
    pub min_offset_alignment: u64,
    /// Number of cameras; view-dependent data is replicated per camera
    pub camera_count: u32,
    /// Reserve one extra frame slot for a shadow pass running a frame ahead
    pub shadow_replica: bool,
    /// Policy for the debug-only consistency checks
    pub debug_checks: DebugChecks,
    /// Default log filter
    pub log_level: String,
}

impl PipelineConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            frames_in_flight: 2,
            min_offset_alignment: 256,
            camera_count: 1,
            shadow_replica: false,
            debug_checks: DebugChecks::default(),
            log_level: "info".to_string(),
        }
    }

    /// Set frames in flight
    pub fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Set the device minimum offset alignment
    pub fn with_min_offset_alignment(mut self, alignment: u64) -> Self {
        self.min_offset_alignment = alignment;
        self
    }

    /// Set the camera count
    pub fn with_camera_count(mut self, cameras: u32) -> Self {
        self.camera_count = cameras;
        self
    }

    /// Enable or disable the extra shadow replica
    pub fn with_shadow_replica(mut self, enabled: bool) -> Self {
        self.shadow_replica = enabled;
        self
    }

    /// Set the debug-check policy
    pub fn with_debug_checks(mut self, checks: DebugChecks) -> Self {
        self.debug_checks = checks;
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Number of frame slots each GPU buffer is split into
    pub fn frame_replicas(&self) -> u32 {
        self.frames_in_flight + u32::from(self.shadow_replica)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames_in_flight < MIN_FRAMES_IN_FLIGHT {
            return Err(ConfigError::Invalid(format!(
                "frames_in_flight must be at least {MIN_FRAMES_IN_FLIGHT}"
            )));
        }
        if self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            return Err(ConfigError::Invalid(format!(
                "frames_in_flight must not exceed {MAX_FRAMES_IN_FLIGHT}"
            )));
        }
        if !self.min_offset_alignment.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "min_offset_alignment {} is not a power of two",
                self.min_offset_alignment
            )));
        }
        if self.camera_count == 0 {
            return Err(ConfigError::Invalid("camera_count must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for PipelineConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_replicas(), 2);
    }

    #[test]
    fn test_shadow_replica_adds_a_slot() {
        let config = PipelineConfig::new().with_frames_in_flight(3).with_shadow_replica(true);
        assert_eq!(config.frame_replicas(), 4);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(PipelineConfig::new().with_frames_in_flight(1).validate().is_err());
        assert!(PipelineConfig::new().with_frames_in_flight(9).validate().is_err());
        assert!(PipelineConfig::new().with_min_offset_alignment(48).validate().is_err());
        assert!(PipelineConfig::new().with_min_offset_alignment(0).validate().is_err());
        assert!(PipelineConfig::new().with_camera_count(0).validate().is_err());
    }

    #[test]
    fn test_debug_check_policy() {
        assert!(DebugChecks::Always.enabled());
        assert!(!DebugChecks::Never.enabled());
        assert_eq!(DebugChecks::DebugBuildsOnly.enabled(), cfg!(debug_assertions));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = "frames_in_flight = 3\ndebug_checks = \"always\"\n";
        let config = PipelineConfig::load_from_str(text, ConfigFormat::Toml).unwrap();

        assert_eq!(config.frames_in_flight, 3);
        assert_eq!(config.debug_checks, DebugChecks::Always);
        assert_eq!(config.min_offset_alignment, 256);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = PipelineConfig::new().with_camera_count(2).with_shadow_replica(true);
        let text = config.to_config_string(ConfigFormat::Ron).unwrap();
        let parsed = PipelineConfig::load_from_str(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed, config);
    }
}
