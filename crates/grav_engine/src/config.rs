//! Configuration system

pub use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec2;

/// Configuration trait: RON or TOML, chosen by file extension.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file.
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file.
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

fn default_fixed_timestep() -> f32 {
    1.0 / 60.0
}

fn default_velocity_iterations() -> u32 {
    8
}

fn default_position_iterations() -> u32 {
    3
}

fn default_field_switch_ticks() -> u32 {
    10
}

fn default_root_gravity() -> Vec2 {
    Vec2::new(0.0, -25.0)
}

/// Tuning constants of the physics integration system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Fixed simulation step in seconds.
    #[serde(default = "default_fixed_timestep")]
    pub fixed_timestep: f32,
    /// Solver velocity iterations per step.
    #[serde(default = "default_velocity_iterations")]
    pub velocity_iterations: u32,
    /// Solver position iterations per step.
    #[serde(default = "default_position_iterations")]
    pub position_iterations: u32,
    /// Minimum ticks between gravity field changes (hysteresis).
    #[serde(default = "default_field_switch_ticks")]
    pub field_switch_ticks: u32,
    /// Acceleration of the root (fallback) gravity field.
    #[serde(default = "default_root_gravity")]
    pub root_gravity: Vec2,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: default_fixed_timestep(),
            velocity_iterations: default_velocity_iterations(),
            position_iterations: default_position_iterations(),
            field_switch_ticks: default_field_switch_ticks(),
            root_gravity: default_root_gravity(),
        }
    }
}

impl Config for PhysicsConfig {}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Physics tuning.
    #[serde(default)]
    pub physics: PhysicsConfig,
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = PhysicsConfig::default();
        assert!(config.fixed_timestep > 0.0);
        assert_eq!(config.field_switch_ticks, 10);
        assert!(config.root_gravity.y < 0.0);
    }

    #[test]
    fn ron_round_trip() {
        let config = EngineConfig::default();
        let text = ron::ser::to_string_pretty(&config, Default::default()).unwrap();
        let back: EngineConfig = ron::from_str(&text).unwrap();
        assert!(
            (back.physics.fixed_timestep - config.physics.fixed_timestep).abs() < 1e-6
        );
        assert_eq!(back.physics.field_switch_ticks, 10);
    }

    fn scratch_file(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("grav_engine_{}_{name}", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn file_round_trip_in_both_formats() {
        for ext in ["ron", "toml"] {
            let path = scratch_file(&format!("engine.{ext}"));
            let mut config = EngineConfig::default();
            config.physics.field_switch_ticks = 17;
            config.physics.velocity_iterations = 4;

            config.save_to_file(&path).unwrap();
            let back = EngineConfig::load_from_file(&path).unwrap();
            std::fs::remove_file(&path).ok();

            assert_eq!(back.physics.field_switch_ticks, 17, "{ext}");
            assert_eq!(back.physics.velocity_iterations, 4, "{ext}");
            assert!(
                (back.physics.root_gravity.y - config.physics.root_gravity.y).abs() < 1e-6,
                "{ext}"
            );
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let config = EngineConfig::default();
        assert!(matches!(
            config.save_to_file("engine.yaml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let path = scratch_file("engine.yaml");
        std::fs::write(&path, "physics: {}").unwrap();
        assert!(matches!(
            EngineConfig::load_from_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
