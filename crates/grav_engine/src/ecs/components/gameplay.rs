//! Gameplay component variants consumed by excluded subsystems
//!
//! Data-only: input handling and trigger evaluation live outside this
//! core, but the variants are part of the component union and must load,
//! store and round-trip like every other component.

use serde::{Deserialize, Serialize};

/// Tuning values for the player input controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompPlayerController {
    /// Horizontal ground acceleration in units/s^2.
    #[serde(default)]
    pub walk_accel: f32,
    /// Maximum horizontal walk speed in units/s.
    #[serde(default)]
    pub max_walk_speed: f32,
    /// Impulse applied on jump.
    #[serde(default)]
    pub jump_impulse: f32,
}

/// A named integer mutated through the `variable_change` bus channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompVariable {
    /// Current value.
    #[serde(default)]
    pub value: i64,
}

/// Trigger declaration: a condition expression and the effects to run
/// when it fires. Evaluated by the excluded trigger system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompTrigger {
    /// Condition expression, interpreted by the trigger system.
    pub condition: String,
    /// Effect identifiers to run when the condition holds.
    #[serde(default)]
    pub effects: Vec<String>,
}
