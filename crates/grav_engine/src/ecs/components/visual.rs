//! Visual component variants consumed by the excluded renderer

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec2;

/// A static texture drawn at the entity's smooth transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompVisualTexture {
    /// Texture asset name.
    pub texture: String,
    /// Draw size in world units.
    pub size: Vec2,
    /// Draw order; higher draws on top.
    #[serde(default)]
    pub z_order: i32,
}

/// A frame animation drawn at the entity's smooth transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompVisualAnimation {
    /// Animation asset name.
    pub animation: String,
    /// Frame to start on.
    #[serde(default)]
    pub start_frame: u32,
    /// Restart after the last frame.
    #[serde(default)]
    pub looping: bool,
}

/// A timed on-screen text message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompVisualMessage {
    /// Message text.
    pub text: String,
    /// Seconds the message stays visible.
    #[serde(default)]
    pub duration_secs: f32,
}
