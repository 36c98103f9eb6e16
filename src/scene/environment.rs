//! Environment
//!
//! Image-based lighting configuration of a scene. This is the reflection
//! source used for shading, not the visible background.

use std::sync::Arc;

use crate::resources::EnvironmentMap;

#[derive(Default, Clone, Debug)]
pub struct Environment {
    /// Pre-filtered environment map
    pub env_map: Option<Arc<EnvironmentMap>>,
    /// Highest usable mip level for roughness lookups
    pub env_map_max_mip_level: f32,
    pub intensity: f32,
    /// Rotation around Y, in radians
    pub rotation: f32,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self {
            env_map: None,
            env_map_max_mip_level: 0.0,
            intensity: 1.0,
            rotation: 0.0,
        }
    }

    pub fn set_env_map(&mut self, env_map: Option<Arc<EnvironmentMap>>) {
        self.env_map_max_mip_level = env_map
            .as_ref()
            .map_or(0.0, |map| map.levels.len().saturating_sub(1) as f32);
        self.env_map = env_map;
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    #[must_use]
    pub fn has_env_map(&self) -> bool {
        self.env_map.is_some()
    }
}
