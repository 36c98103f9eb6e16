//! Stage Configuration
//!
//! Every deployment constant (asset root, target URI, model placement,
//! lighting, environment map, renderer output, frame pacing) lives in
//! [`StageConfig`]. All fields have defaults, so a JSON file only needs the
//! values it changes:
//!
//! ```json
//! {
//!   "asset_base": "./models/",
//!   "strategy": { "kind": "single_file", "path": "Hood/Hood1.fbx" },
//!   "max_frames": 120
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::app::loader::AssetStrategy;
use crate::assets::ColorSpace;
use crate::errors::{Error, Result};
use crate::renderer::RendererSettings;
use crate::scene::{Camera, Light, color_from_hex};

/// Shortest pause the frame loop is scheduled with.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_micros(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Name given to the loaded model's root node.
    pub name: String,
    /// Uniform scale applied after loading.
    pub scale: f32,
    pub position: [f32; 3],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "Hood".to_string(),
            scale: 10.0,
            position: [0.0, 0.0, -300.0],
        }
    }
}

impl ModelConfig {
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
    pub cast_shadows: bool,
    pub shadow_map_size: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: 0xffffff,
            ambient_intensity: 0.3,
            directional_color: 0xffffff,
            directional_intensity: 2.5,
            directional_position: [0.0, 10.0, 10.0],
            cast_shadows: false,
            shadow_map_size: 512,
        }
    }
}

impl LightingConfig {
    #[must_use]
    pub fn ambient_light(&self) -> Light {
        Light::new_ambient(color_from_hex(self.ambient_color), self.ambient_intensity)
    }

    #[must_use]
    pub fn directional_light(&self) -> Light {
        let mut light = Light::new_directional(
            color_from_hex(self.directional_color),
            self.directional_intensity,
        );
        light.cast_shadows = self.cast_shadows;
        if let Some(shadow) = light.shadow.as_mut() {
            shadow.map_size = self.shadow_map_size;
        }
        light
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Directory or URL the HDR image is fetched from.
    pub path: String,
    pub file: String,
    /// Upper bound on pre-filtered levels.
    pub max_levels: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: "./assets/textures/".to_string(),
            file: "royal_esplanade_1k.hdr".to_string(),
            max_levels: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub output_color_space: ColorSpace,
    pub physically_correct_lights: bool,
    /// Host device pixel ratio.
    pub pixel_ratio: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            output_color_space: ColorSpace::Srgb,
            physically_correct_lights: true,
            pixel_ratio: 1.0,
            width: 1280,
            height: 720,
        }
    }
}

impl RendererConfig {
    /// Applies the output configuration onto existing settings.
    pub fn apply(&self, settings: &mut RendererSettings) {
        settings.output_color_space = self.output_color_space;
        settings.physically_correct_lights = self.physically_correct_lights;
        settings.pixel_ratio = self.pixel_ratio;
        settings.width = self.width;
        settings.height = self.height;
    }
}

/// Device camera used by headless runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view, degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 60.0,
            near: 1.0,
            far: 10_000.0,
            position: [0.0, 0.0, 500.0],
        }
    }
}

impl CameraConfig {
    #[must_use]
    pub fn build(&self, aspect: f32) -> Camera {
        let mut camera = Camera::new_perspective(self.fov, aspect, self.near, self.far);
        camera.set_pose(Affine3A::from_translation(Vec3::from_array(self.position)));
        camera
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Root URL or directory the model strategy paths are relative to.
    pub asset_base: String,
    pub target_uri: String,
    pub strategy: AssetStrategy,
    pub model: ModelConfig,
    pub lighting: LightingConfig,
    pub environment: EnvironmentConfig,
    pub renderer: RendererConfig,
    pub camera: CameraConfig,
    /// Frames per second the loop is paced at.
    pub frame_rate: f32,
    /// Stop after this many frames; `None` runs until cancelled.
    pub max_frames: Option<u64>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::fbx()
    }
}

impl StageConfig {
    pub const DEFAULT_TARGET_URI: &'static str =
        "https://developer.letsee.io/api-tm/target-manager/target-uid/6051de97b30426a32a7be172";
    pub const DEFAULT_FRAME_RATE: f32 = 60.0;
    /// Highest rate whose interval is still [`MIN_FRAME_INTERVAL`].
    pub const MAX_FRAME_RATE: f32 = 1_000_000.0;

    /// Single-file FBX deployment.
    #[must_use]
    pub fn fbx() -> Self {
        Self {
            asset_base: "https://intra.letsee.io/3D-model/fbx/".to_string(),
            target_uri: Self::DEFAULT_TARGET_URI.to_string(),
            strategy: AssetStrategy::SingleFile {
                path: "Hood/Hood1.fbx".to_string(),
            },
            model: ModelConfig::default(),
            lighting: LightingConfig::default(),
            environment: EnvironmentConfig::default(),
            renderer: RendererConfig::default(),
            camera: CameraConfig::default(),
            frame_rate: Self::DEFAULT_FRAME_RATE,
            max_frames: None,
        }
    }

    /// MTL + OBJ deployment.
    #[must_use]
    pub fn obj() -> Self {
        Self {
            asset_base: "https://intra.letsee.io/3D-model/mtl/".to_string(),
            strategy: AssetStrategy::MaterialGeometry {
                material: "Hood/Hood1_90.mtl".to_string(),
                geometry: "Hood/Hood1_90.obj".to_string(),
            },
            model: ModelConfig {
                name: "Hood".to_string(),
                scale: 0.5,
                position: [0.0, 0.0, 0.0],
            },
            ..Self::fbx()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.asset_base.is_empty() {
            return Err(Error::Config("asset_base must not be empty".into()));
        }
        if self.target_uri.is_empty() {
            return Err(Error::Config("target_uri must not be empty".into()));
        }
        match &self.strategy {
            AssetStrategy::SingleFile { path } if path.is_empty() => {
                return Err(Error::Config("single_file strategy needs a path".into()));
            }
            AssetStrategy::MaterialGeometry { material, geometry }
                if material.is_empty() || geometry.is_empty() =>
            {
                return Err(Error::Config("material_geometry strategy needs both files".into()));
            }
            _ => {}
        }
        if !(self.model.scale.is_finite() && self.model.scale > 0.0) {
            return Err(Error::Config(format!(
                "model scale must be positive, got {}",
                self.model.scale
            )));
        }
        let rate = self.frame_rate;
        if !(rate.is_finite() && rate > 0.0 && rate <= Self::MAX_FRAME_RATE) {
            return Err(Error::Config(format!(
                "frame_rate must be in (0, {}], got {}",
                Self::MAX_FRAME_RATE,
                self.frame_rate
            )));
        }
        if !(self.renderer.pixel_ratio.is_finite() && self.renderer.pixel_ratio > 0.0) {
            return Err(Error::Config(format!(
                "pixel_ratio must be positive, got {}",
                self.renderer.pixel_ratio
            )));
        }
        Ok(())
    }

    /// Time between two frames. Never shorter than [`MIN_FRAME_INTERVAL`];
    /// a rate that is not a positive number falls back to 60 fps.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Duration::from_secs_f32(1.0 / Self::DEFAULT_FRAME_RATE);
        }
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate)).max(MIN_FRAME_INTERVAL)
    }
}
