use glam::Vec3;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowConfig {
    pub bias: f32,
    pub normal_bias: f32,
    pub map_size: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            bias: 0.005,
            normal_bias: 0.02,
            map_size: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Point the light aims at, in world space.
    pub target: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub range: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    /// Uniform light reaching every surface equally.
    Ambient,
    Directional(DirectionalLight),
    Point(PointLight),
}

#[derive(Debug, Clone)]
pub struct Light {
    pub uuid: Uuid,
    pub id: u64,
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,

    pub cast_shadows: bool,
    pub shadow: Option<ShadowConfig>,
}

/// Converts a `0xRRGGBB` color to linear-agnostic `[0, 1]` components.
#[must_use]
pub fn color_from_hex(hex: u32) -> Vec3 {
    let r = ((hex >> 16) & 0xff) as f32 / 255.0;
    let g = ((hex >> 8) & 0xff) as f32 / 255.0;
    let b = (hex & 0xff) as f32 / 255.0;
    Vec3::new(r, g, b)
}

impl Light {
    fn generate_id_from_uuid(uuid: &Uuid) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        uuid.hash(&mut hasher);
        hasher.finish()
    }

    fn with_kind(
        color: Vec3,
        intensity: f32,
        kind: LightKind,
        shadow: Option<ShadowConfig>,
    ) -> Self {
        let uuid = Uuid::new_v4();
        Self {
            uuid,
            id: Self::generate_id_from_uuid(&uuid),
            color,
            intensity,
            kind,
            cast_shadows: false,
            shadow,
        }
    }

    #[must_use]
    pub fn new_ambient(color: Vec3, intensity: f32) -> Self {
        Self::with_kind(color, intensity, LightKind::Ambient, None)
    }

    #[must_use]
    pub fn new_directional(color: Vec3, intensity: f32) -> Self {
        Self::with_kind(
            color,
            intensity,
            LightKind::Directional(DirectionalLight { target: Vec3::ZERO }),
            Some(ShadowConfig::default()),
        )
    }

    #[must_use]
    pub fn new_point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self::with_kind(
            color,
            intensity,
            LightKind::Point(PointLight { range }),
            Some(ShadowConfig::default()),
        )
    }

    #[must_use]
    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, LightKind::Ambient)
    }
}
