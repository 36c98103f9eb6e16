//! Materials
//!
//! A single Phong-style material covers every format the loaders read:
//! MTL statements, FBX material properties and glTF base colors all map onto
//! the same fields.

use glam::Vec3;

use crate::assets::ColorSpace;
use crate::resources::texture::TextureRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// A texture binding plus the URI it was requested from.
#[derive(Debug, Clone, Default)]
pub struct TextureSlot {
    pub uri: Option<String>,
    pub texture: Option<TextureRef>,
}

impl TextureSlot {
    #[must_use]
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self { uri: Some(uri.into()), texture: None }
    }

    /// A slot is pending when it names a texture that has not been loaded.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.uri.is_some() && self.texture.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub color: Vec3,
    pub specular: Vec3,
    pub emissive: Vec3,
    pub shininess: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub side: Side,

    pub map: TextureSlot,
    pub specular_map: TextureSlot,
    pub emissive_map: TextureSlot,
    pub normal_map: TextureSlot,
    pub bump_map: TextureSlot,
    pub alpha_map: TextureSlot,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Material {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: Vec3::ONE,
            specular: Vec3::splat(0.066_666),
            emissive: Vec3::ZERO,
            shininess: 30.0,
            opacity: 1.0,
            transparent: false,
            side: Side::Front,
            map: TextureSlot::default(),
            specular_map: TextureSlot::default(),
            emissive_map: TextureSlot::default(),
            normal_map: TextureSlot::default(),
            bump_map: TextureSlot::default(),
            alpha_map: TextureSlot::default(),
        }
    }

    #[must_use]
    pub fn with_color(name: &str, color: Vec3) -> Self {
        Self { color, ..Self::new(name) }
    }

    pub fn texture_slots(&self) -> impl Iterator<Item = &TextureSlot> {
        [
            &self.map,
            &self.specular_map,
            &self.emissive_map,
            &self.normal_map,
            &self.bump_map,
            &self.alpha_map,
        ]
        .into_iter()
    }

    /// Mutable slots paired with the color space their images are stored in.
    pub fn texture_slots_mut(&mut self) -> impl Iterator<Item = (&mut TextureSlot, ColorSpace)> {
        [
            (&mut self.map, ColorSpace::Srgb),
            (&mut self.specular_map, ColorSpace::Srgb),
            (&mut self.emissive_map, ColorSpace::Srgb),
            (&mut self.normal_map, ColorSpace::Linear),
            (&mut self.bump_map, ColorSpace::Linear),
            (&mut self.alpha_map, ColorSpace::Linear),
        ]
        .into_iter()
    }
}
