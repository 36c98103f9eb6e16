use std::sync::Arc;

use crate::assets::ColorSpace;

/// Decoded RGBA8 texture.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub data: Vec<u8>,
    pub flip_y: bool,
}

impl Texture {
    #[must_use]
    pub fn new_2d(
        name: &str,
        width: u32,
        height: u32,
        data: Vec<u8>,
        color_space: ColorSpace,
    ) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            color_space,
            data,
            flip_y: true,
        }
    }

    /// A 1×1 texture of a single color.
    #[must_use]
    pub fn create_solid_color(name: &str, color: [u8; 4]) -> Texture {
        Self::new_2d(name, 1, 1, color.to_vec(), ColorSpace::Srgb)
    }

    /// Decodes PNG/JPEG bytes into an RGBA8 texture.
    pub fn decode(name: &str, bytes: &[u8], color_space: ColorSpace) -> crate::Result<Self> {
        let img = image::load_from_memory(bytes)?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::new_2d(name, width, height, rgba.into_raw(), color_space))
    }
}

pub type TextureRef = Arc<Texture>;
