//! Renderer Settings
//!
//! Output configuration shared by every [`Renderer`](super::Renderer)
//! implementation.
//!
//! ```rust,ignore
//! use ar_stage::renderer::RendererSettings;
//! use ar_stage::ColorSpace;
//!
//! let settings = RendererSettings {
//!     output_color_space: ColorSpace::Srgb,
//!     physically_correct_lights: true,
//!     pixel_ratio: 2.0,
//!     ..Default::default()
//! };
//! ```

use glam::Vec4;

use crate::assets::ColorSpace;

#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Encoding of the final framebuffer.
    pub output_color_space: ColorSpace,

    /// Interpret light intensities in physical units (candela, lux) instead
    /// of the legacy artist scale.
    pub physically_correct_lights: bool,

    /// Device pixels per logical pixel.
    pub pixel_ratio: f32,

    /// Logical size of the drawing surface.
    pub width: u32,
    pub height: u32,

    /// Framebuffer clear color, used when the scene has no background.
    pub clear_color: Vec4,

    /// Master switch for shadow maps; lights still opt in individually.
    pub shadow_map_enabled: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            output_color_space: ColorSpace::Linear,
            physically_correct_lights: false,
            pixel_ratio: 1.0,
            width: 1280,
            height: 720,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 0.0),
            shadow_map_enabled: false,
        }
    }
}

impl RendererSettings {
    /// Size of the drawing buffer in device pixels.
    #[inline]
    #[must_use]
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio.max(0.0);
        (
            (self.width as f32 * ratio).round() as u32,
            (self.height as f32 * ratio).round() as u32,
        )
    }

    #[inline]
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_buffer_scales_with_pixel_ratio() {
        let settings = RendererSettings {
            width: 400,
            height: 300,
            pixel_ratio: 2.5,
            ..Default::default()
        };
        assert_eq!(settings.drawing_buffer_size(), (1000, 750));
        assert!((settings.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }
}
