//! Environment map pre-filtering
//!
//! Decodes an equirectangular Radiance HDR image and builds a roughness mip
//! chain from it on the CPU. Each level halves the resolution of the previous
//! one and is blurred proportionally to its roughness, which is
//! `level / (level_count - 1)`.

use half::f16;

use crate::errors::{Error, Result};
use crate::resources::{EnvMapLevel, EnvironmentMap};

/// Smallest edge a generated level may have.
const MIN_LEVEL_SIZE: u32 = 4;

/// Decoded linear RGB32F image.
#[derive(Debug, Clone)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triples
    pub pixels: Vec<[f32; 3]>,
}

impl HdrImage {
    #[inline]
    fn get(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Decodes Radiance `.hdr` (or any float-capable format `image` supports).
pub fn decode_hdr(bytes: &[u8]) -> Result<HdrImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::format(format!("Failed to decode HDR: {e}")))?;

    let width = img.width();
    let height = img.height();
    let rgb32f = img.into_rgb32f();
    let pixels = rgb32f.pixels().map(|p| [p[0], p[1], p[2]]).collect();

    Ok(HdrImage { width, height, pixels })
}

pub struct PmremGenerator {
    max_levels: u32,
}

impl Default for PmremGenerator {
    fn default() -> Self {
        Self { max_levels: 6 }
    }
}

impl PmremGenerator {
    #[must_use]
    pub fn new(max_levels: u32) -> Self {
        Self { max_levels: max_levels.max(1) }
    }

    /// Builds the mip chain for `image`.
    pub fn from_equirectangular(&self, name: &str, image: &HdrImage) -> Result<EnvironmentMap> {
        let texels = (image.width * image.height) as usize;
        if image.width == 0 || image.height == 0 || image.pixels.len() != texels {
            return Err(Error::invalid_data(format!(
                "environment image '{name}' has inconsistent dimensions"
            )));
        }

        let level_count = self.level_count(image.width, image.height);
        let mut levels = Vec::with_capacity(level_count as usize);
        levels.push(to_level(image, 0.0));

        let mut current = image.clone();
        for level in 1..level_count {
            let roughness = level as f32 / (level_count - 1) as f32;
            let downsampled = downsample(&current);
            let radius = (roughness * 2.0).round() as u32;
            let blurred = blur(&downsampled, radius);
            levels.push(to_level(&blurred, roughness));
            current = downsampled;
        }

        log::debug!("Pre-filtered '{name}' into {level_count} levels");

        Ok(EnvironmentMap {
            name: name.to_string(),
            levels,
        })
    }

    fn level_count(&self, width: u32, height: u32) -> u32 {
        let mut count = 1;
        let (mut w, mut h) = (width, height);
        while count < self.max_levels && w / 2 >= MIN_LEVEL_SIZE && h / 2 >= MIN_LEVEL_SIZE {
            w /= 2;
            h /= 2;
            count += 1;
        }
        count
    }
}

fn to_level(image: &HdrImage, roughness: f32) -> EnvMapLevel {
    let mut data = Vec::with_capacity(image.pixels.len() * 4);
    for [r, g, b] in &image.pixels {
        data.push(f16::from_f32(*r));
        data.push(f16::from_f32(*g));
        data.push(f16::from_f32(*b));
        data.push(f16::ONE);
    }
    EnvMapLevel {
        width: image.width,
        height: image.height,
        roughness,
        data,
    }
}

/// 2×2 box filter.
fn downsample(src: &HdrImage) -> HdrImage {
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let mut pixels = Vec::with_capacity((width * height) as usize);

    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let sx = (x * 2 + dx).min(src.width - 1);
                let sy = (y * 2 + dy).min(src.height - 1);
                let p = src.get(sx, sy);
                acc[0] += p[0];
                acc[1] += p[1];
                acc[2] += p[2];
            }
            pixels.push([acc[0] * 0.25, acc[1] * 0.25, acc[2] * 0.25]);
        }
    }

    HdrImage { width, height, pixels }
}

/// Separable box blur; wraps around horizontally (longitude), clamps
/// vertically (latitude).
fn blur(src: &HdrImage, radius: u32) -> HdrImage {
    if radius == 0 {
        return src.clone();
    }
    let r = radius as i64;
    let w = i64::from(src.width);
    let h = i64::from(src.height);
    let norm = 1.0 / (2 * r + 1) as f32;

    let mut horizontal = Vec::with_capacity(src.pixels.len());
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for k in -r..=r {
                let sx = (x + k).rem_euclid(w);
                let p = src.pixels[(y * w + sx) as usize];
                acc[0] += p[0];
                acc[1] += p[1];
                acc[2] += p[2];
            }
            horizontal.push([acc[0] * norm, acc[1] * norm, acc[2] * norm]);
        }
    }

    let mut pixels = Vec::with_capacity(src.pixels.len());
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for k in -r..=r {
                let sy = (y + k).clamp(0, h - 1);
                let p = horizontal[(sy * w + x) as usize];
                acc[0] += p[0];
                acc[1] += p[1];
                acc[2] += p[2];
            }
            pixels.push([acc[0] * norm, acc[1] * norm, acc[2] * norm]);
        }
    }

    HdrImage {
        width: src.width,
        height: src.height,
        pixels,
    }
}
