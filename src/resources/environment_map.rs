use half::f16;

/// One level of a pre-filtered equirectangular environment map.
#[derive(Debug, Clone)]
pub struct EnvMapLevel {
    pub width: u32,
    pub height: u32,
    /// Roughness this level was filtered for, in `[0, 1]`.
    pub roughness: f32,
    /// Row-major RGBA16F texels.
    pub data: Vec<f16>,
}

impl EnvMapLevel {
    /// Reads one texel as linear RGB.
    #[must_use]
    pub fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.data[i].to_f32(),
            self.data[i + 1].to_f32(),
            self.data[i + 2].to_f32(),
        ]
    }
}

/// A roughness mip chain built from an equirectangular HDR image.
///
/// Level 0 is the unfiltered source, the last level the roughest.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub name: String,
    pub levels: Vec<EnvMapLevel>,
}

impl EnvironmentMap {
    #[must_use]
    pub fn base(&self) -> Option<&EnvMapLevel> {
        self.levels.first()
    }

    /// Level whose roughness is closest to `roughness`.
    #[must_use]
    pub fn level_for_roughness(&self, roughness: f32) -> Option<&EnvMapLevel> {
        let max = self.levels.len().checked_sub(1)?;
        let index = (roughness.clamp(0.0, 1.0) * max as f32).round() as usize;
        self.levels.get(index)
    }
}
