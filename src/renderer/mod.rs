//! Rendering surface
//!
//! The drawing backend is provided by the host; [`Renderer`] is the seam the
//! frame loop draws through. [`HeadlessRenderer`] records frame statistics
//! instead of rasterizing.

pub mod headless;
pub mod settings;

pub use headless::{FrameStats, HeadlessRenderer};
pub use settings::RendererSettings;

use crate::errors::Result;
use crate::scene::{Camera, Scene};

pub trait Renderer {
    fn settings(&self) -> &RendererSettings;

    fn settings_mut(&mut self) -> &mut RendererSettings;

    fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.settings_mut().pixel_ratio = pixel_ratio;
    }

    /// Draws `scene` once from `camera`. World matrices must be current.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()>;
}
