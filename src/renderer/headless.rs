//! Headless Renderer
//!
//! Walks the scene the way a GPU renderer would (visibility, frustum culling,
//! light collection) and records what would have been drawn.

use glam::{Vec3, Vec4};

use crate::errors::Result;
use crate::renderer::{Renderer, RendererSettings};
use crate::scene::{Camera, NodeHandle, Scene};

/// What one rendered frame contained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// 1-based index of the frame
    pub frame: u64,
    pub visible_meshes: usize,
    pub culled_meshes: usize,
    pub draw_calls: usize,
    pub triangles: usize,
    pub lights: usize,
    pub has_environment: bool,
    pub background: Option<Vec4>,
    pub camera_position: Vec3,
}

#[derive(Default)]
pub struct HeadlessRenderer {
    settings: RendererSettings,
    frame_count: u64,
    last_stats: Option<FrameStats>,
}

impl HeadlessRenderer {
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            frame_count: 0,
            last_stats: None,
        }
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub fn last_stats(&self) -> Option<&FrameStats> {
        self.last_stats.as_ref()
    }

    /// Collects the frame contents without recording them.
    #[must_use]
    pub fn collect(scene: &Scene, camera: &Camera) -> FrameStats {
        let frustum = camera.frustum();
        let mut stats = FrameStats {
            has_environment: scene.environment.has_env_map(),
            background: scene.background,
            camera_position: camera.position(),
            ..FrameStats::default()
        };

        let mut stack: Vec<NodeHandle> = scene.root_nodes.iter().rev().copied().collect();
        while let Some(handle) = stack.pop() {
            let Some(node) = scene.get_node(handle) else { continue };
            // Hidden nodes hide their whole subtree.
            if !node.visible {
                continue;
            }

            if node.light.is_some_and(|key| scene.lights.contains_key(key)) {
                stats.lights += 1;
            }

            let mesh = node.mesh.and_then(|key| scene.meshes.get(key));
            if let Some(mesh) = mesh.filter(|m| m.visible) {
                let bbox = mesh.geometry.bounding_box();
                if !bbox.is_empty() {
                    let world = bbox.transform(node.world_matrix());
                    let radius = world.size().length() * 0.5;
                    if frustum.intersects_sphere(world.center(), radius) {
                        stats.visible_meshes += 1;
                        stats.draw_calls += mesh.geometry.groups.len().max(1);
                        stats.triangles += mesh.geometry.triangle_count();
                    } else {
                        stats.culled_meshes += 1;
                    }
                }
            }

            stack.extend(node.children().iter().rev().copied());
        }

        stats
    }
}

impl Renderer for HeadlessRenderer {
    fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        let mut stats = Self::collect(scene, camera);
        self.frame_count += 1;
        stats.frame = self.frame_count;

        log::debug!(
            "Frame {}: {} meshes drawn ({} culled), {} triangles, {} lights",
            stats.frame,
            stats.visible_meshes,
            stats.culled_meshes,
            stats.triangles,
            stats.lights
        );

        self.last_stats = Some(stats);
        Ok(())
    }
}
