use std::collections::HashMap;
use std::future::Future;

use glam::Affine3A;

use crate::errors::Result;
use crate::scene::Camera;

/// The AR runtime: camera pose and target poses, refreshed once per frame.
pub trait ArTracker {
    /// Waits for the next camera frame and refreshes all poses.
    fn update(&mut self) -> impl Future<Output = Result<()>>;

    /// The device camera as of the last update.
    fn device_camera(&self) -> &Camera;

    /// World pose of a target, or `None` while it is not recognized.
    fn target_pose(&self, uid: &str) -> Option<Affine3A>;
}

/// A tracker with fixed poses, for headless runs and tests.
pub struct StaticTracker {
    camera: Camera,
    poses: HashMap<String, Affine3A>,
    default_pose: Option<Affine3A>,
    updates: u64,
}

impl StaticTracker {
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            poses: HashMap::new(),
            default_pose: None,
            updates: 0,
        }
    }

    #[must_use]
    pub fn with_pose(mut self, uid: &str, pose: Affine3A) -> Self {
        self.set_pose(uid, pose);
        self
    }

    /// Reports every target without an explicit pose at `pose`.
    #[must_use]
    pub fn with_default_pose(mut self, pose: Affine3A) -> Self {
        self.default_pose = Some(pose);
        self
    }

    pub fn set_pose(&mut self, uid: &str, pose: Affine3A) {
        self.poses.insert(uid.to_string(), pose);
    }

    pub fn remove_pose(&mut self, uid: &str) {
        self.poses.remove(uid);
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}

impl ArTracker for StaticTracker {
    async fn update(&mut self) -> Result<()> {
        self.updates += 1;
        Ok(())
    }

    fn device_camera(&self) -> &Camera {
        &self.camera
    }

    fn target_pose(&self, uid: &str) -> Option<Affine3A> {
        self.poses.get(uid).copied().or(self.default_pose)
    }
}
