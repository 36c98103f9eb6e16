use glam::{Affine3A, Mat4, Vec3, Vec4};
use std::borrow::Cow;
use uuid::Uuid;

/// A perspective camera.
///
/// In an AR session the device camera is owned by the tracker, which sets both
/// the pose and (optionally) an intrinsics-derived projection each frame.
#[derive(Debug, Clone)]
pub struct Camera {
    pub uuid: Uuid,
    pub name: Cow<'static, str>,

    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub(crate) world_matrix: Affine3A,
    pub(crate) view_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,
    pub(crate) view_projection_matrix: Mat4,
    pub(crate) frustum: Frustum,
}

impl Camera {
    /// `fov` is the vertical field of view in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            uuid: Uuid::new_v4(),
            name: Cow::Borrowed("Camera"),
            fov: fov.to_radians(),
            aspect,
            near,
            far,

            world_matrix: Affine3A::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };

        cam.update_projection_matrix();
        cam
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        self.update_view_projection_matrix();
    }

    /// Overrides the projection, e.g. with one computed from device intrinsics.
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection_matrix = projection;
        self.update_view_projection_matrix();
    }

    /// Places the camera; `world_transform` maps camera space to world space.
    pub fn set_pose(&mut self, world_transform: Affine3A) {
        self.world_matrix = world_transform;
        self.view_matrix = Mat4::from(world_transform).inverse();
        self.update_view_projection_matrix();
    }

    fn update_view_projection_matrix(&mut self) {
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(self.view_projection_matrix);
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Gribb-Hartmann plane extraction for a `[0, 1]` depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[2],
            rows[3] - rows[2],
        ];

        for plane in &mut planes {
            let length = Vec3::new(plane.x, plane.y, plane.z).length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| {
            plane.x * center.x + plane.y * center.y + plane.z * center.z + plane.w >= -radius
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_sees_down_negative_z() {
        let camera = Camera::new_perspective(60.0, 1.0, 0.1, 1000.0);
        assert!(camera.frustum().intersects_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0));
        assert!(!camera.frustum().intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
    }

    #[test]
    fn pose_moves_the_frustum() {
        let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 1000.0);
        camera.set_pose(Affine3A::from_translation(Vec3::new(0.0, 0.0, 50.0)));
        assert!(camera.frustum().intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 50.0));
    }
}
