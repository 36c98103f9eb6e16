use glam::{Affine3A, Vec2, Vec3};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// An inverted box that any `expand` call will overwrite.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn center(&self) -> Vec3 { (self.min + self.max) * 0.5 }
    pub fn size(&self) -> Vec3 { self.max - self.min }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn transform(&self, matrix: &Affine3A) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut out = Self::EMPTY;
        for point in corners {
            out.expand(matrix.transform_point3(point));
        }
        out
    }
}

/// A contiguous index range drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: usize,
}

/// CPU-side triangle geometry.
///
/// Attributes are stored planar; `indices` always describe a triangle list.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub uuid: Uuid,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    /// Material ranges. Empty means the whole index buffer uses material 0.
    pub groups: Vec<GeometryGroup>,
    bounding_box: BoundingBox,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            groups: Vec::new(),
            bounding_box: BoundingBox::EMPTY,
        }
    }

    #[must_use]
    pub fn from_triangles(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let mut geometry = Self::new();
        geometry.positions = positions;
        geometry.indices = indices;
        geometry.compute_bounding_volume();
        geometry
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn add_group(&mut self, start: u32, count: u32, material_index: usize) {
        self.groups.push(GeometryGroup { start, count, material_index });
    }

    /// Area-weighted smooth normals from the triangle list.
    pub fn compute_vertex_normals(&mut self) {
        let count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; count];

        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= count || i1 >= count || i2 >= count {
                continue;
            }
            let v0 = self.positions[i0];
            let face_normal = (self.positions[i1] - v0).cross(self.positions[i2] - v0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = normals;
    }

    pub fn compute_bounding_volume(&mut self) {
        let mut bbox = BoundingBox::EMPTY;
        for p in &self.positions {
            bbox.expand(*p);
        }
        self.bounding_box = bbox;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals_of_xy_triangle_point_up_z() {
        let mut geometry = Geometry::from_triangles(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
        );
        geometry.compute_vertex_normals();
        for n in &geometry.normals {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
        assert_eq!(geometry.bounding_box().max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn empty_geometry_has_empty_bounds() {
        let geometry = Geometry::from_triangles(Vec::new(), Vec::new());
        assert!(geometry.bounding_box().is_empty());
        assert_eq!(geometry.triangle_count(), 0);
    }
}
