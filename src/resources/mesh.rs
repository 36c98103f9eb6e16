use std::sync::Arc;

use uuid::Uuid;

use crate::resources::geometry::Geometry;
use crate::resources::material::Material;

#[derive(Debug, Clone)]
pub struct Mesh {
    pub id: Uuid,
    pub name: String,

    pub geometry: Arc<Geometry>,
    /// Indexed by [`GeometryGroup::material_index`](crate::resources::geometry::GeometryGroup).
    pub materials: Vec<Arc<Material>>,

    pub visible: bool,
    pub render_order: i32,
}

impl Mesh {
    #[must_use]
    pub fn new(geometry: Arc<Geometry>, materials: Vec<Arc<Material>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Mesh".to_string(),
            geometry,
            materials,
            visible: true,
            render_order: 0,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Primary material, if any.
    #[must_use]
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.materials.first()
    }
}
