//! CPU-side resources shared by loaders and the scene.

pub mod environment_map;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod texture;

pub use environment_map::{EnvMapLevel, EnvironmentMap};
pub use geometry::{BoundingBox, Geometry, GeometryGroup};
pub use material::{Material, Side, TextureSlot};
pub use mesh::Mesh;
pub use texture::{Texture, TextureRef};
