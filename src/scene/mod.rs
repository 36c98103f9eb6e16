//! Scene graph
//!
//! - Node: hierarchy + transform + component keys
//! - Transform: position, rotation, scale with cached matrices
//! - Scene: node/mesh/light pools, environment, prefab instantiation
//! - Camera: perspective camera driven by the AR tracker
//! - Light: ambient, directional and point lights
//! - transform_system: world matrix propagation

pub mod camera;
pub mod environment;
pub mod light;
pub mod node;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use camera::{Camera, Frustum};
pub use environment::Environment;
pub use light::{Light, LightKind, color_from_hex};
pub use node::Node;
pub use scene::Scene;
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct MeshKey;
    pub struct LightKey;
}
