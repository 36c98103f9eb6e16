use crate::animation::clip::AnimationClip;
use crate::resources::mesh::Mesh;
use crate::scene::transform::Transform;

/// Prefab node: plain data, children referenced by index.
#[derive(Debug, Clone, Default)]
pub struct PrefabNode {
    pub name: Option<String>,
    pub transform: Transform,
    /// Indices into `Prefab::nodes`
    pub children_indices: Vec<usize>,
    pub mesh: Option<Mesh>,
}

impl PrefabNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

/// Scene-independent result of parsing an asset.
///
/// A prefab holds no `NodeHandle`; [`Scene::instantiate`](crate::scene::Scene::instantiate)
/// turns it into scene nodes.
#[derive(Debug, Clone, Default)]
pub struct Prefab {
    pub nodes: Vec<PrefabNode>,
    pub root_indices: Vec<usize>,
    pub animations: Vec<AnimationClip>,
}

impl Prefab {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its index.
    pub fn push_node(&mut self, node: PrefabNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn push_root(&mut self, node: PrefabNode) -> usize {
        let index = self.push_node(node);
        self.root_indices.push(index);
        index
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.mesh.is_some()).count()
    }
}
