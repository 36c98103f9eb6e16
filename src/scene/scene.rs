use std::sync::Arc;

use glam::{Affine3A, Vec4};
use slotmap::SlotMap;

use crate::assets::prefab::Prefab;
use crate::errors::{Error, Result};
use crate::resources::{BoundingBox, Mesh};
use crate::scene::environment::Environment;
use crate::scene::light::Light;
use crate::scene::node::Node;
use crate::scene::transform_system;
use crate::scene::{LightKey, MeshKey, NodeHandle};

/// Scene graph container.
///
/// Nodes live in a slot map; `root_nodes` lists the nodes that are part of the
/// rendered scene. A node that is neither a root nor a descendant of one is
/// detached: it exists but is not drawn.
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    pub meshes: SlotMap<MeshKey, Mesh>,
    pub lights: SlotMap<LightKey, Light>,

    /// Image-based lighting; independent from `background`.
    pub environment: Environment,
    pub background: Option<Vec4>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            meshes: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            environment: Environment::new(),
            background: None,
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Creates a detached node.
    pub fn create_node(&mut self) -> NodeHandle {
        self.nodes.insert(Node::new())
    }

    /// Creates a detached, named node.
    pub fn create_node_with_name(&mut self, name: &str) -> NodeHandle {
        self.nodes.insert(Node::with_name(name))
    }

    /// Inserts a node as a scene root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Makes an existing parentless node a scene root.
    ///
    /// Returns `Ok(false)` if it already is one.
    pub fn add_to_root(&mut self, handle: NodeHandle) -> Result<bool> {
        let node = self.nodes.get(handle).ok_or(Error::NodeNotFound)?;
        if node.parent.is_some() {
            return Err(Error::InvalidHierarchy(format!(
                "node '{}' already has a parent",
                node.name
            )));
        }
        if self.root_nodes.contains(&handle) {
            return Ok(false);
        }
        self.root_nodes.push(handle);
        Ok(true)
    }

    #[must_use]
    pub fn is_root(&self, handle: NodeHandle) -> bool {
        self.root_nodes.contains(&handle)
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn get_name(&self, handle: NodeHandle) -> Option<&str> {
        self.nodes.get(handle).map(|n| n.name.as_str())
    }

    pub fn set_name(&mut self, handle: NodeHandle, name: &str) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.name = name.to_string();
        }
    }

    /// Moves `child` under `parent`, detaching it from its previous parent or
    /// from the root list.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) -> Result<()> {
        if child == parent {
            return Err(Error::InvalidHierarchy("cannot attach a node to itself".into()));
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            return Err(Error::NodeNotFound);
        }
        if self.is_ancestor(child, parent) {
            return Err(Error::InvalidHierarchy("attach would create a cycle".into()));
        }

        self.detach(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
        Ok(())
    }

    /// Unlinks a node from its parent (or the root list). The node survives.
    pub fn detach(&mut self, handle: NodeHandle) {
        let old_parent = self.nodes.get(handle).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p) {
                n.children.retain(|&x| x != handle);
            }
        } else {
            self.root_nodes.retain(|&x| x != handle);
        }
        if let Some(node) = self.nodes.get_mut(handle) {
            node.parent = None;
            node.transform.mark_dirty();
        }
    }

    /// Removes a node and its whole subtree.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        self.detach(handle);
        for h in transform_system::collect_subtree(&self.nodes, handle) {
            if let Some(node) = self.nodes.remove(h) {
                if let Some(mesh) = node.mesh {
                    self.meshes.remove(mesh);
                }
                if let Some(light) = node.light {
                    self.lights.remove(light);
                }
            }
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.nodes.get(h).and_then(|n| n.parent);
        }
        false
    }

    /// Whether the node is reachable from a scene root.
    #[must_use]
    pub fn is_in_scene(&self, handle: NodeHandle) -> bool {
        let mut current = handle;
        loop {
            match self.nodes.get(current).map(|n| n.parent) {
                Some(Some(parent)) => current = parent,
                Some(None) => return self.root_nodes.contains(&current),
                None => return false,
            }
        }
    }

    /// Depth-first search for a node by name below (and including) `root`.
    #[must_use]
    pub fn find_node_by_name(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        transform_system::collect_subtree(&self.nodes, root)
            .into_iter()
            .find(|&h| self.nodes.get(h).is_some_and(|n| n.name == name))
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn add_mesh_to_parent(&mut self, mesh: Mesh, parent: NodeHandle) -> Result<NodeHandle> {
        let mut node = Node::with_name(&mesh.name);
        node.mesh = Some(self.meshes.insert(mesh));
        let handle = self.nodes.insert(node);
        self.attach(handle, parent)?;
        Ok(handle)
    }

    /// Adds a light on a new root node.
    pub fn add_light(&mut self, light: Light) -> NodeHandle {
        let mut node = Node::with_name("Light");
        node.light = Some(self.lights.insert(light));
        self.add_node(node)
    }

    /// Iterates lights attached to nodes, with their world matrices.
    pub fn iter_active_lights(&self) -> impl Iterator<Item = (&Light, &Affine3A)> {
        self.nodes.values().filter_map(move |node| {
            let light = self.lights.get(node.light?)?;
            Some((light, &node.transform.world_matrix))
        })
    }

    // ========================================================================
    // Prefabs
    // ========================================================================

    /// Instantiates a prefab under a new detached group node named `name`.
    ///
    /// Returns the group node. Nodes keep their prefab names so animation
    /// tracks can bind to them.
    pub fn instantiate(&mut self, prefab: &Prefab, name: &str) -> Result<NodeHandle> {
        let group = self.create_node_with_name(name);

        let mut mapping = Vec::with_capacity(prefab.nodes.len());
        for prefab_node in &prefab.nodes {
            let mut node = Node::with_name(prefab_node.name.as_deref().unwrap_or(""));
            node.transform = prefab_node.transform.clone();
            node.transform.mark_dirty();
            if let Some(mesh) = &prefab_node.mesh {
                node.mesh = Some(self.meshes.insert(mesh.clone()));
            }
            mapping.push(self.nodes.insert(node));
        }

        for (index, prefab_node) in prefab.nodes.iter().enumerate() {
            for &child in &prefab_node.children_indices {
                let child_handle = *mapping.get(child).ok_or_else(|| {
                    Error::invalid_data(format!("prefab child index {child} out of bounds"))
                })?;
                self.attach(child_handle, mapping[index])?;
            }
        }

        for &root in &prefab.root_indices {
            let root_handle = *mapping.get(root).ok_or_else(|| {
                Error::invalid_data(format!("prefab root index {root} out of bounds"))
            })?;
            self.attach(root_handle, group)?;
        }

        Ok(group)
    }

    // ========================================================================
    // Update
    // ========================================================================

    pub fn update_matrix_world(&mut self) {
        transform_system::update_hierarchy(&mut self.nodes, &self.root_nodes);
    }

    /// World-space bounds of every mesh below `root`, as of the last matrix update.
    #[must_use]
    pub fn get_bbox_of_node(&self, root: NodeHandle) -> Option<BoundingBox> {
        let mut result: Option<BoundingBox> = None;
        for handle in transform_system::collect_subtree(&self.nodes, root) {
            let Some(node) = self.nodes.get(handle) else { continue };
            let Some(mesh) = node.mesh.and_then(|key| self.meshes.get(key)) else {
                continue;
            };
            let local = mesh.geometry.bounding_box();
            if local.is_empty() {
                continue;
            }
            let world = local.transform(&node.transform.world_matrix);
            result = Some(result.map_or(world, |acc| acc.union(&world)));
        }
        result
    }

    /// Shared handle to a mesh's geometry, mostly for inspection.
    #[must_use]
    pub fn mesh_of(&self, handle: NodeHandle) -> Option<&Mesh> {
        self.nodes.get(handle)?.mesh.and_then(|key| self.meshes.get(key))
    }

    pub fn set_background(&mut self, color: Option<Vec4>) {
        self.background = color;
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Replaces the environment map, keeping other environment settings.
    pub fn set_environment_map(&mut self, map: Option<Arc<crate::resources::EnvironmentMap>>) {
        self.environment.set_env_map(map);
    }
}
