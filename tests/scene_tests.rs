//! Scene Graph Tests
//!
//! Tests for:
//! - Node creation, naming, root membership
//! - attach / detach / remove semantics
//! - Scene membership (`is_in_scene`) and name lookup
//! - Lights and prefab instantiation

use std::sync::Arc;

use glam::Vec3;

use ar_stage::assets::{Prefab, PrefabNode};
use ar_stage::errors::Error;
use ar_stage::resources::{Geometry, Material, Mesh};
use ar_stage::scene::{Light, LightKind, Node, Scene};

fn quad_mesh(name: &str) -> Mesh {
    let geometry = Geometry::from_triangles(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)],
        vec![0, 1, 2, 2, 1, 3],
    );
    Mesh::new(Arc::new(geometry), vec![Arc::new(Material::default())]).with_name(name)
}

// ============================================================================
// Nodes
// ============================================================================

#[test]
fn scene_create_node_is_detached() {
    let mut scene = Scene::new();
    let handle = scene.create_node();

    assert!(scene.get_node(handle).is_some());
    assert!(!scene.is_root(handle));
    assert!(!scene.is_in_scene(handle));
}

#[test]
fn scene_create_node_with_name() {
    let mut scene = Scene::new();
    let handle = scene.create_node_with_name("Target");
    assert_eq!(scene.get_name(handle), Some("Target"));
}

#[test]
fn scene_set_name() {
    let mut scene = Scene::new();
    let handle = scene.create_node();
    scene.set_name(handle, "Renamed");
    assert_eq!(scene.get_node(handle).unwrap().name, "Renamed");
}

#[test]
fn scene_add_node_to_root() {
    let mut scene = Scene::new();
    let handle = scene.add_node(Node::with_name("Root"));
    assert!(scene.is_root(handle));
    assert!(scene.is_in_scene(handle));
}

#[test]
fn add_to_root_is_idempotent() {
    let mut scene = Scene::new();
    let handle = scene.create_node();

    assert!(scene.add_to_root(handle).unwrap());
    assert!(!scene.add_to_root(handle).unwrap());
    assert_eq!(scene.root_nodes.iter().filter(|&&h| h == handle).count(), 1);
}

#[test]
fn add_to_root_rejects_parented_nodes() {
    let mut scene = Scene::new();
    let parent = scene.create_node();
    let child = scene.create_node();
    scene.attach(child, parent).unwrap();

    let err = scene.add_to_root(child).unwrap_err();
    assert!(matches!(err, Error::InvalidHierarchy(_)));
    assert!(!scene.is_root(child));
}

#[test]
fn add_to_root_of_a_removed_node_fails() {
    let mut scene = Scene::new();
    let handle = scene.create_node();
    scene.remove_node(handle);
    assert!(matches!(scene.add_to_root(handle), Err(Error::NodeNotFound)));
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn scene_attach_sets_parent_child() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new());
    let child = scene.create_node();

    scene.attach(child, parent).unwrap();

    assert_eq!(scene.get_node(child).unwrap().parent(), Some(parent));
    assert_eq!(scene.get_node(parent).unwrap().children(), &[child]);
    assert!(scene.is_in_scene(child));
}

#[test]
fn scene_attach_removes_from_old_parent() {
    let mut scene = Scene::new();
    let a = scene.add_node(Node::new());
    let b = scene.add_node(Node::new());
    let child = scene.create_node();

    scene.attach(child, a).unwrap();
    scene.attach(child, b).unwrap();

    assert!(scene.get_node(a).unwrap().children().is_empty());
    assert_eq!(scene.get_node(b).unwrap().children(), &[child]);
}

#[test]
fn scene_attach_takes_a_root_out_of_the_root_list() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new());
    let child = scene.add_node(Node::new());

    scene.attach(child, parent).unwrap();

    assert!(!scene.is_root(child));
    assert!(scene.is_in_scene(child));
}

#[test]
fn scene_attach_to_self_is_rejected() {
    let mut scene = Scene::new();
    let node = scene.add_node(Node::new());
    assert!(scene.attach(node, node).is_err());
    assert!(scene.get_node(node).unwrap().parent().is_none());
}

#[test]
fn scene_attach_cycle_is_rejected() {
    let mut scene = Scene::new();
    let a = scene.create_node();
    let b = scene.create_node();
    scene.attach(b, a).unwrap();

    let err = scene.attach(a, b).unwrap_err();
    assert!(matches!(err, Error::InvalidHierarchy(_)));
    assert_eq!(scene.get_node(b).unwrap().parent(), Some(a));
}

#[test]
fn scene_detach_keeps_the_node() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new());
    let child = scene.create_node();
    scene.attach(child, parent).unwrap();

    scene.detach(child);

    assert!(scene.get_node(child).is_some());
    assert!(scene.get_node(child).unwrap().parent().is_none());
    assert!(!scene.is_in_scene(child));
}

#[test]
fn scene_remove_node_removes_subtree_and_components() {
    let mut scene = Scene::new();
    let root = scene.add_node(Node::new());
    let mesh_node = scene.add_mesh_to_parent(quad_mesh("Quad"), root).unwrap();
    let grandchild = scene.create_node();
    scene.attach(grandchild, mesh_node).unwrap();
    assert_eq!(scene.mesh_count(), 1);

    scene.remove_node(root);

    assert!(scene.get_node(root).is_none());
    assert!(scene.get_node(mesh_node).is_none());
    assert!(scene.get_node(grandchild).is_none());
    assert!(scene.root_nodes.is_empty());
    assert_eq!(scene.mesh_count(), 0);
}

#[test]
fn find_node_by_name_includes_the_root() {
    let mut scene = Scene::new();
    let root = scene.create_node_with_name("Hood");
    let child = scene.create_node_with_name("Body");
    scene.attach(child, root).unwrap();

    assert_eq!(scene.find_node_by_name(root, "Hood"), Some(root));
    assert_eq!(scene.find_node_by_name(root, "Body"), Some(child));
    assert_eq!(scene.find_node_by_name(child, "Hood"), None);
}

#[test]
fn attach_marks_child_dirty() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new());
    let child = scene.add_node(Node::new());
    scene.get_node_mut(parent).unwrap().transform.position = Vec3::new(0.0, 3.0, 0.0);
    scene.get_node_mut(child).unwrap().transform.position = Vec3::new(1.0, 0.0, 0.0);
    scene.update_matrix_world();

    scene.attach(child, parent).unwrap();
    scene.update_matrix_world();

    let world: Vec3 = scene.get_node(child).unwrap().world_matrix().translation.into();
    assert_eq!(world, Vec3::new(1.0, 3.0, 0.0));
}

// ============================================================================
// Lights
// ============================================================================

#[test]
fn add_light_creates_a_root_light_node() {
    let mut scene = Scene::new();
    let handle = scene.add_light(Light::new_directional(Vec3::ONE, 2.5));

    assert!(scene.is_root(handle));
    let node = scene.get_node(handle).unwrap();
    assert_eq!(node.name, "Light");
    let light = &scene.lights[node.light.unwrap()];
    assert!(matches!(light.kind, LightKind::Directional(_)));
}

#[test]
fn scene_iterate_active_lights() {
    let mut scene = Scene::new();
    scene.add_light(Light::new_ambient(Vec3::ONE, 1.0));
    let point = scene.add_light(Light::new_point(Vec3::ONE, 1.0, 10.0));
    scene.get_node_mut(point).unwrap().transform.position = Vec3::new(0.0, 4.0, 0.0);
    scene.update_matrix_world();

    let lights: Vec<_> = scene.iter_active_lights().collect();
    assert_eq!(lights.len(), 2);
    let (_, world) = lights
        .iter()
        .find(|(light, _)| matches!(light.kind, LightKind::Point(_)))
        .unwrap();
    assert_eq!(Vec3::from(world.translation), Vec3::new(0.0, 4.0, 0.0));
}

#[test]
fn light_ids_are_unique() {
    let a = Light::new_ambient(Vec3::ONE, 1.0);
    let b = Light::new_ambient(Vec3::ONE, 1.0);
    assert_ne!(a.uuid, b.uuid);
    assert_ne!(a.id, b.id);
}

// ============================================================================
// Prefab instantiation
// ============================================================================

#[test]
fn instantiate_builds_a_detached_group() {
    let mut prefab = Prefab::new();
    let mut body = PrefabNode::named("Body");
    body.mesh = Some(quad_mesh("Body"));
    let body = prefab.push_root(body);
    let wheel = prefab.push_node(PrefabNode::named("Wheel"));
    prefab.nodes[body].children_indices.push(wheel);

    let mut scene = Scene::new();
    let group = scene.instantiate(&prefab, "Car").unwrap();

    assert_eq!(scene.get_name(group), Some("Car"));
    assert!(!scene.is_in_scene(group));
    let body = scene.find_node_by_name(group, "Body").unwrap();
    assert_eq!(scene.get_node(group).unwrap().children(), &[body]);
    assert!(scene.mesh_of(body).is_some());
    assert!(scene.find_node_by_name(body, "Wheel").is_some());
}

#[test]
fn instantiate_rejects_out_of_range_children() {
    let mut prefab = Prefab::new();
    let root = prefab.push_root(PrefabNode::named("Root"));
    prefab.nodes[root].children_indices.push(7);

    let mut scene = Scene::new();
    assert!(scene.instantiate(&prefab, "Broken").is_err());
}

#[test]
fn bbox_of_node_follows_world_transform() {
    let mut scene = Scene::new();
    let root = scene.add_node(Node::new());
    scene.get_node_mut(root).unwrap().transform.set_scalar(2.0);
    scene.add_mesh_to_parent(quad_mesh("Quad"), root).unwrap();
    scene.update_matrix_world();

    let bbox = scene.get_bbox_of_node(root).unwrap();
    assert_eq!(bbox.min, Vec3::ZERO);
    assert_eq!(bbox.max, Vec3::new(2.0, 2.0, 0.0));
}
