//! glTF 2.0 Loader
//!
//! Self-contained `.glb` files and `.gltf` files with embedded (data URI)
//! buffers. Nodes, triangle meshes, base-color materials and TRS animation
//! channels are read; skins and morph targets are not.

use std::sync::Arc;

use glam::{Quat, Vec2, Vec3};
use gltf::animation::Property;
use gltf::animation::util::ReadOutputs;

use crate::animation::{
    AnimationClip, InterpolationMode, KeyframeTrack, TargetPath, Track, TrackData, TrackMeta,
};
use crate::assets::ColorSpace;
use crate::assets::prefab::{Prefab, PrefabNode};
use crate::errors::Result;
use crate::resources::{Geometry, Material, Mesh, Side, Texture, TextureSlot};
use crate::scene::Transform;

pub struct GltfLoader;

impl GltfLoader {
    pub fn parse(bytes: &[u8]) -> Result<Prefab> {
        let (document, buffers, images) = gltf::import_slice(bytes)?;
        let buffer_data =
            |buffer: gltf::Buffer<'_>| buffers.get(buffer.index()).map(|data| data.0.as_slice());

        let textures: Vec<Option<Arc<Texture>>> = images
            .iter()
            .enumerate()
            .map(|(index, image)| Self::convert_image(index, image))
            .collect();

        let materials: Vec<Arc<Material>> = document
            .materials()
            .map(|m| Arc::new(Self::convert_material(&m, &textures)))
            .collect();
        let default_material = Arc::new(Material::default());

        let mut prefab = Prefab::new();
        for node in document.nodes() {
            let (translation, rotation, scale) = node.transform().decomposed();
            let mut prefab_node = PrefabNode::named(&Self::node_name(&node));
            prefab_node.transform = Transform::from_trs(
                Vec3::from_array(translation),
                Quat::from_array(rotation),
                Vec3::from_array(scale),
            );
            prefab_node.children_indices = node.children().map(|c| c.index()).collect();

            if let Some(mesh) = node.mesh() {
                let mut geometry = Geometry::new();
                let mut mesh_materials: Vec<Arc<Material>> = Vec::new();

                for primitive in mesh.primitives() {
                    if primitive.mode() != gltf::mesh::Mode::Triangles {
                        log::warn!("glTF: primitive mode {:?} skipped", primitive.mode());
                        continue;
                    }
                    let reader = primitive.reader(buffer_data);
                    let Some(positions) = reader.read_positions() else {
                        continue;
                    };

                    let base = geometry.positions.len() as u32;
                    let start = geometry.indices.len() as u32;
                    let positions: Vec<Vec3> = positions.map(Vec3::from_array).collect();
                    let count = positions.len();

                    let normals: Vec<Vec3> = reader
                        .read_normals()
                        .map(|iter| iter.map(Vec3::from_array).collect())
                        .unwrap_or_else(|| vec![Vec3::ZERO; count]);
                    let uvs: Vec<Vec2> = reader
                        .read_tex_coords(0)
                        .map(|iter| iter.into_f32().map(Vec2::from_array).collect())
                        .unwrap_or_else(|| vec![Vec2::ZERO; count]);

                    match reader.read_indices() {
                        Some(indices) => {
                            geometry.indices.extend(indices.into_u32().map(|i| i + base));
                        }
                        None => geometry.indices.extend((0..count as u32).map(|i| i + base)),
                    }
                    geometry.positions.extend(positions);
                    geometry.normals.extend(normals);
                    geometry.uvs.extend(uvs);

                    let material = primitive
                        .material()
                        .index()
                        .and_then(|i| materials.get(i))
                        .unwrap_or(&default_material);
                    let slot = mesh_materials
                        .iter()
                        .position(|m| Arc::ptr_eq(m, material))
                        .unwrap_or_else(|| {
                            mesh_materials.push(Arc::clone(material));
                            mesh_materials.len() - 1
                        });
                    geometry.add_group(start, geometry.indices.len() as u32 - start, slot);
                }

                if !geometry.positions.is_empty() {
                    if geometry.normals.iter().all(|n| *n == Vec3::ZERO) {
                        geometry.compute_vertex_normals();
                    }
                    geometry.compute_bounding_volume();
                    let name = mesh
                        .name()
                        .map_or_else(|| format!("Mesh_{}", mesh.index()), str::to_string);
                    let built = Mesh::new(Arc::new(geometry), mesh_materials);
                    prefab_node.mesh = Some(built.with_name(&name));
                }
            }

            prefab.push_node(prefab_node);
        }

        let scene = document.default_scene().or_else(|| document.scenes().next());
        prefab.root_indices = match scene {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => {
                let mut is_child = vec![false; prefab.nodes.len()];
                for node in &prefab.nodes {
                    for &child in &node.children_indices {
                        if let Some(flag) = is_child.get_mut(child) {
                            *flag = true;
                        }
                    }
                }
                (0..prefab.nodes.len()).filter(|&i| !is_child[i]).collect()
            }
        };

        prefab.animations = Self::load_animations(&document, &buffers);
        Ok(prefab)
    }

    fn node_name(node: &gltf::Node<'_>) -> String {
        node.name()
            .map_or_else(|| format!("Node_{}", node.index()), str::to_string)
    }

    fn convert_image(index: usize, image: &gltf::image::Data) -> Option<Arc<Texture>> {
        let rgba = match image.format {
            gltf::image::Format::R8G8B8A8 => image.pixels.clone(),
            gltf::image::Format::R8G8B8 => {
                let mut rgba = Vec::with_capacity(image.pixels.len() / 3 * 4);
                for rgb in image.pixels.chunks_exact(3) {
                    rgba.extend_from_slice(rgb);
                    rgba.push(255);
                }
                rgba
            }
            other => {
                log::warn!("glTF: image {index} has unsupported format {other:?}");
                return None;
            }
        };
        let name = format!("image_{index}");
        Some(Arc::new(Texture::new_2d(&name, image.width, image.height, rgba, ColorSpace::Srgb)))
    }

    fn convert_material(
        material: &gltf::Material<'_>,
        textures: &[Option<Arc<Texture>>],
    ) -> Material {
        let name = material
            .name()
            .map_or_else(|| format!("Material_{}", material.index().unwrap_or(0)), str::to_string);
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, a] = pbr.base_color_factor();

        let mut engine_material = Material::with_color(&name, Vec3::new(r, g, b));
        engine_material.opacity = a;
        engine_material.transparent = material.alpha_mode() == gltf::material::AlphaMode::Blend;
        engine_material.emissive = Vec3::from_array(material.emissive_factor());
        if material.double_sided() {
            engine_material.side = Side::Double;
        }

        if let Some(info) = pbr.base_color_texture() {
            let source = info.texture().source().index();
            engine_material.map = TextureSlot {
                uri: None,
                texture: textures.get(source).cloned().flatten(),
            };
        }
        engine_material
    }

    fn load_animations(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
    ) -> Vec<AnimationClip> {
        let mut animations = Vec::new();

        for anim in document.animations() {
            let mut tracks = Vec::new();

            for channel in anim.channels() {
                let reader = channel
                    .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
                let target = channel.target();
                let node_name = Self::node_name(&target.node());

                let Some(inputs) = reader.read_inputs() else { continue };
                let times: Vec<f32> = inputs.collect();

                let interpolation = match channel.sampler().interpolation() {
                    gltf::animation::Interpolation::Linear => InterpolationMode::Linear,
                    gltf::animation::Interpolation::Step => InterpolationMode::Step,
                    gltf::animation::Interpolation::CubicSpline => InterpolationMode::CubicSpline,
                };

                let track = match (target.property(), reader.read_outputs()) {
                    (Property::Translation, Some(ReadOutputs::Translations(iter))) => Track {
                        meta: TrackMeta { node_name, target: TargetPath::Translation },
                        data: TrackData::Vector3(KeyframeTrack::new(
                            times,
                            iter.map(Vec3::from_array).collect(),
                            interpolation,
                        )),
                    },
                    (Property::Rotation, Some(ReadOutputs::Rotations(iter))) => Track {
                        meta: TrackMeta { node_name, target: TargetPath::Rotation },
                        data: TrackData::Quaternion(KeyframeTrack::new(
                            times,
                            iter.into_f32().map(Quat::from_array).collect(),
                            interpolation,
                        )),
                    },
                    (Property::Scale, Some(ReadOutputs::Scales(iter))) => Track {
                        meta: TrackMeta { node_name, target: TargetPath::Scale },
                        data: TrackData::Vector3(KeyframeTrack::new(
                            times,
                            iter.map(Vec3::from_array).collect(),
                            interpolation,
                        )),
                    },
                    (property, _) => {
                        log::warn!("glTF: animated property {property:?} on '{node_name}' skipped");
                        continue;
                    }
                };
                tracks.push(track);
            }

            let name = anim
                .name()
                .map_or_else(|| format!("Animation_{}", anim.index()), str::to_string);
            animations.push(AnimationClip::new(name, tracks));
        }

        animations
    }
}
