//! Wavefront OBJ geometry, optionally bound to an MTL library.
//!
//! Every `o`/`g` block becomes one mesh node; `usemtl` switches split a mesh
//! into geometry groups.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::assets::loaders::mtl::MaterialCreator;
use crate::assets::prefab::{Prefab, PrefabNode};
use crate::errors::{Error, Result};
use crate::resources::{Geometry, Material, Mesh};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct VertexKey(usize, Option<usize>, Option<usize>);

#[derive(Default)]
struct ObjectBuilder {
    name: String,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    unique: HashMap<VertexKey, u32>,
    has_normals: bool,
    has_uvs: bool,
    /// (material name, first index)
    material_runs: Vec<(Option<String>, u32)>,
}

impl ObjectBuilder {
    fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    fn use_material(&mut self, name: Option<String>) {
        let start = self.indices.len() as u32;
        match self.material_runs.last_mut() {
            // Nothing was emitted with the previous material yet.
            Some(last) if last.1 == start => last.0 = name,
            _ => self.material_runs.push((name, start)),
        }
    }

    fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

pub struct ObjLoader {
    materials: Option<MaterialCreator>,
}

impl Default for ObjLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjLoader {
    #[must_use]
    pub fn new() -> Self {
        Self { materials: None }
    }

    /// Binds `usemtl` names to this library.
    #[must_use]
    pub fn with_materials(mut self, materials: MaterialCreator) -> Self {
        self.materials = Some(materials);
        self
    }

    pub fn set_materials(&mut self, materials: MaterialCreator) -> &mut Self {
        self.materials = Some(materials);
        self
    }

    pub fn parse(&mut self, text: &str) -> Result<Prefab> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();
        let mut texcoords: Vec<Vec2> = Vec::new();

        let mut objects: Vec<ObjectBuilder> = Vec::new();
        let mut current = ObjectBuilder::default();
        let mut current_material: Option<String> = None;

        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut parts = trimmed.split_whitespace();
            let Some(tag) = parts.next() else { continue };

            match tag {
                "v" => positions.push(parse_vec3(&mut parts, line_no)?),
                "vn" => normals.push(parse_vec3(&mut parts, line_no)?),
                "vt" => {
                    let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                    let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                    texcoords.push(Vec2::new(u, v));
                }
                "f" => {
                    if current.material_runs.is_empty() {
                        current.use_material(current_material.clone());
                    }

                    let mut face: Vec<u32> = Vec::new();
                    for token in parts {
                        let (vi, vti, vni) = parse_face_vertex(
                            token,
                            positions.len(),
                            texcoords.len(),
                            normals.len(),
                            line_no,
                        )?;
                        let key = VertexKey(vi, vti, vni);
                        let index = match current.unique.get(&key) {
                            Some(&idx) => idx,
                            None => {
                                let idx = u32::try_from(current.positions.len())
                                    .map_err(|_| Error::invalid_data("OBJ: too many vertices"))?;
                                current.positions.push(positions[vi]);
                                current.uvs.push(vti.map_or(Vec2::ZERO, |i| texcoords[i]));
                                current.normals.push(vni.map_or(Vec3::ZERO, |i| normals[i]));
                                current.has_uvs |= vti.is_some();
                                current.has_normals |= vni.is_some();
                                current.unique.insert(key, idx);
                                idx
                            }
                        };
                        face.push(index);
                    }

                    if face.len() < 3 {
                        log::warn!(
                            "OBJ line {}: face with fewer than 3 vertices skipped",
                            line_no + 1
                        );
                        continue;
                    }
                    for i in 1..face.len() - 1 {
                        current.indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                    }
                }
                "o" | "g" => {
                    let name = trimmed[tag.len()..].trim();
                    let previous = std::mem::replace(&mut current, ObjectBuilder::named(name));
                    if previous.is_empty() {
                        // `o` immediately followed by `g` names the same object.
                        if current.name.is_empty() {
                            current.name = previous.name;
                        }
                    } else {
                        objects.push(previous);
                    }
                }
                "usemtl" => {
                    let name = trimmed[tag.len()..].trim().to_string();
                    current_material = Some(name);
                    if !current.material_runs.is_empty() {
                        current.use_material(current_material.clone());
                    }
                }
                "mtllib" => log::debug!(
                    "OBJ references material library '{}'",
                    trimmed[tag.len()..].trim()
                ),
                // s, l, p ...
                _ => {}
            }
        }
        if !current.is_empty() {
            objects.push(current);
        }

        if objects.is_empty() {
            return Err(Error::invalid_data("OBJ contained no faces"));
        }

        let mut prefab = Prefab::new();
        for object in objects {
            let node = self.build_node(object);
            prefab.push_root(node);
        }
        Ok(prefab)
    }

    fn build_node(&mut self, object: ObjectBuilder) -> PrefabNode {
        let mut geometry = Geometry::new();
        geometry.positions = object.positions;
        geometry.indices = object.indices;
        if object.has_uvs {
            geometry.uvs = object.uvs;
        }

        let mut materials: Vec<Arc<Material>> = Vec::new();
        let mut material_slots: HashMap<Option<String>, usize> = HashMap::new();
        let total = geometry.indices.len() as u32;
        for (i, (name, start)) in object.material_runs.iter().enumerate() {
            let end = object.material_runs.get(i + 1).map_or(total, |next| next.1);
            if end <= *start {
                continue;
            }
            let slot = *material_slots.entry(name.clone()).or_insert_with(|| {
                materials.push(self.resolve_material(name.as_deref()));
                materials.len() - 1
            });
            geometry.add_group(*start, end - start, slot);
        }
        if materials.is_empty() {
            materials.push(Arc::new(Material::default()));
        }

        if object.has_normals {
            geometry.normals = object.normals;
        } else {
            geometry.compute_vertex_normals();
        }
        geometry.compute_bounding_volume();

        let name = object.name;
        let mut node = PrefabNode::named(&name);
        node.mesh = Some(Mesh::new(Arc::new(geometry), materials).with_name(&name));
        node
    }

    fn resolve_material(&mut self, name: Option<&str>) -> Arc<Material> {
        let Some(name) = name else {
            return Arc::new(Material::default());
        };
        if let Some(material) = self.materials.as_mut().and_then(|m| m.create(name)) {
            return material;
        }
        if self.materials.is_some() {
            log::warn!("OBJ: material '{name}' not found in library");
        }
        Arc::new(Material::new(name))
    }
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| {
        Error::format(format!("OBJ: missing {what} on line {}", line_no + 1))
    })?;
    token
        .parse::<f32>()
        .map_err(|_| Error::format(format!("OBJ: failed to parse {what} on line {}", line_no + 1)))
}

fn parse_vec3<'a>(parts: &mut impl Iterator<Item = &'a str>, line_no: usize) -> Result<Vec3> {
    let x = parse_f32(parts.next(), line_no, "x coordinate")?;
    let y = parse_f32(parts.next(), line_no, "y coordinate")?;
    let z = parse_f32(parts.next(), line_no, "z coordinate")?;
    Ok(Vec3::new(x, y, z))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>, Option<usize>)> {
    let mut split = token.split('/');
    let pos = split.next().ok_or_else(|| {
        Error::format(format!(
            "OBJ: malformed face element '{token}' on line {}",
            line_no + 1
        ))
    })?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };
    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok((pos_idx, tex_idx, norm_idx))
}

/// 1-based, or negative relative to the end of the list so far.
fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token.parse::<i64>().map_err(|_| {
        Error::format(format!("OBJ: invalid index '{token}' on line {}", line_no + 1))
    })?;
    if raw == 0 {
        return Err(Error::format(format!("OBJ: index 0 on line {}", line_no + 1)));
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };
    if idx < 0 || idx as usize >= len {
        return Err(Error::invalid_data(format!(
            "OBJ: index {raw} out of bounds (len={len}) on line {}",
            line_no + 1
        )));
    }
    Ok(idx as usize)
}
