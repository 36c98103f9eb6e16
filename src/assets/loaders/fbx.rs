//! Binary FBX Loader
//!
//! Reads FBX 7.x binary files: the node-record tree, zlib-compressed property
//! arrays, and the object/connection graph on top of it. Models become prefab
//! nodes, mesh geometry is triangulated, and animation stacks become clips
//! that bind to model names.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use flate2::read::ZlibDecoder;
use glam::{EulerRot, Quat, Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::{
    AnimationClip, InterpolationMode, KeyframeTrack, TargetPath, Track, TrackData, TrackMeta,
};
use crate::assets::prefab::{Prefab, PrefabNode};
use crate::errors::{AssetError, Error, Result};
use crate::resources::{Geometry, Material, Mesh, TextureSlot};
use crate::scene::Transform;

const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  \0";
const HEADER_LEN: usize = 27;
/// Deepest node record nesting accepted by the reader.
const MAX_NODE_DEPTH: usize = 256;
/// FBX time units per second.
pub const KTIME_PER_SECOND: f64 = 46_186_158_000.0;

// ============================================================================
// Node tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FbxProperty {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Raw(Vec<u8>),
    BoolArray(Vec<bool>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
}

impl FbxProperty {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FbxProperty::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            FbxProperty::I16(v) => Some(f64::from(v)),
            FbxProperty::I32(v) => Some(f64::from(v)),
            FbxProperty::I64(v) => Some(v as f64),
            FbxProperty::F32(v) => Some(f64::from(v)),
            FbxProperty::F64(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FbxProperty::I16(v) => Some(i64::from(v)),
            FbxProperty::I32(v) => Some(i64::from(v)),
            FbxProperty::I64(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FbxProperty::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any numeric array, widened to `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            FbxProperty::F64Array(v) => Some(v.clone()),
            FbxProperty::F32Array(v) => Some(v.iter().map(|&x| f64::from(x)).collect()),
            FbxProperty::I32Array(v) => Some(v.iter().map(|&x| f64::from(x)).collect()),
            FbxProperty::I64Array(v) => Some(v.iter().map(|&x| x as f64).collect()),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            FbxProperty::I64Array(v) => Some(v.clone()),
            FbxProperty::I32Array(v) => Some(v.iter().map(|&x| i64::from(x)).collect()),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i32_vec(&self) -> Option<Vec<i32>> {
        match self {
            FbxProperty::I32Array(v) => Some(v.clone()),
            FbxProperty::I64Array(v) => v.iter().map(|&x| i32::try_from(x).ok()).collect(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FbxNode {
    pub name: String,
    pub properties: Vec<FbxProperty>,
    pub children: Vec<FbxNode>,
}

impl FbxNode {
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&FbxNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FbxNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    #[must_use]
    pub fn prop(&self, index: usize) -> Option<&FbxProperty> {
        self.properties.get(index)
    }

    /// First property of the named child, e.g. `Vertices` → its array.
    #[must_use]
    pub fn child_prop(&self, name: &str) -> Option<&FbxProperty> {
        self.child(name).and_then(|c| c.prop(0))
    }

    /// `Properties70` entries, keyed by property name.
    ///
    /// Each value slice starts after the name/type/label/flags header.
    #[must_use]
    pub fn properties70(&self) -> FxHashMap<&str, &[FbxProperty]> {
        let mut map = FxHashMap::default();
        if let Some(p70) = self.child("Properties70") {
            for p in p70.children_named("P") {
                if let Some(name) = p.prop(0).and_then(FbxProperty::as_str) {
                    map.insert(name, p.properties.get(4..).unwrap_or(&[]));
                }
            }
        }
        map
    }
}

#[derive(Debug, Clone)]
pub struct FbxDocument {
    pub version: u32,
    pub nodes: Vec<FbxNode>,
}

impl FbxDocument {
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&FbxNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

// ============================================================================
// Binary reader
// ============================================================================

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::format(format!("FBX: unexpected end of data at offset {}", self.pos))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn offset(&mut self, wide: bool) -> Result<u64> {
        if wide { self.u64() } else { self.u32().map(u64::from) }
    }
}

/// Returns `true` for the binary FBX magic.
#[must_use]
pub fn is_binary_fbx(bytes: &[u8]) -> bool {
    bytes.starts_with(BINARY_MAGIC)
}

/// Parses a binary FBX file into its node tree.
pub fn parse_binary(bytes: &[u8]) -> Result<FbxDocument> {
    if !is_binary_fbx(bytes) {
        let looks_ascii = bytes.iter().take(64).all(|b| b.is_ascii());
        return Err(if looks_ascii {
            AssetError::UnsupportedFormat("ASCII FBX".to_string()).into()
        } else {
            Error::format("FBX: missing binary header")
        });
    }

    let mut reader = ByteReader { data: bytes, pos: BINARY_MAGIC.len() };
    // 0x1A 0x00
    reader.take(2)?;
    let version = reader.u32()?;
    debug_assert_eq!(reader.pos, HEADER_LEN);
    let wide = version >= 7500;
    let null_record_len = if wide { 25 } else { 13 };

    let mut nodes = Vec::new();
    while bytes.len() - reader.pos >= null_record_len {
        match read_node(&mut reader, wide, 0)? {
            Some(node) => nodes.push(node),
            None => break,
        }
    }

    Ok(FbxDocument { version, nodes })
}

fn read_node(reader: &mut ByteReader<'_>, wide: bool, depth: usize) -> Result<Option<FbxNode>> {
    if depth > MAX_NODE_DEPTH {
        return Err(Error::format("FBX: nesting too deep"));
    }
    let end_offset = reader.offset(wide)?;
    let num_properties = reader.offset(wide)?;
    let _property_list_len = reader.offset(wide)?;
    let name_len = reader.u8()? as usize;

    if end_offset == 0 {
        return Ok(None);
    }
    let end_offset = usize::try_from(end_offset)
        .ok()
        .filter(|&end| end <= reader.data.len() && end >= reader.pos)
        .ok_or_else(|| Error::format(format!("FBX: node end offset {end_offset} out of range")))?;

    let name = String::from_utf8_lossy(reader.take(name_len)?).into_owned();

    let mut properties = Vec::with_capacity(num_properties.min(64) as usize);
    for _ in 0..num_properties {
        properties.push(read_property(reader)?);
    }

    let mut children = Vec::new();
    while reader.pos < end_offset {
        match read_node(reader, wide, depth + 1)? {
            Some(child) => children.push(child),
            None => break,
        }
    }
    reader.pos = end_offset;

    Ok(Some(FbxNode { name, properties, children }))
}

fn read_property(reader: &mut ByteReader<'_>) -> Result<FbxProperty> {
    let type_code = reader.u8()?;
    let prop = match type_code {
        b'Y' => FbxProperty::I16(i16::from_le_bytes(reader.array()?)),
        b'C' => FbxProperty::Bool(reader.u8()? != 0),
        b'I' => FbxProperty::I32(i32::from_le_bytes(reader.array()?)),
        b'F' => FbxProperty::F32(f32::from_le_bytes(reader.array()?)),
        b'D' => FbxProperty::F64(f64::from_le_bytes(reader.array()?)),
        b'L' => FbxProperty::I64(i64::from_le_bytes(reader.array()?)),
        b'S' => {
            let len = reader.u32()? as usize;
            FbxProperty::String(String::from_utf8_lossy(reader.take(len)?).into_owned())
        }
        b'R' => {
            let len = reader.u32()? as usize;
            FbxProperty::Raw(reader.take(len)?.to_vec())
        }
        b'f' => FbxProperty::F32Array(read_array(reader, 4, |c| {
            f32::from_le_bytes([c[0], c[1], c[2], c[3]])
        })?),
        b'd' => FbxProperty::F64Array(read_array(reader, 8, |c| {
            f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
        })?),
        b'i' => FbxProperty::I32Array(read_array(reader, 4, |c| {
            i32::from_le_bytes([c[0], c[1], c[2], c[3]])
        })?),
        b'l' => FbxProperty::I64Array(read_array(reader, 8, |c| {
            i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
        })?),
        b'b' => FbxProperty::BoolArray(read_array(reader, 1, |c| c[0] != 0)?),
        other => {
            return Err(Error::format(format!(
                "FBX: unknown property type '{}' at offset {}",
                other as char,
                reader.pos - 1
            )));
        }
    };
    Ok(prop)
}

fn read_array<T>(
    reader: &mut ByteReader<'_>,
    elem_size: usize,
    convert: impl Fn(&[u8]) -> T,
) -> Result<Vec<T>> {
    let len = reader.u32()? as usize;
    let encoding = reader.u32()?;
    let stored_len = reader.u32()? as usize;
    let stored = reader.take(stored_len)?;
    let expected = len
        .checked_mul(elem_size)
        .ok_or_else(|| Error::format("FBX: array length overflow"))?;

    let raw: Cow<'_, [u8]> = match encoding {
        0 => Cow::Borrowed(stored),
        1 => {
            // Capacity grows with the inflated bytes, never with the declared length.
            let mut out = Vec::new();
            ZlibDecoder::new(stored)
                .take(expected as u64)
                .read_to_end(&mut out)
                .map_err(|e| Error::format(format!("FBX: failed to inflate array: {e}")))?;
            Cow::Owned(out)
        }
        other => return Err(Error::format(format!("FBX: unknown array encoding {other}"))),
    };

    if raw.len() != expected {
        return Err(Error::format(format!(
            "FBX: array holds {} bytes, expected {expected}",
            raw.len()
        )));
    }

    Ok(raw.chunks_exact(elem_size).map(convert).collect())
}

// ============================================================================
// Object graph
// ============================================================================

/// One entry of the `Objects` section.
struct FbxObject<'a> {
    node: &'a FbxNode,
    name: String,
    subclass: String,
}

#[derive(Debug, Clone)]
struct Connection {
    child: i64,
    parent: i64,
    property: Option<String>,
}

/// Strips the `\0\x01Class` suffix binary files append to object names.
fn object_name(raw: &str) -> String {
    raw.split("\u{0}\u{1}").next().unwrap_or(raw).to_string()
}

fn vec3_of(values: &[FbxProperty]) -> Option<Vec3> {
    Some(Vec3::new(
        values.first()?.as_f64()? as f32,
        values.get(1)?.as_f64()? as f32,
        values.get(2)?.as_f64()? as f32,
    ))
}

fn euler_degrees_to_quat(degrees: Vec3) -> Quat {
    let r = degrees * (std::f32::consts::PI / 180.0);
    Quat::from_euler(EulerRot::ZYX, r.z, r.y, r.x)
}

struct ModelInfo {
    transform: Transform,
    pre_rotation: Quat,
}

pub struct FbxLoader;

impl FbxLoader {
    /// Parses binary FBX bytes into a prefab.
    pub fn parse(bytes: &[u8]) -> Result<Prefab> {
        let document = parse_binary(bytes)?;
        Self::build_prefab(&document)
    }

    pub fn build_prefab(document: &FbxDocument) -> Result<Prefab> {
        let objects_node = document
            .node("Objects")
            .ok_or_else(|| Error::invalid_data("FBX: no Objects section"))?;

        let mut objects: FxHashMap<i64, FbxObject<'_>> = FxHashMap::default();
        for node in &objects_node.children {
            let Some(id) = node.prop(0).and_then(FbxProperty::as_i64) else {
                continue;
            };
            let name = node
                .prop(1)
                .and_then(FbxProperty::as_str)
                .map(object_name)
                .unwrap_or_default();
            let subclass = node
                .prop(2)
                .and_then(FbxProperty::as_str)
                .unwrap_or_default()
                .to_string();
            objects.insert(id, FbxObject { node, name, subclass });
        }

        let connections: Vec<Connection> = document
            .node("Connections")
            .map(|c| {
                c.children_named("C")
                    .filter_map(|c| {
                        Some(Connection {
                            child: c.prop(1)?.as_i64()?,
                            parent: c.prop(2)?.as_i64()?,
                            property: c.prop(3).and_then(FbxProperty::as_str).map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let kind_of = |id: i64| objects.get(&id).map(|o| o.node.name.as_str());

        // Models, in file order so prefab indices are stable.
        let mut model_ids: Vec<i64> = objects_node
            .children
            .iter()
            .filter(|n| n.name == "Model")
            .filter_map(|n| n.prop(0).and_then(FbxProperty::as_i64))
            .collect();
        model_ids.dedup();

        let mut model_info: FxHashMap<i64, ModelInfo> = FxHashMap::default();
        for &id in &model_ids {
            let props = objects[&id].node.properties70();
            let vec3 = |name: &str| props.get(name).and_then(|v| vec3_of(v));
            let position = vec3("Lcl Translation").unwrap_or(Vec3::ZERO);
            let rotation = vec3("Lcl Rotation").unwrap_or(Vec3::ZERO);
            let scale = vec3("Lcl Scaling").unwrap_or(Vec3::ONE);
            let pre_rotation = vec3("PreRotation").map_or(Quat::IDENTITY, euler_degrees_to_quat);
            let rotation = pre_rotation * euler_degrees_to_quat(rotation);

            model_info.insert(
                id,
                ModelInfo {
                    transform: Transform::from_trs(position, rotation, scale),
                    pre_rotation,
                },
            );
        }

        // Materials and their textures.
        let mut materials: FxHashMap<i64, Arc<Material>> = FxHashMap::default();
        for (&id, object) in objects.iter().filter(|(_, o)| o.node.name == "Material") {
            let mut material = Self::build_material(object);
            let textures = connections
                .iter()
                .filter(|c| c.parent == id && kind_of(c.child) == Some("Texture"));
            for conn in textures {
                let Some(uri) = Self::texture_uri(&objects[&conn.child]) else {
                    continue;
                };
                match conn.property.as_deref() {
                    Some("DiffuseColor" | "Maya|baseColor") | None => {
                        material.map = TextureSlot::with_uri(uri);
                    }
                    Some("NormalMap") => material.normal_map = TextureSlot::with_uri(uri),
                    Some("Bump") => material.bump_map = TextureSlot::with_uri(uri),
                    Some("SpecularColor") => material.specular_map = TextureSlot::with_uri(uri),
                    Some("EmissiveColor") => material.emissive_map = TextureSlot::with_uri(uri),
                    Some("TransparentColor") => material.alpha_map = TextureSlot::with_uri(uri),
                    Some(other) => {
                        log::warn!("FBX: texture bound to unsupported property '{other}'");
                    }
                }
            }
            materials.insert(id, Arc::new(material));
        }

        let mut prefab = Prefab::new();
        let mut index_of: FxHashMap<i64, usize> = FxHashMap::default();
        for &id in &model_ids {
            let object = &objects[&id];
            let mut node = PrefabNode::named(&object.name);
            node.transform = model_info[&id].transform.clone();

            let geometry_id = connections
                .iter()
                .find(|c| c.parent == id && kind_of(c.child) == Some("Geometry"))
                .map(|c| c.child);
            if let Some(geometry_id) = geometry_id {
                let mesh_materials: Vec<Arc<Material>> = connections
                    .iter()
                    .filter(|c| c.parent == id)
                    .filter_map(|c| materials.get(&c.child).cloned())
                    .collect();
                let geometry_object = &objects[&geometry_id];
                if geometry_object.subclass == "Mesh" {
                    let geometry = build_geometry(geometry_object.node)?;
                    let mesh_materials = if mesh_materials.is_empty() {
                        vec![Arc::new(Material::default())]
                    } else {
                        mesh_materials
                    };
                    let mesh = Mesh::new(Arc::new(geometry), mesh_materials);
                    node.mesh = Some(mesh.with_name(&object.name));
                } else {
                    log::warn!(
                        "FBX: geometry '{}' of type '{}' skipped",
                        geometry_object.name,
                        geometry_object.subclass
                    );
                }
            }

            index_of.insert(id, prefab.push_node(node));
        }

        for &id in &model_ids {
            let parent = connections
                .iter()
                .find(|c| c.child == id && kind_of(c.parent) == Some("Model"))
                .map(|c| c.parent);
            match parent.and_then(|p| index_of.get(&p)) {
                Some(&parent_index) => {
                    prefab.nodes[parent_index].children_indices.push(index_of[&id]);
                }
                None => prefab.root_indices.push(index_of[&id]),
            }
        }

        prefab.animations = Self::build_animations(&objects, &connections, &model_info);

        log::debug!(
            "FBX {}: {} models, {} meshes, {} clips",
            document.version,
            prefab.nodes.len(),
            prefab.mesh_count(),
            prefab.animations.len()
        );

        Ok(prefab)
    }

    fn build_material(object: &FbxObject<'_>) -> Material {
        let props = object.node.properties70();
        let mut material = Material::new(&object.name);

        let factor = |name: &str| {
            props
                .get(name)
                .and_then(|v| v.first())
                .and_then(FbxProperty::as_f64)
        };

        if let Some(color) = props.get("DiffuseColor").and_then(|v| vec3_of(v)) {
            material.color = color * factor("DiffuseFactor").unwrap_or(1.0) as f32;
        }
        if let Some(color) = props.get("SpecularColor").and_then(|v| vec3_of(v)) {
            material.specular = color * factor("SpecularFactor").unwrap_or(1.0) as f32;
        }
        if let Some(color) = props.get("EmissiveColor").and_then(|v| vec3_of(v)) {
            material.emissive = color * factor("EmissiveFactor").unwrap_or(1.0) as f32;
        }
        if let Some(shininess) = factor("Shininess").or_else(|| factor("ShininessExponent")) {
            material.shininess = shininess as f32;
        }
        let opacity = factor("Opacity").or_else(|| factor("TransparencyFactor").map(|t| 1.0 - t));
        if let Some(opacity) = opacity {
            material.opacity = opacity.clamp(0.0, 1.0) as f32;
            material.transparent = material.opacity < 1.0;
        }
        material
    }

    fn texture_uri(object: &FbxObject<'_>) -> Option<String> {
        let node = object.node;
        let relative = node.child_prop("RelativeFilename").and_then(FbxProperty::as_str);
        let absolute = node.child_prop("FileName").and_then(FbxProperty::as_str);
        relative
            .filter(|s| !s.is_empty())
            .or(absolute)
            .filter(|s| !s.is_empty())
            .map(|s| s.replace('\\', "/"))
    }

    fn build_animations(
        objects: &FxHashMap<i64, FbxObject<'_>>,
        connections: &[Connection],
        model_info: &FxHashMap<i64, ModelInfo>,
    ) -> Vec<AnimationClip> {
        let kind_of = |id: i64| objects.get(&id).map(|o| o.node.name.as_str());

        let mut stack_ids: Vec<i64> = objects
            .iter()
            .filter(|(_, o)| o.node.name == "AnimationStack")
            .map(|(&id, _)| id)
            .collect();
        stack_ids.sort_unstable();

        let mut clips = Vec::new();
        for stack_id in stack_ids {
            let mut tracks = Vec::new();

            let layers = connections
                .iter()
                .filter(|c| c.parent == stack_id && kind_of(c.child) == Some("AnimationLayer"));
            for layer in layers {
                let curve_nodes = connections.iter().filter(|c| {
                    c.parent == layer.child && kind_of(c.child) == Some("AnimationCurveNode")
                });
                for curve_node in curve_nodes {
                    let track =
                        Self::build_track(curve_node.child, objects, connections, model_info);
                    if let Some(track) = track {
                        tracks.push(track);
                    }
                }
            }

            let name = objects[&stack_id].name.clone();
            if tracks.is_empty() {
                log::debug!("FBX: animation stack '{name}' has no usable curves");
                continue;
            }
            clips.push(AnimationClip::new(name, tracks));
        }
        clips
    }

    fn build_track(
        curve_node_id: i64,
        objects: &FxHashMap<i64, FbxObject<'_>>,
        connections: &[Connection],
        model_info: &FxHashMap<i64, ModelInfo>,
    ) -> Option<Track> {
        let (model_id, property) = connections.iter().find_map(|c| {
            (c.child == curve_node_id && model_info.contains_key(&c.parent))
                .then(|| (c.parent, c.property.clone()))
        })?;
        let target = match property.as_deref()? {
            "Lcl Translation" => TargetPath::Translation,
            "Lcl Rotation" => TargetPath::Rotation,
            "Lcl Scaling" => TargetPath::Scale,
            other => {
                log::warn!("FBX: animated property '{other}' is not supported");
                return None;
            }
        };

        let curve_node_props = objects[&curve_node_id].node.properties70();
        let default_of = |axis: &str| {
            curve_node_props
                .get(axis)
                .and_then(|v| v.first())
                .and_then(FbxProperty::as_f64)
                .unwrap_or(0.0) as f32
        };

        let mut curves: [Option<Curve>; 3] = [None, None, None];
        for conn in connections.iter().filter(|c| c.parent == curve_node_id) {
            let axis = match conn.property.as_deref() {
                Some("d|X") => 0,
                Some("d|Y") => 1,
                Some("d|Z") => 2,
                _ => continue,
            };
            let curve = objects
                .get(&conn.child)
                .filter(|o| o.node.name == "AnimationCurve");
            if let Some(object) = curve {
                curves[axis] = Curve::from_node(object.node);
            }
        }

        let mut times: Vec<f32> = curves
            .iter()
            .flatten()
            .flat_map(|c| c.times.iter().copied())
            .collect();
        if times.is_empty() {
            return None;
        }
        times.sort_by(f32::total_cmp);
        times.dedup_by(|a, b| (*a - *b).abs() < 1e-6);

        let defaults = [default_of("d|X"), default_of("d|Y"), default_of("d|Z")];
        let sample = |t: f32| {
            let mut v = [0.0f32; 3];
            for axis in 0..3 {
                v[axis] = curves[axis].as_ref().map_or(defaults[axis], |c| c.evaluate(t));
            }
            Vec3::from_array(v)
        };

        let node_name = objects[&model_id].name.clone();
        let data = match target {
            TargetPath::Rotation => {
                let pre = model_info[&model_id].pre_rotation;
                let values = times
                    .iter()
                    .map(|&t| pre * euler_degrees_to_quat(sample(t)))
                    .collect();
                TrackData::Quaternion(KeyframeTrack::new(times, values, InterpolationMode::Linear))
            }
            _ => {
                let values = times.iter().map(|&t| sample(t)).collect();
                TrackData::Vector3(KeyframeTrack::new(times, values, InterpolationMode::Linear))
            }
        };

        Some(Track {
            meta: TrackMeta { node_name, target },
            data,
        })
    }
}

/// A scalar animation curve, linearly interpolated.
struct Curve {
    times: Vec<f32>,
    values: Vec<f32>,
}

impl Curve {
    fn from_node(node: &FbxNode) -> Option<Self> {
        let ticks = node.child_prop("KeyTime")?.to_i64_vec()?;
        let values = node.child_prop("KeyValueFloat")?.to_f64_vec()?;
        if ticks.is_empty() || ticks.len() != values.len() {
            return None;
        }
        Some(Self {
            times: ticks.iter().map(|&t| (t as f64 / KTIME_PER_SECOND) as f32).collect(),
            values: values.iter().map(|&v| v as f32).collect(),
        })
    }

    fn evaluate(&self, t: f32) -> f32 {
        let next = self.times.partition_point(|&k| k <= t);
        if next == 0 {
            return self.values[0];
        }
        if next >= self.times.len() {
            return self.values[self.values.len() - 1];
        }
        let (t0, t1) = (self.times[next - 1], self.times[next]);
        let (v0, v1) = (self.values[next - 1], self.values[next]);
        let span = t1 - t0;
        if span <= f32::EPSILON {
            return v1;
        }
        v0 + (v1 - v0) * ((t - t0) / span)
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Clone, Copy, PartialEq)]
enum Mapping {
    ByPolygonVertex,
    ByVertex,
    ByPolygon,
    AllSame,
}

/// A `LayerElement*` block: per-corner, per-vertex or per-polygon data.
struct LayerElement {
    mapping: Mapping,
    data: Vec<f64>,
    indices: Option<Vec<i32>>,
    stride: usize,
}

impl LayerElement {
    fn from_node(
        node: &FbxNode,
        data_name: &str,
        index_name: &str,
        stride: usize,
    ) -> Option<Self> {
        let mapping_type = node
            .child_prop("MappingInformationType")
            .and_then(FbxProperty::as_str)?;
        let mapping = match mapping_type {
            "ByPolygonVertex" => Mapping::ByPolygonVertex,
            "ByVertice" | "ByVertex" | "ByControlPoint" => Mapping::ByVertex,
            "ByPolygon" => Mapping::ByPolygon,
            "AllSame" => Mapping::AllSame,
            other => {
                log::warn!("FBX: unsupported layer mapping '{other}'");
                return None;
            }
        };
        let indexed = matches!(
            node.child_prop("ReferenceInformationType").and_then(FbxProperty::as_str),
            Some("IndexToDirect" | "Index")
        );
        let data = node.child_prop(data_name)?.to_f64_vec()?;
        let indices = if indexed {
            Some(node.child_prop(index_name)?.to_i32_vec()?)
        } else {
            None
        };
        Some(Self { mapping, data, indices, stride })
    }

    fn value(&self, corner: usize, vertex: usize, polygon: usize) -> Option<&[f64]> {
        let slot = match self.mapping {
            Mapping::ByPolygonVertex => corner,
            Mapping::ByVertex => vertex,
            Mapping::ByPolygon => polygon,
            Mapping::AllSame => 0,
        };
        let index = match &self.indices {
            Some(indices) => usize::try_from(*indices.get(slot)?).ok()?,
            None => slot,
        };
        self.data.get(index * self.stride..(index + 1) * self.stride)
    }
}

#[derive(Clone, Copy)]
struct Corner {
    position: Vec3,
    normal: Option<Vec3>,
    uv: Option<Vec2>,
}

/// Builds a triangulated, non-indexed geometry with one group per material.
fn build_geometry(node: &FbxNode) -> Result<Geometry> {
    let vertices = node
        .child_prop("Vertices")
        .and_then(FbxProperty::to_f64_vec)
        .ok_or_else(|| Error::invalid_data("FBX: mesh without Vertices"))?;
    let polygon_indices = node
        .child_prop("PolygonVertexIndex")
        .and_then(FbxProperty::to_i32_vec)
        .ok_or_else(|| Error::invalid_data("FBX: mesh without PolygonVertexIndex"))?;

    let positions: Vec<Vec3> = vertices
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
        .collect();

    let normals = node
        .child("LayerElementNormal")
        .and_then(|n| LayerElement::from_node(n, "Normals", "NormalsIndex", 3));
    let uvs = node
        .child("LayerElementUV")
        .and_then(|n| LayerElement::from_node(n, "UV", "UVIndex", 2));
    let material_layer = node.child("LayerElementMaterial").and_then(|n| {
        let mapping = n.child_prop("MappingInformationType").and_then(FbxProperty::as_str)?;
        let materials = n.child_prop("Materials")?.to_i32_vec()?;
        Some((mapping == "AllSame", materials))
    });

    let mut triangles: BTreeMap<usize, Vec<[Corner; 3]>> = BTreeMap::new();
    let mut polygon: Vec<Corner> = Vec::new();
    let mut polygon_index = 0usize;

    for (corner_index, &raw) in polygon_indices.iter().enumerate() {
        let last = raw < 0;
        let vertex = if last { !raw } else { raw };
        let vertex = usize::try_from(vertex).ok().filter(|&v| v < positions.len()).ok_or_else(|| {
            Error::invalid_data(format!("FBX: vertex index {vertex} out of range"))
        })?;

        let read3 = |v: &[f64]| Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32);
        polygon.push(Corner {
            position: positions[vertex],
            normal: normals
                .as_ref()
                .and_then(|l| l.value(corner_index, vertex, polygon_index))
                .map(read3),
            uv: uvs
                .as_ref()
                .and_then(|l| l.value(corner_index, vertex, polygon_index))
                .map(|v| Vec2::new(v[0] as f32, v[1] as f32)),
        });

        if last {
            let material = match &material_layer {
                Some((true, materials)) => materials.first().copied().unwrap_or(0),
                Some((false, materials)) => materials.get(polygon_index).copied().unwrap_or(0),
                None => 0,
            };
            let bucket = triangles.entry(usize::try_from(material).unwrap_or(0)).or_default();
            for i in 1..polygon.len().saturating_sub(1) {
                bucket.push([polygon[0], polygon[i], polygon[i + 1]]);
            }
            polygon.clear();
            polygon_index += 1;
        }
    }

    let has_normals = normals.is_some();
    let has_uvs = uvs.is_some();
    let mut geometry = Geometry::new();
    for (material_index, tris) in triangles {
        let start = geometry.indices.len() as u32;
        for corner in tris.iter().flatten() {
            geometry.indices.push(geometry.positions.len() as u32);
            geometry.positions.push(corner.position);
            if has_normals {
                geometry.normals.push(corner.normal.unwrap_or(Vec3::Y));
            }
            if has_uvs {
                geometry.uvs.push(corner.uv.unwrap_or(Vec2::ZERO));
            }
        }
        geometry.add_group(start, geometry.indices.len() as u32 - start, material_index);
    }

    if !has_normals {
        geometry.compute_vertex_normals();
    }
    geometry.compute_bounding_volume();
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: u32) -> Vec<u8> {
        let mut out = BINARY_MAGIC.to_vec();
        out.extend_from_slice(&[0x1A, 0x00]);
        out.extend_from_slice(&version.to_le_bytes());
        out
    }

    #[test]
    fn rejects_ascii_files() {
        let err = parse_binary(b"; FBX 7.4.0 project file\nFBXHeaderExtension: {").unwrap_err();
        assert!(matches!(err, Error::Asset(AssetError::UnsupportedFormat(_))));
    }

    #[test]
    fn empty_document_parses() {
        let mut bytes = header(7400);
        bytes.extend_from_slice(&[0u8; 13]);
        let doc = parse_binary(&bytes).unwrap();
        assert_eq!(doc.version, 7400);
        assert!(doc.nodes.is_empty());
    }

    #[test]
    fn truncated_node_is_an_error() {
        let mut bytes = header(7400);
        // end offset far beyond the data
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(1);
        bytes.push(b'A');
        bytes.extend_from_slice(&[0u8; 13]);
        assert!(parse_binary(&bytes).is_err());
    }

    fn array_node(encoding: u32, len: u32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = header(7400);
        let record_start = bytes.len();
        let property_len = 1 + 12 + payload.len();
        let end = record_start + 13 + 1 + property_len;
        bytes.extend_from_slice(&(end as u32).to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&(property_len as u32).to_le_bytes());
        bytes.push(1);
        bytes.push(b'A');
        bytes.push(b'd');
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&encoding.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&[0u8; 13]);
        bytes
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        use std::io::Write;

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn array_length_is_checked_against_the_stored_bytes() {
        let huge_compressed = array_node(1, u32::MAX, &zlib(&[0u8; 16]));
        assert!(parse_binary(&huge_compressed).is_err());

        let huge_raw = array_node(0, u32::MAX, &[0u8; 16]);
        assert!(parse_binary(&huge_raw).is_err());

        let padded_raw = array_node(0, 1, &[0u8; 16]);
        assert!(parse_binary(&padded_raw).is_err());
    }

    #[test]
    fn inflated_array_stops_at_the_declared_length() {
        let doc = parse_binary(&array_node(1, 2, &zlib(&[0u8; 4096]))).unwrap();
        assert_eq!(doc.nodes[0].properties, [FbxProperty::F64Array(vec![0.0, 0.0])]);

        let err = parse_binary(&array_node(1, 2, &zlib(&[0u8; 8]))).unwrap_err();
        assert!(err.to_string().contains("expected 16"));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let depth = MAX_NODE_DEPTH + 8;
        let mut bytes = header(7400);
        let total = bytes.len() + depth * (14 + 13) + 13;
        for level in 0..depth {
            // Each record ends after its child and its own null terminator.
            let end = total - 13 - level * 13;
            bytes.extend_from_slice(&(end as u32).to_le_bytes());
            bytes.extend_from_slice(&0u32.to_le_bytes());
            bytes.extend_from_slice(&0u32.to_le_bytes());
            bytes.push(1);
            bytes.push(b'N');
        }
        bytes.resize(total, 0);

        let err = parse_binary(&bytes).unwrap_err();
        assert!(err.to_string().contains("nesting too deep"));
    }

    #[test]
    fn object_names_drop_class_suffix() {
        assert_eq!(object_name("Hood\u{0}\u{1}Model"), "Hood");
        assert_eq!(object_name("Plain"), "Plain");
    }

    #[test]
    fn curve_evaluation_clamps_and_interpolates() {
        let curve = Curve { times: vec![0.0, 1.0], values: vec![0.0, 10.0] };
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert!((curve.evaluate(0.25) - 2.5).abs() < 1e-5);
        assert_eq!(curve.evaluate(2.0), 10.0);
    }

    #[test]
    fn quad_is_split_into_two_triangles() {
        let geometry_node = FbxNode {
            name: "Geometry".into(),
            properties: vec![],
            children: vec![
                FbxNode {
                    name: "Vertices".into(),
                    properties: vec![FbxProperty::F64Array(vec![
                        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
                    ])],
                    children: vec![],
                },
                FbxNode {
                    name: "PolygonVertexIndex".into(),
                    properties: vec![FbxProperty::I32Array(vec![0, 1, 2, !3])],
                    children: vec![],
                },
            ],
        };
        let geometry = build_geometry(&geometry_node).unwrap();
        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.groups.len(), 1);
        assert_eq!(geometry.normals.len(), geometry.positions.len());
        let bbox = geometry.bounding_box();
        assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 0.0));
    }
}
