//! Wavefront MTL material libraries.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;

use crate::assets::io::AssetReader;
use crate::assets::loaders::load_material_textures;
use crate::errors::{Error, Result};
use crate::resources::{Material, Side, TextureSlot};

/// Raw statements of one `newmtl` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialInfo {
    pub name: String,
    pub ka: Option<Vec3>,
    pub kd: Option<Vec3>,
    pub ks: Option<Vec3>,
    pub ke: Option<Vec3>,
    pub ns: Option<f32>,
    pub d: Option<f32>,
    pub tr: Option<f32>,
    pub map_kd: Option<String>,
    pub map_ks: Option<String>,
    pub map_ke: Option<String>,
    pub map_bump: Option<String>,
    pub norm: Option<String>,
    pub map_d: Option<String>,
}

pub struct MtlLoader;

impl MtlLoader {
    /// Parses MTL text. `base_uri` is the library's own URI; texture paths
    /// resolve against its directory.
    pub fn parse(text: &str, base_uri: &str) -> Result<MaterialCreator> {
        let mut infos: Vec<MaterialInfo> = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = match trimmed.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (trimmed, ""),
            };
            let key = key.to_ascii_lowercase();

            if key == "newmtl" {
                infos.push(MaterialInfo { name: value.to_string(), ..MaterialInfo::default() });
                continue;
            }

            let Some(info) = infos.last_mut() else {
                return Err(Error::format(format!(
                    "MTL line {}: '{key}' before any newmtl",
                    line_no + 1
                )));
            };

            match key.as_str() {
                "ka" => info.ka = Some(parse_color(value, line_no)?),
                "kd" => info.kd = Some(parse_color(value, line_no)?),
                "ks" => info.ks = Some(parse_color(value, line_no)?),
                "ke" => info.ke = Some(parse_color(value, line_no)?),
                "ns" => info.ns = Some(parse_scalar(value, line_no)?),
                "d" => info.d = Some(parse_scalar(value, line_no)?),
                "tr" => info.tr = Some(parse_scalar(value, line_no)?),
                "map_kd" => info.map_kd = Some(texture_path(value)),
                "map_ks" => info.map_ks = Some(texture_path(value)),
                "map_ke" => info.map_ke = Some(texture_path(value)),
                "map_bump" | "bump" => info.map_bump = Some(texture_path(value)),
                "norm" | "map_kn" => info.norm = Some(texture_path(value)),
                "map_d" => info.map_d = Some(texture_path(value)),
                // illum, Ni, Tf, map_Ka ...
                _ => {}
            }
        }

        Ok(MaterialCreator::new(base_uri, infos))
    }
}

fn parse_scalar(value: &str, line_no: usize) -> Result<f32> {
    value
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::format(format!("MTL line {}: invalid number '{value}'", line_no + 1)))
}

fn parse_color(value: &str, line_no: usize) -> Result<Vec3> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::format(format!("MTL line {}: invalid color '{value}'", line_no + 1)))?;
    match parts.as_slice() {
        [r, g, b, ..] => Ok(Vec3::new(*r, *g, *b)),
        [v] => Ok(Vec3::splat(*v)),
        _ => Err(Error::format(format!("MTL line {}: empty color", line_no + 1))),
    }
}

/// The last token of a map statement is the file; options like `-bm 1` precede it.
fn texture_path(value: &str) -> String {
    value.split_whitespace().last().unwrap_or(value).replace('\\', "/")
}

/// Materials of one MTL library, built lazily or all at once by [`preload`](Self::preload).
pub struct MaterialCreator {
    base_uri: String,
    infos: Vec<MaterialInfo>,
    materials: HashMap<String, Arc<Material>>,
    pub side: Side,
}

impl MaterialCreator {
    #[must_use]
    pub fn new(base_uri: &str, infos: Vec<MaterialInfo>) -> Self {
        Self {
            base_uri: base_uri.to_string(),
            infos,
            materials: HashMap::new(),
            side: Side::Front,
        }
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[must_use]
    pub fn infos(&self) -> &[MaterialInfo] {
        &self.infos
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.infos.iter().map(|i| i.name.as_str())
    }

    #[must_use]
    pub fn is_preloaded(&self) -> bool {
        self.infos.iter().all(|i| self.materials.contains_key(&i.name))
    }

    /// Returns the named material, building it (without textures) if it was
    /// never preloaded.
    pub fn create(&mut self, name: &str) -> Option<Arc<Material>> {
        if let Some(material) = self.materials.get(name) {
            return Some(Arc::clone(material));
        }
        let info = self.infos.iter().find(|i| i.name == name)?;
        let material = Arc::new(self.build(info));
        self.materials.insert(name.to_string(), Arc::clone(&material));
        Some(material)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Material>> {
        self.materials.get(name).cloned()
    }

    /// Builds every material and fetches its texture maps.
    ///
    /// Texture failures are logged and leave the slot empty.
    pub async fn preload<R: AssetReader>(&mut self, reader: &R) {
        let mut cache = HashMap::new();
        for info in &self.infos {
            let mut material = self.build(info);
            load_material_textures(reader, &self.base_uri, &mut material, &mut cache).await;
            self.materials.insert(info.name.clone(), Arc::new(material));
        }
        log::info!("Preloaded {} materials from {}", self.materials.len(), self.base_uri);
    }

    fn build(&self, info: &MaterialInfo) -> Material {
        let mut material = Material::new(&info.name);
        material.side = self.side;

        if let Some(kd) = info.kd {
            material.color = kd;
        }
        if let Some(ks) = info.ks {
            material.specular = ks;
        }
        if let Some(ke) = info.ke {
            material.emissive = ke;
        }
        if let Some(ns) = info.ns {
            material.shininess = ns;
        }

        let opacity = info.d.or(info.tr.map(|tr| 1.0 - tr));
        if let Some(opacity) = opacity {
            material.opacity = opacity.clamp(0.0, 1.0);
            material.transparent = material.opacity < 1.0;
        }

        let slot = |path: &Option<String>| {
            path.as_deref()
                .map(TextureSlot::with_uri)
                .unwrap_or_default()
        };
        material.map = slot(&info.map_kd);
        material.specular_map = slot(&info.map_ks);
        material.emissive_map = slot(&info.map_ke);
        material.bump_map = slot(&info.map_bump);
        material.normal_map = slot(&info.norm);
        material.alpha_map = slot(&info.map_d);
        if info.map_d.is_some() {
            material.transparent = true;
        }

        material
    }
}
