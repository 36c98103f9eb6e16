pub mod fbx;
pub mod gltf;
pub mod mtl;
pub mod obj;

use std::collections::HashMap;
use std::sync::Arc;

pub use fbx::FbxLoader;
pub use gltf::GltfLoader;
pub use mtl::{MaterialCreator, MtlLoader};
pub use obj::ObjLoader;

use crate::assets::io::{AssetReader, resolve_relative};
use crate::assets::prefab::Prefab;
use crate::errors::{AssetError, Result};
use crate::resources::{Material, Texture, TextureRef};

/// Formats that decode from a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Fbx,
    Gltf,
}

impl ModelFormat {
    /// Picks the decoder from the file extension.
    pub fn from_path(path: &str) -> Result<Self> {
        let file = path.rsplit('/').next().unwrap_or(path);
        let file = file.split(['?', '#']).next().unwrap_or(file);
        let extension = file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("fbx") => Ok(Self::Fbx),
            Some("glb" | "gltf") => Ok(Self::Gltf),
            _ => Err(AssetError::UnsupportedFormat(path.to_string()).into()),
        }
    }

    pub fn parse(self, bytes: &[u8]) -> Result<Prefab> {
        match self {
            Self::Fbx => FbxLoader::parse(bytes),
            Self::Gltf => GltfLoader::parse(bytes),
        }
    }
}

/// Fetches and decodes every pending texture slot of `material`.
///
/// URIs resolve against the directory of `base_uri`. Failures are logged and
/// leave the slot pending; `cache` dedupes images shared by several materials.
pub async fn load_material_textures<R: AssetReader>(
    reader: &R,
    base_uri: &str,
    material: &mut Material,
    cache: &mut HashMap<String, TextureRef>,
) {
    let material_name = material.name.clone();
    for (slot, color_space) in material.texture_slots_mut() {
        let Some(uri) = slot.uri.clone().filter(|_| slot.texture.is_none()) else {
            continue;
        };
        let resolved = resolve_relative(base_uri, &uri);

        if let Some(texture) = cache.get(&resolved) {
            slot.texture = Some(Arc::clone(texture));
            continue;
        }

        let texture = match reader.read_bytes(&resolved).await {
            Ok(bytes) => Texture::decode(&resolved, &bytes, color_space),
            Err(err) => Err(err),
        };
        match texture {
            Ok(texture) => {
                let texture = Arc::new(texture);
                cache.insert(resolved, Arc::clone(&texture));
                slot.texture = Some(texture);
            }
            Err(err) => log::warn!(
                "Texture '{}' of material '{}' failed to load: {}",
                reader.describe(&resolved),
                material_name,
                err
            ),
        }
    }
}

/// Resolves pending textures of every mesh material in `prefab`.
pub async fn load_prefab_textures<R: AssetReader>(reader: &R, base_uri: &str, prefab: &mut Prefab) {
    let mut cache = HashMap::new();
    // (original, resolved) pairs; materials shared between meshes load once.
    let mut resolved: Vec<(Arc<Material>, Arc<Material>)> = Vec::new();

    for node in &mut prefab.nodes {
        let Some(mesh) = node.mesh.as_mut() else { continue };
        for material in &mut mesh.materials {
            if !material.texture_slots().any(|s| s.is_pending()) {
                continue;
            }
            let done = resolved
                .iter()
                .find(|(original, _)| Arc::ptr_eq(original, material));
            if let Some((_, done)) = done {
                *material = Arc::clone(done);
                continue;
            }
            let mut updated = Material::clone(material);
            load_material_textures(reader, base_uri, &mut updated, &mut cache).await;
            let updated = Arc::new(updated);
            resolved.push((Arc::clone(material), Arc::clone(&updated)));
            *material = updated;
        }
    }
}
