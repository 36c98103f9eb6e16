pub mod io;
pub mod loaders;
pub mod pmrem;
pub mod prefab;

pub use io::{
    AssetReader, AssetReaderVariant, FileAssetReader, HttpAssetReader, LoadProgress,
    MemoryAssetReader, resolve_relative,
};
pub use loaders::{FbxLoader, GltfLoader, MaterialCreator, ModelFormat, MtlLoader, ObjLoader};
pub use pmrem::{HdrImage, PmremGenerator, decode_hdr};
pub use prefab::{Prefab, PrefabNode};

use serde::{Deserialize, Serialize};

/// How texel values of an image are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}
