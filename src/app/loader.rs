//! Model loading
//!
//! [`ModelLoader`] runs the whole load of one session: register the target,
//! fetch and decode the asset, then hand the result to the [`Stage`].

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::ar::TargetRegistry;
use crate::assets::loaders::load_prefab_textures;
use crate::assets::{AssetReader, LoadProgress, ModelFormat, MtlLoader, ObjLoader, Prefab};
use crate::config::ModelConfig;
use crate::engine::Stage;
use crate::errors::{Error, Result};
use crate::scene::NodeHandle;

/// How a model is stored on the asset server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetStrategy {
    /// One self-contained file; the decoder follows the extension.
    SingleFile { path: String },
    /// A material library that must be preloaded before its geometry.
    MaterialGeometry { material: String, geometry: String },
}

impl AssetStrategy {
    /// Paths in the order they are requested.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::SingleFile { path } => vec![path.as_str()],
            Self::MaterialGeometry { material, geometry } => {
                vec![material.as_str(), geometry.as_str()]
            }
        }
    }
}

pub struct ModelLoader<R, G> {
    reader: R,
    registry: G,
    target_uri: String,
    strategy: AssetStrategy,
    placement: ModelConfig,
}

impl<R: AssetReader, G: TargetRegistry> ModelLoader<R, G> {
    pub fn new(
        reader: R,
        registry: G,
        target_uri: &str,
        strategy: AssetStrategy,
        placement: ModelConfig,
    ) -> Self {
        Self {
            reader,
            registry,
            target_uri: target_uri.to_string(),
            strategy,
            placement,
        }
    }

    #[must_use]
    pub fn reader(&self) -> &R {
        &self.reader
    }

    #[must_use]
    pub fn strategy(&self) -> &AssetStrategy {
        &self.strategy
    }

    /// Registers the target, loads the model and attaches it under the
    /// target. Returns the model's root node.
    ///
    /// The stage is only borrowed between suspension points. Running two
    /// loads against one stage is not supported; the second attach fails with
    /// [`Error::ModelAlreadyLoaded`].
    pub async fn load(&self, stage: &RefCell<Stage>) -> Result<NodeHandle> {
        if stage.borrow().has_model() {
            return Err(Error::ModelAlreadyLoaded);
        }

        let descriptor = self.registry.add_target(&self.target_uri).await?;
        let target = stage.borrow_mut().create_target(descriptor);

        let prefab = self.fetch_prefab().await?;
        log::info!(
            "Loaded '{}': {} nodes, {} meshes, {} clips",
            self.placement.name,
            prefab.nodes.len(),
            prefab.mesh_count(),
            prefab.animations.len()
        );

        stage.borrow_mut().attach_model(&prefab, target.node, &self.placement)
    }

    /// Fetches and decodes the asset without touching any scene.
    pub async fn fetch_prefab(&self) -> Result<Prefab> {
        match &self.strategy {
            AssetStrategy::SingleFile { path } => {
                let format = ModelFormat::from_path(path)?;
                let bytes = self.fetch(path).await?;
                let mut prefab = format.parse(&bytes)?;
                load_prefab_textures(&self.reader, path, &mut prefab).await;
                Ok(prefab)
            }
            AssetStrategy::MaterialGeometry { material, geometry } => {
                let bytes = self.fetch(material).await?;
                let mut materials = MtlLoader::parse(&String::from_utf8_lossy(&bytes), material)?;
                materials.preload(&self.reader).await;

                let bytes = self.fetch(geometry).await?;
                ObjLoader::new()
                    .with_materials(materials)
                    .parse(&String::from_utf8_lossy(&bytes))
            }
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let location = self.reader.describe(path);
        let mut last_percent = None;
        let mut on_progress = |progress: LoadProgress| {
            let Some(percent) = progress.percent() else { return };
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                log::info!("{percent}% loaded ({location})");
            }
        };
        self.reader.read_bytes_with_progress(path, &mut on_progress).await
    }
}
