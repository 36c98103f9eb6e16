//! Scene setup run once before loading starts.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use crate::assets::{AssetReader, AssetReaderVariant, PmremGenerator, decode_hdr};
use crate::config::{EnvironmentConfig, StageConfig};
use crate::engine::Stage;
use crate::errors::Result;
use crate::renderer::Renderer;
use crate::scene::NodeHandle;

/// Nodes created by [`initialize_scene`].
#[derive(Debug, Clone, Copy)]
pub struct SceneLights {
    pub ambient: NodeHandle,
    pub directional: NodeHandle,
}

/// Adds the lights and configures the renderer output.
pub fn initialize_scene<T: Renderer + ?Sized>(
    stage: &mut Stage,
    renderer: &mut T,
    config: &StageConfig,
) -> SceneLights {
    let lighting = &config.lighting;
    let scene = &mut stage.scene;

    let ambient = scene.add_light(lighting.ambient_light());
    scene.set_name(ambient, "AmbientLight");

    let directional = scene.add_light(lighting.directional_light());
    scene.set_name(directional, "DirectionalLight");
    if let Some(node) = scene.get_node_mut(directional) {
        let [x, y, z] = lighting.directional_position;
        node.transform.set_position(x, y, z);
    }

    let settings = renderer.settings_mut();
    config.renderer.apply(settings);
    settings.shadow_map_enabled = lighting.cast_shadows;

    log::info!(
        "Scene initialized: {:?} output, {}x{} @ {}x",
        settings.output_color_space,
        settings.width,
        settings.height,
        settings.pixel_ratio
    );

    SceneLights { ambient, directional }
}

/// Loads the HDR image of `config`, pre-filters it and assigns it as the
/// scene environment. The background is left as is.
pub async fn load_environment<R: AssetReader>(
    reader: &R,
    stage: &RefCell<Stage>,
    config: &EnvironmentConfig,
) -> Result<()> {
    let bytes = reader.read_bytes(&config.file).await?;
    let image = decode_hdr(&bytes)?;
    let map =
        PmremGenerator::new(config.max_levels).from_equirectangular(&config.file, &image)?;

    log::info!(
        "Environment '{}' ready: {}x{}, {} levels",
        config.file,
        image.width,
        image.height,
        map.levels.len()
    );
    stage.borrow_mut().scene.set_environment_map(Some(Arc::new(map)));
    Ok(())
}

/// The environment load as a detached task, reading from the configured path.
pub fn environment_task(
    stage: Rc<RefCell<Stage>>,
    config: EnvironmentConfig,
) -> impl Future<Output = Result<()>> {
    async move {
        let reader = AssetReaderVariant::from_source(&config.path)?;
        load_environment(&reader, &stage, &config).await
    }
}
