use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use glam::Affine3A;

use ar_stage::app::App;
use ar_stage::ar::{HttpTargetRegistry, StaticTracker};
use ar_stage::assets::AssetReaderVariant;
use ar_stage::config::StageConfig;
use ar_stage::renderer::{HeadlessRenderer, Renderer, RendererSettings};
use ar_stage::utils::Timer;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Preset {
    Fbx,
    Obj,
}

#[derive(Parser, Debug)]
#[command(name = "ar-stage")]
#[command(about = "Loads a model onto an AR target and renders it headlessly", long_about = None)]
struct Cli {
    /// JSON configuration file; overrides the preset
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "fbx")]
    preset: Preset,

    /// Root URL or directory for model files
    #[arg(long)]
    asset_base: Option<String>,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    #[arg(long)]
    pixel_ratio: Option<f32>,
}

impl Cli {
    fn stage_config(&self) -> anyhow::Result<StageConfig> {
        let mut config = match &self.config {
            Some(path) => StageConfig::load(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => match self.preset {
                Preset::Fbx => StageConfig::fbx(),
                Preset::Obj => StageConfig::obj(),
            },
        };

        if let Some(base) = &self.asset_base {
            config.asset_base.clone_from(base);
        }
        if let Some(frames) = self.frames {
            config.max_frames = Some(frames);
        }
        if let Some(ratio) = self.pixel_ratio {
            config.renderer.pixel_ratio = ratio;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();

    let config = Cli::parse().stage_config()?;

    let reader = AssetReaderVariant::from_source(&config.asset_base)
        .with_context(|| format!("asset base {}", config.asset_base))?;

    let mut settings = RendererSettings::default();
    config.renderer.apply(&mut settings);
    let camera = config.camera.build(settings.aspect());
    let tracker = StaticTracker::new(camera).with_default_pose(Affine3A::IDENTITY);
    let renderer = HeadlessRenderer::new(settings);

    let app = App::new(config)?;
    let run = app.run(reader, HttpTargetRegistry::new(), Timer::new(), tracker, renderer).await;

    if let Some(stats) = run.renderer.last_stats() {
        log::info!(
            "Rendered {} frames ({} failed); last frame: {} meshes, {} triangles, environment: {}",
            run.frames,
            run.failed_frames,
            stats.visible_meshes,
            stats.triangles,
            stats.has_environment
        );
    }
    log::info!("Output {:?}", run.renderer.settings().drawing_buffer_size());
    Ok(())
}
