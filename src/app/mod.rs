//! Application Entry
//!
//! [`App`] wires one AR session together on a single thread:
//!
//! 1. [`initialize_scene`] adds the lights and configures the renderer
//! 2. the environment map load is spawned and forgotten
//! 3. the [`ModelLoader`] is spawned
//! 4. the [`FrameLoop`] starts right away and does not wait for either task
//!
//! Tasks run on a tokio [`LocalSet`], so the stage is shared as
//! `Rc<RefCell<Stage>>` and never borrowed across an `.await`.
//!
//! ```rust,ignore
//! use ar_stage::app::App;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> ar_stage::Result<()> {
//!     let app = App::new(StageConfig::fbx())?;
//!     let reader = AssetReaderVariant::from_source(&app.config().asset_base)?;
//!     let run = app.run(reader, HttpTargetRegistry::new(), Timer::new(), tracker, renderer).await;
//!     Ok(())
//! }
//! ```

pub mod frame_loop;
pub mod initializer;
pub mod loader;

pub use frame_loop::{FrameLoop, FrameReport};
pub use initializer::{SceneLights, environment_task, initialize_scene, load_environment};
pub use loader::{AssetStrategy, ModelLoader};

use std::cell::RefCell;
use std::rc::Rc;

use tokio::task::LocalSet;

use crate::ar::{ArTracker, TargetRegistry};
use crate::assets::AssetReader;
use crate::config::StageConfig;
use crate::engine::Stage;
use crate::errors::Result;
use crate::renderer::Renderer;
use crate::utils::FrameClock;

/// Outcome of a bounded [`App::run`].
pub struct AppRun<T, R> {
    pub frames: u64,
    pub failed_frames: u64,
    pub tracker: T,
    pub renderer: R,
}

pub struct App {
    config: StageConfig,
    stage: Rc<RefCell<Stage>>,
}

impl App {
    /// Fails with [`Error::Config`](crate::errors::Error::Config) when the
    /// configuration does not validate.
    pub fn new(config: StageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stage: Rc::new(RefCell::new(Stage::new())),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    #[must_use]
    pub fn stage(&self) -> Rc<RefCell<Stage>> {
        Rc::clone(&self.stage)
    }

    /// Runs the session until the configured frame limit.
    ///
    /// Loader and environment failures are logged and dropped; a session
    /// without a model keeps rendering. Tasks still pending when the frame
    /// loop stops are cancelled.
    pub async fn run<A, G, C, T, R>(
        &self,
        reader: A,
        registry: G,
        clock: C,
        tracker: T,
        mut renderer: R,
    ) -> AppRun<T, R>
    where
        A: AssetReader + 'static,
        G: TargetRegistry + 'static,
        C: FrameClock,
        T: ArTracker,
        R: Renderer,
    {
        let config = &self.config;
        initialize_scene(&mut self.stage.borrow_mut(), &mut renderer, config);

        let local = LocalSet::new();

        let environment = environment_task(Rc::clone(&self.stage), config.environment.clone());
        local.spawn_local(async move {
            if let Err(err) = environment.await {
                log::debug!("Environment map not loaded: {err}");
            }
        });

        let loader = ModelLoader::new(
            reader,
            registry,
            &config.target_uri,
            config.strategy.clone(),
            config.model.clone(),
        );
        let stage = Rc::clone(&self.stage);
        local.spawn_local(async move {
            match loader.load(&stage).await {
                Ok(_) => log::info!("Model attached"),
                Err(err) => log::error!("Model load failed: {err}"),
            }
        });

        let mut frame_loop = FrameLoop::new(Rc::clone(&self.stage), clock, tracker, renderer)
            .with_interval(config.frame_interval())
            .with_max_frames(config.max_frames);
        local.run_until(frame_loop.run()).await;

        let frames = frame_loop.frames();
        let failed_frames = frame_loop.failed_frames();
        let (tracker, renderer) = frame_loop.into_parts();
        AppRun {
            frames,
            failed_frames,
            tracker,
            renderer,
        }
    }
}
