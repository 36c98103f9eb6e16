//! AR stage: scene setup, remote model loading and an AR-synchronized frame
//! loop.

pub mod animation;
pub mod app;
pub mod ar;
pub mod assets;
pub mod config;
pub mod engine;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod utils;

pub use animation::{AnimationAction, AnimationClip, AnimationMixer, Binder, LoopMode};
pub use app::{App, AssetStrategy, FrameLoop, ModelLoader};
pub use ar::{ArTracker, TargetRegistry, TrackingTarget};
pub use assets::{AssetReader, ColorSpace, Prefab};
pub use config::StageConfig;
pub use engine::Stage;
pub use errors::{AssetError, Error, Result};
pub use renderer::{HeadlessRenderer, Renderer, RendererSettings};
pub use resources::{Geometry, Material, Mesh, Texture};
pub use scene::{Camera, Light, Node, NodeHandle, Scene};
