//! AR collaborators
//!
//! - target: remote target registration and the scene-side target handle
//! - tracker: per-frame camera and target poses

pub mod target;
pub mod tracker;

pub use target::{
    HttpTargetRegistry, TargetDescriptor, TargetRegistry, TrackingTarget, parse_descriptor,
};
pub use tracker::{ArTracker, StaticTracker};
