//! Stage Session Context
//!
//! This module contains [`Stage`], the state shared by one AR session: the
//! scene, the registered tracking targets, the loaded model and its animation
//! mixer.
//!
//! # Architecture
//!
//! The stage has no I/O. The model loader fills it in and the frame loop
//! advances it; both share it on a single thread:
//!
//! - **Model loader**: [`create_target`](Stage::create_target), then
//!   [`attach_model`](Stage::attach_model) once the asset is parsed
//! - **Frame loop**: [`advance_animation`](Stage::advance_animation),
//!   [`apply_tracking`](Stage::apply_tracking), then draw
//!
//! # Example
//!
//! ```rust,ignore
//! use ar_stage::{Stage, ar::TargetDescriptor, config::ModelConfig};
//!
//! let mut stage = Stage::new();
//! let target = stage.create_target(TargetDescriptor::new("6051de97"));
//! let model = stage.attach_model(&prefab, target.node, &ModelConfig::default())?;
//! stage.advance_animation(1.0 / 60.0);
//! ```

use std::sync::Arc;

use crate::animation::{AnimationClip, AnimationMixer};
use crate::ar::{ArTracker, TargetDescriptor, TrackingTarget};
use crate::assets::Prefab;
use crate::config::ModelConfig;
use crate::errors::{Error, Result};
use crate::scene::{NodeHandle, Scene};

/// Session state for one AR stage.
///
/// # Invariants
///
/// - At most one model is ever attached; a second
///   [`attach_model`](Self::attach_model) fails with
///   [`Error::ModelAlreadyLoaded`] and leaves the stage unchanged.
/// - The mixer exists only if the attached model carries animation clips,
///   and it plays the first clip only.
pub struct Stage {
    pub scene: Scene,

    targets: Vec<TrackingTarget>,
    model: Option<NodeHandle>,
    clips: Vec<Arc<AnimationClip>>,
    mixer: Option<AnimationMixer>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    #[must_use]
    pub fn new() -> Self {
        Self::with_scene(Scene::new())
    }

    #[must_use]
    pub fn with_scene(scene: Scene) -> Self {
        Self {
            scene,
            targets: Vec::new(),
            model: None,
            clips: Vec::new(),
            mixer: None,
        }
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Creates the scene node for a registered target.
    ///
    /// The node starts hidden and outside the scene; it is shown once the
    /// tracker reports a pose.
    pub fn create_target(&mut self, descriptor: TargetDescriptor) -> TrackingTarget {
        let name = descriptor.name.clone().unwrap_or_else(|| descriptor.uid.clone());
        let node = self.scene.create_node_with_name(&name);
        if let Some(n) = self.scene.get_node_mut(node) {
            n.visible = false;
        }

        let target = TrackingTarget { descriptor, node };
        self.targets.push(target.clone());
        target
    }

    #[must_use]
    pub fn targets(&self) -> &[TrackingTarget] {
        &self.targets
    }

    #[must_use]
    pub fn target(&self, uid: &str) -> Option<&TrackingTarget> {
        self.targets.iter().find(|t| t.uid() == uid)
    }

    /// Adds a target's node to the scene roots. Idempotent.
    pub fn add_target_to_scene(&mut self, target: &TrackingTarget) -> Result<bool> {
        self.scene.add_to_root(target.node)
    }

    // ========================================================================
    // Model
    // ========================================================================

    #[must_use]
    pub fn model(&self) -> Option<NodeHandle> {
        self.model
    }

    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    #[must_use]
    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    /// Clips of the attached model, in file order.
    #[must_use]
    pub fn clips(&self) -> &[Arc<AnimationClip>] {
        &self.clips
    }

    /// Instantiates `prefab` as the session's model under `target_node`.
    ///
    /// The model root is named and placed from `placement` (uniform scale and
    /// position; rotation is kept from the asset). If the prefab has clips, a
    /// mixer is created and the first clip starts playing. Finally the target
    /// node is added to the scene.
    pub fn attach_model(
        &mut self,
        prefab: &Prefab,
        target_node: NodeHandle,
        placement: &ModelConfig,
    ) -> Result<NodeHandle> {
        if self.model.is_some() {
            return Err(Error::ModelAlreadyLoaded);
        }
        if self.scene.get_node(target_node).is_none() {
            return Err(Error::NodeNotFound);
        }

        // Tracks bind to descendants only; the group keeps the placement.
        let root = self.scene.instantiate(prefab, &placement.name)?;

        let clips: Vec<Arc<AnimationClip>> =
            prefab.animations.iter().cloned().map(Arc::new).collect();
        let mixer = clips.first().map(|clip| {
            let mut mixer = AnimationMixer::new(root);
            mixer.clip_action(clip, &self.scene).play();
            mixer
        });

        if let Some(node) = self.scene.get_node_mut(root) {
            node.transform.set_scalar(placement.scale);
            let p = placement.position();
            node.transform.set_position(p.x, p.y, p.z);
        }

        let attached = self
            .scene
            .attach(root, target_node)
            .and_then(|()| self.scene.add_to_root(target_node));
        if let Err(err) = attached {
            self.scene.remove_node(root);
            return Err(err);
        }

        if let Some(clip) = clips.first() {
            log::info!(
                "Model '{}' plays clip '{}' ({:.2}s)",
                placement.name,
                clip.name,
                clip.duration
            );
        }
        self.model = Some(root);
        self.clips = clips;
        self.mixer = mixer;
        Ok(root)
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Advances the mixer by exactly `dt` seconds. Returns `false` if there is
    /// no mixer.
    pub fn advance_animation(&mut self, dt: f32) -> bool {
        match self.mixer.as_mut() {
            Some(mixer) => {
                mixer.update(dt, &mut self.scene);
                true
            }
            None => false,
        }
    }

    /// Moves every target node to its tracked pose and shows it; untracked
    /// targets are hidden. Returns the number of tracked targets.
    pub fn apply_tracking<T: ArTracker>(&mut self, tracker: &T) -> usize {
        let mut tracked = 0;
        for target in &self.targets {
            let pose = tracker.target_pose(target.uid());
            let Some(node) = self.scene.get_node_mut(target.node) else {
                continue;
            };
            match pose {
                Some(pose) => {
                    node.transform.apply_local_matrix(pose);
                    node.visible = true;
                    tracked += 1;
                }
                None => node.visible = false,
            }
        }
        tracked
    }

    /// Propagates transforms so the scene is ready to draw.
    pub fn update_matrix_world(&mut self) {
        self.scene.update_matrix_world();
    }
}
