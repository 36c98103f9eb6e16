use std::sync::Arc;

use crate::animation::action::AnimationAction;
use crate::animation::binder::Binder;
use crate::animation::binding::TargetPath;
use crate::animation::clip::{AnimationClip, TrackData};
use crate::scene::{NodeHandle, Scene};

/// Animation playback controller bound to one root node.
pub struct AnimationMixer {
    root: NodeHandle,
    actions: Vec<AnimationAction>,
    /// Total time the mixer has been advanced by, in seconds
    pub time: f32,
}

impl AnimationMixer {
    #[must_use]
    pub fn new(root: NodeHandle) -> Self {
        Self {
            root,
            actions: Vec::new(),
            time: 0.0,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Returns the action for `clip`, creating and binding it on first use.
    pub fn clip_action(
        &mut self,
        clip: &Arc<AnimationClip>,
        scene: &Scene,
    ) -> &mut AnimationAction {
        let index = match self
            .actions
            .iter()
            .position(|a| Arc::ptr_eq(a.clip(), clip))
        {
            Some(index) => index,
            None => {
                let mut action = AnimationAction::new(Arc::clone(clip));
                action.bindings = Binder::bind(scene, self.root, clip);
                self.actions.push(action);
                self.actions.len() - 1
            }
        };
        &mut self.actions[index]
    }

    pub fn add_action(&mut self, action: AnimationAction) {
        self.actions.push(action);
    }

    #[must_use]
    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    /// Actions currently contributing to the pose.
    pub fn running_actions(&self) -> impl Iterator<Item = &AnimationAction> {
        self.actions.iter().filter(|a| a.is_running())
    }

    /// Advances every action by `dt` seconds and writes sampled values to the
    /// bound nodes.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        self.time += dt;

        for action in &mut self.actions {
            action.update(dt);
        }

        for action in &mut self.actions {
            // Paused actions still hold their pose.
            if !action.enabled || action.weight <= 0.0 {
                continue;
            }

            let clip = Arc::clone(action.clip());
            for binding in &action.bindings {
                let track = &clip.tracks[binding.track_index];
                let cursor = &mut action.track_cursors[binding.track_index];
                let Some(node) = scene.get_node_mut(binding.node_handle) else {
                    continue;
                };

                match (&track.data, binding.target) {
                    (TrackData::Vector3(t), TargetPath::Translation) => {
                        if let Some(val) = t.sample_with_cursor(action.time, cursor) {
                            node.transform.position = val;
                        }
                    }
                    (TrackData::Vector3(t), TargetPath::Scale) => {
                        if let Some(val) = t.sample_with_cursor(action.time, cursor) {
                            node.transform.scale = val;
                        }
                    }
                    (TrackData::Quaternion(t), TargetPath::Rotation) => {
                        if let Some(val) = t.sample_with_cursor(action.time, cursor) {
                            node.transform.rotation = val;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
