use crate::animation::binding::PropertyBinding;
use crate::animation::clip::AnimationClip;
use crate::scene::transform_system::collect_subtree;
use crate::scene::{NodeHandle, Scene};

pub struct Binder;

impl Binder {
    /// Resolves each track of `clip` to a descendant of `root` by name.
    ///
    /// `root` itself is never a binding target. Tracks whose node cannot be
    /// found are skipped.
    #[must_use]
    pub fn bind(scene: &Scene, root: NodeHandle, clip: &AnimationClip) -> Vec<PropertyBinding> {
        let mut bindings = Vec::with_capacity(clip.tracks.len());
        let descendants = collect_subtree(&scene.nodes, root);
        let descendants = descendants.get(1..).unwrap_or_default();

        for (track_index, track) in clip.tracks.iter().enumerate() {
            let found = descendants
                .iter()
                .copied()
                .find(|&h| scene.get_node(h).is_some_and(|n| n.name == track.meta.node_name));
            match found {
                Some(node_handle) => bindings.push(PropertyBinding {
                    track_index,
                    node_handle,
                    target: track.meta.target,
                }),
                None => log::debug!(
                    "Animation '{}': no node named '{}', track skipped",
                    clip.name,
                    track.meta.node_name
                ),
            }
        }

        bindings
    }
}
