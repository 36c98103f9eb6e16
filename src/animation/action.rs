use std::sync::Arc;

use crate::animation::{
    binding::PropertyBinding,
    clip::AnimationClip,
    tracks::KeyframeCursor,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopMode {
    Once,
    Loop,
    PingPong,
}

/// Playback state of one clip inside a mixer.
#[derive(Debug, Clone)]
pub struct AnimationAction {
    clip: Arc<AnimationClip>,

    pub time: f32,
    pub time_scale: f32,
    pub weight: f32,
    pub loop_mode: LoopMode,
    pub paused: bool,
    pub enabled: bool,

    pub bindings: Vec<PropertyBinding>,

    pub(crate) track_cursors: Vec<KeyframeCursor>,
}

impl AnimationAction {
    /// Creates a stopped action; call [`play`](Self::play) to start it.
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        let track_count = clip.tracks.len();
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 0.0,
            loop_mode: LoopMode::Loop,
            paused: false,
            enabled: false,
            bindings: Vec::new(),
            track_cursors: vec![KeyframeCursor::default(); track_count],
        }
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn play(&mut self) -> &mut Self {
        self.enabled = true;
        self.paused = false;
        self.weight = 1.0;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.enabled = false;
        self.time = 0.0;
        self
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.enabled && !self.paused && self.weight > 0.0
    }

    /// Advances local time by `dt` seconds, honoring the loop mode.
    pub fn update(&mut self, dt: f32) {
        if self.paused || !self.enabled {
            return;
        }

        let duration = self.clip.duration;
        if duration <= 0.0 {
            return;
        }

        self.time += dt * self.time_scale;

        match self.loop_mode {
            LoopMode::Once => {
                if self.time >= duration {
                    self.time = duration;
                    self.paused = true;
                } else if self.time < 0.0 {
                    self.time = 0.0;
                    self.paused = true;
                }
            }
            LoopMode::Loop => {
                if self.time >= duration {
                    self.time %= duration;
                } else if self.time < 0.0 {
                    self.time = duration + (self.time % duration);
                }
            }
            LoopMode::PingPong => {
                let double_duration = duration * 2.0;
                let mut t = self.time % double_duration;
                if t < 0.0 {
                    t += double_duration;
                }
                if t > duration {
                    t = double_duration - t;
                }
                self.time = t;
            }
        }
    }
}
