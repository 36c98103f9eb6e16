//! Frame Loop Driver
//!
//! One [`tick`](FrameLoop::tick) is one frame:
//!
//! 1. read the clock delta
//! 2. advance the animation mixer, if a model with clips is loaded
//! 3. wait for the tracker, then move target nodes to their poses
//! 4. update world matrices and render once with the device camera
//!
//! The driver never waits for the model loader. Until a model is attached the
//! animation step does nothing and the scene renders without it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::ar::ArTracker;
use crate::config::{MIN_FRAME_INTERVAL, StageConfig};
use crate::engine::Stage;
use crate::errors::Result;
use crate::renderer::Renderer;
use crate::utils::{FpsCounter, FrameClock};

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// 1-based index of the frame
    pub frame: u64,
    pub delta: Duration,
    /// Whether a mixer was advanced.
    pub animated: bool,
    /// Targets the tracker reported a pose for.
    pub tracked_targets: usize,
}

pub struct FrameLoop<C, T, R> {
    stage: Rc<RefCell<Stage>>,
    clock: C,
    tracker: T,
    renderer: R,

    interval: Duration,
    max_frames: Option<u64>,
    frames: u64,
    failed_frames: u64,
    fps: FpsCounter,
}

impl<C: FrameClock, T: ArTracker, R: Renderer> FrameLoop<C, T, R> {
    pub fn new(stage: Rc<RefCell<Stage>>, clock: C, tracker: T, renderer: R) -> Self {
        Self {
            stage,
            clock,
            tracker,
            renderer,
            interval: Duration::from_secs_f32(1.0 / StageConfig::DEFAULT_FRAME_RATE),
            max_frames: None,
            frames: 0,
            failed_frames: 0,
            fps: FpsCounter::new(),
        }
    }

    /// Time between two scheduled frames, at least [`MIN_FRAME_INTERVAL`].
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_FRAME_INTERVAL);
        self
    }

    /// Stops [`run`](Self::run) after `max_frames` frames.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }

    #[must_use]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    #[must_use]
    pub fn stage(&self) -> &Rc<RefCell<Stage>> {
        &self.stage
    }

    /// Gives back the tracker and renderer.
    pub fn into_parts(self) -> (T, R) {
        (self.tracker, self.renderer)
    }

    /// Runs one frame.
    pub async fn tick(&mut self) -> Result<FrameReport> {
        self.frames += 1;
        let delta = self.clock.delta();

        if let Some(fps) = self.fps.update(delta) {
            log::debug!("{fps:.1} fps");
        }

        let animated = self.stage.borrow_mut().advance_animation(delta.as_secs_f32());

        self.tracker.update().await?;

        let mut stage = self.stage.borrow_mut();
        let tracked_targets = stage.apply_tracking(&self.tracker);
        stage.update_matrix_world();
        self.renderer.render(&stage.scene, self.tracker.device_camera())?;

        Ok(FrameReport {
            frame: self.frames,
            delta,
            animated,
            tracked_targets,
        })
    }

    /// Schedules frames at the configured interval until the frame limit, or
    /// forever without one. A failed frame is logged and the loop goes on.
    pub async fn run(&mut self) -> u64 {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.max_frames.is_none_or(|max| self.frames < max) {
            interval.tick().await;
            if let Err(err) = self.tick().await {
                self.failed_frames += 1;
                log::error!("Frame {} failed: {}", self.frames, err);
            }
        }

        log::info!(
            "Frame loop stopped after {} frames ({} failed)",
            self.frames,
            self.failed_frames
        );
        self.frames
    }
}
