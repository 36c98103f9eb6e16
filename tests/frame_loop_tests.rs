//! Frame Loop Tests
//!
//! Tests for:
//! - Rendering with the tracker camera before any model exists
//! - Mixer advancement by the exact clock delta
//! - Tracked / untracked target visibility
//! - Failed frames not stopping the loop

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use glam::{Affine3A, Vec3};

use ar_stage::app::{FrameLoop, ModelLoader};
use ar_stage::config::StageConfig;
use ar_stage::engine::Stage;
use ar_stage::utils::ManualClock;

use common::*;

fn loaded_stage(with_clip: bool) -> Rc<RefCell<Stage>> {
    let stage = Rc::new(RefCell::new(Stage::new()));
    let config = StageConfig::fbx();
    let loader = ModelLoader::new(
        fbx_reader(with_clip),
        FakeRegistry::new(),
        &config.target_uri,
        config.strategy,
        config.model,
    );
    pollster::block_on(loader.load(&stage)).unwrap();
    stage
}

fn target_visible(stage: &Rc<RefCell<Stage>>) -> bool {
    let stage = stage.borrow();
    let target = stage.target(TARGET_UID).unwrap();
    stage.scene.get_node(target.node).unwrap().visible
}

#[test]
fn frames_render_without_a_model() {
    let stage = Rc::new(RefCell::new(Stage::new()));
    let clock = ManualClock::from_seconds(&[0.016; 5]);
    let tracker = ScriptedTracker::always_tracked(TARGET_UID);
    let mut frame_loop =
        FrameLoop::new(Rc::clone(&stage), clock, tracker, RecordingRenderer::default());

    for k in 1..=5 {
        let report = pollster::block_on(frame_loop.tick()).unwrap();
        assert_eq!(report.frame, k);
        assert!(!report.animated);
        assert_eq!(report.tracked_targets, 0);
    }

    let frames = &frame_loop.renderer().frames;
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[4].visible_meshes, 0);
    // Drawn with the camera of the fifth tracker update.
    assert!(vec3_approx(frames[4].camera_position, Vec3::new(0.0, 0.0, 505.0)));
    assert_eq!(frame_loop.tracker().updates, 5);
}

#[test]
fn mixer_advances_by_the_clock_delta() {
    let stage = loaded_stage(true);
    let clock = ManualClock::from_seconds(&[0.1, 0.2, 0.05]);
    let tracker = ScriptedTracker::always_tracked(TARGET_UID);
    let mut frame_loop =
        FrameLoop::new(Rc::clone(&stage), clock, tracker, RecordingRenderer::default());

    let mut total = Duration::ZERO;
    for _ in 0..3 {
        let report = pollster::block_on(frame_loop.tick()).unwrap();
        assert!(report.animated);
        total += report.delta;
    }

    let mixer_time = stage.borrow().mixer().unwrap().time;
    assert!(approx(mixer_time, total.as_secs_f32()));
    assert!(approx(mixer_time, 0.35));
}

#[test]
fn loop_without_clips_skips_animation() {
    let stage = loaded_stage(false);
    let clock = ManualClock::from_seconds(&[0.1]);
    let tracker = ScriptedTracker::always_tracked(TARGET_UID);
    let mut frame_loop = FrameLoop::new(stage, clock, tracker, RecordingRenderer::default());

    let report = pollster::block_on(frame_loop.tick()).unwrap();
    assert!(!report.animated);
    assert_eq!(frame_loop.renderer().frames.len(), 1);
}

#[test]
fn tracked_target_is_posed_and_shown() {
    let stage = loaded_stage(false);
    let pose = Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0));
    let tracker =
        ScriptedTracker::new(TARGET_UID, vec![Some(pose), None, Some(Affine3A::IDENTITY)]);
    let clock = ManualClock::from_seconds(&[0.016; 3]);
    let mut frame_loop =
        FrameLoop::new(Rc::clone(&stage), clock, tracker, RecordingRenderer::default());

    // Targets start hidden until the tracker sees them.
    assert!(!target_visible(&stage));

    let report = pollster::block_on(frame_loop.tick()).unwrap();
    assert_eq!(report.tracked_targets, 1);
    assert!(target_visible(&stage));
    {
        let stage = stage.borrow();
        let model = stage.model().unwrap();
        let world = stage.scene.get_node(model).unwrap().world_matrix().translation;
        assert!(vec3_approx(world.into(), Vec3::new(5.0, 0.0, -300.0)));
    }

    let report = pollster::block_on(frame_loop.tick()).unwrap();
    assert_eq!(report.tracked_targets, 0);
    assert!(!target_visible(&stage));

    pollster::block_on(frame_loop.tick()).unwrap();
    assert!(target_visible(&stage));

    let frames = &frame_loop.renderer().frames;
    assert_eq!(frames[0].visible_meshes, 1);
    assert_eq!(frames[1].visible_meshes, 0);
    assert_eq!(frames[2].visible_meshes, 1);
}

#[test]
fn tracker_failure_fails_only_that_frame() {
    let stage = Rc::new(RefCell::new(Stage::new()));
    let mut tracker = ScriptedTracker::always_tracked(TARGET_UID);
    tracker.fail_on = vec![2];
    let clock = ManualClock::from_seconds(&[0.016; 3]);
    let mut frame_loop = FrameLoop::new(stage, clock, tracker, RecordingRenderer::default());

    assert!(pollster::block_on(frame_loop.tick()).is_ok());
    assert!(pollster::block_on(frame_loop.tick()).is_err());
    assert!(pollster::block_on(frame_loop.tick()).is_ok());
    assert_eq!(frame_loop.renderer().frames.len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn run_stops_at_the_frame_limit_and_survives_failures() {
    let stage = loaded_stage(true);
    let tracker = ScriptedTracker::always_tracked(TARGET_UID);
    let renderer = RecordingRenderer {
        fail_on: vec![2],
        ..RecordingRenderer::default()
    };
    let clock = ManualClock::from_seconds(&[0.01; 4]);
    let mut frame_loop = FrameLoop::new(stage, clock, tracker, renderer)
        .with_interval(Duration::from_millis(1))
        .with_max_frames(Some(4));

    let frames = frame_loop.run().await;

    assert_eq!(frames, 4);
    assert_eq!(frame_loop.failed_frames(), 1);
    assert_eq!(frame_loop.renderer().frames.len(), 3);
    assert_eq!(frame_loop.tracker().updates, 4);
}

#[tokio::test(flavor = "current_thread")]
async fn zero_interval_is_raised_to_the_minimum() {
    let stage = Rc::new(RefCell::new(Stage::new()));
    let mut frame_loop = FrameLoop::new(
        stage,
        ManualClock::from_seconds(&[0.0; 2]),
        ScriptedTracker::always_tracked(TARGET_UID),
        RecordingRenderer::default(),
    )
    .with_interval(Duration::ZERO)
    .with_max_frames(Some(2));

    assert_eq!(frame_loop.run().await, 2);
    assert_eq!(frame_loop.renderer().frames.len(), 2);
}
