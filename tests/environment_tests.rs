//! Environment Map Tests
//!
//! Tests for:
//! - HDR load → pre-filtered mip chain → scene.environment
//! - Failures leaving the environment empty
//! - The background never being touched

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec4;

use ar_stage::app::{environment_task, load_environment};
use ar_stage::assets::MemoryAssetReader;
use ar_stage::config::EnvironmentConfig;
use ar_stage::engine::Stage;
use ar_stage::errors::{AssetError, Error};

use common::*;

#[test]
fn hdr_becomes_the_scene_environment() {
    let config = EnvironmentConfig::default();
    let reader = MemoryAssetReader::new().with(&config.file, hdr_bytes(32, 16));
    let stage = RefCell::new(Stage::new());

    pollster::block_on(load_environment(&reader, &stage, &config)).unwrap();

    let stage = stage.borrow();
    let map = stage.scene.environment.env_map.as_ref().unwrap();
    assert_eq!(map.name, "royal_esplanade_1k.hdr");
    let sizes: Vec<_> = map.levels.iter().map(|l| (l.width, l.height)).collect();
    assert_eq!(sizes, [(32, 16), (16, 8), (8, 4)]);
    assert_eq!(stage.scene.environment.env_map_max_mip_level, 2.0);
    assert!(stage.scene.background.is_none());
}

#[test]
fn environment_load_keeps_an_existing_background() {
    let config = EnvironmentConfig::default();
    let reader = MemoryAssetReader::new().with(&config.file, hdr_bytes(8, 4));
    let stage = RefCell::new(Stage::new());
    let background = Some(Vec4::new(0.1, 0.2, 0.3, 1.0));
    stage.borrow_mut().scene.set_background(background);

    pollster::block_on(load_environment(&reader, &stage, &config)).unwrap();

    assert!(stage.borrow().scene.environment.has_env_map());
    assert_eq!(stage.borrow().scene.background, background);
}

#[test]
fn missing_hdr_leaves_environment_empty() {
    let stage = RefCell::new(Stage::new());
    let err = pollster::block_on(load_environment(
        &MemoryAssetReader::new(),
        &stage,
        &EnvironmentConfig::default(),
    ))
    .unwrap_err();

    assert!(matches!(err, Error::Asset(AssetError::NotFound(_))));
    assert!(!stage.borrow().scene.environment.has_env_map());
    assert!(stage.borrow().scene.background.is_none());
}

#[test]
fn corrupt_hdr_leaves_environment_empty() {
    let config = EnvironmentConfig::default();
    let reader = MemoryAssetReader::new().with(&config.file, b"#?RADIANCE\ngarbage".to_vec());
    let stage = RefCell::new(Stage::new());

    assert!(pollster::block_on(load_environment(&reader, &stage, &config)).is_err());
    assert!(!stage.borrow().scene.environment.has_env_map());
}

#[tokio::test(flavor = "current_thread")]
async fn task_reads_from_the_configured_directory() {
    let dir = std::env::temp_dir().join(format!("ar-stage-env-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("studio.hdr"), hdr_bytes(16, 8)).unwrap();

    let config = EnvironmentConfig {
        path: dir.display().to_string(),
        file: "studio.hdr".into(),
        max_levels: 2,
    };
    let stage = Rc::new(RefCell::new(Stage::new()));
    environment_task(Rc::clone(&stage), config).await.unwrap();

    let levels = stage.borrow().scene.environment.env_map.as_ref().unwrap().levels.len();
    assert_eq!(levels, 2);

    std::fs::remove_dir_all(&dir).ok();
}
