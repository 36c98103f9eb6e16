//! Shared fixtures for the integration tests.
//!
//! - `RecordingReader`: in-memory assets that remember the request order
//! - `FakeRegistry`: target registration without a network
//! - `ScriptedTracker`: per-frame target poses and failures
//! - `RecordingRenderer`: keeps the stats of every rendered frame
//! - `write_fbx`: encodes node trees as binary FBX

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::rc::Rc;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use glam::{Affine3A, Vec3};

use ar_stage::ar::{ArTracker, TargetDescriptor, TargetRegistry};
use ar_stage::assets::loaders::fbx::{FbxNode, FbxProperty, KTIME_PER_SECOND};
use ar_stage::assets::{AssetReader, LoadProgress, MemoryAssetReader};
use ar_stage::errors::{AssetError, Error, Result};
use ar_stage::renderer::{FrameStats, HeadlessRenderer, Renderer, RendererSettings};
use ar_stage::scene::{Camera, Scene};

pub const TARGET_URI: &str =
    "https://developer.letsee.io/api-tm/target-manager/target-uid/6051de97b30426a32a7be172";
pub const TARGET_UID: &str = "6051de97b30426a32a7be172";

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

pub fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

pub fn test_camera() -> Camera {
    let mut camera = Camera::new_perspective(60.0, 16.0 / 9.0, 1.0, 10_000.0);
    camera.set_pose(Affine3A::from_translation(Vec3::new(0.0, 0.0, 500.0)));
    camera
}

// ============================================================================
// Asset reader
// ============================================================================

/// Serves files from memory and records every request in order.
#[derive(Clone, Default)]
pub struct RecordingReader {
    files: MemoryAssetReader,
    requests: Rc<RefCell<Vec<String>>>,
    progress: Rc<RefCell<Vec<LoadProgress>>>,
    /// Report progress without a total, like a response lacking Content-Length.
    pub unknown_length: bool,
}

impl RecordingReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(uri, bytes);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn progress(&self) -> Vec<LoadProgress> {
        self.progress.borrow().clone()
    }
}

impl AssetReader for RecordingReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(uri.to_string());
        self.files.read_bytes(uri).await
    }

    async fn read_bytes_with_progress(
        &self,
        uri: &str,
        on_progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>> {
        let bytes = self.read_bytes(uri).await?;
        let total = bytes.len() as u64;
        // Four chunks, like a streamed response.
        for step in 1..=4u64 {
            let progress = LoadProgress {
                loaded: total * step / 4,
                total: (!self.unknown_length).then_some(total),
            };
            self.progress.borrow_mut().push(progress);
            on_progress(progress);
        }
        Ok(bytes)
    }
}

// ============================================================================
// Target registry
// ============================================================================

pub struct FakeRegistry {
    pub uid: String,
    pub fail: bool,
    pub calls: Rc<Cell<u32>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            uid: TARGET_UID.to_string(),
            fail: false,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }
}

impl TargetRegistry for FakeRegistry {
    async fn add_target(&self, uri: &str) -> Result<TargetDescriptor> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(Error::TargetRegistration(format!("{uri} rejected")));
        }
        Ok(TargetDescriptor::new(&self.uid))
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Pops one scripted pose per update for a single target uid.
pub struct ScriptedTracker {
    camera: Camera,
    uid: String,
    script: VecDeque<Option<Affine3A>>,
    current: Option<Affine3A>,
    /// Update numbers (1-based) that fail.
    pub fail_on: Vec<u64>,
    pub updates: u64,
}

impl ScriptedTracker {
    pub fn new(uid: &str, script: Vec<Option<Affine3A>>) -> Self {
        Self {
            camera: test_camera(),
            uid: uid.to_string(),
            script: script.into(),
            current: None,
            fail_on: Vec::new(),
            updates: 0,
        }
    }

    /// A tracker that always sees the target at the origin.
    pub fn always_tracked(uid: &str) -> Self {
        let mut tracker = Self::new(uid, Vec::new());
        tracker.current = Some(Affine3A::IDENTITY);
        tracker
    }
}

impl ArTracker for ScriptedTracker {
    async fn update(&mut self) -> Result<()> {
        self.updates += 1;
        if self.fail_on.contains(&self.updates) {
            return Err(Error::Tracking(format!("camera frame {} dropped", self.updates)));
        }
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        // The device camera drifts one unit per frame.
        self.camera
            .set_pose(Affine3A::from_translation(Vec3::new(0.0, 0.0, 500.0 + self.updates as f32)));
        Ok(())
    }

    fn device_camera(&self) -> &Camera {
        &self.camera
    }

    fn target_pose(&self, uid: &str) -> Option<Affine3A> {
        if uid == self.uid { self.current } else { None }
    }
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Default)]
pub struct RecordingRenderer {
    pub settings: RendererSettings,
    pub frames: Vec<FrameStats>,
    /// Render calls (1-based) that fail.
    pub fail_on: Vec<usize>,
    pub calls: usize,
}

impl Renderer for RecordingRenderer {
    fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return Err(Error::Render("device lost".into()));
        }
        let mut stats = HeadlessRenderer::collect(scene, camera);
        stats.frame = self.calls as u64;
        self.frames.push(stats);
        Ok(())
    }
}

// ============================================================================
// Binary FBX writer
// ============================================================================

pub fn node(name: &str, properties: Vec<FbxProperty>, children: Vec<FbxNode>) -> FbxNode {
    FbxNode {
        name: name.to_string(),
        properties,
        children,
    }
}

pub fn leaf(name: &str, property: FbxProperty) -> FbxNode {
    node(name, vec![property], Vec::new())
}

pub fn s(value: &str) -> FbxProperty {
    FbxProperty::String(value.to_string())
}

/// A `Properties70` `P` entry holding three doubles.
pub fn p_vec3(name: &str, v: Vec3) -> FbxNode {
    node(
        "P",
        vec![
            s(name),
            s(name),
            s(""),
            s("A"),
            FbxProperty::F64(f64::from(v.x)),
            FbxProperty::F64(f64::from(v.y)),
            FbxProperty::F64(f64::from(v.z)),
        ],
        Vec::new(),
    )
}

pub fn p_number(name: &str, value: f64) -> FbxNode {
    node("P", vec![s(name), s("Number"), s(""), s("A"), FbxProperty::F64(value)], Vec::new())
}

pub fn properties70(entries: Vec<FbxNode>) -> FbxNode {
    node("Properties70", Vec::new(), entries)
}

pub fn connect(kind: &str, child: i64, parent: i64, property: Option<&str>) -> FbxNode {
    let mut props = vec![s(kind), FbxProperty::I64(child), FbxProperty::I64(parent)];
    if let Some(property) = property {
        props.push(s(property));
    }
    node("C", props, Vec::new())
}

/// Seconds to FBX ticks.
pub fn ktime(seconds: f64) -> i64 {
    (seconds * KTIME_PER_SECOND).round() as i64
}

struct FbxWriter {
    out: Vec<u8>,
    wide: bool,
    compress: bool,
}

impl FbxWriter {
    fn offset(&mut self, value: u64) {
        if self.wide {
            self.out.extend_from_slice(&value.to_le_bytes());
        } else {
            self.out.extend_from_slice(&(value as u32).to_le_bytes());
        }
    }

    fn null_record(&mut self) {
        let len = if self.wide { 25 } else { 13 };
        self.out.extend(std::iter::repeat_n(0u8, len));
    }

    fn patch_offset(&mut self, at: usize, value: u64) {
        if self.wide {
            self.out[at..at + 8].copy_from_slice(&value.to_le_bytes());
        } else {
            self.out[at..at + 4].copy_from_slice(&(value as u32).to_le_bytes());
        }
    }

    fn array(&mut self, code: u8, count: usize, raw: Vec<u8>) {
        self.out.push(code);
        self.out.extend_from_slice(&(count as u32).to_le_bytes());
        if self.compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&raw).unwrap();
            let packed = encoder.finish().unwrap();
            self.out.extend_from_slice(&1u32.to_le_bytes());
            self.out.extend_from_slice(&(packed.len() as u32).to_le_bytes());
            self.out.extend_from_slice(&packed);
        } else {
            self.out.extend_from_slice(&0u32.to_le_bytes());
            self.out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
            self.out.extend_from_slice(&raw);
        }
    }

    fn property(&mut self, property: &FbxProperty) {
        match property {
            FbxProperty::Bool(v) => {
                self.out.push(b'C');
                self.out.push(u8::from(*v));
            }
            FbxProperty::I16(v) => {
                self.out.push(b'Y');
                self.out.extend_from_slice(&v.to_le_bytes());
            }
            FbxProperty::I32(v) => {
                self.out.push(b'I');
                self.out.extend_from_slice(&v.to_le_bytes());
            }
            FbxProperty::I64(v) => {
                self.out.push(b'L');
                self.out.extend_from_slice(&v.to_le_bytes());
            }
            FbxProperty::F32(v) => {
                self.out.push(b'F');
                self.out.extend_from_slice(&v.to_le_bytes());
            }
            FbxProperty::F64(v) => {
                self.out.push(b'D');
                self.out.extend_from_slice(&v.to_le_bytes());
            }
            FbxProperty::String(v) => {
                self.out.push(b'S');
                self.out.extend_from_slice(&(v.len() as u32).to_le_bytes());
                self.out.extend_from_slice(v.as_bytes());
            }
            FbxProperty::Raw(v) => {
                self.out.push(b'R');
                self.out.extend_from_slice(&(v.len() as u32).to_le_bytes());
                self.out.extend_from_slice(v);
            }
            FbxProperty::BoolArray(v) => {
                self.array(b'b', v.len(), v.iter().map(|&b| u8::from(b)).collect());
            }
            FbxProperty::I32Array(v) => {
                self.array(b'i', v.len(), v.iter().flat_map(|x| x.to_le_bytes()).collect());
            }
            FbxProperty::I64Array(v) => {
                self.array(b'l', v.len(), v.iter().flat_map(|x| x.to_le_bytes()).collect());
            }
            FbxProperty::F32Array(v) => {
                self.array(b'f', v.len(), v.iter().flat_map(|x| x.to_le_bytes()).collect());
            }
            FbxProperty::F64Array(v) => {
                self.array(b'd', v.len(), v.iter().flat_map(|x| x.to_le_bytes()).collect());
            }
        }
    }

    fn node(&mut self, node: &FbxNode) {
        let start = self.out.len();
        let width = if self.wide { 8 } else { 4 };
        self.offset(0);
        self.offset(node.properties.len() as u64);
        self.offset(0);
        self.out.push(node.name.len() as u8);
        self.out.extend_from_slice(node.name.as_bytes());

        let props_start = self.out.len();
        for property in &node.properties {
            self.property(property);
        }
        let props_len = (self.out.len() - props_start) as u64;

        if !node.children.is_empty() {
            for child in &node.children {
                self.node(child);
            }
            self.null_record();
        }

        let end = self.out.len() as u64;
        self.patch_offset(start, end);
        self.patch_offset(start + 2 * width, props_len);
    }
}

/// Encodes `nodes` as a binary FBX file of `version`.
pub fn write_fbx(version: u32, nodes: &[FbxNode], compress_arrays: bool) -> Vec<u8> {
    let mut writer = FbxWriter {
        out: b"Kaydara FBX Binary  \0".to_vec(),
        wide: version >= 7500,
        compress: compress_arrays,
    };
    writer.out.extend_from_slice(&[0x1A, 0x00]);
    writer.out.extend_from_slice(&version.to_le_bytes());
    for node in nodes {
        writer.node(node);
    }
    writer.null_record();
    writer.out
}

// ============================================================================
// Fixture assets
// ============================================================================

/// A single-mesh FBX scene: model `Body` with a quad, one material, and,
/// if `with_clip`, a one-second clip moving `Body` along X.
pub fn hood_fbx_nodes(with_clip: bool) -> Vec<FbxNode> {
    let mut objects = vec![
        node(
            "Model",
            vec![FbxProperty::I64(100), s("Body\u{0}\u{1}Model"), s("Mesh")],
            vec![properties70(vec![
                p_vec3("Lcl Translation", Vec3::new(1.0, 2.0, 3.0)),
                p_vec3("Lcl Rotation", Vec3::new(0.0, 90.0, 0.0)),
            ])],
        ),
        node(
            "Geometry",
            vec![FbxProperty::I64(200), s("Body\u{0}\u{1}Geometry"), s("Mesh")],
            vec![
                leaf(
                    "Vertices",
                    FbxProperty::F64Array(vec![
                        -10.0, -10.0, 0.0, 10.0, -10.0, 0.0, 10.0, 10.0, 0.0, -10.0, 10.0, 0.0,
                    ]),
                ),
                leaf("PolygonVertexIndex", FbxProperty::I32Array(vec![0, 1, 2, !3])),
            ],
        ),
        node(
            "Material",
            vec![FbxProperty::I64(300), s("Paint\u{0}\u{1}Material"), s("")],
            vec![properties70(vec![p_vec3("DiffuseColor", Vec3::new(0.8, 0.2, 0.2))])],
        ),
    ];
    let mut connections = vec![
        connect("OO", 100, 0, None),
        connect("OO", 200, 100, None),
        connect("OO", 300, 100, None),
    ];

    if with_clip {
        objects.extend([
            node(
                "AnimationStack",
                vec![FbxProperty::I64(400), s("Take 001\u{0}\u{1}AnimStack"), s("")],
                Vec::new(),
            ),
            node(
                "AnimationLayer",
                vec![FbxProperty::I64(500), s("BaseLayer\u{0}\u{1}AnimLayer"), s("")],
                Vec::new(),
            ),
            node(
                "AnimationCurveNode",
                vec![FbxProperty::I64(600), s("T\u{0}\u{1}AnimCurveNode"), s("")],
                vec![properties70(vec![
                    p_number("d|X", 1.0),
                    p_number("d|Y", 2.0),
                    p_number("d|Z", 3.0),
                ])],
            ),
            node(
                "AnimationCurve",
                vec![FbxProperty::I64(700), s("\u{0}\u{1}AnimCurve"), s("")],
                vec![
                    leaf("KeyTime", FbxProperty::I64Array(vec![0, ktime(1.0)])),
                    leaf("KeyValueFloat", FbxProperty::F32Array(vec![0.0, 10.0])),
                ],
            ),
        ]);
        connections.extend([
            connect("OO", 500, 400, None),
            connect("OO", 600, 500, None),
            connect("OP", 600, 100, Some("Lcl Translation")),
            connect("OP", 700, 600, Some("d|X")),
        ]);
    }

    vec![
        node("FBXHeaderExtension", Vec::new(), vec![leaf("FBXVersion", FbxProperty::I32(7400))]),
        node("Objects", Vec::new(), objects),
        node("Connections", Vec::new(), connections),
    ]
}

pub fn hood_fbx(with_clip: bool) -> Vec<u8> {
    write_fbx(7400, &hood_fbx_nodes(with_clip), true)
}

pub const HOOD_MTL: &str = "
newmtl Paint
Kd 0.8 0.2 0.2
map_Kd paint.png

newmtl Chrome
Kd 0.9 0.9 0.9
Ns 200
";

pub const HOOD_OBJ: &str = "
mtllib Hood1_90.mtl
o Hood
v -1 0 0
v 1 0 0
v 1 1 0
v -1 1 0
vn 0 0 1
usemtl Paint
f 1//1 2//1 3//1
usemtl Chrome
f 1//1 3//1 4//1
";

/// A 2x2 PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 50, 50, 255]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A small equirectangular Radiance HDR image.
pub fn hdr_bytes(width: usize, height: usize) -> Vec<u8> {
    let pixels: Vec<image::Rgb<f32>> = (0..width * height)
        .map(|i| image::Rgb([(i % width) as f32 / width as f32, 0.5, 1.0]))
        .collect();
    let mut out = Vec::new();
    image::codecs::hdr::HdrEncoder::new(&mut out).encode(&pixels, width, height).unwrap();
    out
}

pub fn fbx_reader(with_clip: bool) -> RecordingReader {
    RecordingReader::new().with("Hood/Hood1.fbx", hood_fbx(with_clip))
}

pub fn obj_reader() -> RecordingReader {
    RecordingReader::new()
        .with("Hood/Hood1_90.mtl", HOOD_MTL)
        .with("Hood/paint.png", png_bytes())
        .with("Hood/Hood1_90.obj", HOOD_OBJ)
}

pub fn missing(err: &Error) -> bool {
    matches!(err, Error::Asset(AssetError::NotFound(_)))
}
