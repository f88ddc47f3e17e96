//! Vitrine Core - Engine-agnostic model viewport controller
//!
//! This crate holds everything about a model preview that does not need a GPU:
//! - Decoded scene graph and the solid/wireframe layers derived from it
//! - Bounding box, ground plane and light placement
//! - Camera framing and damped orbit controls
//! - Asset load tracking, render loop and teardown lifecycle
//! - Viewer configuration

pub mod asset;
pub mod compose;
pub mod config;
pub mod error;
pub mod framing;
pub mod graph;
pub mod host;
pub mod orbit;
pub mod render_loop;
pub mod viewport;

pub use asset::{AssetState, LoadEvent, LoadProgress, LoadTicket, LoadTracker, ModelAsset};
pub use compose::{
    compose, compose_scene, Backdrop, BoundingBox, ComposedScene, FillLight, GroundPlane, HemisphereLight,
    SolidLayer, WireframeGeometry, WireframeLayer, WireframeStyle,
};
pub use config::{load_config, save_default_config, ViewerConfig};
pub use error::ViewerError;
pub use framing::{apply_framing, Framing, FramingDecision};
pub use graph::{DecodedScene, EulerOrder, Geometry, LayerNode, NodeKind, NodeTransform, Rotation, SceneNode};
pub use host::{LoadRequest, ModelLoader, Renderer, ViewportHost};
pub use orbit::{CameraState, OrbitControls, OrbitLimits};
pub use render_loop::{FrameHandle, FrameScheduler, LoopState, RenderLoop};
pub use viewport::{ActiveLayer, LiveScene, LoadOutcome, ViewportController, ViewportState};
