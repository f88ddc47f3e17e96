//! Vitrine Scene - Bevy backend for the model viewport
//!
//! This crate connects the engine-agnostic controller in `vitrine-core` to
//! Bevy: glTF loading via the asset server, spawning the solid and wireframe
//! layers, camera sync and orbit input.

pub mod camera;
pub mod convert;
pub mod host;
pub mod input;
pub mod loader;
pub mod viewport;

use bevy::prelude::*;
use vitrine_core::ViewerConfig;

/// Plugin that owns one viewport and its systems
pub struct ViewportPlugin {
    pub source_url: String,
    pub config: ViewerConfig,
}

impl Plugin for ViewportPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Viewport::new(self.source_url.clone(), self.config.clone()))
            .init_resource::<host::FrameQueue>()
            .init_resource::<host::MountedViewport>()
            .init_resource::<loader::PendingLoads>()
            .init_resource::<convert::PrimitiveHandles>()
            .add_message::<ViewportCommand>()
            .add_systems(Startup, camera::spawn_viewport_cameras)
            .add_systems(
                Update,
                (
                    viewport::apply_viewport_commands,
                    loader::poll_model_loads,
                    input::orbit_input,
                    viewport::drive_frames,
                )
                    .chain(),
            );
    }
}

// Re-export commonly used types
pub use camera::{OverlayCamera, ViewportCamera};
pub use host::{BevyHost, ViewportPart};
pub use viewport::{Viewport, ViewportCommand};
