//! Viewport resource and the command queue that drives it

use bevy::prelude::*;
use vitrine_core::{ViewerConfig, ViewportController};

use crate::host::BevyHost;

/// The one viewport controller of this app
#[derive(Resource)]
pub struct Viewport {
    controller: ViewportController,
}

impl Viewport {
    pub fn new(source_url: impl Into<String>, config: ViewerConfig) -> Self {
        Self {
            controller: ViewportController::new(source_url, config),
        }
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewportController {
        &mut self.controller
    }
}

/// Requests from the UI or the host page
#[derive(Message, Debug, Clone, PartialEq)]
pub enum ViewportCommand {
    TriggerRender,
    ToggleWireframe,
    ToggleGroundPlane,
    SetShowWireframe(bool),
    SetShowGroundPlane(bool),
    SetSourceUrl(String),
    Reconfigure(ViewerConfig),
    Teardown,
}

pub fn apply_viewport_commands(
    mut commands: MessageReader<ViewportCommand>,
    mut viewport: ResMut<Viewport>,
    mut host: BevyHost,
) {
    for command in commands.read() {
        let controller = viewport.controller_mut();
        match command {
            ViewportCommand::TriggerRender => {
                if let Err(err) = controller.trigger_render(&mut host) {
                    tracing::warn!(%err, "Render request ignored");
                }
            }
            ViewportCommand::ToggleWireframe => {
                controller.toggle_wireframe();
            }
            ViewportCommand::ToggleGroundPlane => {
                controller.toggle_ground_plane();
            }
            ViewportCommand::SetShowWireframe(show) => controller.set_show_wireframe(*show),
            ViewportCommand::SetShowGroundPlane(show) => controller.set_show_ground_plane(*show),
            ViewportCommand::SetSourceUrl(url) => {
                controller.set_source_url(url.clone(), &mut host);
            }
            ViewportCommand::Reconfigure(config) => controller.reconfigure(config.clone()),
            ViewportCommand::Teardown => controller.teardown(&mut host),
        }
    }
}

/// Fire the frame the controller asked for, if any
pub fn drive_frames(mut viewport: ResMut<Viewport>, mut host: BevyHost) {
    let Some(handle) = host.frames.take_due() else {
        return;
    };
    viewport.controller_mut().on_frame(handle, &mut host);
}
