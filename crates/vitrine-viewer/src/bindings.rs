//! JavaScript bindings for the host page
//!
//! Calls from the page are queued and replayed as viewport commands on the
//! next update. Observable state is published once per frame.

use std::sync::Mutex;

use bevy::prelude::*;
use vitrine_scene::{Viewport, ViewportCommand};
use wasm_bindgen::prelude::*;
use tracing::debug;

static PAGE_COMMANDS: Mutex<Vec<ViewportCommand>> = Mutex::new(Vec::new());
static STATUS: Mutex<ViewportStatus> = Mutex::new(ViewportStatus::INITIAL);

/// Last published viewport state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportStatus {
    pub load_progress: f32,
    pub is_loaded: bool,
}

impl ViewportStatus {
    const INITIAL: Self = Self {
        load_progress: 0.0,
        is_loaded: false,
    };
}

fn queue(command: ViewportCommand) {
    if let Ok(mut pending) = PAGE_COMMANDS.lock() {
        pending.push(command);
    }
}

fn drain_queued() -> Vec<ViewportCommand> {
    match PAGE_COMMANDS.lock() {
        Ok(mut pending) => std::mem::take(&mut *pending),
        Err(_) => Vec::new(),
    }
}

fn status() -> ViewportStatus {
    STATUS.lock().map(|s| *s).unwrap_or(ViewportStatus::INITIAL)
}

/// Point the viewport at a different model
#[wasm_bindgen]
pub fn set_model_url(url: String) {
    queue(ViewportCommand::SetSourceUrl(url));
}

#[wasm_bindgen]
pub fn trigger_render() {
    queue(ViewportCommand::TriggerRender);
}

#[wasm_bindgen]
pub fn toggle_wireframe() {
    queue(ViewportCommand::ToggleWireframe);
}

#[wasm_bindgen]
pub fn set_show_wireframe(show: bool) {
    queue(ViewportCommand::SetShowWireframe(show));
}

#[wasm_bindgen]
pub fn toggle_ground_plane() {
    queue(ViewportCommand::ToggleGroundPlane);
}

#[wasm_bindgen]
pub fn set_show_ground_plane(show: bool) {
    queue(ViewportCommand::SetShowGroundPlane(show));
}

/// Release the GPU resources and stop rendering
#[wasm_bindgen]
pub fn teardown() {
    queue(ViewportCommand::Teardown);
}

/// Load percentage in [0, 100]
#[wasm_bindgen]
pub fn load_progress() -> f32 {
    status().load_progress
}

#[wasm_bindgen]
pub fn is_loaded() -> bool {
    status().is_loaded
}

pub struct BindingsPlugin;

impl Plugin for BindingsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreUpdate, forward_page_commands)
            .add_systems(PostUpdate, publish_status);
    }
}

fn forward_page_commands(mut commands: MessageWriter<ViewportCommand>) {
    let queued = drain_queued();
    if !queued.is_empty() {
        debug!("Forwarding {} page command(s)", queued.len());
        commands.write_batch(queued);
    }
}

fn publish_status(viewport: Res<Viewport>) {
    let controller = viewport.controller();
    let next = ViewportStatus {
        load_progress: controller.load_progress(),
        is_loaded: controller.is_loaded(),
    };
    if let Ok(mut current) = STATUS.lock() {
        *current = next;
    }
}
