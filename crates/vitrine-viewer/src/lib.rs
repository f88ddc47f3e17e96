//! Vitrine Viewer - Embeddable 3D model preview
//!
//! Shows a "render" button until the user asks for the model, then loads it,
//! frames it and lets the user orbit, zoom and switch to a wireframe view.

mod app;
mod bindings;
mod page;
mod ui;

use wasm_bindgen::prelude::*;

pub use bindings::{
    is_loaded, load_progress, set_model_url, set_show_ground_plane, set_show_wireframe, teardown,
    toggle_ground_plane, toggle_wireframe, trigger_render,
};

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    app::run();
}
