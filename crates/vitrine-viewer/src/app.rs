//! Bevy application setup

use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use vitrine_core::ViewerConfig;
use vitrine_scene::ViewportPlugin;

use crate::bindings::BindingsPlugin;
use crate::page::{PagePlugin, PageParams};
use crate::ui::UiPlugin;

/// Model shown when the page does not name one
pub const DEFAULT_MODEL_URL: &str = "models/model.glb";

pub fn run() {
    let params = PageParams::from_location();
    let source_url = params
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL_URL.to_string());
    let config = ViewerConfig::default();
    let [r, g, b] = config.clear_color();

    App::new()
        .insert_resource(ClearColor(Color::srgba(r, g, b, config.renderer.clear_alpha)))
        .insert_resource(WinitSettings::default())
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Vitrine Model Viewer".to_string(),
                    canvas: Some("#model-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Model URLs are used as given
                file_path: "".to_string(),
                // Static hosts don't serve .meta files
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Must come before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(ViewportPlugin { source_url, config })
        .add_plugins(PagePlugin { params })
        .add_plugins(BindingsPlugin)
        .add_plugins(UiPlugin)
        .run();
}
