//! egui overlay: render button, load progress and view toggles

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use vitrine_core::{AssetState, ViewportController};
use vitrine_scene::{Viewport, ViewportCommand};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub viewport: Res<'w, Viewport>,
    pub commands: MessageWriter<'w, ViewportCommand>,
}

/// What the overlay shows for the current controller state
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayMode {
    /// Nothing requested yet
    RenderButton,
    /// Load in flight; label is absent at 0% and 100%
    Loading { fraction: f32, label: Option<String> },
    /// Load failed, offer a retry
    Failed { error: String },
    /// Scene on screen
    Controls { show_wireframe: bool, show_ground_plane: bool },
}

impl OverlayMode {
    pub fn of(controller: &ViewportController) -> Self {
        let state = controller.state();
        if let AssetState::Failed { error } = controller.asset().state() {
            return Self::Failed { error: error.clone() };
        }
        if !state.is_render_triggered {
            return Self::RenderButton;
        }
        if controller.scene().is_some() {
            return Self::Controls {
                show_wireframe: state.show_wireframe,
                show_ground_plane: state.show_ground_plane,
            };
        }
        Self::Loading {
            fraction: state.load_progress.percent() / 100.0,
            label: state.load_progress.label(),
        }
    }
}

fn ui_system(mut params: UiParams) {
    let mode = OverlayMode::of(params.viewport.controller());
    let Ok(ctx) = params.contexts.ctx_mut() else {
        return;
    };

    match mode {
        OverlayMode::RenderButton => {
            egui::Area::new(egui::Id::new("render_button"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    if ui.button(egui::RichText::new("Render 3D model").size(18.0)).clicked() {
                        params.commands.write(ViewportCommand::TriggerRender);
                    }
                });
        }
        OverlayMode::Loading { fraction, label } => {
            // Progress bar only while there is something to report
            let Some(label) = label else {
                return;
            };
            egui::Area::new(egui::Id::new("load_progress"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.set_width(240.0);
                    ui.add(egui::ProgressBar::new(fraction).text(label));
                });
        }
        OverlayMode::Failed { error } => {
            egui::Area::new(egui::Id::new("load_failed"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.colored_label(egui::Color32::from_rgb(255, 100, 100), "Failed to load model");
                        ui.small(error);
                        if ui.button("Retry").clicked() {
                            params.commands.write(ViewportCommand::TriggerRender);
                        }
                    });
                });
        }
        OverlayMode::Controls {
            mut show_wireframe,
            mut show_ground_plane,
        } => {
            egui::Area::new(egui::Id::new("view_toggles"))
                .anchor(egui::Align2::RIGHT_TOP, [-12.0, 12.0])
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.toggle_value(&mut show_wireframe, "Wireframe").changed() {
                            params.commands.write(ViewportCommand::SetShowWireframe(show_wireframe));
                        }
                        if ui.toggle_value(&mut show_ground_plane, "Ground").changed() {
                            params.commands.write(ViewportCommand::SetShowGroundPlane(show_ground_plane));
                        }
                    });
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Vec3;
    use vitrine_core::{
        CameraState, DecodedScene, FrameHandle, FrameScheduler, Geometry, LiveScene, LoadEvent,
        LoadProgress, LoadRequest, LoadTicket, ModelLoader, Renderer, SceneNode, ViewerConfig,
    };

    #[derive(Default)]
    struct NullHost {
        next_frame: u64,
    }

    impl ModelLoader for NullHost {
        fn load(&mut self, _request: LoadRequest) {}
    }

    impl Renderer for NullHost {
        fn mount(&mut self, _scene: &LiveScene, _camera: &CameraState) {}
        fn render(&mut self, _scene: &LiveScene, _camera: &CameraState) {}
        fn dispose(&mut self) {}
        fn detach_surface(&mut self) {}
    }

    impl FrameScheduler for NullHost {
        fn request_frame(&mut self) -> FrameHandle {
            self.next_frame += 1;
            FrameHandle(self.next_frame)
        }

        fn cancel_frame(&mut self, _handle: FrameHandle) {}
    }

    fn loading(host: &mut NullHost) -> (ViewportController, LoadTicket) {
        let mut controller = ViewportController::new("models/chair.glb", ViewerConfig::default());
        let ticket = controller
            .trigger_render(host)
            .expect("fresh viewport")
            .expect("load started");
        (controller, ticket)
    }

    fn progress(controller: &mut ViewportController, ticket: LoadTicket, percent: f32, host: &mut NullHost) {
        controller
            .handle_load_event(ticket, LoadEvent::Progress(LoadProgress::from_percent(percent)), host)
            .expect("current ticket");
    }

    #[test]
    fn test_fresh_viewport_offers_render_button() {
        let controller = ViewportController::new("models/chair.glb", ViewerConfig::default());
        assert_eq!(OverlayMode::of(&controller), OverlayMode::RenderButton);
    }

    #[test]
    fn test_loading_label_hidden_at_bounds() {
        let mut host = NullHost::default();
        let (mut controller, ticket) = loading(&mut host);
        assert_eq!(
            OverlayMode::of(&controller),
            OverlayMode::Loading { fraction: 0.0, label: None }
        );

        progress(&mut controller, ticket, 40.0, &mut host);
        assert_eq!(
            OverlayMode::of(&controller),
            OverlayMode::Loading { fraction: 0.4, label: Some("40.00%".into()) }
        );

        progress(&mut controller, ticket, 100.0, &mut host);
        assert_eq!(
            OverlayMode::of(&controller),
            OverlayMode::Loading { fraction: 1.0, label: None }
        );
    }

    #[test]
    fn test_failed_load_offers_retry() {
        let mut host = NullHost::default();
        let (mut controller, ticket) = loading(&mut host);
        assert!(controller
            .handle_load_event(ticket, LoadEvent::Failed("HTTP 404".into()), &mut host)
            .is_err());
        assert_eq!(
            OverlayMode::of(&controller),
            OverlayMode::Failed { error: "HTTP 404".into() }
        );
    }

    #[test]
    fn test_loaded_scene_shows_toggles() {
        let mut host = NullHost::default();
        let (mut controller, ticket) = loading(&mut host);
        let scene = DecodedScene::new(vec![SceneNode::mesh(Geometry::new(
            "tri",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        ))]);
        controller
            .handle_load_event(ticket, LoadEvent::Loaded(scene), &mut host)
            .expect("current ticket");
        assert_eq!(
            OverlayMode::of(&controller),
            OverlayMode::Controls { show_wireframe: false, show_ground_plane: false }
        );

        controller.toggle_wireframe();
        controller.set_show_ground_plane(true);
        assert_eq!(
            OverlayMode::of(&controller),
            OverlayMode::Controls { show_wireframe: true, show_ground_plane: true }
        );
    }
}
