//! Viewport cameras
//!
//! The main camera clears the surface and draws the solid layer. A child
//! overlay camera draws the wireframe layer with a fresh depth buffer, so
//! lines are never hidden behind surfaces, and hosts the egui context.

use bevy::camera::visibility::RenderLayers;
use bevy::prelude::*;
use bevy_egui::{EguiGlobalSettings, PrimaryEguiContext};
use vitrine_core::CameraState;

use crate::viewport::Viewport;

pub const MODEL_LAYER: usize = 0;
pub const WIREFRAME_LAYER: usize = 1;

/// Marker component for the main viewport camera
#[derive(Component)]
pub struct ViewportCamera;

/// Marker component for the wireframe/UI overlay camera
#[derive(Component)]
pub struct OverlayCamera;

pub fn camera_transform(camera: &CameraState) -> Transform {
    Transform::from_translation(camera.position).looking_at(camera.target, Vec3::Y)
}

pub fn perspective(camera: &CameraState) -> PerspectiveProjection {
    PerspectiveProjection {
        fov: camera.fov_radians(),
        near: camera.near,
        far: camera.far,
        ..default()
    }
}

/// Copy fov and clip planes into a projection, leaving the aspect ratio alone
pub fn sync_projection(projection: &mut Projection, camera: &CameraState) -> bool {
    let Projection::Perspective(p) = projection else {
        *projection = Projection::Perspective(perspective(camera));
        return true;
    };
    let fov = camera.fov_radians();
    if p.fov == fov && p.near == camera.near && p.far == camera.far {
        return false;
    }
    p.fov = fov;
    p.near = camera.near;
    p.far = camera.far;
    true
}

/// Spawn both cameras. The main camera starts detached (drawing nothing)
/// until a scene is mounted.
pub fn spawn_viewport_cameras(
    mut commands: Commands,
    viewport: Res<Viewport>,
    mut egui_settings: ResMut<EguiGlobalSettings>,
) {
    egui_settings.auto_create_primary_context = false;
    let camera = viewport.controller().camera();

    commands
        .spawn((
            Name::new("ViewportCamera"),
            ViewportCamera,
            Camera3d::default(),
            Camera {
                order: 0,
                ..default()
            },
            Projection::Perspective(perspective(camera)),
            camera_transform(camera),
            RenderLayers::none(),
        ))
        .with_children(|parent| {
            parent.spawn((
                Name::new("OverlayCamera"),
                OverlayCamera,
                PrimaryEguiContext,
                Camera3d::default(),
                Camera {
                    order: 1,
                    clear_color: ClearColorConfig::None,
                    ..default()
                },
                Projection::Perspective(perspective(camera)),
                Transform::IDENTITY,
                RenderLayers::layer(WIREFRAME_LAYER),
            ));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ViewerConfig;

    #[test]
    fn test_camera_transform_faces_target() {
        let mut camera = CameraState::from_config(&ViewerConfig::default());
        camera.target = Vec3::new(10.0, 0.0, 0.0);
        let transform = camera_transform(&camera);
        let forward = transform.forward();
        let expected = (camera.target - camera.position).normalize();
        assert!(forward.dot(expected) > 0.9999);
    }

    #[test]
    fn test_sync_projection_only_reports_changes() {
        let mut camera = CameraState::from_config(&ViewerConfig::default());
        let mut projection = Projection::Perspective(perspective(&camera));
        assert!(!sync_projection(&mut projection, &camera));

        camera.fov_degrees = 30.0;
        assert!(sync_projection(&mut projection, &camera));
        let Projection::Perspective(p) = &projection else {
            panic!("expected perspective projection");
        };
        assert!((p.fov - 30f32.to_radians()).abs() < 1e-6);
    }
}
