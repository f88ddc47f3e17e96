//! Pointer, wheel and touch input feeding the orbit controls

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

use crate::viewport::Viewport;

/// Pixels of trackpad scroll that count as one wheel notch
const PIXELS_PER_SCROLL_STEP: f32 = 100.0;

/// Wheel movement as zoom steps; positive zooms in
pub fn scroll_steps(unit: MouseScrollUnit, delta_y: f32) -> f32 {
    match unit {
        MouseScrollUnit::Line => delta_y,
        MouseScrollUnit::Pixel => delta_y / PIXELS_PER_SCROLL_STEP,
    }
}

/// Pinch as zoom steps, matching the 0.95-per-step wheel scale
pub fn pinch_steps(previous_spread: f32, current_spread: f32) -> f32 {
    if previous_spread <= 0.0 || current_spread <= 0.0 {
        return 0.0;
    }
    (previous_spread / current_spread).ln() / 0.95_f32.ln()
}

#[allow(clippy::too_many_arguments)]
pub fn orbit_input(
    mut viewport: ResMut<Viewport>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
) {
    if viewport.controller().scene().is_none() {
        return;
    }
    // Don't orbit while the pointer is over the overlay UI
    if let Ok(ctx) = contexts.ctx_mut() {
        if ctx.wants_pointer_input() || ctx.is_pointer_over_area() {
            return;
        }
    }
    let height = windows.single().map(|w| w.height()).unwrap_or(0.0);
    let controls = viewport.controller_mut().controls_mut();

    if mouse_button.pressed(MouseButton::Left) && mouse_motion.delta != Vec2::ZERO {
        controls.drag(mouse_motion.delta.x, mouse_motion.delta.y, height);
    }
    if mouse_scroll.delta.y != 0.0 {
        controls.zoom(scroll_steps(mouse_scroll.unit, mouse_scroll.delta.y));
    }

    let active: Vec<_> = touches.iter().collect();
    match active.as_slice() {
        [touch] => {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                controls.drag(delta.x, delta.y, height);
            }
        }
        [a, b] => {
            let current = a.position().distance(b.position());
            let previous = (a.position() - a.delta()).distance(b.position() - b.delta());
            controls.zoom(pinch_steps(previous, current));
        }
        _ => {}
    }
}
