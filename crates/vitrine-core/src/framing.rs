//! Fit the camera distance to a model's size
//!
//! With a vertical field of view `fov`, a camera at distance `d` sees a slab
//! of height `2 · tan(fov/2) · d`. A model is reframed when it overflows that
//! slab or fills less than the undersize threshold of it, and the new
//! distance leaves it at `1 / margin` of the view.

use glam::Vec3;
use tracing::{debug, warn};

use crate::compose::BoundingBox;
use crate::config::FramingConfig;
use crate::error::ViewerError;
use crate::orbit::{CameraState, OrbitControls, OrbitLimits};

/// Largest model extent visible at `distance`
pub fn max_viewport_size(fov_degrees: f32, distance: f32) -> f32 {
    (2.0 * (fov_degrees.to_radians() / 2.0).tan() * distance).abs()
}

/// Distance at which `model_size · margin` exactly fills the view
pub fn framing_distance(fov_degrees: f32, model_size: f32, margin: f32) -> Result<f32, ViewerError> {
    let desired = model_size * margin;
    let distance = (desired / 2.0 / (fov_degrees.to_radians() / 2.0).tan()).abs();
    if !distance.is_finite() || distance <= 0.0 || !model_size.is_finite() || model_size <= 0.0 {
        return Err(ViewerError::DegenerateGeometry {
            model_size,
            fov_degrees,
        });
    }
    Ok(distance)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingDecision {
    /// Model already sits comfortably in view
    Unchanged,
    Oversized,
    Undersized,
    /// No usable size; the fallback distance was used
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub distance: f32,
    pub decision: FramingDecision,
    pub limits: OrbitLimits,
}

/// Decide the camera distance for a model of `model_size` seen from `current_distance`
pub fn frame_model(
    fov_degrees: f32,
    current_distance: f32,
    model_size: f32,
    limits: OrbitLimits,
    config: &FramingConfig,
) -> Framing {
    let viewport = max_viewport_size(fov_degrees, current_distance);

    let (distance, decision) = if model_size > viewport {
        reframe(fov_degrees, model_size, config, FramingDecision::Oversized)
    } else if model_size < config.undersize_threshold * viewport {
        reframe(fov_degrees, model_size, config, FramingDecision::Undersized)
    } else if current_distance.is_finite() && current_distance > 0.0 {
        (current_distance, FramingDecision::Unchanged)
    } else {
        (config.fallback_distance, FramingDecision::Degenerate)
    };

    Framing {
        distance,
        decision,
        limits: OrbitLimits {
            min_distance: limits.min_distance.min(distance),
            // Limits must always contain the framed distance
            max_distance: distance + config.max_distance_padding.max(0.0),
        },
    }
}

fn reframe(
    fov_degrees: f32,
    model_size: f32,
    config: &FramingConfig,
    decision: FramingDecision,
) -> (f32, FramingDecision) {
    match framing_distance(fov_degrees, model_size, config.margin_factor) {
        Ok(distance) => (distance, decision),
        Err(err) => {
            warn!(error = %err, fallback = config.fallback_distance, "Using fallback camera distance");
            (config.fallback_distance, FramingDecision::Degenerate)
        }
    }
}

/// Frame the camera on `bounds` and update the orbit limits to match
///
/// The camera keeps its viewing direction, moves to the framed distance from
/// the bounds center and looks at it.
pub fn apply_framing(
    camera: &mut CameraState,
    controls: &mut OrbitControls,
    bounds: &BoundingBox,
    config: &FramingConfig,
) -> Framing {
    let size = bounds.size();
    let center = if bounds.is_empty() {
        Vec3::ZERO
    } else {
        bounds.center()
    };
    let model_size = size.x.max(size.y);
    let current = camera.position.distance(center);

    let framing = frame_model(
        camera.fov_degrees,
        current,
        model_size,
        controls.limits,
        config,
    );

    camera.look_at(center);
    camera.set_distance(framing.distance);
    controls.limits = framing.limits;
    controls.stop();

    debug!(
        model_size,
        distance = framing.distance,
        decision = ?framing.decision,
        "Framed camera"
    );
    framing
}
