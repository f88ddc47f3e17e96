//! Camera state and damped orbit controls
//!
//! The controls orbit a target on a Y-up sphere. Input accumulates into
//! pending deltas which [`OrbitControls::update`] applies once per frame; with
//! damping enabled the pending deltas decay instead of being cleared, which
//! is what keeps the model drifting after a drag is released.

use glam::Vec3;
use std::f32::consts::PI;

use crate::config::ViewerConfig;

const MIN_POLAR: f32 = 1e-6;
const MOTION_EPSILON: f32 = 1e-6;

/// Perspective camera parameters owned by one viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraState {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            fov_degrees: config.camera.fov_degrees,
            near: config.camera.near,
            far: config.camera.far,
            position: Vec3::from_array(config.camera.position),
            target: Vec3::ZERO,
        }
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    pub fn distance_to_target(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Unit vector from the target towards the camera, +Z if they coincide
    pub fn view_axis(&self) -> Vec3 {
        (self.position - self.target).try_normalize().unwrap_or(Vec3::Z)
    }

    /// Slide along the current viewing axis to `distance` from the target
    pub fn set_distance(&mut self, distance: f32) {
        self.position = self.target + self.view_axis() * distance;
    }

    /// Re-aim at `target`, keeping the current viewing axis and distance
    pub fn look_at(&mut self, target: Vec3) {
        let offset = self.position - self.target;
        self.target = target;
        self.position = target + offset;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitLimits {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitLimits {
    pub fn clamp(&self, distance: f32) -> f32 {
        distance.max(self.min_distance).min(self.max_distance)
    }

    pub fn contains(&self, distance: f32) -> bool {
        distance >= self.min_distance && distance <= self.max_distance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub limits: OrbitLimits,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
}

impl OrbitControls {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let controls = &config.controls;
        Self {
            limits: OrbitLimits {
                min_distance: controls.min_distance,
                max_distance: controls.max_distance,
            },
            enable_damping: controls.enable_damping,
            damping_factor: controls.damping_factor,
            rotate_speed: controls.rotate_speed,
            zoom_speed: controls.zoom_speed,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
        }
    }

    /// Rotate around the vertical axis by `angle` radians
    pub fn rotate_left(&mut self, angle: f32) {
        self.pending_theta -= angle;
    }

    /// Tilt towards the pole by `angle` radians
    pub fn rotate_up(&mut self, angle: f32) {
        self.pending_phi -= angle;
    }

    /// Pointer drag in pixels; a drag across the full viewport height is one
    /// full turn at rotate speed 1
    pub fn drag(&mut self, delta_x: f32, delta_y: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let per_pixel = 2.0 * PI * self.rotate_speed / viewport_height;
        self.rotate_left(delta_x * per_pixel);
        self.rotate_up(delta_y * per_pixel);
    }

    /// Wheel or pinch steps; positive moves closer
    pub fn zoom(&mut self, steps: f32) {
        if !steps.is_finite() {
            return;
        }
        self.pending_scale *= 0.95_f32.powf(self.zoom_speed * steps);
    }

    pub fn has_pending_motion(&self) -> bool {
        self.pending_theta.abs() > MOTION_EPSILON
            || self.pending_phi.abs() > MOTION_EPSILON
            || (self.pending_scale - 1.0).abs() > MOTION_EPSILON
    }

    /// Apply pending motion to the camera. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut CameraState) -> bool {
        let before = camera.position;
        let offset = camera.position - camera.target;
        let radius = offset.length();

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI / 2.0
        };

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.pending_theta * step;
        phi += self.pending_phi * step;
        phi = phi.clamp(MIN_POLAR, PI - MIN_POLAR);

        let radius = self.limits.clamp(radius * self.pending_scale);
        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        camera.position = camera.target + new_offset;

        if self.enable_damping {
            self.pending_theta *= 1.0 - self.damping_factor;
            self.pending_phi *= 1.0 - self.damping_factor;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
        }
        self.pending_scale = 1.0;

        camera.position.distance_squared(before) > MOTION_EPSILON
    }

    /// Drop any pending motion
    pub fn stop(&mut self) {
        self.pending_theta = 0.0;
        self.pending_phi = 0.0;
        self.pending_scale = 1.0;
    }
}
