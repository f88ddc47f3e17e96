//! Viewer configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::ViewerError;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub wireframe: WireframeConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default)]
    pub ground_plane: GroundPlaneConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Initial camera position, looking at the origin
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            position: default_camera_position(),
        }
    }
}

fn default_fov() -> f32 {
    50.0
}

fn default_near() -> f32 {
    1.0
}

fn default_far() -> f32 {
    10_000.0
}

fn default_camera_position() -> [f32; 3] {
    [0.0, 0.0, 1000.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsConfig {
    #[serde(default = "default_true")]
    pub enable_damping: bool,
    /// Fraction of the pending rotation applied (and decayed) per frame
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f32,
    #[serde(default = "default_rotate_speed")]
    pub rotate_speed: f32,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: default_damping_factor(),
            rotate_speed: default_rotate_speed(),
            zoom_speed: default_zoom_speed(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_damping_factor() -> f32 {
    0.05
}

fn default_rotate_speed() -> f32 {
    0.1
}

fn default_zoom_speed() -> f32 {
    1.0
}

fn default_min_distance() -> f32 {
    50.0
}

fn default_max_distance() -> f32 {
    10_000.0
}

/// Camera framing parameters
///
/// A model is reframed when it overflows the viewport or covers less than
/// `undersize_threshold` of it. The reframed distance leaves the model at
/// `1 / margin_factor` of the viewport (80% with the default margin of 1.25).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramingConfig {
    #[serde(default = "default_undersize_threshold")]
    pub undersize_threshold: f32,
    #[serde(default = "default_margin_factor")]
    pub margin_factor: f32,
    /// Added to the framed distance to get the orbit max distance
    #[serde(default = "default_max_distance_padding")]
    pub max_distance_padding: f32,
    /// Used when the model has no measurable size
    #[serde(default = "default_fallback_distance")]
    pub fallback_distance: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            undersize_threshold: default_undersize_threshold(),
            margin_factor: default_margin_factor(),
            max_distance_padding: default_max_distance_padding(),
            fallback_distance: default_fallback_distance(),
        }
    }
}

fn default_undersize_threshold() -> f32 {
    0.8
}

fn default_margin_factor() -> f32 {
    1.25
}

fn default_max_distance_padding() -> f32 {
    1000.0
}

fn default_fallback_distance() -> f32 {
    1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireframeConfig {
    /// Accent colour as `#RRGGBB`
    #[serde(default = "default_wireframe_color")]
    pub color: String,
    #[serde(default = "default_wireframe_opacity")]
    pub opacity: f32,
}

impl Default for WireframeConfig {
    fn default() -> Self {
        Self {
            color: default_wireframe_color(),
            opacity: default_wireframe_opacity(),
        }
    }
}

fn default_wireframe_color() -> String {
    "#BA20BB".to_string()
}

fn default_wireframe_opacity() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    #[serde(default = "default_white")]
    pub hemisphere_sky: String,
    #[serde(default = "default_hemisphere_ground")]
    pub hemisphere_ground: String,
    #[serde(default = "default_hemisphere_intensity")]
    pub hemisphere_intensity: f32,
    #[serde(default = "default_white")]
    pub fill_color: String,
    #[serde(default = "default_fill_intensity")]
    pub fill_intensity: f32,
    #[serde(default = "default_fill_range")]
    pub fill_range: f32,
    /// Height of the fill light above the model's top
    #[serde(default = "default_fill_lift")]
    pub fill_lift: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            hemisphere_sky: default_white(),
            hemisphere_ground: default_hemisphere_ground(),
            hemisphere_intensity: default_hemisphere_intensity(),
            fill_color: default_white(),
            fill_intensity: default_fill_intensity(),
            fill_range: default_fill_range(),
            fill_lift: default_fill_lift(),
        }
    }
}

fn default_white() -> String {
    "#FFFFFF".to_string()
}

fn default_hemisphere_ground() -> String {
    "#808080".to_string()
}

fn default_hemisphere_intensity() -> f32 {
    1.0
}

fn default_fill_intensity() -> f32 {
    3.0
}

fn default_fill_range() -> f32 {
    100.0
}

fn default_fill_lift() -> f32 {
    50.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundPlaneConfig {
    /// Plane edge as a multiple of the model's larger horizontal extent
    #[serde(default = "default_plane_scale")]
    pub scale: f32,
    #[serde(default = "default_white")]
    pub color: String,
}

impl Default for GroundPlaneConfig {
    fn default() -> Self {
        Self {
            scale: default_plane_scale(),
            color: default_white(),
        }
    }
}

fn default_plane_scale() -> f32 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_clear_color")]
    pub clear_color: String,
    #[serde(default = "default_clear_alpha")]
    pub clear_alpha: f32,
    #[serde(default = "default_true")]
    pub shadows: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: default_clear_color(),
            clear_alpha: default_clear_alpha(),
            shadows: true,
        }
    }
}

fn default_clear_color() -> String {
    "#1F1F1F".to_string()
}

fn default_clear_alpha() -> f32 {
    0.9
}

impl ViewerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ViewerError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ViewerError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would break the framing math or the materials
    pub fn validate(&self) -> Result<(), ViewerError> {
        let fov = self.camera.fov_degrees;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(ViewerError::InvalidConfig(format!(
                "camera.fov_degrees must be within (0, 180), got {fov}"
            )));
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return Err(ViewerError::InvalidConfig(format!(
                "camera planes must satisfy 0 < near < far, got near={} far={}",
                self.camera.near, self.camera.far
            )));
        }
        let threshold = self.framing.undersize_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ViewerError::InvalidConfig(format!(
                "framing.undersize_threshold must be within (0, 1], got {threshold}"
            )));
        }
        if !(self.framing.margin_factor >= 1.0) {
            return Err(ViewerError::InvalidConfig(format!(
                "framing.margin_factor must be at least 1, got {}",
                self.framing.margin_factor
            )));
        }
        if !(self.framing.fallback_distance > 0.0 && self.framing.fallback_distance.is_finite()) {
            return Err(ViewerError::InvalidConfig(format!(
                "framing.fallback_distance must be positive, got {}",
                self.framing.fallback_distance
            )));
        }
        let padding = self.framing.max_distance_padding;
        if !(padding >= 0.0 && padding.is_finite()) {
            return Err(ViewerError::InvalidConfig(format!(
                "framing.max_distance_padding must be finite and non-negative, got {padding}"
            )));
        }
        if !(self.controls.damping_factor > 0.0 && self.controls.damping_factor <= 1.0) {
            return Err(ViewerError::InvalidConfig(format!(
                "controls.damping_factor must be within (0, 1], got {}",
                self.controls.damping_factor
            )));
        }
        if !(self.controls.min_distance >= 0.0
            && self.controls.max_distance >= self.controls.min_distance)
        {
            return Err(ViewerError::InvalidConfig(format!(
                "controls distances must satisfy 0 <= min <= max, got min={} max={}",
                self.controls.min_distance, self.controls.max_distance
            )));
        }
        if !(0.0..=1.0).contains(&self.wireframe.opacity) {
            return Err(ViewerError::InvalidConfig(format!(
                "wireframe.opacity must be within [0, 1], got {}",
                self.wireframe.opacity
            )));
        }

        for (field, value) in [
            ("wireframe.color", &self.wireframe.color),
            ("lighting.hemisphere_sky", &self.lighting.hemisphere_sky),
            ("lighting.hemisphere_ground", &self.lighting.hemisphere_ground),
            ("lighting.fill_color", &self.lighting.fill_color),
            ("ground_plane.color", &self.ground_plane.color),
            ("renderer.clear_color", &self.renderer.clear_color),
        ] {
            if parse_hex_color(value).is_none() {
                return Err(ViewerError::InvalidConfig(format!(
                    "{field} is not a #RRGGBB colour: {value:?}"
                )));
            }
        }

        Ok(())
    }

    pub fn wireframe_color(&self) -> [f32; 3] {
        parse_hex_color(&self.wireframe.color).unwrap_or([0.73, 0.125, 0.733])
    }

    pub fn clear_color(&self) -> [f32; 3] {
        parse_hex_color(&self.renderer.clear_color).unwrap_or([0.12, 0.12, 0.12])
    }
}

/// Parse `#RRGGBB` (or `RRGGBB`) into linear-agnostic 0.0-1.0 components
pub fn parse_hex_color(s: &str) -> Option<[f32; 3]> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
    ])
}

/// Load configuration from file, falling back to defaults when it is missing
pub fn load_config(path: &Path) -> Result<ViewerConfig, ViewerError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = ViewerConfig::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded viewer configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Viewer configuration not found, using defaults"
        );
        Ok(ViewerConfig::default())
    }
}

/// Save the default configuration to file, as a starting point for a
/// `config=<path>` file
pub fn save_default_config(path: &Path) -> Result<(), ViewerError> {
    let content = ViewerConfig::default().to_toml_string()?;
    std::fs::write(path, content)?;
    Ok(())
}
