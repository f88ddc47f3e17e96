//! Error taxonomy for the viewport controller
//!
//! None of these are fatal to the hosting page. Load failures leave the
//! viewport in its pre-render state, degenerate geometry falls back to a fixed
//! camera distance, and stale load results are dropped.

use thiserror::Error;

use crate::asset::LoadTicket;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Failed to load model {url}: {reason}")]
    LoadFailure { url: String, reason: String },
    #[error("Degenerate geometry: model size {model_size} at fov {fov_degrees}°")]
    DegenerateGeometry { model_size: f32, fov_degrees: f32 },
    #[error("Stale load result for ticket {ticket} (latest: {latest:?})")]
    StaleLoadResult {
        ticket: LoadTicket,
        latest: Option<LoadTicket>,
    },
    #[error("Viewport has been torn down")]
    Disposed,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl ViewerError {
    /// Stale results are expected during URL changes and are never surfaced
    pub fn is_stale(&self) -> bool {
        matches!(self, ViewerError::StaleLoadResult { .. })
    }
}
