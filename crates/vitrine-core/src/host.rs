//! Seams between the controller and the rendering engine
//!
//! The controller never owns an engine. Every operation that needs one takes
//! a `&mut H` where `H` implements these traits, which keeps the controller
//! testable without a GPU.

use crate::asset::LoadTicket;
use crate::orbit::CameraState;
use crate::viewport::LiveScene;

pub use crate::render_loop::{FrameHandle, FrameScheduler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub url: String,
}

/// Starts asynchronous decodes. Results come back through
/// `ViewportController::handle_load_event` tagged with the request's ticket.
pub trait ModelLoader {
    fn load(&mut self, request: LoadRequest);

    /// Best effort; results for a cancelled ticket are dropped either way
    fn cancel(&mut self, _ticket: LoadTicket) {}
}

pub trait Renderer {
    /// Create GPU resources for a freshly composed scene
    fn mount(&mut self, scene: &LiveScene, camera: &CameraState);

    /// Draw one frame, honouring the scene's attached layer and plane
    fn render(&mut self, scene: &LiveScene, camera: &CameraState);

    /// Release everything created by `mount`
    fn dispose(&mut self);

    /// Remove the drawing surface from the page
    fn detach_surface(&mut self);
}

/// Everything a viewport needs from its engine
pub trait ViewportHost: ModelLoader + Renderer + FrameScheduler {}

impl<T: ModelLoader + Renderer + FrameScheduler> ViewportHost for T {}
