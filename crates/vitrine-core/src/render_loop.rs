//! Per-load-cycle render loop state
//!
//! The loop never sleeps or spins: each rendered frame asks the scheduler for
//! the next one, and stopping simply means not asking again.

use tracing::{debug, info};

/// Opaque id of a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Something that can call back on the next display refresh
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
    /// Terminal for this load cycle
    Disposed,
}

#[derive(Debug, Default)]
pub struct RenderLoop {
    state: LoopState,
    pending: Option<FrameHandle>,
    frames_rendered: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// `Idle -> Running`, requesting the first frame. No-op otherwise.
    pub fn start<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if self.state != LoopState::Idle {
            return false;
        }
        self.state = LoopState::Running;
        self.pending = Some(scheduler.request_frame());
        info!("Render loop started");
        true
    }

    /// Consume a fired frame. Returns false for frames that are not ours or
    /// arrive after disposal, which must not be rendered.
    pub fn accept_frame(&mut self, handle: FrameHandle) -> bool {
        if self.state != LoopState::Running || self.pending != Some(handle) {
            return false;
        }
        self.pending = None;
        self.frames_rendered += 1;
        true
    }

    pub fn schedule_next<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.state == LoopState::Running && self.pending.is_none() {
            self.pending = Some(scheduler.request_frame());
        }
    }

    /// Cancel any pending frame and enter `Disposed`. Returns whether the
    /// loop had been running.
    pub fn dispose<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_frame(handle);
        }
        let was_running = self.state == LoopState::Running;
        if self.state != LoopState::Disposed {
            debug!(frames = self.frames_rendered, "Render loop disposed");
        }
        self.state = LoopState::Disposed;
        was_running
    }
}
