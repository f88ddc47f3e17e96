//! The viewport controller
//!
//! One [`ViewportController`] per mounted preview. It owns the camera, orbit
//! controls, load tracker and the current load cycle, and drives an engine
//! through the [`ViewportHost`] traits.
//!
//! A load cycle covers one source URL from request to teardown. Changing the
//! URL ends the cycle and starts a fresh one; tickets issued for the old
//! cycle are invalidated so their results are dropped on arrival.

use tracing::{debug, error, info, warn};

use crate::asset::{LoadEvent, LoadProgress, LoadTicket, LoadTracker, ModelAsset};
use crate::compose::{compose_scene, ComposedScene};
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::framing::{apply_framing, Framing};
use crate::host::{LoadRequest, ViewportHost};
use crate::orbit::{CameraState, OrbitControls};
use crate::render_loop::{FrameHandle, RenderLoop};

/// Flags the host page can observe and flip
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportState {
    pub is_render_triggered: bool,
    pub load_progress: LoadProgress,
    pub show_wireframe: bool,
    pub show_ground_plane: bool,
}

/// Which layer is attached to the scene root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveLayer {
    #[default]
    Solid,
    Wireframe,
}

/// A composed scene as currently presented
#[derive(Debug, Clone, PartialEq)]
pub struct LiveScene {
    composed: ComposedScene,
    active: ActiveLayer,
    plane_attached: bool,
}

impl LiveScene {
    fn new(composed: ComposedScene, state: &ViewportState) -> Self {
        let mut scene = Self {
            composed,
            active: ActiveLayer::Solid,
            plane_attached: false,
        };
        scene.show_wireframe(state.show_wireframe);
        scene.show_ground_plane(state.show_ground_plane);
        scene
    }

    pub fn composed(&self) -> &ComposedScene {
        &self.composed
    }

    pub fn active_layer(&self) -> ActiveLayer {
        self.active
    }

    pub fn is_solid_attached(&self) -> bool {
        self.active == ActiveLayer::Solid
    }

    pub fn is_wireframe_attached(&self) -> bool {
        self.active == ActiveLayer::Wireframe
    }

    /// Attached only when requested and the model has a plane at all
    pub fn is_plane_attached(&self) -> bool {
        self.plane_attached
    }

    fn show_wireframe(&mut self, show: bool) {
        self.active = if show {
            ActiveLayer::Wireframe
        } else {
            ActiveLayer::Solid
        };
    }

    fn show_ground_plane(&mut self, show: bool) {
        self.plane_attached = show && self.composed.ground_plane.is_some();
    }
}

/// Result of feeding a load event to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Progress(LoadProgress),
    /// Scene mounted and the render loop started
    Ready(Framing),
    /// Duplicate completion for an asset that is already ready
    Ignored,
}

#[derive(Debug)]
struct LoadCycle {
    asset: ModelAsset,
    ticket: Option<LoadTicket>,
    render_loop: RenderLoop,
    scene: Option<LiveScene>,
    mounted: bool,
    torn_down: bool,
}

impl LoadCycle {
    fn new(url: String) -> Self {
        Self {
            asset: ModelAsset::new(url),
            ticket: None,
            render_loop: RenderLoop::new(),
            scene: None,
            mounted: false,
            torn_down: false,
        }
    }
}

#[derive(Debug)]
pub struct ViewportController {
    config: ViewerConfig,
    tracker: LoadTracker,
    camera: CameraState,
    controls: OrbitControls,
    state: ViewportState,
    cycle: LoadCycle,
}

impl ViewportController {
    pub fn new(url: impl Into<String>, config: ViewerConfig) -> Self {
        Self {
            camera: CameraState::from_config(&config),
            controls: OrbitControls::from_config(&config),
            tracker: LoadTracker::new(),
            state: ViewportState::default(),
            cycle: LoadCycle::new(url.into()),
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn source_url(&self) -> &str {
        self.cycle.asset.url()
    }

    pub fn asset(&self) -> &ModelAsset {
        &self.cycle.asset
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn scene(&self) -> Option<&LiveScene> {
        self.cycle.scene.as_ref()
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.cycle.render_loop
    }

    /// Percentage in [0, 100]
    pub fn load_progress(&self) -> f32 {
        self.state.load_progress.percent()
    }

    pub fn is_loaded(&self) -> bool {
        !self.cycle.torn_down && self.cycle.asset.is_ready()
    }

    /// Replace the configuration. A mounted scene keeps its composition
    /// until the next load cycle; otherwise camera and controls are rebuilt
    /// right away.
    pub fn reconfigure(&mut self, config: ViewerConfig) {
        self.config = config;
        if self.cycle.scene.is_none() {
            self.camera = CameraState::from_config(&self.config);
            self.controls = OrbitControls::from_config(&self.config);
        }
        info!(deferred = self.cycle.scene.is_some(), "Viewer configuration applied");
    }

    /// User asked to see the model. Starts the decode unless one is already
    /// in flight or done, and returns the ticket of a newly started load.
    pub fn trigger_render<H: ViewportHost>(
        &mut self,
        host: &mut H,
    ) -> Result<Option<LoadTicket>, ViewerError> {
        if self.cycle.torn_down {
            return Err(ViewerError::Disposed);
        }
        self.state.is_render_triggered = true;
        Ok(self.start_load(host))
    }

    fn start_load<H: ViewportHost>(&mut self, host: &mut H) -> Option<LoadTicket> {
        if !self.cycle.asset.begin() {
            debug!(url = %self.source_url(), "Load already in flight or complete");
            return None;
        }
        let ticket = self.tracker.issue();
        self.cycle.ticket = Some(ticket);
        self.state.load_progress = LoadProgress::ZERO;
        info!(url = %self.source_url(), %ticket, "Loading model");
        host.load(LoadRequest {
            ticket,
            url: self.source_url().to_string(),
        });
        Some(ticket)
    }

    /// Apply a loader report. Results for anything but the latest ticket
    /// are rejected with [`ViewerError::StaleLoadResult`].
    pub fn handle_load_event<H: ViewportHost>(
        &mut self,
        ticket: LoadTicket,
        event: LoadEvent,
        host: &mut H,
    ) -> Result<LoadOutcome, ViewerError> {
        if !self.tracker.is_current(ticket) {
            let latest = self.tracker.latest();
            warn!(%ticket, ?latest, "Dropping stale load result");
            return Err(ViewerError::StaleLoadResult { ticket, latest });
        }

        match event {
            LoadEvent::Progress(progress) => {
                if let Some(stored) = self.cycle.asset.record_progress(progress) {
                    self.state.load_progress = stored;
                }
                Ok(LoadOutcome::Progress(self.state.load_progress))
            }
            LoadEvent::Loaded(decoded) => {
                if !self.cycle.asset.finish() {
                    return Ok(LoadOutcome::Ignored);
                }
                self.state.load_progress = LoadProgress::COMPLETE;

                let composed = compose_scene(decoded, &self.config);
                let framing = apply_framing(
                    &mut self.camera,
                    &mut self.controls,
                    &composed.bounds,
                    &self.config.framing,
                );
                let scene = LiveScene::new(composed, &self.state);
                host.mount(&scene, &self.camera);
                self.cycle.mounted = true;
                self.cycle.scene = Some(scene);
                self.cycle.render_loop.start(host);

                info!(
                    url = %self.source_url(),
                    meshes = self.cycle.scene.as_ref().map_or(0, |s| s.composed.mesh_count()),
                    distance = framing.distance,
                    "Model ready"
                );
                Ok(LoadOutcome::Ready(framing))
            }
            LoadEvent::Failed(reason) => {
                if !self.cycle.asset.fail(reason.clone()) {
                    debug!(%ticket, %reason, "Failure reported after load settled");
                    return Ok(LoadOutcome::Ignored);
                }
                let url = self.source_url().to_string();
                error!(%url, %reason, "Model load failed");
                self.cycle.ticket = None;
                self.tracker.invalidate();
                self.state.is_render_triggered = false;
                self.state.load_progress = LoadProgress::ZERO;
                Err(ViewerError::LoadFailure { url, reason })
            }
        }
    }

    /// A scheduled frame fired. Returns whether it was rendered.
    pub fn on_frame<H: ViewportHost>(&mut self, handle: FrameHandle, host: &mut H) -> bool {
        if !self.cycle.render_loop.accept_frame(handle) {
            return false;
        }
        let Some(scene) = self.cycle.scene.as_ref() else {
            return false;
        };
        self.controls.update(&mut self.camera);
        host.render(scene, &self.camera);
        self.cycle.render_loop.schedule_next(host);
        true
    }

    pub fn set_show_wireframe(&mut self, show: bool) {
        self.state.show_wireframe = show;
        if let Some(scene) = self.cycle.scene.as_mut() {
            scene.show_wireframe(show);
        }
    }

    /// Returns the new value
    pub fn toggle_wireframe(&mut self) -> bool {
        let show = !self.state.show_wireframe;
        self.set_show_wireframe(show);
        show
    }

    pub fn set_show_ground_plane(&mut self, show: bool) {
        self.state.show_ground_plane = show;
        if let Some(scene) = self.cycle.scene.as_mut() {
            scene.show_ground_plane(show);
        }
    }

    /// Returns the new value
    pub fn toggle_ground_plane(&mut self) -> bool {
        let show = !self.state.show_ground_plane;
        self.set_show_ground_plane(show);
        show
    }

    /// Switch to another model. The current cycle is torn down, camera and
    /// controls are reset, and loading starts right away if the user had
    /// already asked to render.
    pub fn set_source_url<H: ViewportHost>(
        &mut self,
        url: impl Into<String>,
        host: &mut H,
    ) -> Option<LoadTicket> {
        let url = url.into();
        if url == self.source_url() && !self.cycle.torn_down {
            return None;
        }
        info!(from = %self.source_url(), to = %url, "Model source changed");
        self.teardown(host);

        self.cycle = LoadCycle::new(url);
        self.camera = CameraState::from_config(&self.config);
        self.controls = OrbitControls::from_config(&self.config);
        self.state.load_progress = LoadProgress::ZERO;

        if self.state.is_render_triggered {
            self.start_load(host)
        } else {
            None
        }
    }

    /// Release everything held for the current cycle. Safe to call at any
    /// point and any number of times.
    pub fn teardown<H: ViewportHost>(&mut self, host: &mut H) {
        if self.cycle.torn_down {
            return;
        }
        self.cycle.torn_down = true;

        let was_running = self.cycle.render_loop.dispose(host);
        if self.cycle.mounted {
            host.dispose();
            self.cycle.mounted = false;
        }
        host.detach_surface();
        self.cycle.scene = None;
        self.state.load_progress = LoadProgress::ZERO;

        if let Some(ticket) = self.cycle.ticket.take() {
            if self.cycle.asset.is_loading() {
                host.cancel(ticket);
            }
        }
        self.tracker.invalidate();
        info!(url = %self.source_url(), was_running, "Viewport torn down");
    }
}
