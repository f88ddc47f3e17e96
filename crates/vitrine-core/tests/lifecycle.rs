//! Cross-component viewport scenarios driven through a fake engine

use glam::Vec3;
use vitrine_core::{
    CameraState, DecodedScene, FrameHandle, FrameScheduler, FramingDecision, Geometry, LiveScene,
    LoadEvent, LoadOutcome, LoadProgress, LoadRequest, LoopState, ModelLoader, NodeTransform,
    Renderer, SceneNode, ViewerConfig, ViewerError, ViewportController,
};

#[derive(Default)]
struct FakeEngine {
    loads: Vec<LoadRequest>,
    cancelled_loads: usize,
    mounted: Option<usize>,
    mounts: usize,
    rendered_wireframe: Vec<bool>,
    disposals: usize,
    detaches: usize,
    next_frame: u64,
    pending_frames: Vec<FrameHandle>,
}

impl ModelLoader for FakeEngine {
    fn load(&mut self, request: LoadRequest) {
        self.loads.push(request);
    }

    fn cancel(&mut self, _ticket: vitrine_core::LoadTicket) {
        self.cancelled_loads += 1;
    }
}

impl Renderer for FakeEngine {
    fn mount(&mut self, scene: &LiveScene, _camera: &CameraState) {
        self.mounts += 1;
        self.mounted = Some(scene.composed().mesh_count());
    }

    fn render(&mut self, scene: &LiveScene, _camera: &CameraState) {
        assert!(self.mounted.is_some(), "render before mount");
        assert_ne!(scene.is_solid_attached(), scene.is_wireframe_attached());
        self.rendered_wireframe.push(scene.is_wireframe_attached());
    }

    fn dispose(&mut self) {
        self.disposals += 1;
        self.mounted = None;
    }

    fn detach_surface(&mut self) {
        self.detaches += 1;
    }
}

impl FrameScheduler for FakeEngine {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_frame += 1;
        let handle = FrameHandle(self.next_frame);
        self.pending_frames.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending_frames.retain(|h| *h != handle);
    }
}

impl FakeEngine {
    /// Fire every pending frame once, like one display refresh
    fn tick(&mut self, controller: &mut ViewportController) -> usize {
        let frames: Vec<_> = self.pending_frames.drain(..).collect();
        frames
            .into_iter()
            .filter(|handle| controller.on_frame(*handle, self))
            .count()
    }
}

fn box_mesh(label: &str, size: f32) -> Geometry {
    let h = size / 2.0;
    Geometry::new(
        label,
        vec![
            Vec3::new(-h, -h, 0.0),
            Vec3::new(h, -h, 0.0),
            Vec3::new(h, h, 0.0),
            Vec3::new(-h, h, 0.0),
        ],
    )
    .with_indices(vec![0, 1, 2, 2, 3, 0])
}

fn model(meshes: usize) -> DecodedScene {
    let children = (0..meshes)
        .map(|i| {
            SceneNode::mesh(box_mesh(&format!("mesh-{i}"), 40.0))
                .with_transform(NodeTransform::from_translation(Vec3::new(i as f32 * 50.0, 0.0, 0.0)))
        })
        .collect();
    DecodedScene::new(vec![SceneNode::group(children).with_name("root")])
}

/// Meshes directly at the top level, no grouping node
fn flat_model(meshes: usize) -> DecodedScene {
    let roots = (0..meshes)
        .map(|i| {
            SceneNode::mesh(box_mesh(&format!("flat-{i}"), 20.0))
                .with_transform(NodeTransform::from_translation(Vec3::new(0.0, i as f32 * 30.0, 0.0)))
        })
        .collect();
    DecodedScene::new(roots)
}

#[test]
fn test_full_cycle_renders_frames() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("https://cdn.example/a.glb", ViewerConfig::default());

    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    assert_eq!(engine.loads.len(), 1);
    assert_eq!(engine.loads[0].url, "https://cdn.example/a.glb");

    controller
        .handle_load_event(ticket, LoadEvent::Progress(LoadProgress::from_percent(50.0)), &mut engine)
        .unwrap();
    assert_eq!(controller.load_progress(), 50.0);

    let outcome = controller
        .handle_load_event(ticket, LoadEvent::Loaded(model(3)), &mut engine)
        .unwrap();
    let LoadOutcome::Ready(framing) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert!(framing.distance.is_finite() && framing.distance > 0.0);
    assert!(framing.limits.contains(controller.camera().distance_to_target()));
    assert_eq!(engine.mounted, Some(3));

    assert_eq!(engine.tick(&mut controller), 1);
    assert_eq!(engine.tick(&mut controller), 1);
    assert_eq!(controller.render_loop().frames_rendered(), 2);
}

#[test]
fn test_wireframe_layer_mirrors_solid() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    controller
        .handle_load_event(ticket, LoadEvent::Loaded(model(4)), &mut engine)
        .unwrap();

    let composed = controller.scene().unwrap().composed();
    assert_eq!(composed.solid.content_count(), 4);
    assert_eq!(composed.wireframe.content_count(), 4);
    let solid_group = &composed.solid.children[0];
    let wire_group = &composed.wireframe.children[0];
    for (solid, wire) in solid_group.children.iter().zip(&wire_group.children) {
        assert_eq!(solid.transform, wire.transform);
        assert_eq!(
            solid.content.as_ref().map(|g| g.label.clone()),
            wire.content.as_ref().map(|w| w.source_label.clone())
        );
    }
}

#[test]
fn test_flat_meshes_get_one_wireframe_node_each() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("flat.glb", ViewerConfig::default());
    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    controller
        .handle_load_event(ticket, LoadEvent::Loaded(flat_model(5)), &mut engine)
        .unwrap();

    let composed = controller.scene().unwrap().composed();
    assert_eq!(composed.wireframe.children.len(), 5);
    assert_eq!(composed.wireframe.content_count(), 5);
    for (solid, wire) in composed.solid.children.iter().zip(&composed.wireframe.children) {
        assert!(wire.children.is_empty());
        assert_eq!(solid.transform, wire.transform);
        assert_eq!(
            solid.content.as_ref().map(|g| g.label.clone()),
            wire.content.as_ref().map(|w| w.source_label.clone())
        );
    }
}

#[test]
fn test_wireframe_toggle_round_trips() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    controller
        .handle_load_event(ticket, LoadEvent::Loaded(model(1)), &mut engine)
        .unwrap();

    engine.tick(&mut controller);
    assert!(controller.toggle_wireframe());
    engine.tick(&mut controller);
    assert!(!controller.toggle_wireframe());
    engine.tick(&mut controller);

    assert_eq!(engine.rendered_wireframe, vec![false, true, false]);
    assert!(controller.scene().unwrap().is_solid_attached());
}

#[test]
fn test_ground_plane_persists_across_toggles() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    controller
        .handle_load_event(ticket, LoadEvent::Loaded(model(2)), &mut engine)
        .unwrap();

    let plane = controller.scene().unwrap().composed().ground_plane;
    assert!(plane.is_some());
    assert!(controller.toggle_ground_plane());
    assert!(controller.scene().unwrap().is_plane_attached());
    assert!(!controller.toggle_ground_plane());
    assert!(!controller.scene().unwrap().is_plane_attached());
    assert_eq!(controller.scene().unwrap().composed().ground_plane, plane);
    assert_eq!(engine.mounts, 1);
}

#[test]
fn test_empty_model_uses_fallback_distance() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("empty.glb", ViewerConfig::default());
    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    let outcome = controller
        .handle_load_event(ticket, LoadEvent::Loaded(DecodedScene::default()), &mut engine)
        .unwrap();

    let LoadOutcome::Ready(framing) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(framing.decision, FramingDecision::Degenerate);
    assert_eq!(framing.distance, 1000.0);
    assert!(controller.scene().unwrap().composed().bounds.is_empty());
    assert_eq!(engine.tick(&mut controller), 1);
}

#[test]
fn test_stale_result_after_url_change_is_dropped() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    let ticket_a = controller.trigger_render(&mut engine).unwrap().unwrap();

    let ticket_b = controller.set_source_url("b.glb", &mut engine).unwrap();
    assert_ne!(ticket_a, ticket_b);
    assert_eq!(engine.loads.last().map(|r| r.url.as_str()), Some("b.glb"));
    assert_eq!(engine.cancelled_loads, 1);

    let err = controller
        .handle_load_event(ticket_a, LoadEvent::Loaded(model(5)), &mut engine)
        .unwrap_err();
    assert!(err.is_stale());
    assert!(controller.scene().is_none());
    assert_eq!(engine.mounts, 0);

    controller
        .handle_load_event(ticket_b, LoadEvent::Loaded(model(2)), &mut engine)
        .unwrap();
    assert_eq!(engine.mounted, Some(2));
    assert_eq!(controller.source_url(), "b.glb");
}

#[test]
fn test_url_change_after_load_disposes_previous_scene() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    controller
        .handle_load_event(ticket, LoadEvent::Loaded(model(1)), &mut engine)
        .unwrap();
    engine.tick(&mut controller);

    controller.set_source_url("b.glb", &mut engine);
    assert_eq!(engine.disposals, 1);
    assert!(engine.pending_frames.is_empty());
    assert!(!controller.is_loaded());
    assert_eq!(controller.load_progress(), 0.0);
    assert_eq!(controller.camera().distance_to_target(), 1000.0);
}

#[test]
fn test_url_change_before_trigger_does_not_load() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    assert!(controller.set_source_url("b.glb", &mut engine).is_none());
    assert!(engine.loads.is_empty());
    assert!(controller.trigger_render(&mut engine).unwrap().is_some());
    assert_eq!(engine.loads[0].url, "b.glb");
}

#[test]
fn test_teardown_before_render() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    controller.teardown(&mut engine);
    controller.teardown(&mut engine);

    assert!(engine.pending_frames.is_empty());
    assert_eq!(engine.disposals, 0);
    assert_eq!(engine.detaches, 1);
    assert_eq!(controller.render_loop().state(), LoopState::Disposed);
}

#[test]
fn test_teardown_stops_frames() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    let ticket = controller.trigger_render(&mut engine).unwrap().unwrap();
    controller
        .handle_load_event(ticket, LoadEvent::Loaded(model(1)), &mut engine)
        .unwrap();
    let pending = controller.render_loop().pending_frame().unwrap();

    controller.teardown(&mut engine);
    assert!(engine.pending_frames.is_empty());
    assert!(!controller.on_frame(pending, &mut engine));
    assert!(engine.rendered_wireframe.is_empty());
    assert_eq!(engine.disposals, 1);
}

#[test]
fn test_failure_then_retry() {
    let mut engine = FakeEngine::default();
    let mut controller = ViewportController::new("a.glb", ViewerConfig::default());
    let first = controller.trigger_render(&mut engine).unwrap().unwrap();
    controller
        .handle_load_event(first, LoadEvent::Progress(LoadProgress::from_percent(30.0)), &mut engine)
        .unwrap();

    let err = controller
        .handle_load_event(first, LoadEvent::Failed("404 Not Found".into()), &mut engine)
        .unwrap_err();
    assert!(matches!(err, ViewerError::LoadFailure { ref url, .. } if url == "a.glb"));
    assert!(!controller.state().is_render_triggered);
    assert_eq!(controller.load_progress(), 0.0);
    assert!(controller.scene().is_none());

    let second = controller.trigger_render(&mut engine).unwrap().unwrap();
    assert_ne!(first, second);
    assert!(controller
        .handle_load_event(first, LoadEvent::Loaded(model(1)), &mut engine)
        .unwrap_err()
        .is_stale());
    controller
        .handle_load_event(second, LoadEvent::Loaded(model(1)), &mut engine)
        .unwrap();
    assert!(controller.is_loaded());
}
