//! Bevy implementation of the viewport host traits

use bevy::asset::RenderAssetUsages;
use bevy::camera::visibility::RenderLayers;
use bevy::ecs::system::SystemParam;
use bevy::light::NotShadowCaster;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use vitrine_core::{
    CameraState, FrameHandle, FrameScheduler, Geometry, LayerNode, LiveScene, LoadRequest,
    LoadTicket, ModelLoader, Renderer, WireframeGeometry,
};

use crate::camera::{
    camera_transform, sync_projection, OverlayCamera, ViewportCamera, MODEL_LAYER, WIREFRAME_LAYER,
};
use crate::convert::{bevy_transform, PrimitiveHandles};
use crate::loader::{InFlightLoad, PendingLoads};

/// Lumens per unit of configured fill light intensity
const FILL_LUMENS_PER_UNIT: f32 = 300_000.0;
/// Ambient brightness per unit of configured hemisphere intensity
const AMBIENT_BRIGHTNESS_PER_UNIT: f32 = 400.0;

/// Which togglable piece of the mounted scene an entity is
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportPart {
    Solid,
    Wireframe,
    GroundPlane,
}

/// Entities of the mounted scene
#[derive(Resource, Default)]
pub struct MountedViewport {
    pub root: Option<Entity>,
}

/// Frame requests; one outstanding request at a time
#[derive(Resource, Default)]
pub struct FrameQueue {
    next: u64,
    pending: Option<FrameHandle>,
}

impl FrameQueue {
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Take the request due on this frame
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

/// Everything the controller touches in the Bevy world
#[derive(SystemParam)]
pub struct BevyHost<'w, 's> {
    pub commands: Commands<'w, 's>,
    pub asset_server: Res<'w, AssetServer>,
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub materials: ResMut<'w, Assets<StandardMaterial>>,
    pub frames: ResMut<'w, FrameQueue>,
    pub loads: ResMut<'w, PendingLoads>,
    pub primitives: ResMut<'w, PrimitiveHandles>,
    pub mounted: ResMut<'w, MountedViewport>,
    pub clear_color: ResMut<'w, ClearColor>,
    pub cameras: Query<
        'w,
        's,
        (&'static mut Transform, &'static mut Projection, &'static mut RenderLayers),
        (With<ViewportCamera>, Without<OverlayCamera>),
    >,
    pub overlays: Query<'w, 's, &'static mut Projection, (With<OverlayCamera>, Without<ViewportCamera>)>,
    pub parts: Query<'w, 's, (&'static ViewportPart, &'static mut Visibility)>,
}

impl BevyHost<'_, '_> {
    fn sync_camera(&mut self, camera: &CameraState) {
        let target = camera_transform(camera);
        for (mut transform, mut projection, _) in &mut self.cameras {
            transform.set_if_neq(target);
            if sync_projection(projection.bypass_change_detection(), camera) {
                projection.set_changed();
            }
        }
        for mut projection in &mut self.overlays {
            if sync_projection(projection.bypass_change_detection(), camera) {
                projection.set_changed();
            }
        }
    }

    fn attach_surface(&mut self) {
        for (_, _, mut layers) in &mut self.cameras {
            *layers = RenderLayers::layer(MODEL_LAYER);
        }
    }

    fn spawn_layer<T>(
        &mut self,
        parent: Entity,
        node: &LayerNode<T>,
        spawn_content: &mut impl FnMut(&mut Self, &T) -> Option<(Handle<Mesh>, Handle<StandardMaterial>)>,
        layer: usize,
    ) {
        let mut entity = self.commands.spawn((
            bevy_transform(&node.transform),
            Visibility::Inherited,
        ));
        if let Some(name) = &node.name {
            entity.insert(Name::new(name.clone()));
        }
        let entity = entity.id();
        self.commands.entity(parent).add_child(entity);

        if let Some(content) = &node.content {
            if let Some((mesh, material)) = spawn_content(self, content) {
                self.commands.entity(entity).insert((
                    Mesh3d(mesh),
                    MeshMaterial3d(material),
                    RenderLayers::layer(layer),
                ));
            }
        }
        for child in &node.children {
            self.spawn_layer(entity, child, spawn_content, layer);
        }
    }

    fn solid_handles(
        &mut self,
        geometry: &Geometry,
        fallback: &Handle<StandardMaterial>,
    ) -> Option<(Handle<Mesh>, Handle<StandardMaterial>)> {
        if let Some(entry) = self.primitives.get(&geometry.label) {
            let material = entry.material.clone().unwrap_or_else(|| fallback.clone());
            return Some((entry.mesh.clone(), material));
        }
        if geometry.is_empty() {
            return None;
        }
        Some((self.meshes.add(triangle_mesh(geometry)), fallback.clone()))
    }
}

/// Plain triangle mesh for geometry that has no GPU twin yet
pub fn triangle_mesh(geometry: &Geometry) -> Mesh {
    let positions: Vec<[f32; 3]> = geometry.positions.iter().map(|p| p.to_array()).collect();
    let indices: Vec<u32> = geometry.triangles().into_iter().flatten().collect();
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_indices(bevy::mesh::Indices::U32(indices))
        .with_computed_normals()
}

/// Line-list mesh over a wireframe's segments
pub fn line_mesh(wireframe: &WireframeGeometry) -> Mesh {
    let positions: Vec<[f32; 3]> = wireframe
        .segments
        .iter()
        .flat_map(|[a, b]| [a.to_array(), b.to_array()])
        .collect();
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
}

fn srgb([r, g, b]: [f32; 3]) -> Color {
    Color::srgb(r, g, b)
}

fn visible(attached: bool) -> Visibility {
    if attached {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

impl ModelLoader for BevyHost<'_, '_> {
    fn load(&mut self, request: LoadRequest) {
        tracing::info!(url = %request.url, ticket = %request.ticket, "Requesting glTF");
        let handle = self.asset_server.load(request.url.clone());
        self.loads.in_flight = Some(InFlightLoad {
            ticket: request.ticket,
            url: request.url,
            handle,
            reported: Default::default(),
        });
    }

    fn cancel(&mut self, ticket: LoadTicket) {
        if self.loads.in_flight.as_ref().is_some_and(|load| load.ticket == ticket) {
            self.loads.in_flight = None;
        }
    }
}

impl Renderer for BevyHost<'_, '_> {
    fn mount(&mut self, scene: &LiveScene, camera: &CameraState) {
        if let Some(previous) = self.mounted.root.take() {
            self.commands.entity(previous).despawn();
        }
        let composed = scene.composed();
        let backdrop = composed.backdrop;
        let [r, g, b] = backdrop.clear_color;
        self.clear_color.0 = Color::srgba(r, g, b, backdrop.clear_alpha);

        let hemisphere = composed.hemisphere;
        let sky = Vec3::from_array(hemisphere.sky_color);
        let ground = Vec3::from_array(hemisphere.ground_color);
        self.commands.insert_resource(AmbientLight {
            color: srgb(sky.lerp(ground, 0.5).to_array()),
            brightness: hemisphere.intensity * AMBIENT_BRIGHTNESS_PER_UNIT,
            affects_lightmapped_meshes: true,
        });

        let root = self
            .commands
            .spawn((Name::new("Viewport"), Transform::default(), Visibility::default()))
            .id();

        // Solid layer
        let solid_root = self
            .commands
            .spawn((
                Name::new(composed.solid.name.clone().unwrap_or_default()),
                ViewportPart::Solid,
                Transform::default(),
                visible(scene.is_solid_attached()),
            ))
            .id();
        self.commands.entity(root).add_child(solid_root);
        let fallback = self.materials.add(StandardMaterial {
            base_color: Color::srgb(0.8, 0.8, 0.8),
            perceptual_roughness: 0.7,
            ..default()
        });
        for child in &composed.solid.children {
            self.spawn_layer(
                solid_root,
                child,
                &mut |host: &mut Self, geometry: &std::sync::Arc<Geometry>| {
                    host.solid_handles(geometry, &fallback)
                },
                MODEL_LAYER,
            );
        }

        // Wireframe layer, drawn by the overlay camera
        let style = composed.wireframe_style;
        let [r, g, b] = style.color;
        let line_material = self.materials.add(StandardMaterial {
            base_color: Color::srgba(r, g, b, style.opacity),
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            ..default()
        });
        let wire_root = self
            .commands
            .spawn((
                Name::new(composed.wireframe.name.clone().unwrap_or_default()),
                ViewportPart::Wireframe,
                Transform::default(),
                visible(scene.is_wireframe_attached()),
            ))
            .id();
        self.commands.entity(root).add_child(wire_root);
        for child in &composed.wireframe.children {
            self.spawn_layer(
                wire_root,
                child,
                &mut |host: &mut Self, wireframe: &std::sync::Arc<WireframeGeometry>| {
                    if wireframe.segments.is_empty() {
                        return None;
                    }
                    Some((host.meshes.add(line_mesh(wireframe)), line_material.clone()))
                },
                WIREFRAME_LAYER,
            );
        }

        if let Some(plane) = composed.ground_plane {
            let plane_entity = self
                .commands
                .spawn((
                    Name::new("GroundPlane"),
                    ViewportPart::GroundPlane,
                    Mesh3d(self.meshes.add(Plane3d::default().mesh().size(plane.size, plane.size))),
                    MeshMaterial3d(self.materials.add(StandardMaterial {
                        base_color: srgb(plane.color),
                        double_sided: plane.double_sided,
                        cull_mode: None,
                        perceptual_roughness: 1.0,
                        ..default()
                    })),
                    Transform::from_translation(plane.center),
                    visible(scene.is_plane_attached()),
                    NotShadowCaster,
                ))
                .id();
            self.commands.entity(root).add_child(plane_entity);
        }

        let fill = composed.fill_light;
        let light = self
            .commands
            .spawn((
                Name::new("FillLight"),
                PointLight {
                    color: srgb(fill.color),
                    intensity: fill.intensity * FILL_LUMENS_PER_UNIT,
                    range: fill.range,
                    shadows_enabled: backdrop.shadows,
                    ..default()
                },
                Transform::from_translation(fill.position),
            ))
            .id();
        self.commands.entity(root).add_child(light);

        self.mounted.root = Some(root);
        self.attach_surface();
        self.sync_camera(camera);
        tracing::info!(meshes = composed.mesh_count(), "Scene mounted");
    }

    fn render(&mut self, scene: &LiveScene, camera: &CameraState) {
        for (part, mut visibility) in &mut self.parts {
            let attached = match part {
                ViewportPart::Solid => scene.is_solid_attached(),
                ViewportPart::Wireframe => scene.is_wireframe_attached(),
                ViewportPart::GroundPlane => scene.is_plane_attached(),
            };
            visibility.set_if_neq(visible(attached));
        }
        self.sync_camera(camera);
    }

    fn dispose(&mut self) {
        if let Some(root) = self.mounted.root.take() {
            self.commands.entity(root).despawn();
        }
        self.primitives.clear();
        self.loads.retained = None;
        tracing::debug!("Scene resources released");
    }

    fn detach_surface(&mut self) {
        for (_, _, mut layers) in &mut self.cameras {
            *layers = RenderLayers::none();
        }
    }
}

impl FrameScheduler for BevyHost<'_, '_> {
    fn request_frame(&mut self) -> FrameHandle {
        self.frames.request_frame()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.frames.cancel_frame(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::mesh::VertexAttributeValues;

    #[test]
    fn test_frame_queue_single_outstanding() {
        let mut queue = FrameQueue::default();
        let first = queue.request_frame();
        queue.cancel_frame(FrameHandle(99));
        assert_eq!(queue.pending(), Some(first));
        queue.cancel_frame(first);
        assert_eq!(queue.take_due(), None);

        let second = queue.request_frame();
        assert_ne!(first, second);
        assert_eq!(queue.take_due(), Some(second));
        assert_eq!(queue.take_due(), None);
    }

    #[test]
    fn test_line_mesh_has_two_vertices_per_segment() {
        let geometry = Geometry::new("tri", vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let wireframe = WireframeGeometry::from_geometry(&geometry);
        let mesh = line_mesh(&wireframe);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::LineList);
        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("missing positions");
        };
        assert_eq!(positions.len(), 6);
    }

    #[test]
    fn test_triangle_mesh_has_normals() {
        let geometry = Geometry::new("tri", vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let mesh = triangle_mesh(&geometry);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert_eq!(mesh.indices().map(|i| i.len()), Some(3));
    }
}
