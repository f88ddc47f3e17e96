//! Scene composition: solid and wireframe layers, bounds, lights and plane
//!
//! Both layers come out of a single [`map_eligible`] traversal, so they can
//! never disagree about which nodes exist or where they sit.

use glam::{Affine3A, Vec3};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::{parse_hex_color, ViewerConfig};
use crate::graph::{map_eligible, DecodedScene, Geometry, LayerNode, SceneNode};

pub const SOLID_ROOT_NAME: &str = "ModelMeshes";
pub const WIREFRAME_ROOT_NAME: &str = "Wireframes";

/// Line segments along the unique edges of a mesh's triangles
#[derive(Debug, Clone, PartialEq)]
pub struct WireframeGeometry {
    /// Label of the geometry this was derived from
    pub source_label: String,
    pub segments: Vec<[Vec3; 2]>,
}

impl WireframeGeometry {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        let mut edges = BTreeSet::new();
        for [a, b, c] in geometry.triangles() {
            for (i, j) in [(a, b), (b, c), (c, a)] {
                if i != j {
                    edges.insert((i.min(j), i.max(j)));
                }
            }
        }
        let segments = edges
            .into_iter()
            .map(|(i, j)| [geometry.positions[i as usize], geometry.positions[j as usize]])
            .collect();
        Self {
            source_label: geometry.label.clone(),
            segments,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.segments.len()
    }
}

pub type SolidLayer = LayerNode<Arc<Geometry>>;
pub type WireframeLayer = LayerNode<Arc<WireframeGeometry>>;

/// Eligible nodes reparented under the solid root
pub fn partition_solid(roots: &[SceneNode]) -> SolidLayer {
    let children = roots
        .iter()
        .filter_map(|node| map_eligible(node, &mut |g: &Arc<Geometry>| Arc::clone(g)))
        .collect();
    LayerNode::root(SOLID_ROOT_NAME, children)
}

/// Wireframe mirror of the eligible nodes under the wireframe root
pub fn build_wireframe(roots: &[SceneNode]) -> WireframeLayer {
    let children = roots
        .iter()
        .filter_map(|node| {
            map_eligible(node, &mut |g: &Arc<Geometry>| {
                Arc::new(WireframeGeometry::from_geometry(g))
            })
        })
        .collect();
    LayerNode::root(WIREFRAME_ROOT_NAME, children)
}

/// Derive both layers in one pass over the decoded scene
pub fn compose(decoded: DecodedScene) -> (SolidLayer, WireframeLayer) {
    let (solid, wire): (Vec<_>, Vec<_>) = decoded
        .roots
        .iter()
        .filter_map(|node| {
            map_eligible(node, &mut |g: &Arc<Geometry>| {
                (Arc::clone(g), Arc::new(WireframeGeometry::from_geometry(g)))
            })
        })
        .map(LayerNode::unzip)
        .unzip();
    (
        LayerNode::root(SOLID_ROOT_NAME, solid),
        LayerNode::root(WIREFRAME_ROOT_NAME, wire),
    )
}

/// Axis-aligned bounds in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Vec3) {
        if !point.is_finite() {
            return;
        }
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Extent along each axis, zero when empty
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }
}

pub fn compute_bounding_box(solid: &SolidLayer) -> BoundingBox {
    let mut bounds = BoundingBox::EMPTY;
    solid.for_each_world(Affine3A::IDENTITY, &mut |node, world| {
        if let Some(geometry) = &node.content {
            for &p in &geometry.positions {
                bounds.expand(world.transform_point3(p));
            }
        }
    });
    bounds
}

/// Shadow-receiving quad under the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    /// Edge length of the square
    pub size: f32,
    pub center: Vec3,
    pub color: [f32; 3],
    pub receive_shadows: bool,
    pub cast_shadows: bool,
    pub double_sided: bool,
}

/// `None` when there is nothing to stand on
pub fn ground_plane(bounds: &BoundingBox, config: &ViewerConfig) -> Option<GroundPlane> {
    if bounds.is_empty() {
        return None;
    }
    let size = bounds.size();
    let center = bounds.center();
    Some(GroundPlane {
        size: config.ground_plane.scale * size.x.max(size.z),
        center: Vec3::new(center.x, center.y - size.y / 2.0, center.z),
        color: parse_hex_color(&config.ground_plane.color).unwrap_or([1.0; 3]),
        receive_shadows: true,
        cast_shadows: false,
        double_sided: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillLight {
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
    pub range: f32,
}

/// Point light above and to the side of the model, offset by its own size
pub fn fill_light(bounds: &BoundingBox, config: &ViewerConfig) -> FillLight {
    let size = bounds.size();
    let lighting = &config.lighting;
    FillLight {
        position: bounds.center() + Vec3::new(size.x, size.y + lighting.fill_lift, size.z),
        color: parse_hex_color(&lighting.fill_color).unwrap_or([1.0; 3]),
        intensity: lighting.fill_intensity,
        range: lighting.fill_range,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub intensity: f32,
}

impl HemisphereLight {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let lighting = &config.lighting;
        Self {
            sky_color: parse_hex_color(&lighting.hemisphere_sky).unwrap_or([1.0; 3]),
            ground_color: parse_hex_color(&lighting.hemisphere_ground).unwrap_or([0.5; 3]),
            intensity: lighting.hemisphere_intensity,
        }
    }
}

/// Line material parameters for the wireframe layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireframeStyle {
    pub color: [f32; 3],
    pub opacity: f32,
    pub depth_test: bool,
}

impl WireframeStyle {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            color: config.wireframe_color(),
            opacity: config.wireframe.opacity,
            depth_test: false,
        }
    }
}

/// Surface clear colour and shadow switch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backdrop {
    pub clear_color: [f32; 3],
    pub clear_alpha: f32,
    pub shadows: bool,
}

impl Backdrop {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            clear_color: config.clear_color(),
            clear_alpha: config.renderer.clear_alpha,
            shadows: config.renderer.shadows,
        }
    }
}

/// Everything the renderer needs for one loaded model
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedScene {
    pub solid: SolidLayer,
    pub wireframe: WireframeLayer,
    pub bounds: BoundingBox,
    pub ground_plane: Option<GroundPlane>,
    pub fill_light: FillLight,
    pub hemisphere: HemisphereLight,
    pub wireframe_style: WireframeStyle,
    pub backdrop: Backdrop,
}

impl ComposedScene {
    pub fn mesh_count(&self) -> usize {
        self.solid.content_count()
    }
}

pub fn compose_scene(decoded: DecodedScene, config: &ViewerConfig) -> ComposedScene {
    let (solid, wireframe) = compose(decoded);
    let bounds = compute_bounding_box(&solid);
    debug!(
        meshes = solid.content_count(),
        empty = bounds.is_empty(),
        "Composed scene"
    );
    ComposedScene {
        ground_plane: ground_plane(&bounds, config),
        fill_light: fill_light(&bounds, config),
        hemisphere: HemisphereLight::from_config(config),
        wireframe_style: WireframeStyle::from_config(config),
        backdrop: Backdrop::from_config(config),
        solid,
        wireframe,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, NodeTransform};

    fn cube(label: &str, half: f32) -> Geometry {
        let positions = vec![
            Vec3::new(-half, -half, -half),
            Vec3::new(half, -half, -half),
            Vec3::new(half, half, -half),
            Vec3::new(-half, half, -half),
            Vec3::new(-half, -half, half),
            Vec3::new(half, -half, half),
            Vec3::new(half, half, half),
            Vec3::new(-half, half, half),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 1, 2, 2, 3, 0,
            4, 5, 6, 6, 7, 4,
            0, 1, 5, 5, 4, 0,
            2, 3, 7, 7, 6, 2,
            1, 2, 6, 6, 5, 1,
            0, 3, 7, 7, 4, 0,
        ];
        Geometry::new(label, positions).with_indices(indices)
    }

    fn sample_scene() -> DecodedScene {
        DecodedScene::new(vec![
            SceneNode::mesh(cube("a", 1.0))
                .with_transform(NodeTransform::from_translation(Vec3::new(-5.0, 0.0, 0.0))),
            SceneNode::new(NodeKind::Light),
            SceneNode::group(vec![
                SceneNode::mesh(cube("b", 1.0))
                    .with_transform(NodeTransform::from_translation(Vec3::new(5.0, 0.0, 0.0))),
                SceneNode::mesh(cube("c", 0.5)),
            ]),
            SceneNode::group(Vec::new()),
        ])
    }

    #[test]
    fn test_wireframe_edges_are_unique() {
        let wire = WireframeGeometry::from_geometry(&cube("cube", 1.0));
        // 12 cube edges plus one diagonal per face
        assert_eq!(wire.edge_count(), 18);
        assert_eq!(wire.source_label, "cube");
    }

    #[test]
    fn test_layers_mirror_each_other() {
        let (solid, wire) = compose(sample_scene());
        assert_eq!(solid.name.as_deref(), Some(SOLID_ROOT_NAME));
        assert_eq!(wire.name.as_deref(), Some(WIREFRAME_ROOT_NAME));
        assert_eq!(solid.content_count(), 3);
        assert_eq!(wire.content_count(), 3);

        let mut solid_transforms = Vec::new();
        solid.for_each_world(Affine3A::IDENTITY, &mut |n, w| {
            if n.content.is_some() {
                solid_transforms.push(w);
            }
        });
        let mut wire_transforms = Vec::new();
        wire.for_each_world(Affine3A::IDENTITY, &mut |n, w| {
            if n.content.is_some() {
                wire_transforms.push(w);
            }
        });
        assert_eq!(solid_transforms, wire_transforms);
    }

    #[test]
    fn test_single_pass_matches_separate_builders() {
        let scene = sample_scene();
        let solid = partition_solid(&scene.roots);
        let wire = build_wireframe(&scene.roots);
        let (solid_once, wire_once) = compose(scene);
        assert_eq!(solid, solid_once);
        assert_eq!(wire, wire_once);
    }

    #[test]
    fn test_bounding_box_world_space() {
        let (solid, _) = compose(sample_scene());
        let bounds = compute_bounding_box(&solid);
        assert_eq!(bounds.min, Vec3::new(-6.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(6.0, 1.0, 1.0));
        assert_eq!(bounds.center(), Vec3::ZERO);
        assert_eq!(bounds.size(), Vec3::new(12.0, 2.0, 2.0));
    }

    #[test]
    fn test_empty_scene_has_empty_bounds_and_no_plane() {
        let composed = compose_scene(DecodedScene::default(), &ViewerConfig::default());
        assert!(composed.bounds.is_empty());
        assert_eq!(composed.bounds.size(), Vec3::ZERO);
        assert!(composed.ground_plane.is_none());
        assert_eq!(composed.mesh_count(), 0);
    }

    #[test]
    fn test_ground_plane_sits_under_model() {
        let bounds = BoundingBox {
            min: Vec3::new(-2.0, 1.0, -3.0),
            max: Vec3::new(2.0, 5.0, 3.0),
        };
        let plane = ground_plane(&bounds, &ViewerConfig::default()).unwrap();
        assert_eq!(plane.size, 12.0);
        assert_eq!(plane.center, Vec3::new(0.0, 1.0, 0.0));
        assert!(plane.receive_shadows);
        assert!(!plane.cast_shadows);
        assert!(plane.double_sided);
    }

    #[test]
    fn test_fill_light_offset_by_size() {
        let bounds = BoundingBox {
            min: Vec3::ZERO,
            max: Vec3::new(2.0, 4.0, 6.0),
        };
        let light = fill_light(&bounds, &ViewerConfig::default());
        assert_eq!(light.position, Vec3::new(3.0, 56.0, 9.0));
        assert_eq!(light.intensity, 3.0);
        assert_eq!(light.range, 100.0);
    }

    #[test]
    fn test_wireframe_style_defaults() {
        let style = WireframeStyle::from_config(&ViewerConfig::default());
        assert_eq!(style.opacity, 0.5);
        assert!(!style.depth_test);
    }
}
