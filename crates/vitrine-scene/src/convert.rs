//! glTF asset to core scene graph conversion

use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::mesh::{Indices, VertexAttributeValues};
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use std::collections::{HashMap, HashSet};
use vitrine_core::{DecodedScene, EulerOrder, Geometry, NodeTransform, Rotation, SceneNode};

/// GPU handles behind each decoded geometry, keyed by `Geometry::label`
#[derive(Resource, Default)]
pub struct PrimitiveHandles {
    pub entries: HashMap<String, PrimitiveEntry>,
}

#[derive(Clone)]
pub struct PrimitiveEntry {
    pub mesh: Handle<Mesh>,
    pub material: Option<Handle<StandardMaterial>>,
}

impl PrimitiveHandles {
    pub fn get(&self, label: &str) -> Option<&PrimitiveEntry> {
        self.entries.get(label)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub fn primitive_label(mesh_index: usize, primitive_index: usize) -> String {
    format!("Mesh{mesh_index}/Primitive{primitive_index}")
}

pub fn node_transform(transform: &Transform) -> NodeTransform {
    NodeTransform {
        translation: transform.translation,
        rotation: Rotation::from_quat(transform.rotation, EulerOrder::Xyz),
        scale: transform.scale,
    }
}

pub fn bevy_transform(transform: &NodeTransform) -> Transform {
    Transform {
        translation: transform.translation,
        rotation: transform.rotation.to_quat(),
        scale: transform.scale,
    }
}

/// CPU-side triangle data of a mesh; non-triangle topologies keep their
/// positions for bounds but contribute no edges
pub fn mesh_geometry(label: String, mesh: &Mesh) -> Geometry {
    let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
        Some(VertexAttributeValues::Float32x3(values)) => {
            values.iter().map(|p| Vec3::from_array(*p)).collect()
        }
        _ => Vec::new(),
    };
    let geometry = Geometry::new(label, positions);

    if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
        return geometry.with_indices(Vec::new());
    }
    match mesh.indices() {
        Some(Indices::U16(indices)) => {
            geometry.with_indices(indices.iter().map(|&i| u32::from(i)).collect())
        }
        Some(Indices::U32(indices)) => geometry.with_indices(indices.clone()),
        None => geometry,
    }
}

/// Read-only views of the glTF asset collections
pub struct GltfSources<'a> {
    pub nodes: &'a Assets<GltfNode>,
    pub gltf_meshes: &'a Assets<GltfMesh>,
    pub meshes: &'a Assets<Mesh>,
}

/// Build the scene graph of a loaded glTF, recording primitive handles
///
/// Roots are the nodes nobody lists as a child. A node with a single-primitive
/// mesh becomes a mesh node; multi-primitive meshes become a group holding
/// one mesh node per primitive.
pub fn decode_gltf(
    gltf: &Gltf,
    sources: &GltfSources,
    primitives: &mut PrimitiveHandles,
) -> DecodedScene {
    let children: HashSet<AssetId<GltfNode>> = gltf
        .nodes
        .iter()
        .filter_map(|handle| sources.nodes.get(handle))
        .flat_map(|node| node.children.iter().map(Handle::id))
        .collect();

    let mut visited = HashSet::new();
    let roots = gltf
        .nodes
        .iter()
        .filter(|handle| !children.contains(&handle.id()))
        .filter_map(|handle| convert_node(handle, sources, primitives, &mut visited))
        .collect();
    DecodedScene::new(roots)
}

fn convert_node(
    handle: &Handle<GltfNode>,
    sources: &GltfSources,
    primitives: &mut PrimitiveHandles,
    visited: &mut HashSet<AssetId<GltfNode>>,
) -> Option<SceneNode> {
    if !visited.insert(handle.id()) {
        return None;
    }
    let node = sources.nodes.get(handle)?;

    let mut mesh_nodes = node
        .mesh
        .as_ref()
        .and_then(|mesh| sources.gltf_meshes.get(mesh))
        .map(|gltf_mesh| convert_primitives(gltf_mesh, sources, primitives))
        .unwrap_or_default();

    let children: Vec<SceneNode> = node
        .children
        .iter()
        .filter_map(|child| convert_node(child, sources, primitives, visited))
        .collect();

    let converted = if mesh_nodes.len() == 1 {
        let mut mesh_node = mesh_nodes.remove(0);
        mesh_node.children = children;
        mesh_node
    } else {
        mesh_nodes.extend(children);
        SceneNode::group(mesh_nodes)
    };

    let converted = converted.with_transform(node_transform(&node.transform));
    Some(if node.name.is_empty() {
        converted
    } else {
        converted.with_name(node.name.clone())
    })
}

fn convert_primitives(
    gltf_mesh: &GltfMesh,
    sources: &GltfSources,
    primitives: &mut PrimitiveHandles,
) -> Vec<SceneNode> {
    gltf_mesh
        .primitives
        .iter()
        .filter_map(|primitive| {
            let mesh = sources.meshes.get(&primitive.mesh)?;
            let label = primitive_label(gltf_mesh.index, primitive.index);
            primitives.entries.insert(
                label.clone(),
                PrimitiveEntry {
                    mesh: primitive.mesh.clone(),
                    material: primitive.material.clone(),
                },
            );
            Some(SceneNode::mesh(mesh_geometry(label, mesh)))
        })
        .collect()
}
