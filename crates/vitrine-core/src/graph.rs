//! Decoded scene graph and the layer trees derived from it
//!
//! A [`DecodedScene`] is what the model loader hands over: a forest of
//! [`SceneNode`]s with glTF semantics (any node may carry a mesh and
//! children). Viewport layers are [`LayerNode`] trees produced by
//! [`map_eligible`], the one traversal shared by every layer.

use glam::{Affine3A, EulerRot, Quat, Vec3};
use std::sync::Arc;

/// Euler angle ordering, intrinsic (`Xyz` rotates about X, then Y, then Z)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EulerOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl EulerOrder {
    fn to_glam(self) -> EulerRot {
        match self {
            EulerOrder::Xyz => EulerRot::XYZ,
            EulerOrder::Xzy => EulerRot::XZY,
            EulerOrder::Yxz => EulerRot::YXZ,
            EulerOrder::Yzx => EulerRot::YZX,
            EulerOrder::Zxy => EulerRot::ZXY,
            EulerOrder::Zyx => EulerRot::ZYX,
        }
    }
}

/// Rotation as Euler angles (radians) plus their ordering
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub angles: Vec3,
    pub order: EulerOrder,
}

impl Rotation {
    pub const IDENTITY: Self = Self {
        angles: Vec3::ZERO,
        order: EulerOrder::Xyz,
    };

    pub fn new(angles: Vec3, order: EulerOrder) -> Self {
        Self { angles, order }
    }

    pub fn from_quat(quat: Quat, order: EulerOrder) -> Self {
        let (a, b, c) = quat.to_euler(order.to_glam());
        Self {
            angles: Vec3::new(a, b, c),
            order,
        }
    }

    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(
            self.order.to_glam(),
            self.angles.x,
            self.angles.y,
            self.angles.z,
        )
    }
}

/// Local transform of a node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Rotation,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl NodeTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Rotation::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(
            self.scale,
            self.rotation.to_quat(),
            self.translation,
        )
    }
}

/// Triangle geometry of one mesh primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Engine-side identifier used to find the GPU buffers again
    pub label: String,
    pub positions: Vec<Vec3>,
    /// Triangle-list indices; `None` means every three positions form a triangle
    pub indices: Option<Vec<u32>>,
}

impl Geometry {
    pub fn new(label: impl Into<String>, positions: Vec<Vec3>) -> Self {
        Self {
            label: label.into(),
            positions,
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Triangles as index triples, skipping any that reference missing vertices
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let vertex_count = self.positions.len() as u32;
        let valid = |tri: &[u32; 3]| tri.iter().all(|&i| i < vertex_count);
        match &self.indices {
            Some(indices) => indices
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .filter(valid)
                .collect(),
            None => (0..vertex_count / 3)
                .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(Arc<Geometry>),
    /// Container with no geometry of its own (glTF node without a mesh)
    Group,
    Light,
    Camera,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: NodeTransform,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn mesh(geometry: Geometry) -> Self {
        Self::new(NodeKind::Mesh(Arc::new(geometry)))
    }

    pub fn group(children: Vec<SceneNode>) -> Self {
        Self::new(NodeKind::Group).with_children(children)
    }

    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            transform: NodeTransform::IDENTITY,
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_children(mut self, children: Vec<SceneNode>) -> Self {
        self.children = children;
        self
    }

    /// Meshes, and containers that have something inside them
    pub fn is_eligible(&self) -> bool {
        match self.kind {
            NodeKind::Mesh(_) => true,
            NodeKind::Group => !self.children.is_empty(),
            NodeKind::Light | NodeKind::Camera => false,
        }
    }

    pub fn mesh_count(&self) -> usize {
        let own = usize::from(matches!(self.kind, NodeKind::Mesh(_)));
        own + self.children.iter().map(SceneNode::mesh_count).sum::<usize>()
    }
}

/// The output of a model decode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedScene {
    pub roots: Vec<SceneNode>,
}

impl DecodedScene {
    pub fn new(roots: Vec<SceneNode>) -> Self {
        Self { roots }
    }

    pub fn mesh_count(&self) -> usize {
        self.roots.iter().map(SceneNode::mesh_count).sum()
    }
}

/// A node in a derived viewport layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode<T> {
    pub name: Option<String>,
    pub transform: NodeTransform,
    pub content: Option<T>,
    pub children: Vec<LayerNode<T>>,
}

impl<T> LayerNode<T> {
    /// Untransformed wrapper node holding the given children
    pub fn root(name: impl Into<String>, children: Vec<LayerNode<T>>) -> Self {
        Self {
            name: Some(name.into()),
            transform: NodeTransform::IDENTITY,
            content: None,
            children,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.children.iter().all(LayerNode::is_empty)
    }

    /// Number of nodes carrying content in this subtree
    pub fn content_count(&self) -> usize {
        usize::from(self.content.is_some())
            + self.children.iter().map(LayerNode::content_count).sum::<usize>()
    }

    /// Visit every node depth-first together with its world transform
    pub fn for_each_world<F>(&self, parent: Affine3A, f: &mut F)
    where
        F: FnMut(&LayerNode<T>, Affine3A),
    {
        let world = parent * self.transform.to_affine();
        f(self, world);
        for child in &self.children {
            child.for_each_world(world, f);
        }
    }

    /// Contents in depth-first order
    pub fn contents(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_contents(&mut out);
        out
    }

    fn collect_contents<'a>(&'a self, out: &mut Vec<&'a T>) {
        if let Some(content) = &self.content {
            out.push(content);
        }
        for child in &self.children {
            child.collect_contents(out);
        }
    }
}

impl<A, B> LayerNode<(A, B)> {
    /// Split a tree of pairs into two structurally identical trees
    pub fn unzip(self) -> (LayerNode<A>, LayerNode<B>) {
        let (a, b) = match self.content {
            Some((a, b)) => (Some(a), Some(b)),
            None => (None, None),
        };
        let (left, right): (Vec<_>, Vec<_>) =
            self.children.into_iter().map(LayerNode::unzip).unzip();
        (
            LayerNode {
                name: self.name.clone(),
                transform: self.transform,
                content: a,
                children: left,
            },
            LayerNode {
                name: self.name,
                transform: self.transform,
                content: b,
                children: right,
            },
        )
    }
}

/// Mirror an eligible subtree, mapping every mesh through `f`
///
/// Returns `None` for nodes outside {mesh, non-empty container}. Transforms
/// and hierarchy are preserved one-to-one, so every layer derived through
/// this function lines up with every other.
pub fn map_eligible<T, F>(node: &SceneNode, f: &mut F) -> Option<LayerNode<T>>
where
    F: FnMut(&Arc<Geometry>) -> T,
{
    if !node.is_eligible() {
        return None;
    }
    let content = match &node.kind {
        NodeKind::Mesh(geometry) => Some(f(geometry)),
        _ => None,
    };
    let children = node
        .children
        .iter()
        .filter_map(|child| map_eligible(child, f))
        .collect();
    Some(LayerNode {
        name: node.name.clone(),
        transform: node.transform,
        content,
        children,
    })
}
