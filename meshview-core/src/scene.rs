//! Scene graph
//!
//! Nodes live in an arena owned by [`SceneGraph`] and are addressed by
//! generational [`NodeId`] handles. Each node owns its local transform, an
//! optional mesh and its animation rules; world matrices are cached and only
//! valid after an update pass.

use std::fmt;

use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::SceneError;
use crate::geometry::Mesh;
use crate::stats::{stats, MeshStats};
use crate::transform::{EulerRotation, LocalTransform};

/// Handle to a node; a handle to a removed node never aliases a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Caller-supplied clock reading for one animation step, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub delta: f32,
    pub elapsed: f32,
}

impl FrameTime {
    pub fn new(delta: f32, elapsed: f32) -> Self {
        Self { delta, elapsed }
    }
}

/// Per-node animation applied to the local transform on each [`SceneGraph::advance`]
pub trait AnimationRule: fmt::Debug + Send + Sync {
    fn apply(&self, local: &mut LocalTransform, time: FrameTime);
}

/// Constant angular velocity in radians per second
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub rate: EulerRotation,
}

impl Spin {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            rate: EulerRotation::new(x, y, z),
        }
    }
}

impl AnimationRule for Spin {
    fn apply(&self, local: &mut LocalTransform, time: FrameTime) {
        local.rotation.rotate(
            self.rate.x * time.delta,
            self.rate.y * time.delta,
            self.rate.z * time.delta,
        );
    }
}

/// Circles the parent in the XY plane: `x = sin(t)·r`, `y = cos(t)·r`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub radius: f32,
    pub speed: f32,
}

impl AnimationRule for Orbit {
    fn apply(&self, local: &mut LocalTransform, time: FrameTime) {
        let t = time.elapsed * self.speed;
        local.translation.x = t.sin() * self.radius;
        local.translation.y = t.cos() * self.radius;
    }
}

/// Uniform scale oscillating around 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub amplitude: f32,
    pub speed: f32,
}

impl AnimationRule for Pulse {
    fn apply(&self, local: &mut LocalTransform, time: FrameTime) {
        let s = 1.0 + (time.elapsed * self.speed).sin() * self.amplitude;
        local.scale = Vector3::repeat(s);
    }
}

#[derive(Debug)]
pub struct SceneNode {
    name: String,
    local: LocalTransform,
    world: Matrix4<f32>,
    /// World matrix is out of date with the local transforms above it
    stale: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mesh: Option<Mesh>,
    animations: Vec<Box<dyn AnimationRule>>,
}

impl SceneNode {
    fn new(name: String, mesh: Option<Mesh>) -> Self {
        Self {
            name,
            local: LocalTransform::identity(),
            world: Matrix4::identity(),
            stale: true,
            parent: None,
            children: Vec::new(),
            mesh,
            animations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_transform(&self) -> &LocalTransform {
        &self.local
    }

    /// Cached world matrix, valid when the node is not stale
    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<SceneNode>,
}

/// Tree of transform nodes composing local transforms into world transforms
#[derive(Debug, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    len: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root node with an identity transform
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(SceneNode::new(name.into(), None))
    }

    pub fn create_mesh_node(&mut self, name: impl Into<String>, mesh: Mesh) -> NodeId {
        self.insert(SceneNode::new(name.into(), Some(mesh)))
    }

    fn insert(&mut self, node: SceneNode) -> NodeId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        self.roots.push(id);
        self.len += 1;
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn get(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.node(id).ok_or(SceneError::MissingNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.node_mut(id).ok_or(SceneError::MissingNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nodes without a parent, in creation order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.get(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(&self.get(id)?.children)
    }

    /// Whether `ancestor` lies on the parent chain of `id` (a node is not its own ancestor)
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).and_then(|n| n.parent);
        }
        false
    }

    /// Append `child` to the children of `parent`, detaching it from any previous parent
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.get(parent)?;
        self.get(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }

        self.unlink(child);
        self.get_mut(parent)?.children.push(child);
        self.get_mut(child)?.parent = Some(parent);
        self.mark_stale(child);
        Ok(())
    }

    /// Make `id` a root again
    pub fn detach(&mut self, id: NodeId) -> Result<(), SceneError> {
        if self.get(id)?.parent.is_some() {
            self.unlink(id);
            self.roots.push(id);
            self.mark_stale(id);
        }
        Ok(())
    }

    /// Remove `id` from its parent's children or from the root list
    fn unlink(&mut self, id: NodeId) {
        match self.node_mut(id).and_then(|n| n.parent.take()) {
            Some(parent) => {
                if let Some(parent) = self.node_mut(parent) {
                    parent.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
    }

    /// Destroy a node and everything below it, returning how many nodes were removed
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<usize, SceneError> {
        let mut doomed = self.descendants(id)?;
        doomed.push(id);
        self.unlink(id);

        for node in &doomed {
            let slot = &mut self.slots[node.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
        self.len -= doomed.len();
        log::debug!("removed {} nodes under {}", doomed.len(), id);
        Ok(doomed.len())
    }

    /// All nodes below `id` in depth-first pre-order
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, SceneError> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.get(id)?.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            if let Some(node) = self.node(next) {
                stack.extend(node.children.iter().rev());
            }
        }
        Ok(result)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter().find(|(_, node)| node.name == name).map(|(id, _)| id)
    }

    fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    pub fn local_transform(&self, id: NodeId) -> Result<&LocalTransform, SceneError> {
        Ok(&self.get(id)?.local)
    }

    /// Overwrite the local transform; the node and its subtree become stale
    pub fn set_local_transform(
        &mut self,
        id: NodeId,
        transform: LocalTransform,
    ) -> Result<(), SceneError> {
        self.get_mut(id)?.local = transform;
        self.mark_stale(id);
        Ok(())
    }

    pub fn set_uniform_scale(&mut self, id: NodeId, scale: f32) -> Result<(), SceneError> {
        let local = self.get(id)?.local.with_uniform_scale(scale);
        self.set_local_transform(id, local)
    }

    /// Attach a mesh, returning the one it replaces
    pub fn set_mesh(&mut self, id: NodeId, mesh: Mesh) -> Result<Option<Mesh>, SceneError> {
        Ok(self.get_mut(id)?.mesh.replace(mesh))
    }

    pub fn take_mesh(&mut self, id: NodeId) -> Result<Option<Mesh>, SceneError> {
        Ok(self.get_mut(id)?.mesh.take())
    }

    pub fn attach_animation(
        &mut self,
        id: NodeId,
        rule: Box<dyn AnimationRule>,
    ) -> Result<(), SceneError> {
        self.get_mut(id)?.animations.push(rule);
        Ok(())
    }

    fn mark_stale(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.node_mut(next) {
                node.stale = true;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    pub fn is_stale(&self, id: NodeId) -> Result<bool, SceneError> {
        Ok(self.get(id)?.stale)
    }

    /// Recompute world matrices top-down from `root`, given the world matrix of its parent
    pub fn update_world_transforms(
        &mut self,
        root: NodeId,
        parent_world: &Matrix4<f32>,
    ) -> Result<(), SceneError> {
        self.get(root)?;
        self.update_subtree(root, *parent_world);
        Ok(())
    }

    /// Pre-order pass over an explicit stack; depth is unbounded
    fn update_subtree(&mut self, root: NodeId, parent_world: Matrix4<f32>) {
        let mut stack = vec![(root, parent_world)];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            node.world = parent_world * node.local.matrix();
            node.stale = false;
            let world = node.world;
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
            log::trace!("updated world transform of {}", id);
        }
    }

    /// Run the update pass from every root
    pub fn update_all(&mut self) {
        let roots = self.roots.clone();
        for root in roots {
            self.update_subtree(root, Matrix4::identity());
        }
    }

    /// Apply every attached animation rule, then refresh world matrices
    pub fn advance(&mut self, time: FrameTime) {
        for slot in &mut self.slots {
            if let Some(node) = slot.node.as_mut() {
                for rule in &node.animations {
                    rule.apply(&mut node.local, time);
                }
            }
        }
        self.update_all();
    }

    pub fn world_matrix(&self, id: NodeId) -> Result<&Matrix4<f32>, SceneError> {
        Ok(&self.get(id)?.world)
    }

    pub fn world_position(&self, id: NodeId) -> Result<Point3<f32>, SceneError> {
        Ok(self.get(id)?.world.transform_point(&Point3::origin()))
    }

    /// Every mesh payload with its node and world matrix
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh, &Matrix4<f32>)> {
        self.iter()
            .filter_map(|(id, node)| node.mesh.as_ref().map(|mesh| (id, mesh, &node.world)))
    }

    /// Summed statistics of every mesh in the graph
    pub fn stats(&self) -> MeshStats {
        self.meshes().map(|(_, mesh, _)| stats(mesh)).sum()
    }
}
