use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{Mat4, Vec3, decompose_trs, inverse_or_identity};
use crate::graph::model::{AttrValue, NodeId, NodeKind, Plug};

/// Host scene-graph surface the rig builder drives.
///
/// Every call can fail when the referenced node or attribute does not exist. Node
/// names are unique; `create_node` and `rename` resolve clashes by appending a
/// number and return the name actually used.
pub trait SceneGraph {
    /// Create a node. The returned id is stable for the lifetime of the node.
    fn create_node(&mut self, kind: NodeKind, name: &str) -> RigResult<NodeId>;
    /// Look a node up by exact name.
    fn find_node(&self, name: &str) -> Option<NodeId>;
    /// Whether `node` is alive.
    fn exists(&self, node: NodeId) -> bool;
    /// Current name of `node`.
    fn node_name(&self, node: NodeId) -> RigResult<String>;
    /// Type of `node`.
    fn node_kind(&self, node: NodeId) -> RigResult<NodeKind>;
    /// Rename `node`, returning the (possibly suffixed) name.
    fn rename(&mut self, node: NodeId, name: &str) -> RigResult<String>;
    /// DAG parent of `node`.
    fn parent(&self, node: NodeId) -> RigResult<Option<NodeId>>;
    /// Reparent `node` keeping its local channels (`None` parents to world).
    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> RigResult<()>;
    /// Direct DAG children in creation order.
    fn children(&self, node: NodeId) -> RigResult<Vec<NodeId>>;
    /// All live nodes in creation order.
    fn nodes(&self) -> Vec<NodeId>;
    /// Delete `node`, its DAG descendants and every connection touching them.
    fn delete_node(&mut self, node: NodeId) -> RigResult<()>;

    /// Add a writable attribute.
    fn add_attr(&mut self, node: NodeId, name: &str, default: AttrValue) -> RigResult<()>;
    /// Add a writable array attribute.
    fn add_multi_attr(&mut self, node: NodeId, name: &str, default: AttrValue) -> RigResult<()>;
    /// Whether `node` has attribute `name`.
    fn has_attr(&self, node: NodeId, name: &str) -> bool;
    /// Stored (unevaluated) value of an input plug.
    fn get_attr(&self, plug: &Plug) -> RigResult<AttrValue>;
    /// Set the stored value of an input plug.
    fn set_attr(&mut self, plug: &Plug, value: AttrValue) -> RigResult<()>;
    /// Indices of an array attribute that are set or connected, ascending.
    fn multi_indices(&self, node: NodeId, attr: &str) -> RigResult<Vec<usize>>;

    /// Connect `src` into `dst`. Fails when `dst` already has a source.
    fn connect(&mut self, src: &Plug, dst: &Plug) -> RigResult<()>;
    /// Break the connection into `dst`, returning its former source.
    fn disconnect(&mut self, dst: &Plug) -> RigResult<Option<Plug>>;
    /// Source feeding `dst`, if any.
    fn source(&self, dst: &Plug) -> Option<Plug>;
    /// Connections `(src, dst)` leaving `node`.
    fn outgoing(&self, node: NodeId) -> Vec<(Plug, Plug)>;
    /// Connections `(src, dst)` entering `node`.
    fn incoming(&self, node: NodeId) -> Vec<(Plug, Plug)>;

    /// Pull-evaluate a plug through the dataflow graph.
    fn evaluate(&self, plug: &Plug) -> RigResult<AttrValue>;

    /// Evaluated world matrix of a DAG node.
    fn world_matrix(&self, node: NodeId) -> RigResult<Mat4> {
        self.evaluate_matrix(&Plug::new(node, "worldMatrix"))
    }

    /// Evaluate a plug expected to hold a matrix.
    fn evaluate_matrix(&self, plug: &Plug) -> RigResult<Mat4> {
        self.evaluate(plug)?
            .as_matrix()
            .ok_or_else(|| RigError::graph(format!("{} is not a matrix", self.describe(plug))))
    }

    /// Evaluate a plug expected to hold a scalar.
    fn evaluate_float(&self, plug: &Plug) -> RigResult<f64> {
        self.evaluate(plug)?
            .as_float()
            .ok_or_else(|| RigError::graph(format!("{} is not a scalar", self.describe(plug))))
    }

    /// Evaluate a plug expected to hold a vector.
    fn evaluate_vec3(&self, plug: &Plug) -> RigResult<Vec3> {
        self.evaluate(plug)?
            .as_vec3()
            .ok_or_else(|| RigError::graph(format!("{} is not a vector", self.describe(plug))))
    }

    /// Human-readable `name.attr` for messages.
    fn describe(&self, plug: &Plug) -> String {
        match self.node_name(plug.node) {
            Ok(n) => format!("{n}.{}", plug.path()),
            Err(_) => plug.to_string(),
        }
    }

    /// Look a node up by name, failing with a graph error.
    fn require_node(&self, name: &str) -> RigResult<NodeId> {
        self.find_node(name)
            .ok_or_else(|| RigError::graph(format!("node '{name}' does not exist")))
    }

    /// Set the local channels of `node` so its world transform equals `target_world`.
    ///
    /// Joint orient is zeroed; the offset-parent matrix is honoured.
    fn match_world(&mut self, node: NodeId, target_world: &Mat4) -> RigResult<()> {
        let inherits = self
            .get_attr(&Plug::new(node, "inheritsTransform"))?
            .as_bool()
            .unwrap_or(true);
        let parent_world = match self.parent(node)? {
            Some(p) if inherits => self.world_matrix(p)?,
            _ => Mat4::identity(),
        };
        let opm = self
            .get_attr(&Plug::new(node, "offsetParentMatrix"))?
            .as_matrix()
            .unwrap_or_else(Mat4::identity);
        let local = inverse_or_identity(&opm) * inverse_or_identity(&parent_world) * target_world;
        let trs = decompose_trs(&local);
        if self.node_kind(node)? == NodeKind::Joint {
            self.set_attr(&Plug::new(node, "jointOrient"), Vec3::zeros().into())?;
        }
        self.set_attr(&Plug::new(node, "translate"), trs.translate.into())?;
        self.set_attr(&Plug::new(node, "rotate"), trs.rotate.into())?;
        self.set_attr(&Plug::new(node, "scale"), trs.scale.into())?;
        Ok(())
    }

    /// Match `node`'s world transform to `target`'s.
    fn match_transform(&mut self, node: NodeId, target: NodeId) -> RigResult<()> {
        let world = self.world_matrix(target)?;
        self.match_world(node, &world)
    }

    /// All DAG descendants of `node`, depth-first pre-order.
    fn descendants(&self, node: NodeId) -> RigResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node)?.into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n)?.into_iter().rev());
        }
        Ok(out)
    }
}
