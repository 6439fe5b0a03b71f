use std::collections::{BTreeMap, HashMap};

use crate::foundation::error::{RigError, RigResult};
use crate::graph::eval::Evaluator;
use crate::graph::model::{AttrValue, Attribute, NodeId, NodeKind, Plug, ValueClass};
use crate::graph::scene::SceneGraph;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One node of an [`InMemoryScene`].
pub struct NodeRecord {
    /// Stable id.
    pub id: NodeId,
    /// Unique name.
    pub name: String,
    /// Node type.
    pub kind: NodeKind,
    /// DAG parent.
    pub parent: Option<NodeId>,
    /// DAG children in creation / parenting order.
    pub children: Vec<NodeId>,
    /// Attributes by name.
    pub attrs: BTreeMap<String, Attribute>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Directed attribute connection.
pub struct Connection {
    /// Producer.
    pub src: Plug,
    /// Consumer.
    pub dst: Plug,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Mutating call recorded by an instrumented scene.
pub enum JournalEntry {
    /// A node was created.
    CreateNode {
        /// New node.
        node: NodeId,
        /// Name actually assigned.
        name: String,
    },
    /// A node (and its subtree) was deleted.
    DeleteNode {
        /// Deleted node.
        node: NodeId,
    },
    /// A connection was made.
    Connect {
        /// Producer.
        src: Plug,
        /// Consumer.
        dst: Plug,
    },
    /// A connection was broken.
    Disconnect {
        /// Consumer.
        dst: Plug,
    },
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SceneFile {
    nodes: Vec<NodeRecord>,
    connections: Vec<Connection>,
}

/// In-process scene graph used by tests and the command-line tool.
#[derive(Clone, Debug, Default)]
pub struct InMemoryScene {
    nodes: BTreeMap<NodeId, NodeRecord>,
    names: HashMap<String, NodeId>,
    connections: BTreeMap<Plug, Plug>,
    next_id: u32,
    journal: Option<Vec<JournalEntry>>,
}

impl InMemoryScene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty scene that records every mutating call.
    pub fn with_journal() -> Self {
        Self {
            journal: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Recorded calls (empty when the journal is off).
    pub fn journal(&self) -> &[JournalEntry] {
        self.journal.as_deref().unwrap_or(&[])
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All connections, ordered by destination.
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.connections.iter().map(|(dst, src)| Connection {
            src: src.clone(),
            dst: dst.clone(),
        })
    }

    /// Borrow a node record.
    pub fn record(&self, node: NodeId) -> RigResult<&NodeRecord> {
        self.nodes
            .get(&node)
            .ok_or_else(|| RigError::graph(format!("node {node} does not exist")))
    }

    fn record_mut(&mut self, node: NodeId) -> RigResult<&mut NodeRecord> {
        self.nodes
            .get_mut(&node)
            .ok_or_else(|| RigError::graph(format!("node {node} does not exist")))
    }

    pub(crate) fn attribute(&self, plug: &Plug) -> RigResult<&Attribute> {
        let rec = self.record(plug.node)?;
        rec.attrs.get(&plug.attr).ok_or_else(|| {
            RigError::graph(format!("'{}' has no attribute '{}'", rec.name, plug.attr))
        })
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> RigResult<String> {
        let file = SceneFile {
            nodes: self.nodes.values().cloned().collect(),
            connections: self.connections().collect(),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|e| RigError::Other(anyhow::anyhow!("serialize scene: {e}")))
    }

    /// Load a scene serialised with [`InMemoryScene::to_json`].
    pub fn from_json(s: &str) -> RigResult<Self> {
        let file: SceneFile = serde_json::from_str(s)
            .map_err(|e| RigError::configuration(format!("invalid scene file: {e}")))?;
        let mut scene = Self::new();
        for rec in file.nodes {
            if scene.names.insert(rec.name.clone(), rec.id).is_some() {
                return Err(RigError::configuration(format!(
                    "duplicate node name '{}' in scene file",
                    rec.name
                )));
            }
            scene.next_id = scene.next_id.max(rec.id.0 + 1);
            scene.nodes.insert(rec.id, rec);
        }
        for c in file.connections {
            scene.attribute(&c.src)?;
            scene.attribute(&c.dst)?;
            scene.connections.insert(c.dst, c.src);
        }
        Ok(scene)
    }

    fn log(&mut self, entry: JournalEntry) {
        if let Some(j) = self.journal.as_mut() {
            j.push(entry);
        }
    }

    fn unique_name(&self, wanted: &str, exclude: Option<NodeId>) -> String {
        let free = |n: &str| match self.names.get(n) {
            None => true,
            Some(id) => Some(*id) == exclude,
        };
        if free(wanted) {
            return wanted.to_string();
        }
        let base = wanted.trim_end_matches(|c: char| c.is_ascii_digit());
        (1u32..)
            .map(|i| format!("{base}{i}"))
            .find(|n| free(n))
            .unwrap_or_else(|| wanted.to_string())
    }

    fn check_plug(&self, plug: &Plug) -> RigResult<&Attribute> {
        let attr = self.attribute(plug)?;
        if plug.index.is_some() && !attr.multi {
            return Err(RigError::graph(format!(
                "{} is not an array attribute",
                self.describe(plug)
            )));
        }
        if plug.axis.is_some() && attr.default.class() != ValueClass::Vector {
            return Err(RigError::graph(format!("{} has no components", self.describe(plug))));
        }
        Ok(attr)
    }

    fn plug_class(&self, plug: &Plug) -> RigResult<ValueClass> {
        let attr = self.check_plug(plug)?;
        Ok(if plug.axis.is_some() {
            ValueClass::Scalar
        } else {
            attr.default.class()
        })
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.nodes.get(&node).and_then(|r| r.parent);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.nodes.get(&p).and_then(|r| r.parent);
        }
        false
    }
}

impl SceneGraph for InMemoryScene {
    fn create_node(&mut self, kind: NodeKind, name: &str) -> RigResult<NodeId> {
        if name.trim().is_empty() {
            return Err(RigError::graph("node name must be non-empty"));
        }
        let name = self.unique_name(name, None);
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeRecord {
                id,
                name: name.clone(),
                kind,
                parent: None,
                children: Vec::new(),
                attrs: kind.builtin_attrs(),
            },
        );
        self.names.insert(name.clone(), id);
        self.log(JournalEntry::CreateNode { node: id, name });
        Ok(id)
    }

    fn find_node(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn node_name(&self, node: NodeId) -> RigResult<String> {
        Ok(self.record(node)?.name.clone())
    }

    fn node_kind(&self, node: NodeId) -> RigResult<NodeKind> {
        Ok(self.record(node)?.kind)
    }

    fn rename(&mut self, node: NodeId, name: &str) -> RigResult<String> {
        if name.trim().is_empty() {
            return Err(RigError::graph("node name must be non-empty"));
        }
        let new_name = self.unique_name(name, Some(node));
        let rec = self.record_mut(node)?;
        let old = std::mem::replace(&mut rec.name, new_name.clone());
        self.names.remove(&old);
        self.names.insert(new_name.clone(), node);
        Ok(new_name)
    }

    fn parent(&self, node: NodeId) -> RigResult<Option<NodeId>> {
        Ok(self.record(node)?.parent)
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> RigResult<()> {
        let kind = self.record(node)?.kind;
        if !kind.is_dag() {
            return Err(RigError::graph(format!("'{}' is not a DAG node", self.record(node)?.name)));
        }
        if let Some(p) = parent {
            let pk = self.record(p)?.kind;
            if !pk.is_dag() {
                return Err(RigError::graph(format!(
                    "'{}' cannot hold children",
                    self.record(p)?.name
                )));
            }
            if p == node || self.is_ancestor(node, p) {
                return Err(RigError::graph(format!(
                    "parenting '{}' under '{}' would create a cycle",
                    self.record(node)?.name,
                    self.record(p)?.name
                )));
            }
        }
        let old = self.record(node)?.parent;
        if old == parent {
            return Ok(());
        }
        if let Some(o) = old {
            self.record_mut(o)?.children.retain(|c| *c != node);
        }
        if let Some(p) = parent {
            self.record_mut(p)?.children.push(node);
        }
        self.record_mut(node)?.parent = parent;
        Ok(())
    }

    fn children(&self, node: NodeId) -> RigResult<Vec<NodeId>> {
        Ok(self.record(node)?.children.clone())
    }

    fn nodes(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn delete_node(&mut self, node: NodeId) -> RigResult<()> {
        let mut doomed = self.descendants(node)?;
        doomed.push(node);

        if let Some(p) = self.record(node)?.parent {
            self.record_mut(p)?.children.retain(|c| *c != node);
        }
        self.connections
            .retain(|dst, src| !doomed.contains(&dst.node) && !doomed.contains(&src.node));
        for n in doomed {
            if let Some(rec) = self.nodes.remove(&n) {
                self.names.remove(&rec.name);
            }
        }
        self.log(JournalEntry::DeleteNode { node });
        Ok(())
    }

    fn add_attr(&mut self, node: NodeId, name: &str, default: AttrValue) -> RigResult<()> {
        let rec = self.record_mut(node)?;
        if rec.attrs.contains_key(name) {
            return Err(RigError::graph(format!("'{}' already has attribute '{name}'", rec.name)));
        }
        rec.attrs.insert(name.to_string(), Attribute::input(default));
        Ok(())
    }

    fn add_multi_attr(&mut self, node: NodeId, name: &str, default: AttrValue) -> RigResult<()> {
        let rec = self.record_mut(node)?;
        if rec.attrs.contains_key(name) {
            return Err(RigError::graph(format!("'{}' already has attribute '{name}'", rec.name)));
        }
        rec.attrs.insert(name.to_string(), Attribute::multi(default));
        Ok(())
    }

    fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|r| r.attrs.contains_key(name))
    }

    fn get_attr(&self, plug: &Plug) -> RigResult<AttrValue> {
        let attr = self.check_plug(plug)?;
        let value = attr.stored(plug.index);
        match (plug.axis, value) {
            (Some(a), AttrValue::Vec3(v)) => Ok(AttrValue::Float(v[a.index()])),
            _ => Ok(value.clone()),
        }
    }

    fn set_attr(&mut self, plug: &Plug, value: AttrValue) -> RigResult<()> {
        let attr = self.check_plug(plug)?;
        if attr.output {
            return Err(RigError::graph(format!(
                "{} is an output and cannot be set",
                self.describe(plug)
            )));
        }
        let template = if plug.axis.is_some() {
            AttrValue::Float(0.0)
        } else {
            attr.default.clone()
        };
        let value = value.coerce_like(&template).ok_or_else(|| {
            RigError::graph(format!("type mismatch setting {}", self.describe(plug)))
        })?;

        let rec = self.record_mut(plug.node)?;
        let Some(attr) = rec.attrs.get_mut(&plug.attr) else {
            return Err(RigError::graph(format!("attribute '{}' vanished", plug.attr)));
        };
        let slot = match plug.index {
            Some(i) => attr
                .elements
                .entry(i)
                .or_insert_with(|| attr.default.clone()),
            None => &mut attr.value,
        };
        match (plug.axis, slot) {
            (Some(a), AttrValue::Vec3(v)) => {
                v[a.index()] = value.as_float().unwrap_or_default();
            }
            (_, slot) => *slot = value,
        }
        Ok(())
    }

    fn multi_indices(&self, node: NodeId, attr: &str) -> RigResult<Vec<usize>> {
        let a = self.attribute(&Plug::new(node, attr))?;
        let mut idx: Vec<usize> = a.elements.keys().copied().collect();
        idx.extend(
            self.connections
                .keys()
                .filter(|d| d.node == node && d.attr == attr)
                .filter_map(|d| d.index),
        );
        idx.sort_unstable();
        idx.dedup();
        Ok(idx)
    }

    fn connect(&mut self, src: &Plug, dst: &Plug) -> RigResult<()> {
        let src_class = self.plug_class(src)?;
        let dst_class = self.plug_class(dst)?;
        if self.attribute(dst)?.output {
            return Err(RigError::graph(format!(
                "cannot connect into output {}",
                self.describe(dst)
            )));
        }
        if src_class != dst_class || src_class == ValueClass::Data {
            return Err(RigError::graph(format!(
                "cannot connect {} into {}: incompatible types",
                self.describe(src),
                self.describe(dst)
            )));
        }
        if let Some(existing) = self.connections.get(dst) {
            return Err(RigError::graph(format!(
                "{} is already driven by {}",
                self.describe(dst),
                self.describe(existing)
            )));
        }
        let conflict = self.connections.keys().any(|d| {
            d.node == dst.node
                && d.attr == dst.attr
                && d.index == dst.index
                && (d.axis.is_none() != dst.axis.is_none())
        });
        if conflict {
            return Err(RigError::graph(format!(
                "{} overlaps an existing whole/component connection",
                self.describe(dst)
            )));
        }
        self.connections.insert(dst.clone(), src.clone());
        self.log(JournalEntry::Connect {
            src: src.clone(),
            dst: dst.clone(),
        });
        Ok(())
    }

    fn disconnect(&mut self, dst: &Plug) -> RigResult<Option<Plug>> {
        self.check_plug(dst)?;
        let old = self.connections.remove(dst);
        if old.is_some() {
            self.log(JournalEntry::Disconnect { dst: dst.clone() });
        }
        Ok(old)
    }

    fn source(&self, dst: &Plug) -> Option<Plug> {
        self.connections.get(dst).cloned()
    }

    fn outgoing(&self, node: NodeId) -> Vec<(Plug, Plug)> {
        self.connections
            .iter()
            .filter(|(_, src)| src.node == node)
            .map(|(dst, src)| (src.clone(), dst.clone()))
            .collect()
    }

    fn incoming(&self, node: NodeId) -> Vec<(Plug, Plug)> {
        self.connections
            .iter()
            .filter(|(dst, _)| dst.node == node)
            .map(|(dst, src)| (src.clone(), dst.clone()))
            .collect()
    }

    fn evaluate(&self, plug: &Plug) -> RigResult<AttrValue> {
        self.check_plug(plug)?;
        Evaluator::new(self).value(plug)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/memory.rs"]
mod tests;
