//! Finding module roots and their chains by walking the skeleton.

use crate::config::prefs::RigConfig;
use crate::foundation::error::RigResult;
use crate::graph::model::{NodeId, NodeKind};
use crate::graph::scene::SceneGraph;
use crate::scaffold::scaffold::{MODULE_ROOT_TAG, Scaffold};

fn is_joint(scene: &dyn SceneGraph, node: NodeId) -> bool {
    scene.node_kind(node).is_ok_and(|k| k == NodeKind::Joint)
}

fn is_module_root(scene: &dyn SceneGraph, node: NodeId) -> bool {
    is_joint(scene, node) && scene.has_attr(node, MODULE_ROOT_TAG)
}

/// Joints owned by the module rooted at `root`: the root plus every descendant
/// joint that is not under a nested module root. Depth-first, parents first.
pub fn module_chain(scene: &dyn SceneGraph, root: NodeId) -> RigResult<Vec<NodeId>> {
    let mut chain = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        chain.push(node);
        let children = scene.children(node)?;
        for child in children.into_iter().rev() {
            if is_joint(scene, child) && !is_module_root(scene, child) {
                stack.push(child);
            }
        }
    }
    Ok(chain)
}

/// Every tagged module root at or below the skeleton root, parents first.
pub fn module_roots(scene: &dyn SceneGraph, config: &RigConfig) -> RigResult<Vec<NodeId>> {
    let Some(root) = scene.find_node(&config.root_joint) else {
        return Ok(Vec::new());
    };
    let mut roots = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_module_root(scene, node) {
            roots.push(node);
        }
        for child in scene.children(node)?.into_iter().rev() {
            if is_joint(scene, child) {
                stack.push(child);
            }
        }
    }
    Ok(roots)
}

/// Scaffold views for every module root whose tags can be read.
///
/// A root with an unreadable module type is skipped with a warning.
pub fn discover_scaffolds(scene: &dyn SceneGraph, config: &RigConfig) -> RigResult<Vec<Scaffold>> {
    let mut out = Vec::new();
    for node in module_roots(scene, config)? {
        let scaffold = Scaffold::from_node(scene, node)?;
        match scaffold.module_type(scene) {
            Ok(_) => out.push(scaffold),
            Err(e) => {
                tracing::warn!(
                    joint = %scene.node_name(node)?,
                    error = %e,
                    "skipping module root with unreadable tags"
                );
            }
        }
    }
    tracing::debug!(count = out.len(), "scaffolds discovered");
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/scaffold/discovery.rs"]
mod tests;
