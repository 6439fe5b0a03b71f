use std::collections::BTreeMap;

use crate::config::prefs::RigConfig;
use crate::foundation::error::RigResult;
use crate::graph::model::{NodeId, Plug};
use crate::graph::scene::SceneGraph;

/// Marker attribute on a module output node listing the joints its slots drive.
pub const OUTPUT_JOINTS_ATTR: &str = "rigJoints";
/// Multi matrix attribute holding one output slot per joint.
pub const OUTPUT_SLOTS_ATTR: &str = "outMatrix";

/// Resolved handles to the rig-wide nodes every module attaches to.
///
/// The root module fills these in while it builds; later modules read them
/// instead of looking nodes up by name. The socket index maps a joint to the
/// output slot of the module that drives it.
#[derive(Clone, Debug)]
pub struct RigContext {
    config: RigConfig,
    root_joint: Option<NodeId>,
    root_control: Option<NodeId>,
    global_control: Option<NodeId>,
    cog: Option<NodeId>,
    modules_group: Option<NodeId>,
    slots: BTreeMap<NodeId, Plug>,
}

impl RigContext {
    /// Empty context.
    pub fn new(config: RigConfig) -> Self {
        Self {
            config,
            root_joint: None,
            root_control: None,
            global_control: None,
            cog: None,
            modules_group: None,
            slots: BTreeMap::new(),
        }
    }

    /// Context for a scene whose root module was built in an earlier pass.
    ///
    /// Rig-wide nodes are found once by their configured names and the socket
    /// index is rebuilt from the output nodes of already built modules.
    pub fn resolve(scene: &dyn SceneGraph, config: RigConfig) -> RigResult<Self> {
        let mut ctx = Self::new(config);
        ctx.root_joint = scene.find_node(&ctx.config.root_joint);
        ctx.root_control = scene.find_node(&ctx.config.root_control_name());
        ctx.global_control = scene.find_node(&ctx.config.root2_control_name());
        ctx.cog = scene.find_node(&ctx.config.cog_control_name());
        ctx.modules_group = scene.find_node(&ctx.config.module_group);

        for node in scene.nodes() {
            if !scene.has_attr(node, OUTPUT_JOINTS_ATTR) {
                continue;
            }
            let joints = scene.get_attr(&Plug::new(node, OUTPUT_JOINTS_ATTR))?;
            for (i, joint) in joints.as_nodes().unwrap_or_default().iter().enumerate() {
                if scene.exists(*joint) {
                    ctx.slots
                        .insert(*joint, Plug::new(node, OUTPUT_SLOTS_ATTR).at(i));
                }
            }
        }
        Ok(ctx)
    }

    /// Naming conventions in effect.
    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Skeleton root joint.
    pub fn root_joint(&self) -> Option<NodeId> {
        self.root_joint
    }

    /// Top-level root controller.
    pub fn root_control(&self) -> Option<NodeId> {
        self.root_control
    }

    /// Secondary root controller whose world matrix is the rig's global space.
    pub fn global_control(&self) -> Option<NodeId> {
        self.global_control
    }

    /// Centre-of-gravity controller.
    pub fn cog(&self) -> Option<NodeId> {
        self.cog
    }

    /// Group every module is nested under.
    pub fn modules_group(&self) -> Option<NodeId> {
        self.modules_group
    }

    /// World matrix plug of the global controller.
    pub fn global_plug(&self) -> Option<Plug> {
        self.global_control.map(|n| Plug::new(n, "worldMatrix"))
    }

    /// World matrix plug of the cog controller.
    pub fn cog_plug(&self) -> Option<Plug> {
        self.cog.map(|n| Plug::new(n, "worldMatrix"))
    }

    pub(crate) fn set_root_joint(&mut self, node: NodeId) {
        self.root_joint = Some(node);
    }

    pub(crate) fn set_root_controls(&mut self, root: NodeId, global: NodeId) {
        self.root_control = Some(root);
        self.global_control = Some(global);
    }

    pub(crate) fn set_cog(&mut self, node: NodeId) {
        self.cog = Some(node);
    }

    pub(crate) fn set_modules_group(&mut self, node: NodeId) {
        self.modules_group = Some(node);
    }

    /// Record that `joint` is driven by `slot`.
    pub fn register_slot(&mut self, joint: NodeId, slot: Plug) {
        self.slots.insert(joint, slot);
    }

    /// Output slot driving `joint`, if a registered module owns it.
    pub fn slot_for(&self, joint: NodeId) -> Option<&Plug> {
        self.slots.get(&joint)
    }

    /// Forget the slots of `joints`.
    pub fn release_slots(&mut self, joints: &[NodeId]) {
        for j in joints {
            self.slots.remove(j);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/rig/context.rs"]
mod tests;
