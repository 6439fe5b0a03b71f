//! The rig root: global controllers, the modules group and the cog.
//!
//! Built on its own before every other module, since their registration reads
//! the handles it stores in the [`RigContext`].

use crate::config::prefs::{RigConfig, RigNode};
use crate::config::shapes::shape_points;
use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{Axis, Vec3};
use crate::graph::model::{AttrValue, NodeId, NodeKind, Plug};
use crate::graph::ops::SkipAxes;
use crate::graph::scene::SceneGraph;
use crate::module::base::ModuleBase;
use crate::module::lifecycle::Module;
use crate::module::registry::ModuleType;
use crate::rig::context::{OUTPUT_JOINTS_ATTR, RigContext};
use crate::rig::controller::{
    Controller, ControllerOptions, make_controller, scale_shape, set_override_colour,
};
use crate::scaffold::scaffold::MODULE_ROOT_TAG;

/// Marker attribute on the group that holds every module group.
pub const MODULES_GROUP_TAG: &str = "rigModules";

const ROOT_SIZE: f64 = 45.0;
const ROOT2_SIZE: f64 = 10.2;
const COG_SIZE: f64 = 5.0;

/// Root module bound to the skeleton root scaffold.
#[derive(Clone, Debug)]
pub struct RootModule {
    base: ModuleBase,
}

impl RootModule {
    /// Wrap a base; the root drives scale as well.
    pub fn new(mut base: ModuleBase) -> Self {
        base.joint_skip = SkipAxes::none();
        Self { base }
    }

    fn root_controls(&self) -> RigResult<(&Controller, &Controller)> {
        match self.base.controllers.as_slice() {
            [god, god2, ..] => Ok((god, god2)),
            _ => Err(RigError::structural(&self.base.name, "root controllers were not created")),
        }
    }

    /// Walk the rig tree, reusing nodes that already exist by name.
    fn safe_create(
        &mut self,
        scene: &mut dyn SceneGraph,
        ctx: &mut RigContext,
        tree: &RigNode,
        socket: Option<NodeId>,
    ) -> RigResult<()> {
        let config = ctx.config().clone();
        let next = if tree.component == config.root_control {
            let (god, god2) = ensure_root_controls(scene, &config)?;
            if socket.is_some() {
                scene.set_parent(god, socket)?;
            }
            ctx.set_root_controls(god, god2);
            self.base
                .controllers
                .push(Controller::bare(config.root_control.clone(), god));
            self.base
                .controllers
                .push(Controller::bare(config.root2_control.clone(), god2));
            god
        } else {
            let node = match scene.find_node(&tree.component) {
                Some(n) => n,
                None => scene.create_node(NodeKind::Transform, &tree.component)?,
            };
            if socket.is_some() && scene.parent(node)? != socket {
                scene.set_parent(node, socket)?;
            }
            if scene.node_kind(node)? == NodeKind::Transform {
                scene.set_attr(&Plug::new(node, "inheritsTransform"), false.into())?;
            }
            if tree.component == config.module_group {
                if !scene.has_attr(node, MODULES_GROUP_TAG) {
                    scene.add_attr(node, MODULES_GROUP_TAG, true.into())?;
                }
                ctx.set_modules_group(node);
            }
            if tree.component == config.root_joint {
                ctx.set_root_joint(node);
            }
            node
        };

        for child in &tree.children {
            self.safe_create(scene, ctx, child, Some(next))?;
        }
        Ok(())
    }
}

/// Find or create `GOD_ctrl` and `GOD_2_ctrl`.
fn ensure_root_controls(
    scene: &mut dyn SceneGraph,
    config: &RigConfig,
) -> RigResult<(NodeId, NodeId)> {
    let god_name = config.root_control_name();
    let god2_name = config.root2_control_name();
    if let Some(god) = scene.find_node(&god_name) {
        let god2 = scene.require_node(&god2_name)?;
        return Ok((god, god2));
    }

    let god = scene.create_node(NodeKind::Control, &god_name)?;
    let flat: Vec<Vec3> = shape_points("circle")?
        .into_iter()
        .map(|p| Vec3::new(p.y, 0.0, p.z))
        .collect();
    scene.set_attr(&Plug::new(god, "points"), AttrValue::Points(flat))?;
    scale_shape(scene, god, ROOT_SIZE, Some(config.line_width))?;
    set_override_colour(scene, god, "grey")?;
    let uniform = Plug::new(god, "scale").component(Axis::Y);
    for axis in [Axis::X, Axis::Z] {
        scene.connect(&uniform, &Plug::new(god, "scale").component(axis))?;
    }

    let god2 = scene.create_node(NodeKind::Control, &god2_name)?;
    scene.set_attr(
        &Plug::new(god2, "points"),
        AttrValue::Points(shape_points("omni-circle")?),
    )?;
    scale_shape(scene, god2, ROOT2_SIZE, Some(config.line_width))?;
    set_override_colour(scene, god2, "light-orange")?;
    scene.set_parent(god2, Some(god))?;

    tracing::info!(root = %god_name, "created root controllers");
    Ok((god, god2))
}

impl Module for RootModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Root
    }

    fn register_module(
        &mut self,
        scene: &mut dyn SceneGraph,
        ctx: &mut RigContext,
    ) -> RigResult<()> {
        let tree = ctx.config().rig_tree.clone();
        self.safe_create(scene, ctx, &tree, None)?;
        self.base.register(scene, ctx)
    }

    fn pre_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        self.base.pre_build(scene, ctx)?;
        let (_, god2) = self.root_controls()?;
        let god2 = god2.shape;
        let placement = self
            .base
            .chain
            .get(1)
            .or(self.base.chain.first())
            .copied()
            .ok_or_else(|| RigError::validation(&self.base.name, "root chain is empty"))?;

        let opts = ControllerOptions::default()
            .shape("cog")
            .colour("pink")
            .size(COG_SIZE);
        let config = ctx.config().clone();
        let cog = make_controller(scene, &config, &config.cog_control, &opts)?;
        cog.parent_under(scene, god2)?;
        cog.match_to(scene, placement)?;
        ctx.set_cog(cog.shape);
        self.base.controllers.push(cog);
        Ok(())
    }

    fn build(&mut self, scene: &mut dyn SceneGraph, _ctx: &mut RigContext) -> RigResult<()> {
        let (_, god2) = self.root_controls()?;
        let god2 = god2.transform();
        self.base.drive_slot(scene, 0, &god2)?;
        if self.base.chain.len() > 1 {
            let cog = self
                .base
                .controllers
                .get(2)
                .map(Controller::transform)
                .ok_or_else(|| RigError::structural(&self.base.name, "cog controller is missing"))?;
            self.base.drive_slot(scene, 1, &cog)?;
        }
        Ok(())
    }

    fn post_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        if self.base.chain.len() > 2 {
            let extra = self.base.chain.split_off(2);
            for j in &extra {
                if !scene.exists(*j) {
                    continue;
                }
                let hosts_module = scene
                    .descendants(*j)?
                    .iter()
                    .any(|d| scene.has_attr(*d, MODULE_ROOT_TAG));
                if hosts_module {
                    tracing::warn!(
                        joint = %scene.node_name(*j)?,
                        "root chain joint hosts a module, keeping it"
                    );
                    continue;
                }
                scene.delete_node(*j)?;
            }
            ctx.release_slots(&extra);
            let output = self.base.globals()?.output;
            scene.set_attr(
                &Plug::new(output, OUTPUT_JOINTS_ATTR),
                AttrValue::Nodes(self.base.chain.clone()),
            )?;
        }
        self.base.post_build(scene, ctx)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/root.rs"]
mod tests;
