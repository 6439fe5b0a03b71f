use std::collections::BTreeSet;

use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{Mat4, inverse_or_identity};
use crate::graph::model::{AttrValue, NodeId, NodeKind, Plug};
use crate::graph::ops::{self, Channel, Decomposed, Input, SkipAxes};
use crate::graph::scene::SceneGraph;
use crate::module::lifecycle::ModuleState;
use crate::module::registry::ModuleType;
use crate::rig::constraint::follow_with_offset;
use crate::rig::context::{OUTPUT_JOINTS_ATTR, OUTPUT_SLOTS_ATTR, RigContext};
use crate::rig::controller::Controller;
use crate::rig::joints::{clean_joint_orients, clean_scale_compensate};
use crate::scaffold::scaffold::ScaffoldInfo;

/// Text attribute naming the module on its top group.
pub const MODULE_GROUP_MARKER: &str = "rigModule";
/// Marker on the input group.
pub const INPUT_MARKER: &str = "rigInput";
/// Marker on the output group.
pub const OUTPUT_MARKER: &str = "rigOutput";
/// Marker on the controls group.
pub const CONTROLS_MARKER: &str = "rigControls";
/// Module type tag stored on the container.
pub const CONTAINER_TYPE_ATTR: &str = "rigModuleType";
/// Socket world matrix on the input group.
pub const SOCKET_MATRIX_ATTR: &str = "socketMatrix";
/// Global-space matrix on the input group.
pub const GLOBAL_MATRIX_ATTR: &str = "globalMatrix";
/// Cog matrix on the input group.
pub const COG_MATRIX_ATTR: &str = "cogMatrix";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Auxiliary sockets a module type asks for.
pub struct ModuleFlags {
    /// Wire the rig's global controller into `input.globalMatrix`.
    pub uses_global_plug: bool,
    /// Wire the cog controller into `input.cogMatrix`.
    pub uses_cog_plug: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The groups every module creates under its top group.
pub struct ModuleGlobals {
    /// `{name}_module`
    pub group: NodeId,
    /// Socket and auxiliary matrices come in here.
    pub input: NodeId,
    /// Holds one output slot per chain joint.
    pub output: NodeId,
    /// Parent of every controller; follows the socket.
    pub controls: NodeId,
    /// Extra nodes that follow the rig.
    pub transform: NodeId,
    /// Extra nodes that must not follow the rig.
    pub no_transform: NodeId,
}

/// State and default stage behaviour shared by every module.
#[derive(Clone, Debug)]
pub struct ModuleBase {
    /// Instance name (scaffold nice name).
    pub name: String,
    /// Joints driven by this module, root first.
    pub chain: Vec<NodeId>,
    /// Joint the module attaches to (`None` for world).
    pub socket: Option<NodeId>,
    /// Whether the chain's last joint gets its own controller.
    pub include_end_joint: bool,
    /// Auxiliary sockets requested by the module type.
    pub flags: ModuleFlags,
    /// Joint channels left undriven in post-build.
    pub joint_skip: SkipAxes,
    /// Groups created at registration.
    pub globals: Option<ModuleGlobals>,
    /// Controllers in creation order.
    pub controllers: Vec<Controller>,
    /// Socket matrix split into channels.
    pub socket_decompose: Option<Decomposed>,
    state: ModuleState,
    group: Option<NodeId>,
    container: Option<NodeId>,
}

impl ModuleBase {
    /// Bind to a scaffold.
    pub fn new(info: &ScaffoldInfo) -> Self {
        Self::from_parts(
            info.name.clone(),
            info.chain.clone(),
            info.socket,
            info.include_end_joint,
        )
    }

    /// Bind to an explicit chain.
    pub fn from_parts(
        name: impl Into<String>,
        chain: Vec<NodeId>,
        socket: Option<NodeId>,
        include_end_joint: bool,
    ) -> Self {
        Self {
            name: name.into(),
            chain,
            socket,
            include_end_joint,
            flags: ModuleFlags::default(),
            joint_skip: SkipAxes::none().without(Channel::Scale),
            globals: None,
            controllers: Vec::new(),
            socket_decompose: None,
            state: ModuleState::Constructed,
            group: None,
            container: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ModuleState) {
        self.state = state;
    }

    /// Container created by encapsulation.
    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// Registered groups, or a structural error before registration.
    pub fn globals(&self) -> RigResult<ModuleGlobals> {
        self.globals.ok_or_else(|| {
            RigError::structural(&self.name, "module groups do not exist (not registered)")
        })
    }

    /// Output slot `i`.
    pub fn output_slot(&self, i: usize) -> RigResult<Plug> {
        Ok(Plug::new(self.globals()?.output, OUTPUT_SLOTS_ATTR).at(i))
    }

    /// Socket matrix plug on the input group.
    pub fn socket_plug(&self) -> RigResult<Plug> {
        Ok(Plug::new(self.globals()?.input, SOCKET_MATRIX_ATTR))
    }

    /// Global matrix plug on the input group.
    pub fn global_plug(&self) -> RigResult<Plug> {
        if !self.flags.uses_global_plug {
            return Err(RigError::structural(&self.name, "module has no global plug"));
        }
        Ok(Plug::new(self.globals()?.input, GLOBAL_MATRIX_ATTR))
    }

    /// Cog matrix plug on the input group.
    pub fn cog_plug(&self) -> RigResult<Plug> {
        if !self.flags.uses_cog_plug {
            return Err(RigError::structural(&self.name, "module has no cog plug"));
        }
        Ok(Plug::new(self.globals()?.input, COG_MATRIX_ATTR))
    }

    /// Controller by base name.
    pub fn controller(&self, name: &str) -> Option<&Controller> {
        self.controllers.iter().find(|c| c.name == name)
    }

    /// Joints that get a controller: all of them, or all but the end joint.
    pub fn controlled_count(&self) -> usize {
        self.chain
            .len()
            .saturating_sub(usize::from(!self.include_end_joint))
    }

    /// Fails when the chain is empty.
    pub fn validate_non_empty(&self) -> RigResult<()> {
        if self.chain.is_empty() {
            return Err(RigError::validation(&self.name, "joint chain is empty"));
        }
        Ok(())
    }

    /// Rest world matrix of chain joint `i`, as stored in its slot at registration.
    pub fn rest_world(&self, scene: &dyn SceneGraph, i: usize) -> RigResult<Mat4> {
        let slot = self.output_slot(i)?;
        scene.get_attr(&slot)?.as_matrix().ok_or_else(|| {
            let what = format!("{} holds no matrix", scene.describe(&slot));
            RigError::structural(&self.name, what)
        })
    }

    /// Default `registerModule`.
    pub fn register(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        let modules = ctx.modules_group().ok_or_else(|| {
            RigError::registration(
                &self.name,
                format!(
                    "module group '{}' does not exist; build the root module first",
                    ctx.config().module_group
                ),
            )
        })?;
        if let Some(s) = self.socket {
            let ok = scene.exists(s) && scene.node_kind(s)?.is_transform();
            if !ok {
                return Err(RigError::registration(
                    &self.name,
                    format!("socket {s} does not resolve to an existing transform"),
                ));
            }
        }
        if self.flags.uses_global_plug && ctx.global_control().is_none() {
            return Err(RigError::registration(
                &self.name,
                format!(
                    "global control '{}' is missing",
                    ctx.config().root2_control_name()
                ),
            ));
        }
        if self.flags.uses_cog_plug && ctx.cog().is_none() {
            return Err(RigError::registration(
                &self.name,
                format!(
                    "cog control '{}' is missing",
                    ctx.config().cog_control_name()
                ),
            ));
        }
        for j in &self.chain {
            if !scene.exists(*j) {
                return Err(RigError::structural(
                    &self.name,
                    format!("chain joint {j} does not exist"),
                ));
            }
        }

        let group = scene.create_node(NodeKind::Transform, &format!("{}_module", self.name))?;
        self.group = Some(group);
        scene.set_parent(group, Some(modules))?;
        scene.add_attr(group, MODULE_GROUP_MARKER, self.name.as_str().into())?;

        let child = |scene: &mut dyn SceneGraph, part: &str| -> RigResult<NodeId> {
            let n = scene.create_node(NodeKind::Transform, &format!("{}_{part}", self.name))?;
            scene.set_parent(n, Some(group))?;
            scene.set_attr(&Plug::new(n, "inheritsTransform"), false.into())?;
            Ok(n)
        };
        let globals = ModuleGlobals {
            group,
            input: child(scene, "input")?,
            output: child(scene, "output")?,
            controls: child(scene, "controls")?,
            transform: child(scene, "transform")?,
            no_transform: child(scene, "noTransform")?,
        };
        scene.set_attr(&Plug::new(group, "inheritsTransform"), false.into())?;
        scene.add_attr(globals.input, INPUT_MARKER, true.into())?;
        scene.add_attr(globals.output, OUTPUT_MARKER, true.into())?;
        scene.add_attr(globals.controls, CONTROLS_MARKER, true.into())?;

        scene.add_attr(globals.input, SOCKET_MATRIX_ATTR, Mat4::identity().into())?;
        let socket = Plug::new(globals.input, SOCKET_MATRIX_ATTR);
        self.socket_decompose = Some(ops::decompose(
            scene,
            &format!("{}_socket_dcmpM", self.name),
            socket,
        )?);

        scene.add_multi_attr(globals.output, OUTPUT_SLOTS_ATTR, Mat4::identity().into())?;
        scene.add_attr(
            globals.output,
            OUTPUT_JOINTS_ATTR,
            AttrValue::Nodes(self.chain.clone()),
        )?;
        for (i, j) in self.chain.iter().enumerate() {
            let slot = Plug::new(globals.output, OUTPUT_SLOTS_ATTR).at(i);
            let rest = scene.world_matrix(*j)?;
            scene.set_attr(&slot, rest.into())?;
            ctx.register_slot(*j, slot);
        }

        self.globals = Some(globals);
        tracing::debug!(module = %self.name, joints = self.chain.len(), "registered");
        Ok(())
    }

    /// Default `preBuild`.
    pub fn pre_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        let g = self.globals()?;
        clean_joint_orients(scene, &self.chain)?;
        clean_scale_compensate(scene, &self.chain)?;

        let source: Input = match self.socket {
            Some(s) => match ctx.slot_for(s) {
                Some(slot) => slot.clone().into(),
                None => Plug::new(s, "worldMatrix").into(),
            },
            None => Mat4::identity().into(),
        };
        ops::feed(scene, source, &self.socket_plug()?)?;
        let dcmp = self
            .socket_decompose
            .clone()
            .ok_or_else(|| RigError::structural(&self.name, "socket decompose is missing"))?;
        ops::drive_channels(scene, &dcmp, g.controls, &SkipAxes::none())?;

        if self.flags.uses_global_plug {
            let src = ctx.global_plug().ok_or_else(|| {
                RigError::registration(&self.name, "global control is missing")
            })?;
            scene.add_attr(g.input, GLOBAL_MATRIX_ATTR, Mat4::identity().into())?;
            scene.connect(&src, &Plug::new(g.input, GLOBAL_MATRIX_ATTR))?;
        }
        if self.flags.uses_cog_plug {
            let src = ctx
                .cog_plug()
                .ok_or_else(|| RigError::registration(&self.name, "cog control is missing"))?;
            scene.add_attr(g.input, COG_MATRIX_ATTR, Mat4::identity().into())?;
            scene.connect(&src, &Plug::new(g.input, COG_MATRIX_ATTR))?;
        }
        Ok(())
    }

    /// Drive slot `i` from `driver`, keeping the joint's rest offset from it.
    pub fn drive_slot(&self, scene: &mut dyn SceneGraph, i: usize, driver: &Plug) -> RigResult<()> {
        let rest = self.rest_world(scene, i)?;
        let jname = scene.node_name(self.chain[i])?;
        let out = follow_with_offset(scene, &format!("{jname}_slot_multM"), driver, &rest)?;
        scene.connect(&out, &self.output_slot(i)?)
    }

    /// Drive slot `i` from slot `i - 1`, keeping the rest offset between the joints.
    pub fn follow_previous_slot(&self, scene: &mut dyn SceneGraph, i: usize) -> RigResult<()> {
        if i == 0 {
            return Err(RigError::structural(&self.name, "the chain root has no previous slot"));
        }
        let prev = self.output_slot(i - 1)?;
        let prev_rest = self.rest_world(scene, i - 1)?;
        let offset = inverse_or_identity(&prev_rest) * self.rest_world(scene, i)?;
        let jname = scene.node_name(self.chain[i])?;
        let out = ops::mult_matrix(
            scene,
            &format!("{jname}_follow_multM"),
            &[offset.into(), prev.into()],
        )?;
        scene.connect(&out, &self.output_slot(i)?)
    }

    /// Default `postBuild`: remove the display shape and drive every joint from its slot.
    pub fn post_build(
        &mut self,
        scene: &mut dyn SceneGraph,
        _ctx: &mut RigContext,
    ) -> RigResult<()> {
        if let Some(&root) = self.chain.first() {
            for c in scene.children(root)? {
                if scene.node_kind(c)? == NodeKind::Shape {
                    scene.delete_node(c)?;
                }
            }
        }

        for (i, &j) in self.chain.iter().enumerate() {
            let jname = scene.node_name(j)?;
            let slot = self.output_slot(i)?;
            let inherits = scene
                .get_attr(&Plug::new(j, "inheritsTransform"))?
                .as_bool()
                .unwrap_or(true);
            let local = if inherits && scene.parent(j)?.is_some() {
                ops::mult_matrix(
                    scene,
                    &format!("{jname}_out_multM"),
                    &[slot.into(), Plug::new(j, "parentInverseMatrix").into()],
                )?
            } else {
                slot
            };
            let dcmp = ops::decompose(scene, &format!("{jname}_out_dcmpM"), local)?;
            ops::drive_channels(scene, &dcmp, j, &self.joint_skip)?;
        }
        Ok(())
    }

    /// Every node belonging to this module: the group hierarchy plus every
    /// operator reachable from it through operator-only connections.
    pub fn collect_members(&self, scene: &dyn SceneGraph) -> RigResult<Vec<NodeId>> {
        let Some(group) = self.group.filter(|g| scene.exists(*g)) else {
            return Ok(Vec::new());
        };
        let mut members: BTreeSet<NodeId> = scene.descendants(group)?.into_iter().collect();
        members.insert(group);

        let mut queue: Vec<NodeId> = members.iter().copied().collect();
        while let Some(n) = queue.pop() {
            let edges = scene.incoming(n).into_iter().chain(scene.outgoing(n));
            for (src, dst) in edges {
                for other in [src.node, dst.node] {
                    if members.contains(&other) {
                        continue;
                    }
                    let kind = scene.node_kind(other)?;
                    if kind.is_dag() || kind == NodeKind::Container {
                        continue;
                    }
                    members.insert(other);
                    queue.push(other);
                }
            }
        }
        Ok(members.into_iter().collect())
    }

    /// Default `encapsulate`: publish the controllers in a container.
    pub fn encapsulate(
        &mut self,
        scene: &mut dyn SceneGraph,
        module_type: ModuleType,
    ) -> RigResult<()> {
        let g = self.globals.ok_or_else(|| {
            RigError::encapsulation(
                &self.name,
                "input/output markers missing (module not registered)",
            )
        })?;
        for (node, marker, what) in [
            (g.input, INPUT_MARKER, "input"),
            (g.output, OUTPUT_MARKER, "output"),
        ] {
            let found = scene.exists(node)
                && scene.has_attr(node, marker)
                && scene.parent(node)? == Some(g.group);
            if !found {
                return Err(RigError::encapsulation(
                    &self.name,
                    format!(
                        "{what} marker '{marker}' not found under '{}_module'",
                        self.name
                    ),
                ));
            }
        }

        let members = self.collect_members(scene)?;
        let published: Vec<NodeId> = self
            .controllers
            .iter()
            .flat_map(|c| std::iter::once(c.shape).chain(c.offsets.iter().copied()))
            .collect();

        let container_name = format!("{}_container", self.name);
        let container = scene.create_node(NodeKind::Container, &container_name)?;
        scene.set_attr(&Plug::new(container, "members"), AttrValue::Nodes(members))?;
        let published = AttrValue::Nodes(published);
        scene.set_attr(&Plug::new(container, "published"), published)?;
        scene.add_attr(container, CONTAINER_TYPE_ATTR, module_type.tag().into())?;
        self.container = Some(container);
        Ok(())
    }

    /// Best-effort teardown. Problems are logged, never returned.
    pub fn dismantle(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) {
        let members = match self.collect_members(scene) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(module = %self.name, error = %e, "could not collect module members");
                Vec::new()
            }
        };
        let mut doomed: Vec<NodeId> = self.container.take().into_iter().collect();
        for n in &members {
            if scene.node_kind(*n).is_ok_and(|k| !k.is_dag()) {
                doomed.push(*n);
            }
        }
        for c in &self.controllers {
            if c.pivot != c.shape {
                doomed.push(c.pivot);
            }
        }
        doomed.extend(self.group.take());

        for n in doomed {
            if !scene.exists(n) {
                continue;
            }
            if let Err(e) = scene.delete_node(n) {
                tracing::warn!(module = %self.name, node = %n, error = %e, "could not delete node");
            }
        }

        if let Some(g) = self.globals.take() {
            let ours: Vec<NodeId> = self
                .chain
                .iter()
                .copied()
                .filter(|j| ctx.slot_for(*j).is_some_and(|p| p.node == g.output))
                .collect();
            ctx.release_slots(&ours);
        }
        self.controllers.clear();
        self.socket_decompose = None;
        self.state = ModuleState::Constructed;
        tracing::info!(module = %self.name, "dismantled");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/base.rs"]
mod tests;
