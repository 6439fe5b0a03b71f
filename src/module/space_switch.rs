//! FK chain whose terminal controller blends between local and global space.
//!
//! The terminal pivot is driven through its offset-parent matrix: translation
//! and scale always come from the FK parent, rotation from the blend. A share
//! of the blend is spread over the interior controllers' first offset null so
//! the chain bends into the tip instead of breaking at it. The spread is an
//! Euler split and misbehaves when the rest chain runs along the blend axis.

use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{Vec3, inverse_or_identity};
use crate::graph::model::{Plug, ProductOp};
use crate::graph::ops::{self, Channel};
use crate::graph::scene::SceneGraph;
use crate::module::base::ModuleBase;
use crate::module::lifecycle::Module;
use crate::module::registry::ModuleType;
use crate::module::simple_fk::SimpleFk;
use crate::rig::constraint::blend_matrices;
use crate::rig::context::RigContext;

/// Blend attribute on the terminal controller: 0 is local, 1 is global.
pub const SPACE_BLEND_ATTR: &str = "spaceBlend";

/// Space-switching FK chain.
#[derive(Clone, Debug)]
pub struct SpaceSwitchChain {
    fk: SimpleFk,
}

impl SpaceSwitchChain {
    /// Wrap a base; the chain reads the rig's global plug.
    pub fn new(mut base: ModuleBase) -> Self {
        base.flags.uses_global_plug = true;
        Self {
            fk: SimpleFk::new(base),
        }
    }

    fn base_ref(&self) -> &ModuleBase {
        &self.fk.base
    }

    /// Drive the terminal pivot from the local/global blend.
    fn drive_terminal(&self, scene: &mut dyn SceneGraph) -> RigResult<()> {
        let base = self.base_ref();
        let name = &base.name;
        let n = base.controllers.len();
        let parent = &base.controllers[n - 2];
        let tip = &base.controllers[n - 1];
        let blend = tip.attr(SPACE_BLEND_ATTR);

        let pivot_rest = scene.world_matrix(tip.pivot)?;
        let parent_rest = scene.world_matrix(parent.shape)?;
        let global = base.global_plug()?;
        let global_rest = scene.evaluate_matrix(&global)?;

        let local = ops::mult_matrix(
            scene,
            &format!("{name}_space_local_multM"),
            &[
                (inverse_or_identity(&parent_rest) * pivot_rest).into(),
                parent.transform().into(),
            ],
        )?;
        let global_space = ops::mult_matrix(
            scene,
            &format!("{name}_space_global_multM"),
            &[
                (inverse_or_identity(&global_rest) * pivot_rest).into(),
                global.into(),
            ],
        )?;
        let blended = blend_matrices(
            scene,
            &format!("{name}_space"),
            local.clone(),
            global_space,
            &blend,
        )?;

        let local_dcmp = ops::decompose(scene, &format!("{name}_space_local_dcmpM"), local)?;
        let blend_dcmp = ops::decompose(scene, &format!("{name}_space_dcmpM"), blended)?;
        let composed = ops::compose(
            scene,
            &format!("{name}_space_cmpM"),
            local_dcmp.channel(Channel::Translate),
            blend_dcmp.channel(Channel::Rotate),
            local_dcmp.channel(Channel::Scale),
        )?;
        let opm = ops::mult_matrix(
            scene,
            &format!("{name}_space_multM"),
            &[
                composed.into(),
                Plug::new(tip.pivot, "parentInverseMatrix").into(),
            ],
        )?;

        scene.set_attr(&Plug::new(tip.pivot, "translate"), Vec3::zeros().into())?;
        scene.set_attr(&Plug::new(tip.pivot, "rotate"), Vec3::zeros().into())?;
        scene.set_attr(&Plug::new(tip.pivot, "scale"), Vec3::repeat(1.0).into())?;
        scene.connect(&opm, &Plug::new(tip.pivot, "offsetParentMatrix"))
    }

    /// Spread `1 / (n - 2)` of the blend rotation over the interior controllers.
    ///
    /// The share is measured against the tip's rest placement under the socket,
    /// not against the live FK chain, so the interior nulls never feed back
    /// into their own input.
    fn spread_interior(&self, scene: &mut dyn SceneGraph) -> RigResult<()> {
        let base = self.base_ref();
        let name = &base.name;
        let n = base.controllers.len();
        if n < 3 {
            return Ok(());
        }
        let interior = (n - 2) as f64;
        let tip = &base.controllers[n - 1];
        let blend = tip.attr(SPACE_BLEND_ATTR);

        let pivot_rest = scene.world_matrix(tip.pivot)?;
        let socket = base.socket_plug()?;
        let socket_rest = scene.evaluate_matrix(&socket)?;
        let global = base.global_plug()?;
        let global_rest = scene.evaluate_matrix(&global)?;

        let rest_local = ops::mult_matrix(
            scene,
            &format!("{name}_spread_local_multM"),
            &[
                (inverse_or_identity(&socket_rest) * pivot_rest).into(),
                socket.into(),
            ],
        )?;
        let rest_global = ops::mult_matrix(
            scene,
            &format!("{name}_spread_global_multM"),
            &[
                (inverse_or_identity(&global_rest) * pivot_rest).into(),
                global.into(),
            ],
        )?;
        let blended = blend_matrices(
            scene,
            &format!("{name}_spread"),
            rest_local.clone(),
            rest_global,
            &blend,
        )?;
        let local_inv = ops::inverse(scene, &format!("{name}_spread_inverseM"), rest_local)?;
        let delta = ops::mult_matrix(
            scene,
            &format!("{name}_spread_delta_multM"),
            &[blended.into(), local_inv.into()],
        )?;
        let delta = ops::decompose(scene, &format!("{name}_spread_dcmpM"), delta)?;
        let share = ops::multiply_divide(
            scene,
            &format!("{name}_spread_multD"),
            ProductOp::Multiply,
            delta.channel(Channel::Rotate),
            Vec3::repeat(1.0 / interior),
        )?;

        for ctrl in &base.controllers[1..n - 1] {
            let null = ctrl.offsets.first().copied().ok_or_else(|| {
                let what = format!("controller '{}' has no offset null", ctrl.name);
                RigError::structural(name, what)
            })?;
            scene.connect(&share, &Plug::new(null, "rotate"))?;
        }
        Ok(())
    }
}

impl Module for SpaceSwitchChain {
    fn base(&self) -> &ModuleBase {
        &self.fk.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.fk.base
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::SpaceSwitchChain
    }

    fn validate_chain(&self) -> RigResult<()> {
        self.fk.validate_chain()?;
        if self.base_ref().controlled_count() < 2 {
            return Err(RigError::validation(
                &self.base_ref().name,
                "a space switch needs at least two controllers",
            ));
        }
        Ok(())
    }

    fn pre_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        self.fk.offsets = Some(ctx.config().offset_count.max(1));
        self.fk.pre_build(scene, ctx)?;
        let tip = self
            .base_ref()
            .controllers
            .last()
            .ok_or_else(|| RigError::structural(&self.base_ref().name, "no controllers"))?;
        tip.make_attr(scene, SPACE_BLEND_ATTR, 0.0)?;
        Ok(())
    }

    fn build(&mut self, scene: &mut dyn SceneGraph, _ctx: &mut RigContext) -> RigResult<()> {
        if self.base_ref().controllers.len() < 2 {
            return Err(RigError::structural(
                &self.base_ref().name,
                "a space switch needs at least two controllers",
            ));
        }
        self.spread_interior(scene)?;
        self.drive_terminal(scene)?;
        self.fk.drive_slots(scene)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/space_switch.rs"]
mod tests;
