//! Analytic two-bone IK emitted as a dataflow network.
//!
//! Everything is solved in socket space. The network mirrors
//! [`solve_two_bone`] node for node: soft-clamped reach, law-of-cosines
//! angles, an aim basis from the base, pole and end-effector positions, and
//! three chained frames that are concatenated with the socket matrix before
//! they reach the output slots.

use std::f64::consts::PI;

use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{
    AimSign, Axis, MIN_REACH, Mat4, STRETCH_LIMIT, TwoBoneInputs, Vec3, compose_trs,
    inverse_or_identity, orthogonal_direction, project_pole_vector, solve_two_bone, translation_of,
};
use crate::graph::model::{AverageOp, FloatOp, Plug, VectorOp};
use crate::graph::ops::{self, Channel, Input, SkipAxes};
use crate::graph::scene::SceneGraph;
use crate::module::base::ModuleBase;
use crate::module::lifecycle::Module;
use crate::module::registry::ModuleType;
use crate::module::space_switch::SPACE_BLEND_ATTR;
use crate::rig::constraint::{ConstraintOptions, blend_matrices, matrix_constraint};
use crate::rig::context::RigContext;
use crate::rig::controller::{Controller, ControllerOptions, make_controller};

/// Rest length of the first segment, on the ik controller.
pub const HUMERUS_ATTR: &str = "humerus";
/// Rest length of the second segment, on the ik controller.
pub const RADIUS_ATTR: &str = "radius";
/// Stretch switch, on the ik controller.
pub const STRETCH_ATTR: &str = "stretch";

const BASE: usize = 0;
const POLE: usize = 1;
const EFFECTOR: usize = 2;

/// Three-joint IK limb with base, pole-vector and end-effector controllers.
#[derive(Clone, Debug)]
pub struct TwoBoneIk {
    base: ModuleBase,
    aim_sign: AimSign,
}

impl TwoBoneIk {
    /// Wrap a base; the end effector can switch to the rig's global space.
    pub fn new(mut base: ModuleBase) -> Self {
        base.flags.uses_global_plug = true;
        Self {
            base,
            aim_sign: AimSign::Positive,
        }
    }

    /// Aim direction decided from the rest pose at pre-build.
    pub fn aim_sign(&self) -> AimSign {
        self.aim_sign
    }

    fn role(&self, i: usize) -> RigResult<&Controller> {
        self.base.controllers.get(i).ok_or_else(|| {
            RigError::structural(&self.base.name, "ik controllers were not created")
        })
    }

    /// Place the pole-vector pivot off the bend plane.
    fn pole_position(&self, scene: &dyn SceneGraph, distance: f64) -> RigResult<Vec3> {
        let p: Vec<Vec3> = self
            .base
            .chain
            .iter()
            .map(|j| scene.world_matrix(*j).map(|m| translation_of(&m)))
            .collect::<RigResult<_>>()?;
        if let Some(pos) = project_pole_vector(&p[0], &p[1], &p[2], distance) {
            return Ok(pos);
        }

        let mid = scene.world_matrix(self.base.chain[1])?;
        let hint = mid.fixed_view::<3, 1>(0, 1).into_owned();
        let dir = orthogonal_direction(&(p[2] - p[0]), &hint);
        tracing::warn!(
            module = %self.base.name,
            "chain is straight, pole vector placed along the middle joint's up axis"
        );
        Ok(p[1] + dir * (distance * (p[2] - p[0]).norm()))
    }

    /// End-effector pivot blends between socket space and global space.
    fn drive_effector_space(&self, scene: &mut dyn SceneGraph) -> RigResult<()> {
        let name = self.base.name.clone();
        let ik = self.role(EFFECTOR)?.clone();
        let pivot_rest = scene.world_matrix(ik.pivot)?;
        let socket = self.base.socket_plug()?;
        let socket_rest = scene.evaluate_matrix(&socket)?;
        let global = self.base.global_plug()?;
        let global_rest = scene.evaluate_matrix(&global)?;

        let local = ops::mult_matrix(
            scene,
            &format!("{name}_ik_local_multM"),
            &[
                (inverse_or_identity(&socket_rest) * pivot_rest).into(),
                socket.into(),
            ],
        )?;
        let global_space = ops::mult_matrix(
            scene,
            &format!("{name}_ik_global_multM"),
            &[
                (inverse_or_identity(&global_rest) * pivot_rest).into(),
                global.into(),
            ],
        )?;
        let blended = blend_matrices(
            scene,
            &format!("{name}_ik_space"),
            local,
            global_space,
            &ik.attr(SPACE_BLEND_ATTR),
        )?;
        let opm = ops::mult_matrix(
            scene,
            &format!("{name}_ik_space_multM"),
            &[
                blended.into(),
                Plug::new(ik.pivot, "parentInverseMatrix").into(),
            ],
        )?;

        scene.set_attr(&Plug::new(ik.pivot, "translate"), Vec3::zeros().into())?;
        scene.set_attr(&Plug::new(ik.pivot, "rotate"), Vec3::zeros().into())?;
        scene.set_attr(&Plug::new(ik.pivot, "scale"), Vec3::repeat(1.0).into())?;
        scene.connect(&opm, &Plug::new(ik.pivot, "offsetParentMatrix"))
    }

    /// Rest inputs of the solve, read from the scene before the network exists.
    fn rest_inputs(&self, scene: &dyn SceneGraph) -> RigResult<TwoBoneInputs> {
        let socket_inv = inverse_or_identity(&scene.evaluate_matrix(&self.base.socket_plug()?)?);
        let local = |i: usize| -> RigResult<Vec3> {
            let world = scene.world_matrix(self.role(i)?.shape)?;
            Ok(translation_of(&(socket_inv * world)))
        };
        let ik = self.role(EFFECTOR)?;
        Ok(TwoBoneInputs {
            humerus: scene.evaluate_float(&ik.attr(HUMERUS_ATTR))?,
            radius: scene.evaluate_float(&ik.attr(RADIUS_ATTR))?,
            stretch: 0.0,
            base: local(BASE)?,
            pole: local(POLE)?,
            target: local(EFFECTOR)?,
            aim_sign: self.aim_sign,
        })
    }
}

impl Module for TwoBoneIk {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::TwoBoneIk
    }

    fn validate_chain(&self) -> RigResult<()> {
        if self.base.chain.len() != 3 {
            return Err(RigError::validation(
                &self.base.name,
                format!(
                    "two-bone IK needs exactly 3 joints, got {}",
                    self.base.chain.len()
                ),
            ));
        }
        Ok(())
    }

    fn pre_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        self.validate_chain()?;
        self.base.pre_build(scene, ctx)?;
        let config = ctx.config().clone();
        let name = self.base.name.clone();
        let controls = self.base.globals()?.controls;
        let chain = self.base.chain.clone();

        let end_offset = scene.evaluate_vec3(&Plug::new(chain[2], "translate"))?;
        self.aim_sign = AimSign::from_offset(&end_offset);

        let base = make_controller(
            scene,
            &config,
            &format!("{name}_base"),
            &ControllerOptions::default().shape("square"),
        )?;
        base.parent_under(scene, controls)?;
        base.match_to(scene, chain[0])?;

        let pv = make_controller(
            scene,
            &config,
            &format!("{name}_pv"),
            &ControllerOptions::default().shape("locator"),
        )?;
        pv.parent_under(scene, controls)?;
        let pole = self.pole_position(scene, config.pole_vector_distance)?;
        let pole_world = compose_trs(&pole, &Vec3::zeros(), &Vec3::repeat(1.0));
        pv.match_world(scene, &pole_world)?;
        let follow = ConstraintOptions {
            skip: SkipAxes::none().without(Channel::Scale),
            ..ConstraintOptions::default()
        };
        matrix_constraint(scene, base.shape, &[pv.pivot], &follow)?;

        let ik = make_controller(
            scene,
            &config,
            &format!("{name}_ik"),
            &ControllerOptions::default().shape("cube"),
        )?;
        ik.parent_under(scene, controls)?;
        ik.match_to(scene, chain[2])?;

        let socket_inv = inverse_or_identity(&scene.evaluate_matrix(&self.base.socket_plug()?)?);
        let rest: Vec<Vec3> = chain
            .iter()
            .map(|j| {
                scene
                    .world_matrix(*j)
                    .map(|m| translation_of(&(socket_inv * m)))
            })
            .collect::<RigResult<_>>()?;
        ik.make_attr(scene, HUMERUS_ATTR, (rest[1] - rest[0]).norm())?;
        ik.make_attr(scene, RADIUS_ATTR, (rest[2] - rest[1]).norm())?;
        ik.make_attr(scene, STRETCH_ATTR, 0.0)?;
        ik.make_attr(scene, SPACE_BLEND_ATTR, 0.0)?;

        self.base.controllers.extend([base, pv, ik]);
        self.drive_effector_space(scene)
    }

    fn build(&mut self, scene: &mut dyn SceneGraph, _ctx: &mut RigContext) -> RigResult<()> {
        let name = self.base.name.clone();
        let n = |part: &str| format!("{name}_ik_{part}");
        let rest = self.rest_inputs(scene)?;
        let solved = solve_two_bone(&rest).ok_or_else(|| {
            RigError::structural(
                &name,
                "rest pose has no aim basis (pole vector lies on the base-to-end line)",
            )
        })?;
        if solved.elbow_angle > PI - 1.0e-3 {
            tracing::warn!(
                module = %name,
                "rest chain is nearly straight; bend direction comes from the pole vector only"
            );
        }

        let socket = self.base.socket_plug()?;
        let socket_rest = scene.evaluate_matrix(&socket)?;
        let ik = self.role(EFFECTOR)?.clone();
        let humerus = ik.attr(HUMERUS_ATTR);
        let radius = ik.attr(RADIUS_ATTR);

        // controller positions in socket space
        let socket_inv = ops::inverse(scene, &n("socket_inverseM"), socket.clone())?;
        let mut pos = Vec::with_capacity(3);
        for (i, role) in ["base", "pv", "end"].into_iter().enumerate() {
            let ctrl = self.role(i)?.transform();
            let local = ops::mult_matrix(
                scene,
                &n(&format!("{role}_multM")),
                &[ctrl.into(), socket_inv.clone().into()],
            )?;
            let d = ops::decompose(scene, &n(&format!("{role}_dcmpM")), local)?;
            pos.push(d.translate);
        }
        let (base_t, pole_t, end_t) = (pos[0].clone(), pos[1].clone(), pos[2].clone());

        // soft-clamped reach and stretched lengths
        let reach = ops::distance(scene, &n("distance"), &base_t, &end_t)?;
        let rest_sum = ops::float_math(scene, &n("restSum_fm"), FloatOp::Add, &humerus, &radius)?;
        let factor = ops::blend_two(
            scene,
            &n("stretch_blend"),
            1.0,
            STRETCH_LIMIT,
            ik.attr(STRETCH_ATTR),
        )?;
        let max_reach = ops::float_math(
            scene,
            &n("maxReach_fm"),
            FloatOp::Multiply,
            &rest_sum,
            &factor,
        )?;
        let reach = ops::clamp(scene, &n("reach_clamp"), reach, MIN_REACH, max_reach)?;
        let ratio = ops::float_math(scene, &n("ratio_fm"), FloatOp::Divide, &reach, &rest_sum)?;
        let scale = ops::float_math(scene, &n("scale_fm"), FloatOp::Max, ratio, 1.0)?;
        let a = ops::float_math(scene, &n("humerus_fm"), FloatOp::Multiply, &humerus, &scale)?;
        let b = ops::float_math(scene, &n("radius_fm"), FloatOp::Multiply, &radius, &scale)?;

        // law of cosines
        let a2 = ops::float_math(scene, &n("humerusSq_fm"), FloatOp::Multiply, &a, &a)?;
        let b2 = ops::float_math(scene, &n("radiusSq_fm"), FloatOp::Multiply, &b, &b)?;
        let c2 = ops::float_math(scene, &n("reachSq_fm"), FloatOp::Multiply, &reach, &reach)?;

        let ab2 = ops::float_math(scene, &n("elbowSum_fm"), FloatOp::Add, &a2, &b2)?;
        let elbow_num = ops::float_math(scene, &n("elbowNum_fm"), FloatOp::Subtract, ab2, &c2)?;
        let ab = ops::float_math(scene, &n("elbowProd_fm"), FloatOp::Multiply, &a, &b)?;
        let elbow_den = ops::float_math(scene, &n("elbowDen_fm"), FloatOp::Multiply, ab, 2.0)?;
        let elbow_cos = ops::float_math(
            scene,
            &n("elbowCos_fm"),
            FloatOp::Divide,
            elbow_num,
            elbow_den,
        )?;
        let elbow = ops::float_math(scene, &n("elbow_fm"), FloatOp::Acos, elbow_cos, 0.0)?;
        let elbow = ops::float_math(scene, &n("elbowRot_fm"), FloatOp::Subtract, elbow, PI)?;

        let ac2 = ops::float_math(scene, &n("shoulderSum_fm"), FloatOp::Add, &a2, &c2)?;
        let shoulder_num = ops::float_math(
            scene,
            &n("shoulderNum_fm"),
            FloatOp::Subtract,
            ac2,
            &b2,
        )?;
        let ac = ops::float_math(scene, &n("shoulderProd_fm"), FloatOp::Multiply, &a, &reach)?;
        let shoulder_den = ops::float_math(
            scene,
            &n("shoulderDen_fm"),
            FloatOp::Multiply,
            ac,
            2.0,
        )?;
        let shoulder_cos = ops::float_math(
            scene,
            &n("shoulderCos_fm"),
            FloatOp::Divide,
            shoulder_num,
            shoulder_den,
        )?;
        let shoulder = ops::float_math(scene, &n("shoulder_fm"), FloatOp::Acos, shoulder_cos, 0.0)?;

        // aim basis; a negative aim axis flips the primary and swaps the cross operands
        let aim_inputs: [Input; 2] = match self.aim_sign {
            AimSign::Positive => [end_t.clone().into(), base_t.clone().into()],
            AimSign::Negative => [base_t.clone().into(), end_t.clone().into()],
        };
        let aim = ops::plus_minus(scene, &n("aim_pma"), AverageOp::Subtract, &aim_inputs)?;
        let primary = ops::normalize(scene, &n("primary_vp"), aim)?;
        let pole_dir = ops::plus_minus(
            scene,
            &n("pole_pma"),
            AverageOp::Subtract,
            &[pole_t.into(), base_t.clone().into()],
        )?;
        let cross: [Input; 2] = match self.aim_sign {
            AimSign::Positive => [primary.clone().into(), pole_dir.into()],
            AimSign::Negative => [pole_dir.into(), primary.clone().into()],
        };
        let [lhs, rhs] = cross;
        let secondary = ops::vector_product(
            scene,
            &n("secondary_vp"),
            VectorOp::Cross,
            lhs,
            rhs,
            true,
        )?;
        let tertiary = ops::vector_product(
            scene,
            &n("tertiary_vp"),
            VectorOp::Cross,
            &primary,
            &secondary,
            true,
        )?;
        let basis = ops::four_by_four(
            scene,
            &n("basis_fbf"),
            [primary.into(), secondary.into(), tertiary.into()],
            base_t,
        )?;

        // chained frames
        let sign = self.aim_sign.factor();
        let (a, b) = if sign < 0.0 {
            (
                ops::float_math(scene, &n("humerusSign_fm"), FloatOp::Multiply, a, sign)?,
                ops::float_math(scene, &n("radiusSign_fm"), FloatOp::Multiply, b, sign)?,
            )
        } else {
            (a, b)
        };
        let (zero, one) = (Vec3::zeros(), Vec3::repeat(1.0));
        let identity = |scene: &mut dyn SceneGraph, part: &str| {
            ops::compose(scene, &n(part), zero, zero, one)
        };
        let rotate_y = |node| Plug::new(node, "inputRotate").component(Axis::Y);
        let slide_x = |node| Plug::new(node, "inputTranslate").component(Axis::X);
        let shoulder_m = identity(scene, "shoulder_cmpM")?;
        scene.connect(&shoulder, &rotate_y(shoulder_m.node))?;
        let elbow_m = identity(scene, "elbow_cmpM")?;
        scene.connect(&a, &slide_x(elbow_m.node))?;
        scene.connect(&elbow, &rotate_y(elbow_m.node))?;
        let wrist_m = identity(scene, "wrist_cmpM")?;
        scene.connect(&b, &slide_x(wrist_m.node))?;

        let f0 = ops::mult_matrix(
            scene,
            &n("frame01_multM"),
            &[shoulder_m.into(), basis.into()],
        )?;
        let f1 = ops::mult_matrix(
            scene,
            &n("frame02_multM"),
            &[elbow_m.into(), f0.clone().into()],
        )?;
        let f2 = ops::mult_matrix(
            scene,
            &n("frame03_multM"),
            &[wrist_m.into(), f1.clone().into()],
        )?;

        let socket_rest_inv = inverse_or_identity(&socket_rest);
        for (i, frame) in [f0, f1, f2].into_iter().enumerate() {
            let joint_rest = self.base.rest_world(scene, i)?;
            let offset: Mat4 =
                inverse_or_identity(&solved.frames[i]) * socket_rest_inv * joint_rest;
            let out = ops::mult_matrix(
                scene,
                &n(&format!("out{:02}_multM", i + 1)),
                &[offset.into(), frame.into(), socket.clone().into()],
            )?;
            scene.connect(&out, &self.base.output_slot(i)?)?;
        }
        tracing::debug!(module = %name, aim = ?self.aim_sign, "two-bone network emitted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/two_bone_ik.rs"]
mod tests;
