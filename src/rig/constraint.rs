use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{Mat4, inverse_or_identity};
use crate::graph::model::{NodeId, Plug};
use crate::graph::ops::{self, Decomposed, Input, SkipAxes};
use crate::graph::scene::SceneGraph;

/// Tolerance used when grouping children with the same rest world matrix.
const SAME_WORLD_TOLERANCE: f64 = 1.0e-6;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Options for [`matrix_constraint`].
pub struct ConstraintOptions {
    /// Keep each child's rest offset from the parent.
    pub maintain_offset: bool,
    /// Channels left unconnected.
    pub skip: SkipAxes,
    /// Multiply by the child's parent-inverse so the result lands in local space.
    pub compensate_parent: bool,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            maintain_offset: true,
            skip: SkipAxes::none(),
            compensate_parent: true,
        }
    }
}

/// Drive `children` from `parent`'s world matrix.
///
/// With `maintain_offset`, children that share a rest world matrix and a DAG
/// parent share one network, and the rest offset `parentRest^-1 * childRest` is
/// baked into it as a constant. Returns the decompose nodes created.
pub fn matrix_constraint(
    scene: &mut dyn SceneGraph,
    parent: NodeId,
    children: &[NodeId],
    opts: &ConstraintOptions,
) -> RigResult<Vec<Decomposed>> {
    if children.is_empty() {
        return Err(RigError::graph("matrix constraint needs at least one child"));
    }
    let parent_name = scene.node_name(parent)?;
    let parent_rest = scene.world_matrix(parent)?;

    let mut groups: Vec<(Mat4, Option<NodeId>, Vec<NodeId>)> = Vec::new();
    for &child in children {
        let rest = scene.world_matrix(child)?;
        let dag_parent = scene.parent(child)?;
        let existing = groups.iter().position(|(m, p, _)| {
            opts.maintain_offset
                && *p == dag_parent
                && (m - rest).abs().max() < SAME_WORLD_TOLERANCE
        });
        match existing {
            Some(i) => groups[i].2.push(child),
            None => groups.push((rest, dag_parent, vec![child])),
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (rest, _, members) in groups {
        let leader = members[0];
        let leader_name = scene.node_name(leader)?;
        let mut inputs: Vec<Input> = Vec::new();
        if opts.maintain_offset {
            inputs.push((inverse_or_identity(&parent_rest) * rest).into());
        }
        inputs.push(Plug::new(parent, "worldMatrix").into());
        if opts.compensate_parent {
            inputs.push(Plug::new(leader, "parentInverseMatrix").into());
        }
        let mult = ops::mult_matrix(scene, &format!("{leader_name}_mtxCon_multM"), &inputs)?;
        let dcmp = ops::decompose(scene, &format!("{leader_name}_mtxCon_dcmpM"), mult)?;
        for child in &members {
            ops::drive_channels(scene, &dcmp, *child, &opts.skip)?;
        }
        tracing::debug!(
            parent = %parent_name,
            leader = %leader_name,
            children = members.len(),
            "matrix constraint"
        );
        out.push(dcmp);
    }
    Ok(out)
}

/// Weighted matrix blend network: `t = 0` selects `a`, `t = 1` selects `b`.
///
/// The weight of `a` comes from a reverse node on `t`. Rotations are blended
/// linearly, so the result is only a clean rotation when `a` and `b` are close.
pub fn blend_matrices(
    scene: &mut dyn SceneGraph,
    name: &str,
    a: impl Into<Input>,
    b: impl Into<Input>,
    t: impl Into<Input>,
) -> RigResult<Plug> {
    let t = t.into();
    let weight_a = ops::reverse(scene, &format!("{name}_rev"), t.clone())?;
    ops::wt_add(
        scene,
        &format!("{name}_wtAddM"),
        &[(a.into(), weight_a.into()), (b.into(), t)],
    )
}

/// Matrix that follows `driver` while keeping `driven_rest`'s rest offset from it.
pub fn follow_with_offset(
    scene: &mut dyn SceneGraph,
    name: &str,
    driver: &Plug,
    driven_rest: &Mat4,
) -> RigResult<Plug> {
    let driver_rest = scene.evaluate_matrix(driver)?;
    let offset = inverse_or_identity(&driver_rest) * driven_rest;
    ops::mult_matrix(scene, name, &[offset.into(), driver.into()])
}

#[cfg(test)]
#[path = "../../tests/unit/rig/constraint.rs"]
mod tests;
