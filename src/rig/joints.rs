use crate::foundation::error::RigResult;
use crate::foundation::math::Vec3;
use crate::graph::model::{NodeId, NodeKind, Plug};
use crate::graph::scene::SceneGraph;

/// Spacing between consecutive joints of a new chain.
pub const JOINT_SPACING: f64 = 10.0;

/// Create `length` joints named `{name}_{NN}_{suffix}`, each parented under the
/// previous one and spaced along +X.
pub fn make_joint_chain(
    scene: &mut dyn SceneGraph,
    name: &str,
    length: usize,
    suffix: &str,
    radius: f64,
) -> RigResult<Vec<NodeId>> {
    let mut chain: Vec<NodeId> = Vec::with_capacity(length);
    for i in 0..length {
        let j = scene.create_node(NodeKind::Joint, &format!("{name}_{:02}_{suffix}", i + 1))?;
        scene.set_attr(&Plug::new(j, "radius"), radius.into())?;
        if let Some(prev) = chain.last().copied() {
            scene.set_parent(j, Some(prev))?;
            scene.set_attr(
                &Plug::new(j, "translate"),
                Vec3::new(JOINT_SPACING, 0.0, 0.0).into(),
            )?;
        }
        chain.push(j);
    }
    Ok(chain)
}

/// Fold joint orients into the rotate channels without moving the joints.
pub fn clean_joint_orients(scene: &mut dyn SceneGraph, joints: &[NodeId]) -> RigResult<()> {
    let worlds = joints
        .iter()
        .map(|j| scene.world_matrix(*j))
        .collect::<RigResult<Vec<_>>>()?;
    for (j, world) in joints.iter().zip(&worlds) {
        scene.match_world(*j, world)?;
    }
    Ok(())
}

/// Turn segment scale compensation off so parent scale reaches children.
pub fn clean_scale_compensate(scene: &mut dyn SceneGraph, joints: &[NodeId]) -> RigResult<()> {
    for j in joints {
        scene.set_attr(&Plug::new(*j, "segmentScaleCompensate"), false.into())?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/rig/joints.rs"]
mod tests;
