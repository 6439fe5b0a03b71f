use super::*;
use crate::config::prefs::RigConfig;
use crate::foundation::math::Vec3;
use crate::graph::memory::InMemoryScene;
use crate::graph::model::Plug;
use crate::module::lifecycle::run_all;
use crate::module::root::RootModule;
use crate::scaffold::scaffold::{Scaffold, ScaffoldInfo, ScaffoldOptions};
use approx::assert_relative_eq;

fn rooted() -> (InMemoryScene, RigConfig, RigContext) {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let root = Scaffold::make_root(&mut s, &cfg).unwrap();
    let info = root.info(&s, &cfg).unwrap();
    let mut ctx = RigContext::new(cfg.clone());
    let mut root_module = RootModule::new(ModuleBase::new(&info));
    run_all(&mut root_module, &mut s, &mut ctx).unwrap();
    (s, cfg, ctx)
}

fn scaffold(
    s: &mut InMemoryScene,
    cfg: &RigConfig,
    length: usize,
    include_end: bool,
) -> ScaffoldInfo {
    let opts = ScaffoldOptions {
        name: "spine".to_string(),
        length,
        module_type: ModuleType::SimpleFk,
        include_end_joint: include_end,
        ..ScaffoldOptions::default()
    };
    Scaffold::make(s, cfg, &opts).unwrap().info(s, cfg).unwrap()
}

#[test]
fn controllers_nest_and_match_their_joints() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, 3, true);
    let mut m = SimpleFk::new(ModuleBase::new(&info));
    run_all(&mut m, &mut s, &mut ctx).unwrap();

    let ctrls = &m.base.controllers;
    assert_eq!(ctrls.len(), 3);
    assert_eq!(s.node_name(ctrls[0].shape).unwrap(), "spine_01_ctrl");
    assert_eq!(s.node_name(ctrls[2].shape).unwrap(), "spine_03_ctrl");
    let controls = m.base.globals().unwrap().controls;
    assert_eq!(s.parent(ctrls[0].pivot).unwrap(), Some(controls));
    assert_eq!(s.parent(ctrls[1].pivot).unwrap(), Some(ctrls[0].shape));
    assert_eq!(s.parent(ctrls[2].pivot).unwrap(), Some(ctrls[1].shape));

    for (c, j) in ctrls.iter().zip(&info.chain) {
        assert_relative_eq!(
            s.world_matrix(c.shape).unwrap(),
            s.world_matrix(*j).unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn joints_follow_their_controllers() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, 3, true);
    let mut m = SimpleFk::new(ModuleBase::new(&info));
    run_all(&mut m, &mut s, &mut ctx).unwrap();

    let ctrls = m.base.controllers.clone();
    s.set_attr(
        &Plug::new(ctrls[0].shape, "rotate"),
        Vec3::new(0.0, 0.0, 0.4).into(),
    )
    .unwrap();
    s.set_attr(
        &Plug::new(ctrls[1].shape, "rotate"),
        Vec3::new(0.0, -0.9, 0.0).into(),
    )
    .unwrap();
    s.set_attr(
        &Plug::new(ctrls[2].shape, "translate"),
        Vec3::new(1.0, 1.0, 0.0).into(),
    )
    .unwrap();
    let god2 = ctx.global_control().unwrap();
    s.set_attr(
        &Plug::new(god2, "translate"),
        Vec3::new(0.0, 5.0, 5.0).into(),
    )
    .unwrap();

    for (c, j) in ctrls.iter().zip(&info.chain) {
        assert_relative_eq!(
            s.world_matrix(c.shape).unwrap(),
            s.world_matrix(*j).unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn excluded_end_joint_rides_on_the_previous_slot() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, 3, false);
    let mut m = SimpleFk::new(ModuleBase::new(&info));
    run_all(&mut m, &mut s, &mut ctx).unwrap();
    assert_eq!(m.base.controllers.len(), 2);

    let rest_mid = s.world_matrix(info.chain[1]).unwrap();
    let rest_end = s.world_matrix(info.chain[2]).unwrap();
    let mid = m.base.controllers[1].shape;
    s.set_attr(&Plug::new(mid, "rotate"), Vec3::new(0.3, 0.0, 0.6).into())
        .unwrap();
    let expected = s.world_matrix(mid).unwrap() * rest_mid.try_inverse().unwrap() * rest_end;
    let end = s.world_matrix(info.chain[2]).unwrap();
    assert_relative_eq!(end, expected, epsilon = 1e-9);
}

#[test]
fn offsets_are_created_per_controller() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, 2, true);
    let mut m = SimpleFk::new(ModuleBase::new(&info)).with_offsets(2);
    run_all(&mut m, &mut s, &mut ctx).unwrap();
    for c in &m.base.controllers {
        assert_eq!(c.offsets.len(), 2);
    }
}

#[test]
fn a_lone_excluded_joint_is_invalid() {
    let base = ModuleBase::from_parts("tip", vec![crate::graph::model::NodeId(4)], None, false);
    let err = SimpleFk::new(base).validate_chain().unwrap_err();
    assert!(err.is_validation());
}
