use super::*;
use crate::foundation::math::translation_of;
use crate::graph::memory::InMemoryScene;
use crate::module::lifecycle::run_all;
use crate::scaffold::scaffold::{Scaffold, ScaffoldOptions};
use approx::assert_relative_eq;

fn build_root(s: &mut InMemoryScene, cfg: &RigConfig) -> (RootModule, RigContext) {
    let root = Scaffold::make_root(s, cfg).unwrap();
    let info = root.info(s, cfg).unwrap();
    let mut ctx = RigContext::new(cfg.clone());
    let mut m = RootModule::new(ModuleBase::new(&info));
    run_all(&mut m, s, &mut ctx).unwrap();
    (m, ctx)
}

fn joint(s: &mut InMemoryScene, name: &str, parent: NodeId, t: Vec3) -> NodeId {
    let j = s.create_node(NodeKind::Joint, name).unwrap();
    s.set_parent(j, Some(parent)).unwrap();
    s.set_attr(&Plug::new(j, "translate"), t.into()).unwrap();
    j
}

#[test]
fn root_creates_the_rig_hierarchy() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let (m, ctx) = build_root(&mut s, &cfg);

    let god = s.find_node("GOD_ctrl").unwrap();
    let god2 = s.find_node("GOD_2_ctrl").unwrap();
    let modules = s.find_node("modules").unwrap();
    let root_joint = s.find_node("root_BIND").unwrap();
    let cog = s.find_node("cog_ctrl").unwrap();

    assert_eq!(s.parent(god).unwrap(), None);
    assert_eq!(s.parent(god2).unwrap(), Some(god));
    assert_eq!(s.parent(root_joint).unwrap(), Some(god));
    assert_eq!(s.parent(modules).unwrap(), Some(god));
    assert!(s.has_attr(modules, MODULES_GROUP_TAG));

    assert_eq!(ctx.root_control(), Some(god));
    assert_eq!(ctx.global_control(), Some(god2));
    assert_eq!(ctx.modules_group(), Some(modules));
    assert_eq!(ctx.root_joint(), Some(root_joint));
    assert_eq!(ctx.cog(), Some(cog));
    assert_eq!(m.base().controllers.len(), 3);
}

#[test]
fn god_scale_y_is_uniform() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    build_root(&mut s, &cfg);
    let god = s.find_node("GOD_ctrl").unwrap();
    s.set_attr(&Plug::new(god, "scale"), Vec3::new(1.0, 2.0, 1.0).into())
        .unwrap();
    assert_relative_eq!(
        s.evaluate_vec3(&Plug::new(god, "scale")).unwrap(),
        Vec3::repeat(2.0),
        epsilon = 1e-12
    );
}

#[test]
fn root_joint_follows_the_global_control() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    build_root(&mut s, &cfg);
    let god2 = s.find_node("GOD_2_ctrl").unwrap();
    let root_joint = s.find_node("root_BIND").unwrap();
    s.set_attr(
        &Plug::new(god2, "translate"),
        Vec3::new(3.0, 0.0, -2.0).into(),
    )
    .unwrap();
    s.set_attr(&Plug::new(god2, "rotate"), Vec3::new(0.0, 0.7, 0.0).into())
        .unwrap();
    assert_relative_eq!(
        s.world_matrix(root_joint).unwrap(),
        s.world_matrix(god2).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn existing_groups_are_reused() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let modules = s.create_node(NodeKind::Transform, "modules").unwrap();
    build_root(&mut s, &cfg);
    assert_eq!(s.find_node("modules"), Some(modules));
    assert!(s.find_node("modules1").is_none());
}

#[test]
fn cog_drives_the_second_root_joint() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let root = Scaffold::make_root(&mut s, &cfg).unwrap().root();
    let hips = joint(&mut s, "hips_BIND", root, Vec3::new(0.0, 10.0, 0.0));
    let (_, ctx) = build_root(&mut s, &cfg);

    let cog = ctx.cog().unwrap();
    assert_relative_eq!(
        translation_of(&s.world_matrix(cog).unwrap()),
        Vec3::new(0.0, 10.0, 0.0),
        epsilon = 1e-9
    );
    s.set_attr(
        &Plug::new(cog, "translate"),
        Vec3::new(0.0, 0.0, 4.0).into(),
    )
    .unwrap();
    assert_relative_eq!(
        s.world_matrix(hips).unwrap(),
        s.world_matrix(cog).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn extra_root_joints_are_removed_unless_they_host_a_module() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let root = Scaffold::make_root(&mut s, &cfg).unwrap().root();
    let hips = joint(&mut s, "hips_BIND", root, Vec3::new(0.0, 10.0, 0.0));
    let spare = joint(&mut s, "spare_BIND", hips, Vec3::new(0.0, 2.0, 0.0));
    let host = joint(&mut s, "host_BIND", hips, Vec3::new(0.0, 4.0, 0.0));
    let opts = ScaffoldOptions {
        name: "tail".to_string(),
        length: 2,
        socket: Some(host),
        ..ScaffoldOptions::default()
    };
    Scaffold::make(&mut s, &cfg, &opts).unwrap();

    let (m, ctx) = build_root(&mut s, &cfg);
    assert!(!s.exists(spare));
    assert!(s.exists(host));
    assert_eq!(m.base().chain, vec![root, hips]);
    assert!(ctx.slot_for(host).is_none());
    let output = m.base().globals().unwrap().output;
    assert_eq!(
        s.get_attr(&Plug::new(output, OUTPUT_JOINTS_ATTR)).unwrap(),
        AttrValue::Nodes(vec![root, hips])
    );
}
