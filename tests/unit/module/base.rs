use super::*;
use crate::config::prefs::RigConfig;
use crate::foundation::math::{Vec3, compose_trs};
use crate::graph::memory::InMemoryScene;
use crate::module::lifecycle::{Stage, run_all, run_stage};
use crate::module::root::RootModule;
use crate::scaffold::scaffold::{Scaffold, ScaffoldOptions};
use approx::assert_relative_eq;

fn rooted() -> (InMemoryScene, RigConfig, RigContext) {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let root = Scaffold::make_root(&mut s, &cfg).unwrap();
    let info = root.info(&s, &cfg).unwrap();
    let mut ctx = RigContext::new(cfg.clone());
    let mut m = RootModule::new(ModuleBase::new(&info));
    run_all(&mut m, &mut s, &mut ctx).unwrap();
    (s, cfg, ctx)
}

fn scaffold(s: &mut InMemoryScene, cfg: &RigConfig, name: &str, length: usize) -> ScaffoldInfo {
    let opts = ScaffoldOptions {
        name: name.to_string(),
        length,
        ..ScaffoldOptions::default()
    };
    Scaffold::make(s, cfg, &opts).unwrap().info(s, cfg).unwrap()
}

#[test]
fn registration_creates_marked_groups_and_rest_slots() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 3);
    let mut base = ModuleBase::new(&info);
    base.register(&mut s, &mut ctx).unwrap();

    let g = base.globals().unwrap();
    assert_eq!(s.node_name(g.group).unwrap(), "neck_module");
    assert_eq!(s.parent(g.group).unwrap(), ctx.modules_group());
    for (node, name) in [
        (g.input, "neck_input"),
        (g.output, "neck_output"),
        (g.controls, "neck_controls"),
        (g.transform, "neck_transform"),
        (g.no_transform, "neck_noTransform"),
    ] {
        assert_eq!(s.node_name(node).unwrap(), name);
        assert_eq!(s.parent(node).unwrap(), Some(g.group));
        assert_eq!(
            s.get_attr(&Plug::new(node, "inheritsTransform")).unwrap(),
            AttrValue::Bool(false)
        );
    }
    assert!(s.has_attr(g.input, INPUT_MARKER));
    assert!(s.has_attr(g.output, OUTPUT_MARKER));
    assert!(s.has_attr(g.controls, CONTROLS_MARKER));

    let slots = s.multi_indices(g.output, OUTPUT_SLOTS_ATTR).unwrap();
    assert_eq!(slots, vec![0, 1, 2]);
    for (i, j) in info.chain.iter().enumerate() {
        assert_relative_eq!(
            base.rest_world(&s, i).unwrap(),
            s.world_matrix(*j).unwrap(),
            epsilon = 1e-9
        );
        assert_eq!(ctx.slot_for(*j), Some(&base.output_slot(i).unwrap()));
    }
}

#[test]
fn registration_needs_the_modules_group() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut ctx = RigContext::new(cfg.clone());
    let mut base = ModuleBase::new(&info);
    let err = base.register(&mut s, &mut ctx).unwrap_err();
    assert!(matches!(err, RigError::Registration { ref module, .. } if module == "neck"));
}

#[test]
fn registration_rejects_a_missing_socket() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let ghost = s.create_node(NodeKind::Transform, "ghost").unwrap();
    s.delete_node(ghost).unwrap();
    let mut base = ModuleBase::from_parts("neck", info.chain.clone(), Some(ghost), true);
    let err = base.register(&mut s, &mut ctx).unwrap_err();
    assert!(matches!(err, RigError::Registration { .. }));
    assert!(base.globals.is_none());
}

#[test]
fn global_plug_requires_the_flag() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut base = ModuleBase::new(&info);
    base.register(&mut s, &mut ctx).unwrap();
    assert!(base.global_plug().is_err());
    assert!(base.cog_plug().is_err());
    base.flags.uses_global_plug = true;
    assert_eq!(base.global_plug().unwrap().attr, GLOBAL_MATRIX_ATTR);
}

#[test]
fn pre_build_feeds_the_socket_and_carries_the_controls_group() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut base = ModuleBase::new(&info);
    base.flags.uses_global_plug = true;
    base.flags.uses_cog_plug = true;
    base.register(&mut s, &mut ctx).unwrap();
    base.pre_build(&mut s, &mut ctx).unwrap();

    let g = base.globals().unwrap();
    let god2 = ctx.global_control().unwrap();
    s.set_attr(
        &Plug::new(god2, "translate"),
        Vec3::new(0.0, 4.0, 0.0).into(),
    )
    .unwrap();

    let socket = s.evaluate_matrix(&base.socket_plug().unwrap()).unwrap();
    assert_relative_eq!(socket, s.world_matrix(god2).unwrap(), epsilon = 1e-9);
    assert_relative_eq!(s.world_matrix(g.controls).unwrap(), socket, epsilon = 1e-9);
    assert_relative_eq!(
        s.evaluate_matrix(&base.global_plug().unwrap()).unwrap(),
        s.world_matrix(god2).unwrap(),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        s.evaluate_matrix(&base.cog_plug().unwrap()).unwrap(),
        s.world_matrix(ctx.cog().unwrap()).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn slots_drive_joints_after_post_build() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut base = ModuleBase::new(&info);
    base.register(&mut s, &mut ctx).unwrap();
    base.pre_build(&mut s, &mut ctx).unwrap();

    let driver = s.create_node(NodeKind::Transform, "driver").unwrap();
    let driver_plug = Plug::new(driver, "worldMatrix");
    base.drive_slot(&mut s, 0, &driver_plug).unwrap();
    base.follow_previous_slot(&mut s, 1).unwrap();
    base.post_build(&mut s, &mut ctx).unwrap();

    let rest: Vec<_> = info
        .chain
        .iter()
        .map(|j| s.world_matrix(*j).unwrap())
        .collect();
    let (t, r) = (Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 0.3));
    let moved = compose_trs(&t, &r, &Vec3::repeat(1.0));
    s.set_attr(
        &Plug::new(driver, "translate"),
        Vec3::new(1.0, 2.0, 3.0).into(),
    )
    .unwrap();
    s.set_attr(
        &Plug::new(driver, "rotate"),
        Vec3::new(0.0, 0.0, 0.3).into(),
    )
    .unwrap();
    for (j, r) in info.chain.iter().zip(&rest) {
        assert_relative_eq!(s.world_matrix(*j).unwrap(), moved * r, epsilon = 1e-9);
    }
    for c in s.children(info.chain[0]).unwrap() {
        assert_ne!(s.node_kind(c).unwrap(), NodeKind::Shape);
    }
}

#[test]
fn the_chain_root_has_no_previous_slot() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut base = ModuleBase::new(&info);
    base.register(&mut s, &mut ctx).unwrap();
    assert!(base.follow_previous_slot(&mut s, 0).is_err());
}

#[test]
fn encapsulation_needs_the_markers() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut base = ModuleBase::new(&info);

    let err = base.encapsulate(&mut s, ModuleType::SimpleFk).unwrap_err();
    assert!(matches!(err, RigError::Encapsulation { .. }));

    base.register(&mut s, &mut ctx).unwrap();
    let output = base.globals().unwrap().output;
    s.set_parent(output, None).unwrap();
    let err = base.encapsulate(&mut s, ModuleType::SimpleFk).unwrap_err();
    assert!(matches!(err, RigError::Encapsulation { ref detail, .. } if detail.contains("output")));
}

#[test]
fn container_holds_members_and_publishes_controllers() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut m = ModuleType::SimpleFk.instantiate(ModuleBase::new(&info));
    run_all(m.as_mut(), &mut s, &mut ctx).unwrap();

    let base = m.base();
    let container = base.container().unwrap();
    assert_eq!(s.node_name(container).unwrap(), "neck_container");
    let type_plug = Plug::new(container, CONTAINER_TYPE_ATTR);
    let module_type = s.get_attr(&type_plug).unwrap();
    assert_eq!(module_type.as_text(), Some("simple_fk"));
    let members = s.get_attr(&Plug::new(container, "members")).unwrap();
    let members = members.as_nodes().unwrap();
    let g = base.globals().unwrap();
    assert!(members.contains(&g.group));
    assert!(members.contains(&g.input));
    let dcmp = s.find_node("neck_socket_dcmpM").unwrap();
    assert!(members.contains(&dcmp));
    assert!(!members.contains(&info.chain[0]));

    let published = s.get_attr(&Plug::new(container, "published")).unwrap();
    let published = published.as_nodes().unwrap();
    for c in &base.controllers {
        assert!(published.contains(&c.shape));
    }
}

#[test]
fn dismantle_removes_the_module_and_releases_its_slots() {
    let (mut s, cfg, mut ctx) = rooted();
    let info = scaffold(&mut s, &cfg, "neck", 2);
    let mut m = ModuleType::SimpleFk.instantiate(ModuleBase::new(&info));
    for stage in [Stage::Register, Stage::PreBuild, Stage::Build] {
        run_stage(m.as_mut(), stage, &mut s, &mut ctx).unwrap();
    }
    m.dismantle(&mut s, &mut ctx);

    assert_eq!(m.base().state(), ModuleState::Constructed);
    assert!(m.base().controllers.is_empty());
    assert!(s.find_node("neck_module").is_none());
    assert!(s.find_node("neck_socket_dcmpM").is_none());
    assert!(s.find_node("neck_01_ctrl").is_none());
    for j in &info.chain {
        assert!(s.exists(*j));
        assert!(ctx.slot_for(*j).is_none());
    }
    // a fresh run works after teardown
    run_all(m.as_mut(), &mut s, &mut ctx).unwrap();
    assert_eq!(m.base().state(), ModuleState::Encapsulated);
}

#[test]
fn controlled_count_drops_the_end_joint_when_excluded() {
    let ids = vec![NodeId(1), NodeId(2), NodeId(3)];
    let base = |chain: &[NodeId], end| ModuleBase::from_parts("a", chain.to_vec(), None, end);
    assert_eq!(base(&ids, true).controlled_count(), 3);
    assert_eq!(base(&ids, false).controlled_count(), 2);
    assert_eq!(base(&[], false).controlled_count(), 0);
    assert!(base(&[], true).validate_non_empty().is_err());
}
