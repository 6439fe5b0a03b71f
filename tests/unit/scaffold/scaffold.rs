use super::*;
use crate::foundation::math::{Vec3, translation_of};
use crate::graph::memory::InMemoryScene;
use approx::assert_relative_eq;

fn opts(name: &str, length: usize) -> ScaffoldOptions {
    ScaffoldOptions {
        name: name.to_string(),
        length,
        module_type: ModuleType::SimpleFk,
        ..ScaffoldOptions::default()
    }
}

#[test]
fn make_builds_a_tagged_chain_under_the_root() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let sc = Scaffold::make(&mut s, &cfg, &opts("spine", 3)).unwrap();

    let root_joint = s.find_node("root_BIND").unwrap();
    assert_eq!(s.node_name(sc.root()).unwrap(), "spine_01_BIND");
    assert_eq!(s.parent(sc.root()).unwrap(), Some(root_joint));
    assert_eq!(sc.name(&s, &cfg).unwrap(), "spine");
    assert_eq!(sc.module_type(&s).unwrap(), ModuleType::SimpleFk);
    assert!(sc.include_end_joint(&s).unwrap());
    assert_eq!(sc.socket(&s).unwrap(), Some(root_joint));

    let chain = sc.chain(&s).unwrap();
    let names: Vec<String> = chain.iter().map(|j| s.node_name(*j).unwrap()).collect();
    assert_eq!(names, ["spine_01_BIND", "spine_02_BIND", "spine_03_BIND"]);
    assert_relative_eq!(
        translation_of(&s.world_matrix(chain[2]).unwrap()),
        Vec3::new(20.0, 0.0, 0.0),
        epsilon = 1e-9
    );

    let display = s.find_node("spine_display").unwrap();
    assert_eq!(s.parent(display).unwrap(), Some(sc.root()));
    assert_eq!(s.node_kind(display).unwrap(), NodeKind::Shape);
}

#[test]
fn root_scaffold_is_created_once() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let a = Scaffold::make_root(&mut s, &cfg).unwrap();
    let b = Scaffold::make_root(&mut s, &cfg).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.module_type(&s).unwrap(), ModuleType::Root);
    assert_eq!(a.socket(&s).unwrap(), None);
    assert_eq!(a.name(&s, &cfg).unwrap(), "root");
    assert_eq!(
        s.get_attr(&Plug::new(a.root(), "radius")).unwrap(),
        AttrValue::Float(0.001)
    );
}

#[test]
fn scaffolds_attach_to_their_socket() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let spine = Scaffold::make(&mut s, &cfg, &opts("spine", 3)).unwrap();
    let tip = spine.chain(&s).unwrap()[2];
    let neck = Scaffold::make(
        &mut s,
        &cfg,
        &ScaffoldOptions {
            socket: Some(tip),
            ..opts("neck", 2)
        },
    )
    .unwrap();
    assert_eq!(s.parent(neck.root()).unwrap(), Some(tip));
    assert_relative_eq!(
        s.world_matrix(neck.root()).unwrap(),
        s.world_matrix(tip).unwrap(),
        epsilon = 1e-9
    );
    // nested module roots are not part of the parent chain
    assert_eq!(spine.chain(&s).unwrap().len(), 3);
}

#[test]
fn names_are_made_unique() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    Scaffold::make(&mut s, &cfg, &opts("arm", 1)).unwrap();
    let second = Scaffold::make(&mut s, &cfg, &opts("arm", 1)).unwrap();
    assert_eq!(second.name(&s, &cfg).unwrap(), "arm1");
    assert_eq!(unique_scaffold_name(&s, "leg"), "leg");
}

#[test]
fn invalid_options_are_rejected() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    for bad in [
        opts("", 2),
        opts("upper_arm", 2),
        opts("arm", 0),
        ScaffoldOptions {
            module_type: ModuleType::Root,
            ..opts("arm", 2)
        },
    ] {
        let err = Scaffold::make(&mut s, &cfg, &bad).unwrap_err();
        assert!(matches!(err, RigError::Configuration(_)), "{err}");
    }

    let group = s.create_node(NodeKind::Transform, "grp").unwrap();
    let err = Scaffold::make(
        &mut s,
        &cfg,
        &ScaffoldOptions {
            socket: Some(group),
            ..opts("arm", 2)
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("not a joint"));
}

#[test]
fn sided_names_keep_their_prefix() {
    let cfg = RigConfig::default();
    assert_eq!(module_name_from_node("L_arm_01_BIND", &cfg), "L_arm");
    assert_eq!(module_name_from_node("R_leg_display", &cfg), "R_leg");
    assert_eq!(module_name_from_node("spine_02_BIND", &cfg), "spine");
    assert_eq!(module_name_from_node("root_BIND", &cfg), "root");

    let mut s = InMemoryScene::new();
    let sc = Scaffold::make(&mut s, &cfg, &opts("L_arm", 2)).unwrap();
    assert_eq!(sc.name(&s, &cfg).unwrap(), "L_arm");
}

#[test]
fn setters_rewrite_the_tags() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let sc = Scaffold::make(&mut s, &cfg, &opts("arm", 3)).unwrap();

    sc.set_name(&mut s, &cfg, "leg").unwrap();
    assert_eq!(sc.name(&s, &cfg).unwrap(), "leg");
    assert!(s.find_node("leg_03_BIND").is_some());
    assert!(s.find_node("leg_display").is_some());

    sc.set_module_type(&mut s, ModuleType::TwoBoneIk).unwrap();
    assert_eq!(sc.module_type(&s).unwrap(), ModuleType::TwoBoneIk);
    assert!(sc.set_module_type(&mut s, ModuleType::Root).is_err());

    sc.set_include_end_joint(&mut s, false).unwrap();
    assert!(!sc.include_end_joint(&s).unwrap());

    let info = sc.info(&s, &cfg).unwrap();
    assert_eq!(info.name, "leg");
    assert_eq!(info.module_type, ModuleType::TwoBoneIk);
    assert!(!info.include_end_joint);
    assert_eq!(info.chain.len(), 3);
}

#[test]
fn set_socket_keeps_the_world_placement() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let spine = Scaffold::make(&mut s, &cfg, &opts("spine", 3)).unwrap();
    let arm = Scaffold::make(&mut s, &cfg, &opts("arm", 2)).unwrap();
    s.set_attr(
        &Plug::new(arm.root(), "translate"),
        Vec3::new(0.0, 3.0, 1.0).into(),
    )
    .unwrap();
    let before = s.world_matrix(arm.root()).unwrap();

    let new_socket = spine.chain(&s).unwrap()[1];
    arm.set_socket(&mut s, new_socket).unwrap();
    assert_eq!(arm.socket(&s).unwrap(), Some(new_socket));
    assert_relative_eq!(s.world_matrix(arm.root()).unwrap(), before, epsilon = 1e-9);
}

#[test]
fn untagged_joints_are_not_scaffolds() {
    let mut s = InMemoryScene::new();
    let j = s.create_node(NodeKind::Joint, "loose_BIND").unwrap();
    assert!(Scaffold::from_node(&s, j).is_err());
}
