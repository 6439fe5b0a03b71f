use super::*;
use crate::graph::memory::InMemoryScene;
use crate::graph::model::{NodeId, NodeKind, Plug};
use crate::scaffold::scaffold::ScaffoldOptions;

fn make(
    s: &mut InMemoryScene,
    cfg: &RigConfig,
    name: &str,
    length: usize,
    module_type: ModuleType,
    socket: Option<NodeId>,
) -> Scaffold {
    let opts = ScaffoldOptions {
        name: name.to_string(),
        length,
        socket,
        module_type,
        ..ScaffoldOptions::default()
    };
    Scaffold::make(s, cfg, &opts).unwrap()
}

#[test]
fn root_and_modules_are_built() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let spine = make(&mut s, &cfg, "spine", 3, ModuleType::SimpleFk, None);
    let tip = spine.chain(&s).unwrap()[2];
    make(
        &mut s,
        &cfg,
        "neck",
        2,
        ModuleType::SpaceSwitchChain,
        Some(tip),
    );
    make(&mut s, &cfg, "tail", 2, ModuleType::Unassigned, None);

    let report = batch_build(&mut s, &cfg).unwrap();
    assert_eq!(report.built(), ["root", "spine", "neck", "tail"]);
    assert!(report.skipped().is_empty());
    for name in [
        "root_container",
        "spine_container",
        "neck_container",
        "tail_container",
    ] {
        assert!(s.find_node(name).is_some(), "{name} missing");
    }
}

#[test]
fn invalid_chains_are_skipped_with_a_reason() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    make(&mut s, &cfg, "arm", 2, ModuleType::TwoBoneIk, None);
    make(&mut s, &cfg, "spine", 2, ModuleType::SimpleFk, None);

    let report = batch_build(&mut s, &cfg).unwrap();
    assert_eq!(report.built(), ["root", "spine"]);
    let skipped = report.skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, "arm");
    assert!(skipped[0].1.contains("exactly 3 joints"));
    assert!(s.find_node("arm_module").is_none());
}

#[test]
fn rebuilding_skips_what_is_already_built() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    make(&mut s, &cfg, "spine", 2, ModuleType::SimpleFk, None);
    batch_build(&mut s, &cfg).unwrap();
    let nodes = s.len();

    make(&mut s, &cfg, "tail", 2, ModuleType::SimpleFk, None);
    let report = batch_build(&mut s, &cfg).unwrap();
    assert_eq!(report.built(), ["tail"]);
    let reasons: Vec<&str> = report.skipped().iter().map(|(_, r)| *r).collect();
    assert_eq!(reasons, ["already built", "already built"]);
    assert!(s.len() > nodes);
    assert!(s.find_node("spine_module1").is_none());
}

#[test]
fn a_failing_stage_rolls_the_batch_back() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    make(&mut s, &cfg, "tail", 2, ModuleType::SimpleFk, None);
    let spine = make(&mut s, &cfg, "spine", 2, ModuleType::SimpleFk, None);
    let joint = spine.chain(&s).unwrap()[1];
    let rogue = s.create_node(NodeKind::Transform, "rogue").unwrap();
    let rotate = Plug::new(joint, "rotate");
    s.connect(&Plug::new(rogue, "rotate"), &rotate).unwrap();

    let err = batch_build(&mut s, &cfg).unwrap_err();
    match &err {
        RigError::BuildFailed { module, stage, .. } => {
            assert_eq!(module, "spine");
            assert_eq!(stage, "postBuild");
        }
        other => panic!("unexpected error: {other}"),
    }
    for name in [
        "tail_module",
        "spine_module",
        "tail_01_ctrl",
        "tail_01_BIND_out_dcmpM",
    ] {
        assert!(s.find_node(name).is_none(), "{name} survived the rollback");
    }
    let tail_root = s.find_node("tail_01_BIND").unwrap();
    assert!(s.source(&Plug::new(tail_root, "translate")).is_none());
    // the root is not rolled back
    assert!(s.find_node("root_container").is_some());
    assert!(s.find_node("GOD_ctrl").is_some());

    s.disconnect(&rotate).unwrap();
    let report = batch_build(&mut s, &cfg).unwrap();
    assert_eq!(report.built(), ["tail", "spine"]);
}

#[test]
fn scenes_without_scaffolds_build_nothing() {
    let cfg = RigConfig::default();
    let mut s = InMemoryScene::new();
    let report = batch_build(&mut s, &cfg).unwrap();
    assert!(report.modules.is_empty());
    assert!(s.is_empty());
}
