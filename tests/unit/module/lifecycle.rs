use super::*;
use crate::config::prefs::RigConfig;
use crate::graph::memory::InMemoryScene;
use crate::module::root::RootModule;
use crate::scaffold::scaffold::{Scaffold, ScaffoldOptions};

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

fn unassigned(s: &mut InMemoryScene, cfg: &RigConfig) -> Box<dyn Module> {
    let opts = ScaffoldOptions {
        name: "tail".to_string(),
        length: 2,
        ..ScaffoldOptions::default()
    };
    let sc = Scaffold::make(s, cfg, &opts).unwrap();
    let info = sc.info(s, cfg).unwrap();
    ModuleType::Unassigned.instantiate(ModuleBase::new(&info))
}

#[test]
fn stages_chain_their_states() {
    for pair in Stage::ALL.windows(2) {
        assert_eq!(pair[0].reaches(), pair[1].requires());
    }
    assert_eq!(Stage::Register.requires(), ModuleState::Constructed);
    assert_eq!(Stage::Encapsulate.reaches(), ModuleState::Encapsulated);
    assert_eq!(Stage::PreBuild.to_string(), "preBuild");
    assert_eq!(Stage::Register.to_string(), "registerModule");
    assert_eq!(Stage::Build.progress(), "building");
}

#[test]
fn stages_out_of_order_are_rejected() {
    let (mut s, cfg, mut ctx) = rooted();
    let mut m = unassigned(&mut s, &cfg);

    let err = run_stage(m.as_mut(), Stage::Build, &mut s, &mut ctx).unwrap_err();
    assert!(matches!(err, RigError::Lifecycle { ref module, .. } if module == "tail"));
    assert_eq!(m.base().state(), ModuleState::Constructed);

    run_stage(m.as_mut(), Stage::Register, &mut s, &mut ctx).unwrap();
    let err = run_stage(m.as_mut(), Stage::Register, &mut s, &mut ctx).unwrap_err();
    assert!(matches!(err, RigError::Lifecycle { .. }));
    assert_eq!(m.base().state(), ModuleState::Registered);
}

#[test]
fn run_all_reaches_encapsulated() {
    let (mut s, cfg, mut ctx) = rooted();
    let mut m = unassigned(&mut s, &cfg);
    run_all(m.as_mut(), &mut s, &mut ctx).unwrap();
    assert_eq!(m.base().state(), ModuleState::Encapsulated);
    assert!(m.base().container().is_some());

    // already complete: nothing left to run
    run_all(m.as_mut(), &mut s, &mut ctx).unwrap();
    assert_eq!(m.base().state(), ModuleState::Encapsulated);
}

#[test]
fn graph_failures_are_attributed_to_the_module() {
    let (mut s, cfg, mut ctx) = rooted();
    let mut m = unassigned(&mut s, &cfg);
    run_stage(m.as_mut(), Stage::Register, &mut s, &mut ctx).unwrap();

    let joint = m.base().chain[0];
    s.delete_node(joint).unwrap();
    let err = run_stage(m.as_mut(), Stage::PreBuild, &mut s, &mut ctx).unwrap_err();
    assert!(matches!(err, RigError::Structural { ref module, .. } if module == "tail"));
    assert_eq!(m.base().state(), ModuleState::Registered);
}
