use super::*;
use crate::graph::model::NodeId;

#[test]
fn tags_round_trip() {
    for t in ModuleType::ALL {
        assert_eq!(ModuleType::from_tag(t.tag()).unwrap(), t);
        assert_eq!(t.to_string().parse::<ModuleType>().unwrap(), t);
    }
}

#[test]
fn unknown_tags_list_the_known_ones() {
    let err = ModuleType::from_tag("spline_ik").unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, RigError::Configuration(_)));
    assert!(msg.contains("spline_ik"));
    assert!(msg.contains("two_bone_ik"));
}

#[test]
fn serde_uses_the_tag_spelling() {
    let json = serde_json::to_string(&ModuleType::SpaceSwitchChain).unwrap();
    assert_eq!(json, "\"space_switch_chain\"");
    let back: ModuleType = serde_json::from_str("\"simple_fk\"").unwrap();
    assert_eq!(back, ModuleType::SimpleFk);
}

#[test]
fn instantiate_picks_the_matching_module() {
    for t in ModuleType::ALL {
        let base = ModuleBase::from_parts("m", vec![NodeId(0), NodeId(1), NodeId(2)], None, true);
        let m = t.instantiate(base);
        assert_eq!(m.module_type(), t);
        assert_eq!(m.base().name, "m");
    }
}

#[test]
fn module_types_set_their_flags() {
    let base = || ModuleBase::from_parts("m", vec![NodeId(0)], None, true);
    let uses_global = |ty: ModuleType| ty.instantiate(base()).base().flags.uses_global_plug;
    assert!(!uses_global(ModuleType::SimpleFk));
    assert!(uses_global(ModuleType::SpaceSwitchChain));
    assert!(uses_global(ModuleType::TwoBoneIk));
}
