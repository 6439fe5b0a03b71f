use super::*;
use crate::graph::memory::InMemoryScene;
use crate::graph::model::AttrValue;
use approx::assert_relative_eq;

#[test]
fn chain_is_nested_and_spaced() {
    let mut s = InMemoryScene::new();
    let chain = make_joint_chain(&mut s, "tail", 3, "BIND", 1.0).unwrap();
    assert_eq!(s.node_name(chain[2]).unwrap(), "tail_03_BIND");
    assert_eq!(s.parent(chain[1]).unwrap(), Some(chain[0]));
    let w = s.world_matrix(chain[2]).unwrap();
    assert_relative_eq!(w[(0, 3)], 20.0);
}

#[test]
fn orients_fold_into_rotation() {
    let mut s = InMemoryScene::new();
    let chain = make_joint_chain(&mut s, "arm", 2, "BIND", 1.0).unwrap();
    s.set_attr(
        &Plug::new(chain[0], "jointOrient"),
        Vec3::new(0.0, 0.0, 0.5).into(),
    )
    .unwrap();
    s.set_attr(
        &Plug::new(chain[1], "jointOrient"),
        Vec3::new(0.2, 0.0, 0.0).into(),
    )
    .unwrap();
    let before: Vec<_> = chain.iter().map(|j| s.world_matrix(*j).unwrap()).collect();

    clean_joint_orients(&mut s, &chain).unwrap();

    for (j, w) in chain.iter().zip(&before) {
        assert_relative_eq!(s.world_matrix(*j).unwrap(), *w, epsilon = 1e-9);
        assert_eq!(
            s.get_attr(&Plug::new(*j, "jointOrient")).unwrap(),
            AttrValue::Vec3(Vec3::zeros())
        );
    }
}

#[test]
fn scale_compensation_is_switched_off() {
    let mut s = InMemoryScene::new();
    let chain = make_joint_chain(&mut s, "neck", 2, "BIND", 1.0).unwrap();
    clean_scale_compensate(&mut s, &chain).unwrap();
    let compensate = Plug::new(chain[1], "segmentScaleCompensate");
    assert_eq!(s.get_attr(&compensate).unwrap(), AttrValue::Bool(false));
}
