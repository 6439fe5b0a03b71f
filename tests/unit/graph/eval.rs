use super::*;
use approx::assert_relative_eq;
use std::f64::consts::FRAC_PI_2;

fn tr(t: Vec3) -> Mat4 {
    compose_trs(&t, &Vec3::zeros(), &Vec3::repeat(1.0))
}

#[test]
fn world_is_parent_world_times_local() {
    let mut s = InMemoryScene::new();
    let a = s.create_node(NodeKind::Transform, "a").unwrap();
    let b = s.create_node(NodeKind::Transform, "b").unwrap();
    s.set_parent(b, Some(a)).unwrap();
    s.set_attr(
        &Plug::new(a, "rotate"),
        Vec3::new(0.0, 0.0, FRAC_PI_2).into(),
    )
    .unwrap();
    s.set_attr(&Plug::new(b, "translate"), Vec3::new(2.0, 0.0, 0.0).into())
        .unwrap();

    let w = s.world_matrix(b).unwrap();
    assert_relative_eq!(w[(0, 3)], 0.0, epsilon = 1e-12);
    assert_relative_eq!(w[(1, 3)], 2.0, epsilon = 1e-12);

    s.set_attr(&Plug::new(b, "inheritsTransform"), false.into())
        .unwrap();
    assert_relative_eq!(
        s.world_matrix(b).unwrap(),
        tr(Vec3::new(2.0, 0.0, 0.0)),
        epsilon = 1e-12
    );
}

#[test]
fn joint_orient_precedes_rotation() {
    let mut s = InMemoryScene::new();
    let j = s.create_node(NodeKind::Joint, "j").unwrap();
    let jo = Vec3::new(0.0, 0.0, FRAC_PI_2);
    let r = Vec3::new(0.3, 0.0, 0.0);
    s.set_attr(&Plug::new(j, "jointOrient"), jo.into()).unwrap();
    s.set_attr(&Plug::new(j, "rotate"), r.into()).unwrap();

    let expected = (euler_to_rotation(&jo) * euler_to_rotation(&r)).to_homogeneous();
    assert_relative_eq!(s.world_matrix(j).unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn segment_scale_compensation_cancels_parent_scale() {
    let mut s = InMemoryScene::new();
    let a = s.create_node(NodeKind::Joint, "a").unwrap();
    let b = s.create_node(NodeKind::Joint, "b").unwrap();
    s.set_parent(b, Some(a)).unwrap();
    s.set_attr(&Plug::new(a, "scale"), Vec3::repeat(2.0).into())
        .unwrap();
    s.set_attr(&Plug::new(b, "translate"), Vec3::new(5.0, 0.0, 0.0).into())
        .unwrap();

    let w = s.world_matrix(b).unwrap();
    assert_relative_eq!(w[(0, 3)], 10.0, epsilon = 1e-12);
    assert_relative_eq!(w[(0, 0)], 1.0, epsilon = 1e-12);

    s.set_attr(&Plug::new(b, "segmentScaleCompensate"), false.into())
        .unwrap();
    assert_relative_eq!(s.world_matrix(b).unwrap()[(0, 0)], 2.0, epsilon = 1e-12);
}

#[test]
fn mult_matrix_applies_first_input_first() {
    let mut s = InMemoryScene::new();
    let m = s.create_node(NodeKind::MultMatrix, "m").unwrap();
    let rot = compose_trs(
        &Vec3::zeros(),
        &Vec3::new(0.0, 0.0, FRAC_PI_2),
        &Vec3::repeat(1.0),
    );
    s.set_attr(&Plug::new(m, "matrixIn").at(0), tr(Vec3::x()).into())
        .unwrap();
    s.set_attr(&Plug::new(m, "matrixIn").at(1), rot.into())
        .unwrap();

    let out = s.evaluate_matrix(&Plug::new(m, "matrixSum")).unwrap();
    assert_relative_eq!(out, rot * tr(Vec3::x()), epsilon = 1e-12);
    assert_relative_eq!(out[(1, 3)], 1.0, epsilon = 1e-12);
}

#[test]
fn decompose_drives_transform_channels() {
    let mut s = InMemoryScene::new();
    let src = s.create_node(NodeKind::Transform, "src").unwrap();
    let dst = s.create_node(NodeKind::Transform, "dst").unwrap();
    let d = s.create_node(NodeKind::DecomposeMatrix, "d").unwrap();
    s.set_attr(
        &Plug::new(src, "translate"),
        Vec3::new(1.0, 2.0, 3.0).into(),
    )
    .unwrap();
    s.set_attr(&Plug::new(src, "rotate"), Vec3::new(0.1, 0.2, 0.3).into())
        .unwrap();
    s.connect(&Plug::new(src, "worldMatrix"), &Plug::new(d, "inputMatrix"))
        .unwrap();
    for (o, i) in [("outputTranslate", "translate"), ("outputRotate", "rotate")] {
        s.connect(&Plug::new(d, o), &Plug::new(dst, i)).unwrap();
    }
    assert_relative_eq!(
        s.world_matrix(dst).unwrap(),
        s.world_matrix(src).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn scalar_operators() {
    let mut s = InMemoryScene::new();
    let f = s
        .create_node(NodeKind::FloatMath(FloatOp::Divide), "f")
        .unwrap();
    s.set_attr(&Plug::new(f, "floatA"), 9.0.into()).unwrap();
    s.set_attr(&Plug::new(f, "floatB"), 2.0.into()).unwrap();
    assert_eq!(s.evaluate_float(&Plug::new(f, "outFloat")).unwrap(), 4.5);

    let c = s.create_node(NodeKind::Clamp, "c").unwrap();
    s.connect(&Plug::new(f, "outFloat"), &Plug::new(c, "input"))
        .unwrap();
    s.set_attr(&Plug::new(c, "max"), 3.0.into()).unwrap();
    assert_eq!(s.evaluate_float(&Plug::new(c, "output")).unwrap(), 3.0);

    let b = s.create_node(NodeKind::BlendTwoAttr, "b").unwrap();
    s.set_attr(&Plug::new(b, "input").at(0), 1.0.into())
        .unwrap();
    s.set_attr(&Plug::new(b, "input").at(1), 100.0.into())
        .unwrap();
    s.set_attr(&Plug::new(b, "attributesBlender"), 1.0.into())
        .unwrap();
    assert_eq!(s.evaluate_float(&Plug::new(b, "output")).unwrap(), 100.0);

    let r = s.create_node(NodeKind::Reverse, "r").unwrap();
    s.set_attr(&Plug::new(r, "input"), 0.25.into()).unwrap();
    assert_eq!(s.evaluate_float(&Plug::new(r, "output")).unwrap(), 0.75);

    let acos = s
        .create_node(NodeKind::FloatMath(FloatOp::Acos), "acos")
        .unwrap();
    s.set_attr(&Plug::new(acos, "floatA"), (-3.0).into())
        .unwrap();
    assert_relative_eq!(
        s.evaluate_float(&Plug::new(acos, "outFloat")).unwrap(),
        std::f64::consts::PI
    );
}

#[test]
fn dot_product_fills_every_component() {
    let mut s = InMemoryScene::new();
    let v = s
        .create_node(NodeKind::VectorProduct(VectorOp::Dot), "v")
        .unwrap();
    s.set_attr(&Plug::new(v, "input1"), Vec3::new(1.0, 2.0, 3.0).into())
        .unwrap();
    s.set_attr(&Plug::new(v, "input2"), Vec3::new(4.0, 5.0, 6.0).into())
        .unwrap();
    assert_eq!(
        s.evaluate_vec3(&Plug::new(v, "output")).unwrap(),
        Vec3::repeat(32.0)
    );
    assert_eq!(
        s.evaluate_float(&Plug::new(v, "output").component(Axis::Z))
            .unwrap(),
        32.0
    );
}

#[test]
fn component_connections_on_the_same_node() {
    let mut s = InMemoryScene::new();
    let g = s.create_node(NodeKind::Control, "god").unwrap();
    for axis in [Axis::X, Axis::Z] {
        s.connect(
            &Plug::new(g, "scale").component(Axis::Y),
            &Plug::new(g, "scale").component(axis),
        )
        .unwrap();
    }
    s.set_attr(&Plug::new(g, "scale").component(Axis::Y), 3.0.into())
        .unwrap();
    assert_eq!(
        s.evaluate_vec3(&Plug::new(g, "scale")).unwrap(),
        Vec3::repeat(3.0)
    );
}

#[test]
fn cycles_are_reported() {
    let mut s = InMemoryScene::new();
    let a = s.create_node(NodeKind::MultMatrix, "a").unwrap();
    let b = s.create_node(NodeKind::InverseMatrix, "b").unwrap();
    s.connect(&Plug::new(a, "matrixSum"), &Plug::new(b, "inputMatrix"))
        .unwrap();
    s.connect(
        &Plug::new(b, "outputMatrix"),
        &Plug::new(a, "matrixIn").at(0),
    )
    .unwrap();
    let err = s.evaluate(&Plug::new(a, "matrixSum")).unwrap_err();
    assert!(err.to_string().contains("cycle detected"));
}
