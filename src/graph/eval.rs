//! Pull evaluator for [`InMemoryScene`](crate::InMemoryScene).
//!
//! Values are computed lazily from the requested plug back through connections,
//! memoised for the duration of one query. Re-entering a computation that is still
//! in progress means the graph has a cycle and is reported as a graph error.

use std::collections::{HashMap, HashSet};

use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{
    Axis, Mat4, Vec3, basis_matrix, compose_trs, decompose_trs, euler_to_rotation,
    inverse_or_identity,
};
use crate::graph::memory::InMemoryScene;
use crate::graph::model::{
    AttrValue, AverageOp, FloatOp, NodeId, NodeKind, Plug, ProductOp, VectorOp,
};
use crate::graph::scene::SceneGraph;

type Outputs = Vec<(&'static str, AttrValue)>;

pub(crate) struct Evaluator<'a> {
    scene: &'a InMemoryScene,
    worlds: HashMap<NodeId, Mat4>,
    operators: HashMap<NodeId, Outputs>,
    active: HashSet<(NodeId, &'static str)>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(scene: &'a InMemoryScene) -> Self {
        Self {
            scene,
            worlds: HashMap::new(),
            operators: HashMap::new(),
            active: HashSet::new(),
        }
    }

    /// Value of any plug: outputs are computed, inputs follow their connections.
    pub(crate) fn value(&mut self, plug: &Plug) -> RigResult<AttrValue> {
        if !self.scene.attribute(plug)?.output {
            return self.input(plug);
        }
        let whole = self.output(plug.node, &plug.attr)?;
        Ok(pick_component(whole, plug))
    }

    fn input(&mut self, plug: &Plug) -> RigResult<AttrValue> {
        let template = self.scene.attribute(plug)?.default.clone();

        if plug.axis.is_some() {
            if let Some(src) = self.scene.source(plug) {
                return self.scalar_from(&src, plug);
            }
            if let Some(src) = self.scene.source(&plug.whole()) {
                let whole = self.value(&src)?;
                return Ok(pick_component(whole, plug));
            }
            return self.scene.get_attr(plug);
        }

        if let Some(src) = self.scene.source(plug) {
            let v = self.value(&src)?;
            return v.coerce_like(&template).ok_or_else(|| {
                RigError::graph(format!(
                    "{} cannot feed {}",
                    self.scene.describe(&src),
                    self.scene.describe(plug)
                ))
            });
        }

        let stored = self.scene.get_attr(plug)?;
        if let AttrValue::Vec3(mut v) = stored {
            for axis in Axis::ALL {
                let comp = plug.clone().component(axis);
                if let Some(src) = self.scene.source(&comp) {
                    v[axis.index()] = self.scalar_from(&src, &comp)?.as_float().unwrap_or(0.0);
                }
            }
            return Ok(AttrValue::Vec3(v));
        }
        Ok(stored)
    }

    fn scalar_from(&mut self, src: &Plug, dst: &Plug) -> RigResult<AttrValue> {
        let v = self.value(src)?;
        v.as_float().map(AttrValue::Float).ok_or_else(|| {
            RigError::graph(format!(
                "{} cannot feed component {}",
                self.scene.describe(src),
                self.scene.describe(dst)
            ))
        })
    }

    fn float_in(&mut self, node: NodeId, attr: &str) -> RigResult<f64> {
        let value = self.input(&Plug::new(node, attr))?;
        Ok(value.as_float().unwrap_or(0.0))
    }

    fn bool_in(&mut self, node: NodeId, attr: &str) -> RigResult<bool> {
        let value = self.input(&Plug::new(node, attr))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn vec_in(&mut self, node: NodeId, attr: &str) -> RigResult<Vec3> {
        Ok(self
            .input(&Plug::new(node, attr))?
            .as_vec3()
            .unwrap_or_else(Vec3::zeros))
    }

    fn mat_in(&mut self, plug: &Plug) -> RigResult<Mat4> {
        Ok(self.input(plug)?.as_matrix().unwrap_or_else(Mat4::identity))
    }

    fn enter(&mut self, node: NodeId, what: &'static str) -> RigResult<()> {
        if !self.active.insert((node, what)) {
            return Err(RigError::graph(format!(
                "cycle detected while evaluating '{}' ({what})",
                self.scene.node_name(node)?
            )));
        }
        Ok(())
    }

    fn leave(&mut self, node: NodeId, what: &'static str) {
        self.active.remove(&(node, what));
    }

    fn output(&mut self, node: NodeId, attr: &str) -> RigResult<AttrValue> {
        let kind = self.scene.node_kind(node)?;
        if kind.is_dag() {
            let m = match attr {
                "matrix" => self.local(node)?,
                "worldMatrix" => self.world(node)?,
                "worldInverseMatrix" => inverse_or_identity(&self.world(node)?),
                "parentMatrix" => self.parent_world(node)?,
                "parentInverseMatrix" => inverse_or_identity(&self.parent_world(node)?),
                other => {
                    return Err(RigError::graph(format!(
                        "'{}' has no computed attribute '{other}'",
                        self.scene.node_name(node)?
                    )));
                }
            };
            return Ok(AttrValue::Matrix(m));
        }

        if !self.operators.contains_key(&node) {
            self.enter(node, "compute")?;
            let computed = self.compute(node, kind);
            self.leave(node, "compute");
            self.operators.insert(node, computed?);
        }
        self.operators
            .get(&node)
            .and_then(|outs| outs.iter().find(|(n, _)| *n == attr))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                RigError::graph(format!("operator {node} has no output '{attr}'"))
            })
    }

    fn parent_world(&mut self, node: NodeId) -> RigResult<Mat4> {
        match self.scene.parent(node)? {
            Some(p) => self.world(p),
            None => Ok(Mat4::identity()),
        }
    }

    fn world(&mut self, node: NodeId) -> RigResult<Mat4> {
        if let Some(w) = self.worlds.get(&node) {
            return Ok(*w);
        }
        self.enter(node, "world")?;
        let result = self.world_uncached(node);
        self.leave(node, "world");
        let w = result?;
        self.worlds.insert(node, w);
        Ok(w)
    }

    fn world_uncached(&mut self, node: NodeId) -> RigResult<Mat4> {
        let local = self.local(node)?;
        let kind = self.scene.node_kind(node)?;
        let inherits = !kind.is_transform() || self.bool_in(node, "inheritsTransform")?;
        if inherits {
            Ok(self.parent_world(node)? * local)
        } else {
            Ok(local)
        }
    }

    fn local(&mut self, node: NodeId) -> RigResult<Mat4> {
        let kind = self.scene.node_kind(node)?;
        if !kind.is_transform() {
            return Ok(Mat4::identity());
        }
        self.enter(node, "local")?;
        let result = self.local_uncached(node, kind);
        self.leave(node, "local");
        result
    }

    fn local_uncached(&mut self, node: NodeId, kind: NodeKind) -> RigResult<Mat4> {
        let opm = self.mat_in(&Plug::new(node, "offsetParentMatrix"))?;
        let t = self.vec_in(node, "translate")?;
        let r = self.vec_in(node, "rotate")?;
        let s = self.vec_in(node, "scale")?;

        if kind != NodeKind::Joint {
            return Ok(opm * compose_trs(&t, &r, &s));
        }

        let mut m = opm * compose_trs(&t, &Vec3::zeros(), &Vec3::repeat(1.0));
        if self.bool_in(node, "segmentScaleCompensate")? {
            if let Some(p) = self.scene.parent(node)? {
                if self.scene.node_kind(p)? == NodeKind::Joint {
                    let ps = self.vec_in(p, "scale")?;
                    let inv = ps.map(|c| if c.abs() > f64::EPSILON { 1.0 / c } else { 1.0 });
                    m *= compose_trs(&Vec3::zeros(), &Vec3::zeros(), &inv);
                }
            }
        }
        let jo = self.vec_in(node, "jointOrient")?;
        let rot = euler_to_rotation(&jo) * euler_to_rotation(&r);
        let mut rs = Mat4::identity();
        rs.fixed_view_mut::<3, 3>(0, 0).copy_from(&rot);
        Ok(m * rs * compose_trs(&Vec3::zeros(), &Vec3::zeros(), &s))
    }

    fn compute(&mut self, node: NodeId, kind: NodeKind) -> RigResult<Outputs> {
        let out: Outputs = match kind {
            NodeKind::MultMatrix => {
                let mut acc = Mat4::identity();
                for i in self.scene.multi_indices(node, "matrixIn")? {
                    let m = self.mat_in(&Plug::new(node, "matrixIn").at(i))?;
                    acc = m * acc;
                }
                vec![("matrixSum", acc.into())]
            }
            NodeKind::DecomposeMatrix => {
                let m = self.mat_in(&Plug::new(node, "inputMatrix"))?;
                let trs = decompose_trs(&m);
                vec![
                    ("outputTranslate", trs.translate.into()),
                    ("outputRotate", trs.rotate.into()),
                    ("outputScale", trs.scale.into()),
                ]
            }
            NodeKind::ComposeMatrix => {
                let t = self.vec_in(node, "inputTranslate")?;
                let r = self.vec_in(node, "inputRotate")?;
                let s = self.vec_in(node, "inputScale")?;
                vec![("outputMatrix", compose_trs(&t, &r, &s).into())]
            }
            NodeKind::InverseMatrix => {
                let m = self.mat_in(&Plug::new(node, "inputMatrix"))?;
                vec![("outputMatrix", inverse_or_identity(&m).into())]
            }
            NodeKind::WtAddMatrix => {
                let mut idx = self.scene.multi_indices(node, "matrixIn")?;
                idx.extend(self.scene.multi_indices(node, "weightIn")?);
                idx.sort_unstable();
                idx.dedup();
                let mut acc = Mat4::zeros();
                for i in idx {
                    let m = self.mat_in(&Plug::new(node, "matrixIn").at(i))?;
                    let w = self
                        .input(&Plug::new(node, "weightIn").at(i))?
                        .as_float()
                        .unwrap_or(0.0);
                    acc += m * w;
                }
                vec![("matrixSum", acc.into())]
            }
            NodeKind::FourByFourMatrix => {
                let x = self.vec_in(node, "axisX")?;
                let y = self.vec_in(node, "axisY")?;
                let z = self.vec_in(node, "axisZ")?;
                let p = self.vec_in(node, "position")?;
                vec![("output", basis_matrix(&x, &y, &z, &p).into())]
            }
            NodeKind::VectorProduct(op) => {
                let a = self.vec_in(node, "input1")?;
                let b = self.vec_in(node, "input2")?;
                let m = self.mat_in(&Plug::new(node, "matrix"))?;
                let normalize = self.bool_in(node, "normalizeOutput")?;
                vec![("output", vector_product(op, a, b, &m, normalize).into())]
            }
            NodeKind::DistanceBetween => {
                let a = self.vec_in(node, "point1")?;
                let b = self.vec_in(node, "point2")?;
                vec![("distance", (b - a).norm().into())]
            }
            NodeKind::FloatMath(op) => {
                let a = self.float_in(node, "floatA")?;
                let b = self.float_in(node, "floatB")?;
                vec![("outFloat", float_math(op, a, b).into())]
            }
            NodeKind::PlusMinusAverage(op) => {
                let mut inputs = Vec::new();
                for i in self.scene.multi_indices(node, "input3D")? {
                    let v = self.input(&Plug::new(node, "input3D").at(i))?;
                    inputs.push(v.as_vec3().unwrap_or_else(Vec3::zeros));
                }
                vec![("output3D", plus_minus(op, &inputs).into())]
            }
            NodeKind::MultiplyDivide(op) => {
                let a = self.vec_in(node, "input1")?;
                let b = self.vec_in(node, "input2")?;
                let out = a.zip_map(&b, |x, y| match op {
                    ProductOp::Multiply => x * y,
                    ProductOp::Divide if y == 0.0 => 0.0,
                    ProductOp::Divide => x / y,
                    ProductOp::Power => x.powf(y),
                });
                vec![("output", out.into())]
            }
            NodeKind::Clamp => {
                let v = self.float_in(node, "input")?;
                let lo = self.float_in(node, "min")?;
                let hi = self.float_in(node, "max")?;
                vec![("output", v.max(lo).min(hi).into())]
            }
            NodeKind::BlendTwoAttr => {
                let a = self.input(&Plug::new(node, "input").at(0))?;
                let b = self.input(&Plug::new(node, "input").at(1))?;
                let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
                let t = self.float_in(node, "attributesBlender")?;
                vec![("output", (a * (1.0 - t) + b * t).into())]
            }
            NodeKind::Reverse => {
                let v = self.float_in(node, "input")?;
                vec![("output", (1.0 - v).into())]
            }
            NodeKind::Container
            | NodeKind::Transform
            | NodeKind::Joint
            | NodeKind::Control
            | NodeKind::Shape => Vec::new(),
        };
        Ok(out)
    }
}

fn pick_component(value: AttrValue, plug: &Plug) -> AttrValue {
    match (plug.axis, &value) {
        (Some(a), AttrValue::Vec3(v)) => AttrValue::Float(v[a.index()]),
        _ => value,
    }
}

fn vector_product(op: VectorOp, a: Vec3, b: Vec3, m: &Mat4, normalize: bool) -> Vec3 {
    let unit = |v: Vec3| v.try_normalize(1.0e-12).unwrap_or_else(Vec3::zeros);
    let v = match op {
        VectorOp::NoOp => a,
        VectorOp::Dot => {
            let (a, b) = if normalize { (unit(a), unit(b)) } else { (a, b) };
            return Vec3::repeat(a.dot(&b));
        }
        VectorOp::Cross => a.cross(&b),
        VectorOp::PointMatrix => m.transform_point(&a.into()).coords,
        VectorOp::VectorMatrix => m.transform_vector(&a),
    };
    if normalize { unit(v) } else { v }
}

fn float_math(op: FloatOp, a: f64, b: f64) -> f64 {
    match op {
        FloatOp::Add => a + b,
        FloatOp::Subtract => a - b,
        FloatOp::Multiply => a * b,
        FloatOp::Divide if b == 0.0 => 0.0,
        FloatOp::Divide => a / b,
        FloatOp::Min => a.min(b),
        FloatOp::Max => a.max(b),
        FloatOp::Power => a.powf(b),
        FloatOp::Acos => a.clamp(-1.0, 1.0).acos(),
    }
}

fn plus_minus(op: AverageOp, inputs: &[Vec3]) -> Vec3 {
    match (op, inputs.split_first()) {
        (_, None) => Vec3::zeros(),
        (AverageOp::Sum, Some(_)) => inputs.iter().sum(),
        (AverageOp::Subtract, Some((first, rest))) => rest.iter().fold(*first, |acc, v| acc - v),
        (AverageOp::Average, Some(_)) => inputs.iter().sum::<Vec3>() / inputs.len() as f64,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/eval.rs"]
mod tests;
