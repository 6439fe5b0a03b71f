//! Emission helpers: create one operator node, feed its inputs and return its output plug.
//!
//! Every input is either an upstream plug (connected) or a constant (set).

use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{Axis, Mat4, Vec3};
use crate::graph::model::{
    AttrValue, AverageOp, FloatOp, NodeId, NodeKind, Plug, ProductOp, VectorOp,
};
use crate::graph::scene::SceneGraph;

#[derive(Clone, Debug, PartialEq)]
/// Operator input: an upstream plug or a constant.
pub enum Input {
    /// Connect from this plug.
    Plug(Plug),
    /// Set this constant.
    Value(AttrValue),
}

impl From<Plug> for Input {
    fn from(p: Plug) -> Self {
        Input::Plug(p)
    }
}

impl From<&Plug> for Input {
    fn from(p: &Plug) -> Self {
        Input::Plug(p.clone())
    }
}

impl From<f64> for Input {
    fn from(v: f64) -> Self {
        Input::Value(AttrValue::Float(v))
    }
}

impl From<bool> for Input {
    fn from(v: bool) -> Self {
        Input::Value(AttrValue::Bool(v))
    }
}

impl From<Vec3> for Input {
    fn from(v: Vec3) -> Self {
        Input::Value(AttrValue::Vec3(v))
    }
}

impl From<Mat4> for Input {
    fn from(v: Mat4) -> Self {
        Input::Value(AttrValue::Matrix(v))
    }
}

/// Connect or set `input` into `dst`.
pub fn feed(scene: &mut dyn SceneGraph, input: impl Into<Input>, dst: &Plug) -> RigResult<()> {
    match input.into() {
        Input::Plug(src) => scene.connect(&src, dst),
        Input::Value(v) => scene.set_attr(dst, v),
    }
}

fn node(scene: &mut dyn SceneGraph, kind: NodeKind, name: &str) -> RigResult<NodeId> {
    scene.create_node(kind, name)
}

/// Product of `inputs`, the first applied first (`... * in[1] * in[0]`).
pub fn mult_matrix(scene: &mut dyn SceneGraph, name: &str, inputs: &[Input]) -> RigResult<Plug> {
    let n = node(scene, NodeKind::MultMatrix, name)?;
    for (i, input) in inputs.iter().enumerate() {
        feed(scene, input.clone(), &Plug::new(n, "matrixIn").at(i))?;
    }
    Ok(Plug::new(n, "matrixSum"))
}

#[derive(Clone, Debug)]
/// Output plugs of a decompose node.
pub struct Decomposed {
    /// The decompose node.
    pub node: NodeId,
    /// `outputTranslate`
    pub translate: Plug,
    /// `outputRotate`
    pub rotate: Plug,
    /// `outputScale`
    pub scale: Plug,
}

impl Decomposed {
    /// Output plug of a channel (`translate`, `rotate` or `scale`).
    pub fn channel(&self, channel: Channel) -> &Plug {
        match channel {
            Channel::Translate => &self.translate,
            Channel::Rotate => &self.rotate,
            Channel::Scale => &self.scale,
        }
    }
}

/// Split a matrix into translate / rotate / scale.
pub fn decompose(
    scene: &mut dyn SceneGraph,
    name: &str,
    matrix: impl Into<Input>,
) -> RigResult<Decomposed> {
    let n = node(scene, NodeKind::DecomposeMatrix, name)?;
    feed(scene, matrix, &Plug::new(n, "inputMatrix"))?;
    Ok(Decomposed {
        node: n,
        translate: Plug::new(n, "outputTranslate"),
        rotate: Plug::new(n, "outputRotate"),
        scale: Plug::new(n, "outputScale"),
    })
}

/// `T * R * S` from three vector inputs.
pub fn compose(
    scene: &mut dyn SceneGraph,
    name: &str,
    translate: impl Into<Input>,
    rotate: impl Into<Input>,
    scale: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::ComposeMatrix, name)?;
    feed(scene, translate, &Plug::new(n, "inputTranslate"))?;
    feed(scene, rotate, &Plug::new(n, "inputRotate"))?;
    feed(scene, scale, &Plug::new(n, "inputScale"))?;
    Ok(Plug::new(n, "outputMatrix"))
}

/// Matrix inverse.
pub fn inverse(
    scene: &mut dyn SceneGraph,
    name: &str,
    matrix: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::InverseMatrix, name)?;
    feed(scene, matrix, &Plug::new(n, "inputMatrix"))?;
    Ok(Plug::new(n, "outputMatrix"))
}

/// `sum(weight_i * matrix_i)`.
pub fn wt_add(scene: &mut dyn SceneGraph, name: &str, terms: &[(Input, Input)]) -> RigResult<Plug> {
    let n = node(scene, NodeKind::WtAddMatrix, name)?;
    for (i, (m, w)) in terms.iter().enumerate() {
        feed(scene, m.clone(), &Plug::new(n, "matrixIn").at(i))?;
        feed(scene, w.clone(), &Plug::new(n, "weightIn").at(i))?;
    }
    Ok(Plug::new(n, "matrixSum"))
}

/// Matrix from axis columns and a position.
pub fn four_by_four(
    scene: &mut dyn SceneGraph,
    name: &str,
    axes: [Input; 3],
    position: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::FourByFourMatrix, name)?;
    let [x, y, z] = axes;
    feed(scene, x, &Plug::new(n, "axisX"))?;
    feed(scene, y, &Plug::new(n, "axisY"))?;
    feed(scene, z, &Plug::new(n, "axisZ"))?;
    feed(scene, position, &Plug::new(n, "position"))?;
    Ok(Plug::new(n, "output"))
}

/// Vector product of two vectors, optionally normalised.
pub fn vector_product(
    scene: &mut dyn SceneGraph,
    name: &str,
    op: VectorOp,
    a: impl Into<Input>,
    b: impl Into<Input>,
    normalize: bool,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::VectorProduct(op), name)?;
    feed(scene, a, &Plug::new(n, "input1"))?;
    feed(scene, b, &Plug::new(n, "input2"))?;
    scene.set_attr(&Plug::new(n, "normalizeOutput"), normalize.into())?;
    Ok(Plug::new(n, "output"))
}

/// Unit vector of `v` (zero when `v` is zero).
pub fn normalize(scene: &mut dyn SceneGraph, name: &str, v: impl Into<Input>) -> RigResult<Plug> {
    vector_product(scene, name, VectorOp::NoOp, v, Vec3::zeros(), true)
}

/// Distance between two points.
pub fn distance(
    scene: &mut dyn SceneGraph,
    name: &str,
    a: impl Into<Input>,
    b: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::DistanceBetween, name)?;
    feed(scene, a, &Plug::new(n, "point1"))?;
    feed(scene, b, &Plug::new(n, "point2"))?;
    Ok(Plug::new(n, "distance"))
}

/// Scalar arithmetic.
pub fn float_math(
    scene: &mut dyn SceneGraph,
    name: &str,
    op: FloatOp,
    a: impl Into<Input>,
    b: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::FloatMath(op), name)?;
    feed(scene, a, &Plug::new(n, "floatA"))?;
    feed(scene, b, &Plug::new(n, "floatB"))?;
    Ok(Plug::new(n, "outFloat"))
}

/// Vector sum / difference / mean.
pub fn plus_minus(
    scene: &mut dyn SceneGraph,
    name: &str,
    op: AverageOp,
    inputs: &[Input],
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::PlusMinusAverage(op), name)?;
    for (i, input) in inputs.iter().enumerate() {
        feed(scene, input.clone(), &Plug::new(n, "input3D").at(i))?;
    }
    Ok(Plug::new(n, "output3D"))
}

/// Component-wise vector arithmetic.
pub fn multiply_divide(
    scene: &mut dyn SceneGraph,
    name: &str,
    op: ProductOp,
    a: impl Into<Input>,
    b: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::MultiplyDivide(op), name)?;
    feed(scene, a, &Plug::new(n, "input1"))?;
    feed(scene, b, &Plug::new(n, "input2"))?;
    Ok(Plug::new(n, "output"))
}

/// Scalar clamp to `[min, max]`.
pub fn clamp(
    scene: &mut dyn SceneGraph,
    name: &str,
    input: impl Into<Input>,
    min: impl Into<Input>,
    max: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::Clamp, name)?;
    feed(scene, input, &Plug::new(n, "input"))?;
    feed(scene, min, &Plug::new(n, "min"))?;
    feed(scene, max, &Plug::new(n, "max"))?;
    Ok(Plug::new(n, "output"))
}

/// `a * (1 - t) + b * t`.
pub fn blend_two(
    scene: &mut dyn SceneGraph,
    name: &str,
    a: impl Into<Input>,
    b: impl Into<Input>,
    t: impl Into<Input>,
) -> RigResult<Plug> {
    let n = node(scene, NodeKind::BlendTwoAttr, name)?;
    feed(scene, a, &Plug::new(n, "input").at(0))?;
    feed(scene, b, &Plug::new(n, "input").at(1))?;
    feed(scene, t, &Plug::new(n, "attributesBlender"))?;
    Ok(Plug::new(n, "output"))
}

/// `1 - input`.
pub fn reverse(scene: &mut dyn SceneGraph, name: &str, input: impl Into<Input>) -> RigResult<Plug> {
    let n = node(scene, NodeKind::Reverse, name)?;
    feed(scene, input, &Plug::new(n, "input"))?;
    Ok(Plug::new(n, "output"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Transform channel.
pub enum Channel {
    /// `translate`
    Translate,
    /// `rotate`
    Rotate,
    /// `scale`
    Scale,
}

impl Channel {
    /// All channels in order.
    pub const ALL: [Channel; 3] = [Channel::Translate, Channel::Rotate, Channel::Scale];

    /// Attribute name on a transform node.
    pub fn attr(self) -> &'static str {
        match self {
            Channel::Translate => "translate",
            Channel::Rotate => "rotate",
            Channel::Scale => "scale",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Per-channel, per-axis connections to leave out when driving a transform.
pub struct SkipAxes {
    skip: [[bool; 3]; 3],
}

impl SkipAxes {
    /// Drive everything.
    pub fn none() -> Self {
        Self::default()
    }

    /// Skip the axes named by `letters` (e.g. `"xz"`) on `channel`.
    pub fn with(mut self, channel: Channel, letters: &str) -> RigResult<Self> {
        for c in letters.chars() {
            let axis = Axis::from_letter(c).ok_or_else(|| {
                RigError::configuration(format!("'{c}' is not an axis letter"))
            })?;
            self.skip[channel as usize][axis.index()] = true;
        }
        Ok(self)
    }

    /// Skip a whole channel.
    pub fn without(mut self, channel: Channel) -> Self {
        self.skip[channel as usize] = [true; 3];
        self
    }

    /// Whether `axis` of `channel` is skipped.
    pub fn skips(&self, channel: Channel, axis: Axis) -> bool {
        self.skip[channel as usize][axis.index()]
    }
}

/// Connect decomposed channels into a transform's channels, honouring `skip`.
///
/// Fully driven channels use one whole connection; partially skipped ones are
/// connected per component.
pub fn drive_channels(
    scene: &mut dyn SceneGraph,
    src: &Decomposed,
    target: NodeId,
    skip: &SkipAxes,
) -> RigResult<()> {
    for channel in Channel::ALL {
        let from = src.channel(channel);
        let to = Plug::new(target, channel.attr());
        let driven: Vec<Axis> = Axis::ALL
            .into_iter()
            .filter(|a| !skip.skips(channel, *a))
            .collect();
        match driven.len() {
            0 => {}
            3 => scene.connect(from, &to)?,
            _ => {
                for a in driven {
                    scene.connect(&from.clone().component(a), &to.clone().component(a))?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/graph/ops.rs"]
mod tests;
