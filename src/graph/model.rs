use std::collections::BTreeMap;
use std::fmt;

use crate::foundation::math::{Axis, Mat4, Vec3};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
/// Stable handle of a node inside one scene.
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Operation of a `VectorProduct` node.
pub enum VectorOp {
    /// Pass `input1` through.
    NoOp,
    /// `input1 . input2`, written to all three output components.
    Dot,
    /// `input1 x input2`.
    Cross,
    /// Transform `input1` as a point by `matrix`.
    PointMatrix,
    /// Transform `input1` as a direction by `matrix`.
    VectorMatrix,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Operation of a `FloatMath` node.
pub enum FloatOp {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b` (0 when `b` is 0)
    Divide,
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
    /// `a ^ b`
    Power,
    /// `acos(clamp(a, -1, 1))`
    Acos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Operation of a `PlusMinusAverage` node.
pub enum AverageOp {
    /// Sum of all inputs.
    Sum,
    /// First input minus the rest.
    Subtract,
    /// Mean of all inputs.
    Average,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Operation of a `MultiplyDivide` node.
pub enum ProductOp {
    /// Component-wise product.
    Multiply,
    /// Component-wise quotient (0 where the divisor is 0).
    Divide,
    /// Component-wise power.
    Power,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Type of a scene node.
///
/// The first four kinds live in the transform hierarchy (DAG); `Container` and
/// the operator kinds are dataflow-only.
pub enum NodeKind {
    /// Group / null.
    Transform,
    /// Skeleton joint.
    Joint,
    /// Controller transform carrying its own curve points.
    Control,
    /// Display-only curve parented under a transform.
    Shape,
    /// Published module container.
    Container,
    /// Product of `matrixIn[]`, index 0 applied first.
    MultMatrix,
    /// Matrix to translate / rotate / scale.
    DecomposeMatrix,
    /// Translate / rotate / scale to matrix.
    ComposeMatrix,
    /// Matrix inverse.
    InverseMatrix,
    /// Weighted sum of matrices.
    WtAddMatrix,
    /// Matrix from three axis columns and a position.
    FourByFourMatrix,
    /// Vector product.
    VectorProduct(VectorOp),
    /// Distance between two points.
    DistanceBetween,
    /// Scalar arithmetic.
    FloatMath(FloatOp),
    /// Sum / difference / mean of vectors.
    PlusMinusAverage(AverageOp),
    /// Component-wise vector arithmetic.
    MultiplyDivide(ProductOp),
    /// Scalar clamp.
    Clamp,
    /// Linear blend of two scalars.
    BlendTwoAttr,
    /// `1 - input`.
    Reverse,
}

impl NodeKind {
    /// Whether the node takes part in the parent/child hierarchy.
    pub fn is_dag(self) -> bool {
        matches!(
            self,
            NodeKind::Transform | NodeKind::Joint | NodeKind::Control | NodeKind::Shape
        )
    }

    /// Whether the node carries translate / rotate / scale channels.
    pub fn is_transform(self) -> bool {
        matches!(
            self,
            NodeKind::Transform | NodeKind::Joint | NodeKind::Control
        )
    }

    /// Host-style type name.
    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::Transform => "transform",
            NodeKind::Joint => "joint",
            NodeKind::Control => "control",
            NodeKind::Shape => "shape",
            NodeKind::Container => "container",
            NodeKind::MultMatrix => "multMatrix",
            NodeKind::DecomposeMatrix => "decomposeMatrix",
            NodeKind::ComposeMatrix => "composeMatrix",
            NodeKind::InverseMatrix => "inverseMatrix",
            NodeKind::WtAddMatrix => "wtAddMatrix",
            NodeKind::FourByFourMatrix => "fourByFourMatrix",
            NodeKind::VectorProduct(_) => "vectorProduct",
            NodeKind::DistanceBetween => "distanceBetween",
            NodeKind::FloatMath(_) => "floatMath",
            NodeKind::PlusMinusAverage(_) => "plusMinusAverage",
            NodeKind::MultiplyDivide(_) => "multiplyDivide",
            NodeKind::Clamp => "clamp",
            NodeKind::BlendTwoAttr => "blendTwoAttr",
            NodeKind::Reverse => "reverse",
        }
    }

    /// Built-in attributes of a freshly created node.
    pub fn builtin_attrs(self) -> BTreeMap<String, Attribute> {
        let zeros = || AttrValue::Vec3(Vec3::zeros());
        let ones = || AttrValue::Vec3(Vec3::repeat(1.0));
        let identity = || AttrValue::Matrix(Mat4::identity());
        let mut attrs = BTreeMap::new();
        let mut put = |name: &str, attr: Attribute| {
            attrs.insert(name.to_string(), attr);
        };

        if self.is_dag() {
            put("visibility", Attribute::input(AttrValue::Bool(true)));
            put("overrideEnabled", Attribute::input(AttrValue::Bool(false)));
            put("overrideColor", Attribute::input(zeros()));
            for out in [
                "matrix",
                "worldMatrix",
                "worldInverseMatrix",
                "parentMatrix",
                "parentInverseMatrix",
            ] {
                put(out, Attribute::output(identity()));
            }
        }
        if self.is_transform() {
            put("translate", Attribute::input(zeros()));
            put("rotate", Attribute::input(zeros()));
            put("scale", Attribute::input(ones()));
            put("offsetParentMatrix", Attribute::input(identity()));
            put("inheritsTransform", Attribute::input(AttrValue::Bool(true)));
        }

        match self {
            NodeKind::Transform => {}
            NodeKind::Joint => {
                put("jointOrient", Attribute::input(zeros()));
                put(
                    "segmentScaleCompensate",
                    Attribute::input(AttrValue::Bool(true)),
                );
                put("radius", Attribute::input(AttrValue::Float(1.0)));
                put("useOutlinerColor", Attribute::input(AttrValue::Bool(false)));
                put("outlinerColor", Attribute::input(zeros()));
            }
            NodeKind::Control | NodeKind::Shape => {
                put("points", Attribute::input(AttrValue::Points(Vec::new())));
                put("lineWidth", Attribute::input(AttrValue::Float(1.0)));
            }
            NodeKind::Container => {
                put("members", Attribute::input(AttrValue::Nodes(Vec::new())));
                put("published", Attribute::input(AttrValue::Nodes(Vec::new())));
            }
            NodeKind::MultMatrix => {
                put("matrixIn", Attribute::multi(identity()));
                put("matrixSum", Attribute::output(identity()));
            }
            NodeKind::DecomposeMatrix => {
                put("inputMatrix", Attribute::input(identity()));
                put("outputTranslate", Attribute::output(zeros()));
                put("outputRotate", Attribute::output(zeros()));
                put("outputScale", Attribute::output(ones()));
            }
            NodeKind::ComposeMatrix => {
                put("inputTranslate", Attribute::input(zeros()));
                put("inputRotate", Attribute::input(zeros()));
                put("inputScale", Attribute::input(ones()));
                put("outputMatrix", Attribute::output(identity()));
            }
            NodeKind::InverseMatrix => {
                put("inputMatrix", Attribute::input(identity()));
                put("outputMatrix", Attribute::output(identity()));
            }
            NodeKind::WtAddMatrix => {
                put("matrixIn", Attribute::multi(identity()));
                put("weightIn", Attribute::multi(AttrValue::Float(0.0)));
                put("matrixSum", Attribute::output(identity()));
            }
            NodeKind::FourByFourMatrix => {
                put("axisX", Attribute::input(AttrValue::Vec3(Vec3::x())));
                put("axisY", Attribute::input(AttrValue::Vec3(Vec3::y())));
                put("axisZ", Attribute::input(AttrValue::Vec3(Vec3::z())));
                put("position", Attribute::input(zeros()));
                put("output", Attribute::output(identity()));
            }
            NodeKind::VectorProduct(_) => {
                put("input1", Attribute::input(zeros()));
                put("input2", Attribute::input(zeros()));
                put("matrix", Attribute::input(identity()));
                put("normalizeOutput", Attribute::input(AttrValue::Bool(false)));
                put("output", Attribute::output(zeros()));
            }
            NodeKind::DistanceBetween => {
                put("point1", Attribute::input(zeros()));
                put("point2", Attribute::input(zeros()));
                put("distance", Attribute::output(AttrValue::Float(0.0)));
            }
            NodeKind::FloatMath(_) => {
                put("floatA", Attribute::input(AttrValue::Float(0.0)));
                put("floatB", Attribute::input(AttrValue::Float(0.0)));
                put("outFloat", Attribute::output(AttrValue::Float(0.0)));
            }
            NodeKind::PlusMinusAverage(_) => {
                put("input3D", Attribute::multi(zeros()));
                put("output3D", Attribute::output(zeros()));
            }
            NodeKind::MultiplyDivide(_) => {
                put("input1", Attribute::input(ones()));
                put("input2", Attribute::input(ones()));
                put("output", Attribute::output(zeros()));
            }
            NodeKind::Clamp => {
                put("input", Attribute::input(AttrValue::Float(0.0)));
                put("min", Attribute::input(AttrValue::Float(0.0)));
                put("max", Attribute::input(AttrValue::Float(0.0)));
                put("output", Attribute::output(AttrValue::Float(0.0)));
            }
            NodeKind::BlendTwoAttr => {
                put("input", Attribute::multi(AttrValue::Float(0.0)));
                put("attributesBlender", Attribute::input(AttrValue::Float(0.0)));
                put("output", Attribute::output(AttrValue::Float(0.0)));
            }
            NodeKind::Reverse => {
                put("input", Attribute::input(AttrValue::Float(0.0)));
                put("output", Attribute::output(AttrValue::Float(0.0)));
            }
        }
        attrs
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Value stored on (or computed for) an attribute.
pub enum AttrValue {
    /// Scalar.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Integer / enum index.
    Int(i64),
    /// String.
    Text(String),
    /// 3-vector.
    Vec3(Vec3),
    /// 4x4 matrix.
    Matrix(Mat4),
    /// Curve points.
    Points(Vec<Vec3>),
    /// Node references (container membership).
    Nodes(Vec<NodeId>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Connection compatibility class of a value.
pub enum ValueClass {
    /// Float, Bool, Int.
    Scalar,
    /// 3-vector.
    Vector,
    /// Matrix.
    Matrix,
    /// Text, points, node lists: not connectable.
    Data,
}

impl AttrValue {
    /// Compatibility class used when connecting plugs.
    pub fn class(&self) -> ValueClass {
        match self {
            AttrValue::Float(_) | AttrValue::Bool(_) | AttrValue::Int(_) => ValueClass::Scalar,
            AttrValue::Vec3(_) => ValueClass::Vector,
            AttrValue::Matrix(_) => ValueClass::Matrix,
            AttrValue::Text(_) | AttrValue::Points(_) | AttrValue::Nodes(_) => ValueClass::Data,
        }
    }

    /// Scalar view (bools map to 0/1).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean view (non-zero scalars are true).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Float(v) => Some(*v != 0.0),
            AttrValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Vector view.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            AttrValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Matrix view.
    pub fn as_matrix(&self) -> Option<Mat4> {
        match self {
            AttrValue::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    /// String view.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Node list view.
    pub fn as_nodes(&self) -> Option<&[NodeId]> {
        match self {
            AttrValue::Nodes(n) => Some(n),
            _ => None,
        }
    }

    /// Point list view.
    pub fn as_points(&self) -> Option<&[Vec3]> {
        match self {
            AttrValue::Points(p) => Some(p),
            _ => None,
        }
    }

    /// Coerce `self` into the storage type of `template`, when the classes agree.
    pub fn coerce_like(&self, template: &AttrValue) -> Option<AttrValue> {
        match template {
            AttrValue::Float(_) => self.as_float().map(AttrValue::Float),
            AttrValue::Bool(_) => self.as_bool().map(AttrValue::Bool),
            AttrValue::Int(_) => self.as_float().map(|v| AttrValue::Int(v.round() as i64)),
            _ if std::mem::discriminant(self) == std::mem::discriminant(template) => {
                Some(self.clone())
            }
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<Vec3> for AttrValue {
    fn from(v: Vec3) -> Self {
        AttrValue::Vec3(v)
    }
}

impl From<Mat4> for AttrValue {
    fn from(v: Mat4) -> Self {
        AttrValue::Matrix(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Attribute declaration plus its stored value(s).
pub struct Attribute {
    /// Value of unset elements and the type template for connections.
    pub default: AttrValue,
    /// Stored value of a scalar attribute.
    pub value: AttrValue,
    /// Stored values of a multi (array) attribute, by index.
    #[serde(default)]
    pub elements: BTreeMap<usize, AttrValue>,
    /// Array attribute addressed with an index.
    pub multi: bool,
    /// Computed by the node; cannot be set or connected into.
    pub output: bool,
}

impl Attribute {
    /// Writable attribute initialised to `value`.
    pub fn input(value: AttrValue) -> Self {
        Self {
            default: value.clone(),
            value,
            elements: BTreeMap::new(),
            multi: false,
            output: false,
        }
    }

    /// Writable array attribute whose unset elements read as `default`.
    pub fn multi(default: AttrValue) -> Self {
        Self {
            multi: true,
            ..Self::input(default)
        }
    }

    /// Computed attribute.
    pub fn output(template: AttrValue) -> Self {
        Self {
            output: true,
            ..Self::input(template)
        }
    }

    /// Stored value at `index` (or the scalar value).
    pub fn stored(&self, index: Option<usize>) -> &AttrValue {
        match index {
            Some(i) if self.multi => self.elements.get(&i).unwrap_or(&self.default),
            _ => &self.value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
/// Address of an attribute, an array element or a vector component on a node.
pub struct Plug {
    /// Owning node.
    pub node: NodeId,
    /// Attribute name.
    pub attr: String,
    /// Element index of an array attribute.
    pub index: Option<usize>,
    /// Component of a vector attribute.
    pub axis: Option<Axis>,
}

impl Plug {
    /// Whole-attribute plug.
    pub fn new(node: NodeId, attr: impl Into<String>) -> Self {
        Self {
            node,
            attr: attr.into(),
            index: None,
            axis: None,
        }
    }

    /// Same attribute, element `index`.
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Same attribute, component `axis`.
    pub fn component(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Same plug without its component.
    pub fn whole(&self) -> Self {
        Self {
            axis: None,
            ..self.clone()
        }
    }

    /// Attribute path without the node, e.g. `matrixIn[2]` or `translate.x`.
    pub fn path(&self) -> String {
        let mut s = self.attr.clone();
        if let Some(i) = self.index {
            s.push_str(&format!("[{i}]"));
        }
        if let Some(a) = self.axis {
            s.push('.');
            s.push(a.letter());
        }
        s
    }
}

impl fmt::Display for Plug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.path())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/model.rs"]
mod tests;
