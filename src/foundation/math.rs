//! Pure transform math shared by the graph evaluator and the rig modules.
//!
//! Conventions: column vectors, `M = T * R * S`, rotations are XYZ Euler angles in
//! radians (`R = Rz * Ry * Rx`).

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

/// 3D vector used throughout the crate.
pub type Vec3 = Vector3<f64>;
/// 4x4 homogeneous transform used throughout the crate.
pub type Mat4 = Matrix4<f64>;

/// Lengths and dot products below this are treated as zero.
pub const EPSILON: f64 = 1.0e-9;

/// Upper bound multiplier applied to the rest chain length when stretch is fully on.
pub const STRETCH_LIMIT: f64 = 100.0;

/// Smallest base-to-target distance the two-bone solver works with.
pub const MIN_REACH: f64 = 1.0e-6;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
/// Cartesian axis, used for component plugs and per-axis channel selection.
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    /// All three axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (`0..3`).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Lower-case axis letter.
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    /// Parse an axis letter (case-insensitive).
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            _ => None,
        }
    }

    /// Unit vector along this axis.
    pub fn unit(self) -> Vec3 {
        let mut v = Vec3::zeros();
        v[self.index()] = 1.0;
        v
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Translate / rotate / scale channels of a transform.
pub struct Trs {
    /// Translation.
    pub translate: Vec3,
    /// XYZ Euler rotation in radians.
    pub rotate: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            translate: Vec3::zeros(),
            rotate: Vec3::zeros(),
            scale: Vec3::repeat(1.0),
        }
    }
}

impl Trs {
    /// Compose the channels into a matrix.
    pub fn to_matrix(&self) -> Mat4 {
        compose_trs(&self.translate, &self.rotate, &self.scale)
    }
}

/// Rotation matrix for XYZ Euler angles in radians.
pub fn euler_to_rotation(rotate: &Vec3) -> Matrix3<f64> {
    Rotation3::from_euler_angles(rotate.x, rotate.y, rotate.z).into_inner()
}

/// Compose `T * R * S`.
pub fn compose_trs(translate: &Vec3, rotate: &Vec3, scale: &Vec3) -> Mat4 {
    let rs = euler_to_rotation(rotate) * Matrix3::from_diagonal(scale);
    let mut m = rs.to_homogeneous();
    m[(0, 3)] = translate.x;
    m[(1, 3)] = translate.y;
    m[(2, 3)] = translate.z;
    m
}

/// Split a matrix into translate / XYZ Euler rotate / scale.
///
/// Shear is discarded and non-orthonormal rotation parts (e.g. from a linear matrix
/// blend) are projected onto the closest rotation.
pub fn decompose_trs(m: &Mat4) -> Trs {
    let translate = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let upper: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();

    let mut scale = Vec3::new(
        upper.column(0).norm(),
        upper.column(1).norm(),
        upper.column(2).norm(),
    );
    if upper.determinant() < 0.0 {
        scale.x = -scale.x;
    }

    if scale.iter().any(|s| s.abs() < EPSILON) {
        return Trs {
            translate,
            rotate: Vec3::zeros(),
            scale,
        };
    }

    let mut rot = upper;
    for (i, s) in scale.iter().enumerate() {
        let col = rot.column(i) / *s;
        rot.set_column(i, &col);
    }
    let (rx, ry, rz) = Rotation3::from_matrix(&rot).euler_angles();

    Trs {
        translate,
        rotate: Vec3::new(rx, ry, rz),
        scale,
    }
}

/// Translation part of a matrix.
pub fn translation_of(m: &Mat4) -> Vec3 {
    Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

/// Inverse that falls back to identity for singular matrices.
pub fn inverse_or_identity(m: &Mat4) -> Mat4 {
    m.try_inverse().unwrap_or_else(Mat4::identity)
}

/// Build a matrix from three axis columns and a position.
pub fn basis_matrix(x: &Vec3, y: &Vec3, z: &Vec3, position: &Vec3) -> Mat4 {
    let mut m = Mat4::identity();
    for row in 0..3 {
        m[(row, 0)] = x[row];
        m[(row, 1)] = y[row];
        m[(row, 2)] = z[row];
        m[(row, 3)] = position[row];
    }
    m
}

/// Project a pole-vector position for a three-joint chain.
///
/// The perpendicular component of `mid - start` relative to `end - start` is
/// normalised and pushed out by `magnitude * |end - start|` from the projection of
/// `mid` onto the chain line. Returns `None` when the chain is fully extended (or
/// degenerate) and the perpendicular direction is undefined.
pub fn project_pole_vector(start: &Vec3, mid: &Vec3, end: &Vec3, magnitude: f64) -> Option<Vec3> {
    let chain = end - start;
    let chain_len = chain.norm();
    if chain_len < EPSILON {
        return None;
    }
    let limb = mid - start;
    let projection = chain * (limb.dot(&chain) / chain.dot(&chain));
    let perpendicular = limb - projection;
    let perp_len = perpendicular.norm();
    if perp_len < EPSILON * chain_len.max(1.0) {
        return None;
    }
    let offset = perpendicular / perp_len * (magnitude * chain_len);
    Some(start + projection + offset)
}

/// Orthogonalise `hint` against `dir` (Gram-Schmidt), trying the world axes when
/// `hint` is parallel to `dir`.
pub fn orthogonal_direction(dir: &Vec3, hint: &Vec3) -> Vec3 {
    let d = match dir.try_normalize(EPSILON) {
        Some(d) => d,
        None => return hint.try_normalize(EPSILON).unwrap_or_else(Vec3::y),
    };
    let candidates = [*hint, Vec3::y(), Vec3::z(), Vec3::x()];
    for c in candidates {
        let ortho = c - d * c.dot(&d);
        if let Some(n) = ortho.try_normalize(1.0e-6) {
            return n;
        }
    }
    Vec3::y()
}

/// Linear weighted blend of two matrices: `t = 0` gives `a`, `t = 1` gives `b`.
///
/// The rotation part is not re-orthonormalised, so the result is only a good
/// rotation when `a` and `b` are angularly close.
pub fn lerp_matrix(a: &Mat4, b: &Mat4, t: f64) -> Mat4 {
    a * (1.0 - t) + b * t
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Direction of a chain's primary (aim) axis in its rest pose.
pub enum AimSign {
    /// Children sit along +X.
    Positive,
    /// Children sit along -X.
    Negative,
}

impl AimSign {
    /// Decide the sign from a child joint's rest local offset.
    pub fn from_offset(offset: &Vec3) -> Self {
        if offset.x < 0.0 {
            AimSign::Negative
        } else {
            AimSign::Positive
        }
    }

    /// `1.0` or `-1.0`.
    pub fn factor(self) -> f64 {
        match self {
            AimSign::Positive => 1.0,
            AimSign::Negative => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
/// Inputs of the closed-form two-bone solve, all in the same (socket) space.
pub struct TwoBoneInputs {
    /// Rest length of the first segment.
    pub humerus: f64,
    /// Rest length of the second segment.
    pub radius: f64,
    /// Stretch switch in `[0, 1]`.
    pub stretch: f64,
    /// Base controller position.
    pub base: Vec3,
    /// Pole-vector controller position.
    pub pole: Vec3,
    /// End-effector controller position.
    pub target: Vec3,
    /// Rest aim direction of the chain.
    pub aim_sign: AimSign,
}

#[derive(Clone, Copy, Debug)]
/// Result of [`solve_two_bone`].
pub struct TwoBoneSolution {
    /// Base-to-target distance after the soft length clamp.
    pub reach: f64,
    /// Stretch multiplier applied to both segments (`>= 1`).
    pub stretch_scale: f64,
    /// Stretched first segment length.
    pub humerus: f64,
    /// Stretched second segment length.
    pub radius: f64,
    /// Angle between the first segment and the base-to-target line.
    pub shoulder_angle: f64,
    /// Interior angle at the middle joint.
    pub elbow_angle: f64,
    /// Base, middle and end frames.
    pub frames: [Mat4; 3],
}

/// Closed-form two-bone solve (law of cosines with soft stretch).
///
/// This mirrors, node for node, the network the two-bone IK module emits, and is
/// used to bake rest offsets. Returns `None` when the aim basis is undefined (the
/// pole lies on the base-to-target line or the target sits on the base).
pub fn solve_two_bone(inputs: &TwoBoneInputs) -> Option<TwoBoneSolution> {
    let a = inputs.humerus;
    let b = inputs.radius;
    let rest_sum = a + b;
    if a <= 0.0 || b <= 0.0 {
        return None;
    }

    let distance = (inputs.target - inputs.base).norm();
    let stretch_factor = 1.0 + (STRETCH_LIMIT - 1.0) * inputs.stretch;
    let reach = distance.clamp(MIN_REACH, rest_sum * stretch_factor);
    let stretch_scale = (reach / rest_sum).max(1.0);
    let a_s = a * stretch_scale;
    let b_s = b * stretch_scale;

    let cos_elbow = ((a_s * a_s + b_s * b_s - reach * reach) / (2.0 * a_s * b_s)).clamp(-1.0, 1.0);
    let elbow_angle = cos_elbow.acos();
    let cos_shoulder =
        ((a_s * a_s + reach * reach - b_s * b_s) / (2.0 * a_s * reach)).clamp(-1.0, 1.0);
    let shoulder_angle = cos_shoulder.acos();

    let pole_dir = inputs.pole - inputs.base;
    let (primary, secondary) = match inputs.aim_sign {
        AimSign::Positive => {
            let p = (inputs.target - inputs.base).try_normalize(EPSILON)?;
            (p, p.cross(&pole_dir).try_normalize(EPSILON)?)
        }
        AimSign::Negative => {
            let p = (inputs.base - inputs.target).try_normalize(EPSILON)?;
            (p, pole_dir.cross(&p).try_normalize(EPSILON)?)
        }
    };
    let tertiary = primary.cross(&secondary).normalize();
    let basis = basis_matrix(&primary, &secondary, &tertiary, &inputs.base);

    let sign = inputs.aim_sign.factor();
    let shoulder = compose_trs(
        &Vec3::zeros(),
        &Vec3::new(0.0, shoulder_angle, 0.0),
        &Vec3::repeat(1.0),
    );
    let elbow = compose_trs(
        &Vec3::new(sign * a_s, 0.0, 0.0),
        &Vec3::new(0.0, elbow_angle - std::f64::consts::PI, 0.0),
        &Vec3::repeat(1.0),
    );
    let wrist = compose_trs(
        &Vec3::new(sign * b_s, 0.0, 0.0),
        &Vec3::zeros(),
        &Vec3::repeat(1.0),
    );

    let f0 = basis * shoulder;
    let f1 = f0 * elbow;
    let f2 = f1 * wrist;

    Some(TwoBoneSolution {
        reach,
        stretch_scale,
        humerus: a_s,
        radius: b_s,
        shoulder_angle,
        elbow_angle,
        frames: [f0, f1, f2],
    })
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
