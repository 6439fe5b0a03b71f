//! Controllers: a visible curve, a pivot null and a chain of offset nulls.

use crate::config::palette::{colour_linear, colour_rgb};
use crate::config::prefs::RigConfig;
use crate::config::shapes::shape_points;
use crate::foundation::error::{RigError, RigResult};
use crate::foundation::math::{Mat4, Vec3};
use crate::graph::model::{AttrValue, NodeId, NodeKind, Plug};
use crate::graph::scene::SceneGraph;

#[derive(Clone, Debug, PartialEq)]
/// Appearance and structure of a new controller.
pub struct ControllerOptions {
    /// Named shape from the shape table.
    pub shape: String,
    /// Uniform scale applied to the shape points.
    pub size: f64,
    /// Curve line width; `None` uses the configured default.
    pub line_width: Option<f64>,
    /// Named override colour.
    pub colour: String,
    /// Offset nulls between pivot and curve; `None` uses the configured default.
    pub offsets: Option<usize>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            shape: "circle".to_string(),
            size: 1.0,
            line_width: None,
            colour: "dark-blue".to_string(),
            offsets: None,
        }
    }
}

impl ControllerOptions {
    /// Use shape `name`.
    pub fn shape(mut self, name: &str) -> Self {
        self.shape = name.to_string();
        self
    }

    /// Scale the shape by `size`.
    pub fn size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// Use colour `name`.
    pub fn colour(mut self, name: &str) -> Self {
        self.colour = name.to_string();
        self
    }

    /// Create `count` offset nulls.
    pub fn offsets(mut self, count: usize) -> Self {
        self.offsets = Some(count);
        self
    }

    /// Draw with `width`.
    pub fn line_width(mut self, width: f64) -> Self {
        self.line_width = Some(width);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Handle to a controller hierarchy.
///
/// Parenting runs `pivot -> offsets[last] -> ... -> offsets[0] -> shape`; the
/// shape is the node animators move.
pub struct Controller {
    /// Unique base name (without the controller suffix).
    pub name: String,
    /// The manipulated curve transform.
    pub shape: NodeId,
    /// Top-most null; parent and match this one.
    pub pivot: NodeId,
    /// Offset nulls, innermost first.
    pub offsets: Vec<NodeId>,
}

impl Controller {
    /// Wrap an existing transform that has no pivot or offsets.
    pub fn bare(name: impl Into<String>, node: NodeId) -> Self {
        Self {
            name: name.into(),
            shape: node,
            pivot: node,
            offsets: Vec::new(),
        }
    }

    /// World matrix output of the shape.
    pub fn transform(&self) -> Plug {
        Plug::new(self.shape, "worldMatrix")
    }

    /// Plug of a custom attribute on the shape.
    pub fn attr(&self, name: &str) -> Plug {
        Plug::new(self.shape, name)
    }

    /// Innermost null above the shape (the pivot when there are no offsets).
    pub fn inner(&self) -> NodeId {
        self.offsets.first().copied().unwrap_or(self.pivot)
    }

    /// Every node of the hierarchy, shape first.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut out = vec![self.shape];
        out.extend(&self.offsets);
        if self.pivot != self.shape {
            out.push(self.pivot);
        }
        out
    }

    /// Parent the pivot under `parent`.
    pub fn parent_under(&self, scene: &mut dyn SceneGraph, parent: NodeId) -> RigResult<()> {
        scene.set_parent(self.pivot, Some(parent))
    }

    /// Place the pivot at `target`'s world transform.
    pub fn match_to(&self, scene: &mut dyn SceneGraph, target: NodeId) -> RigResult<()> {
        scene.match_transform(self.pivot, target)
    }

    /// Place the pivot at `world`.
    pub fn match_world(&self, scene: &mut dyn SceneGraph, world: &Mat4) -> RigResult<()> {
        scene.match_world(self.pivot, world)
    }

    /// Add (or reset) a keyable scalar attribute on the shape.
    pub fn make_attr(
        &self,
        scene: &mut dyn SceneGraph,
        name: &str,
        default: f64,
    ) -> RigResult<Plug> {
        let plug = self.attr(name);
        if scene.has_attr(self.shape, name) {
            tracing::warn!(
                controller = %self.name,
                attr = name,
                "attribute already exists, overriding"
            );
            scene.set_attr(&plug, default.into())?;
        } else {
            scene.add_attr(self.shape, name, default.into())?;
        }
        Ok(plug)
    }
}

/// `name` with a numeric suffix so that `{name}_{suffix}` is not taken.
pub fn unique_name(scene: &dyn SceneGraph, name: &str, suffix: &str) -> String {
    let taken = |n: &str| scene.find_node(&format!("{n}_{suffix}")).is_some();
    if !taken(name) {
        return name.to_string();
    }
    (1u32..)
        .map(|i| format!("{name}{i}"))
        .find(|n| !taken(n))
        .unwrap_or_else(|| name.to_string())
}

/// Create a controller named `{name}_{suffix}` with pivot and offset nulls.
///
/// The name gets a numeric suffix when it is already taken.
pub fn make_controller(
    scene: &mut dyn SceneGraph,
    config: &RigConfig,
    name: &str,
    opts: &ControllerOptions,
) -> RigResult<Controller> {
    if opts.size <= 0.0 {
        return Err(RigError::configuration(format!(
            "controller '{name}' needs a positive size, got {}",
            opts.size
        )));
    }
    let base = unique_name(scene, name, &config.control_suffix);
    let points = shape_points(&opts.shape)?;

    let shape = scene.create_node(NodeKind::Control, &config.control_name(&base))?;
    let shape_name = scene.node_name(shape)?;
    scene.set_attr(&Plug::new(shape, "points"), AttrValue::Points(points))?;
    scale_shape(
        scene,
        shape,
        opts.size,
        Some(opts.line_width.unwrap_or(config.line_width)),
    )?;
    set_override_colour(scene, shape, &opts.colour)?;

    let count = opts.offsets.unwrap_or(config.offset_count);
    let mut offsets = Vec::with_capacity(count);
    for i in 0..count {
        let num = if count > 1 {
            format!("{:02}", i + 1)
        } else {
            String::new()
        };
        let off_name = format!("{shape_name}_offset{num}_loc");
        let off = scene.create_node(NodeKind::Transform, &off_name)?;
        set_override_colour(scene, off, "purple")?;
        offsets.push(off);
    }
    let pivot = scene.create_node(NodeKind::Transform, &format!("{shape_name}_null"))?;

    let mut chain = vec![shape];
    chain.extend(&offsets);
    chain.push(pivot);
    for pair in chain.windows(2) {
        scene.set_parent(pair[0], Some(pair[1]))?;
    }

    tracing::debug!(
        controller = %shape_name,
        shape = %opts.shape,
        offsets = count,
        "controller created"
    );
    Ok(Controller {
        name: base,
        shape,
        pivot,
        offsets,
    })
}

/// Scale a curve's points about its origin and optionally set its line width.
pub fn scale_shape(
    scene: &mut dyn SceneGraph,
    node: NodeId,
    factor: f64,
    line_width: Option<f64>,
) -> RigResult<()> {
    let plug = Plug::new(node, "points");
    let points: Vec<Vec3> = scene
        .get_attr(&plug)?
        .as_points()
        .map(|p| p.iter().map(|v| v * factor).collect())
        .unwrap_or_default();
    scene.set_attr(&plug, AttrValue::Points(points))?;
    if let Some(w) = line_width {
        scene.set_attr(&Plug::new(node, "lineWidth"), w.into())?;
    }
    Ok(())
}

/// Enable the display override and set its colour.
pub fn set_override_colour(
    scene: &mut dyn SceneGraph,
    node: NodeId,
    colour: &str,
) -> RigResult<()> {
    let rgb = colour_rgb(colour)?;
    scene.set_attr(&Plug::new(node, "overrideEnabled"), true.into())?;
    scene.set_attr(
        &Plug::new(node, "overrideColor"),
        Vec3::new(rgb[0], rgb[1], rgb[2]).into(),
    )
}

/// Set the outliner colour of a joint (display-space values).
pub fn set_outliner_colour(
    scene: &mut dyn SceneGraph,
    node: NodeId,
    colour: &str,
) -> RigResult<()> {
    let rgb = colour_linear(colour)?;
    scene.set_attr(&Plug::new(node, "useOutlinerColor"), true.into())?;
    scene.set_attr(
        &Plug::new(node, "outlinerColor"),
        Vec3::new(rgb[0], rgb[1], rgb[2]).into(),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/rig/controller.rs"]
mod tests;
