use crate::foundation::error::{RigError, RigResult};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Naming conventions and defaults consumed by scaffolds, controllers and modules.
///
/// Changing naming prefs after a scene has been scaffolded means existing nodes no
/// longer match by name, so the root module will create a second hierarchy.
pub struct RigConfig {
    /// Name of the skeleton root joint (the root scaffold).
    pub root_joint: String,
    /// Suffix appended to bind joints created by scaffolds.
    pub bind_suffix: String,
    /// Override colour for scaffold joints.
    pub default_joint_colour: String,
    /// Override/outliner colour for module root joints.
    pub module_root_colour: String,
    /// Name of the group that holds every built module.
    pub module_group: String,
    /// Base name of the top-level root controller.
    pub root_control: String,
    /// Base name of the secondary root controller.
    pub root2_control: String,
    /// Base name of the centre-of-gravity controller.
    pub cog_control: String,
    /// Suffix appended to every controller shape.
    pub control_suffix: String,
    /// Default number of offset nulls per controller.
    pub offset_count: usize,
    /// Default controller line width.
    pub line_width: f64,
    /// Prefix marking left-side modules.
    pub left_prefix: String,
    /// Prefix marking right-side modules.
    pub right_prefix: String,
    /// Distance factor used when seeding pole-vector controllers.
    pub pole_vector_distance: f64,
    /// Top-level hierarchy the root module creates or reuses.
    pub rig_tree: RigNode,
}

impl Default for RigConfig {
    fn default() -> Self {
        let root_control = "GOD".to_string();
        let root_joint = "root_BIND".to_string();
        let module_group = "modules".to_string();
        Self {
            rig_tree: RigNode::new(
                root_control.clone(),
                vec![
                    RigNode::leaf(root_joint.clone()),
                    RigNode::leaf(module_group.clone()),
                ],
            ),
            root_joint,
            bind_suffix: "BIND".to_string(),
            default_joint_colour: "grey-blue".to_string(),
            module_root_colour: "pale-orange".to_string(),
            module_group,
            root_control,
            root2_control: "GOD_2".to_string(),
            cog_control: "cog".to_string(),
            control_suffix: "ctrl".to_string(),
            offset_count: 0,
            line_width: 2.0,
            left_prefix: "L".to_string(),
            right_prefix: "R".to_string(),
            pole_vector_distance: 1.0,
        }
    }
}

impl RigConfig {
    /// Parse a config from JSON. Missing fields take their defaults; unknown fields are rejected.
    pub fn from_json_str(s: &str) -> RigResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| RigError::configuration(format!("invalid rig config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> RigResult<()> {
        for (field, value) in [
            ("root_joint", &self.root_joint),
            ("module_group", &self.module_group),
            ("root_control", &self.root_control),
            ("root2_control", &self.root2_control),
            ("control_suffix", &self.control_suffix),
        ] {
            if value.trim().is_empty() {
                return Err(RigError::configuration(format!("{field} must be non-empty")));
            }
        }
        if self.line_width.is_nan() || self.line_width <= 0.0 {
            return Err(RigError::configuration("line_width must be > 0"));
        }
        if self.rig_tree.find(&self.root_control).is_none() {
            return Err(RigError::configuration(format!(
                "rig_tree does not contain the root controller '{}'",
                self.root_control
            )));
        }
        if self.rig_tree.find(&self.module_group).is_none() {
            return Err(RigError::configuration(format!(
                "rig_tree does not contain the module group '{}'",
                self.module_group
            )));
        }
        Ok(())
    }

    /// `{base}_{control_suffix}`.
    pub fn control_name(&self, base: &str) -> String {
        format!("{base}_{}", self.control_suffix)
    }

    /// Full name of the top-level root controller.
    pub fn root_control_name(&self) -> String {
        self.control_name(&self.root_control)
    }

    /// Full name of the secondary root controller.
    pub fn root2_control_name(&self) -> String {
        self.control_name(&self.root2_control)
    }

    /// Full name of the centre-of-gravity controller.
    pub fn cog_control_name(&self) -> String {
        self.control_name(&self.cog_control)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// One entry of the [`RigTree`]: a named component and its children.
pub struct RigNode {
    /// Node name. The root controller name creates the controller pair, anything else a group.
    pub component: String,
    /// Nested components.
    #[serde(default)]
    pub children: Vec<RigNode>,
}

/// Static n-ary tree of top-level rig nodes.
pub type RigTree = RigNode;

impl RigNode {
    /// Node with children.
    pub fn new(component: impl Into<String>, children: Vec<RigNode>) -> Self {
        Self {
            component: component.into(),
            children,
        }
    }

    /// Node without children.
    pub fn leaf(component: impl Into<String>) -> Self {
        Self::new(component, Vec::new())
    }

    /// Depth-first search by component name.
    pub fn find(&self, component: &str) -> Option<&RigNode> {
        if self.component == component {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(component))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/prefs.rs"]
mod tests;
