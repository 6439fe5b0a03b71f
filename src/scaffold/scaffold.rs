use crate::config::prefs::RigConfig;
use crate::config::shapes::shape_points;
use crate::foundation::error::{RigError, RigResult};
use crate::graph::model::{AttrValue, NodeId, NodeKind, Plug};
use crate::graph::scene::SceneGraph;
use crate::module::registry::ModuleType;
use crate::rig::controller::{scale_shape, set_outliner_colour, set_override_colour};
use crate::rig::joints::make_joint_chain;
use crate::scaffold::discovery::module_chain;

/// Boolean tag marking a joint as a module root.
pub const MODULE_ROOT_TAG: &str = "rigModuleRoot";
/// Text tag holding the module type of a module root.
pub const MODULE_TYPE_TAG: &str = "rigModuleType";
/// Boolean tag: whether the chain's end joint gets a controller.
pub const INCLUDE_END_TAG: &str = "rigIncludeEndJoint";

const ROOT_JOINT_RADIUS: f64 = 0.001;
const ROOT_DISPLAY_SIZE: f64 = 1.43;
const DISPLAY_SIZE: f64 = 0.5;
const DISPLAY_LINE_WIDTH: f64 = 3.0;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Arguments of [`Scaffold::make`].
pub struct ScaffoldOptions {
    /// Name prefix; made unique in the scene.
    pub name: String,
    /// Number of joints.
    pub length: usize,
    /// Joint to attach to; `None` attaches to the skeleton root.
    pub socket: Option<NodeId>,
    /// Module type tag.
    pub module_type: ModuleType,
    /// Give the end joint a controller.
    pub include_end_joint: bool,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            name: "untitled".to_string(),
            length: 1,
            socket: None,
            module_type: ModuleType::Unassigned,
            include_end_joint: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
/// Snapshot of a scaffold's tags and chain.
pub struct ScaffoldInfo {
    /// Module root joint.
    pub root: NodeId,
    /// Module nice name.
    pub name: String,
    /// Module type tag.
    pub module_type: ModuleType,
    /// End joint flag.
    pub include_end_joint: bool,
    /// Parent joint, `None` for the root scaffold.
    pub socket: Option<NodeId>,
    /// Joints owned by the module, root first.
    pub chain: Vec<NodeId>,
}

/// View over a tagged module root joint.
///
/// Holds nothing but the root handle; every property is read from (and every
/// setter writes to) the scene tags, so the scaffold never goes stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Scaffold {
    root: NodeId,
}

impl Scaffold {
    /// Create a joint chain, attach it to its socket, colour and tag it.
    #[tracing::instrument(skip(scene, config, opts), fields(name = %opts.name))]
    pub fn make(
        scene: &mut dyn SceneGraph,
        config: &RigConfig,
        opts: &ScaffoldOptions,
    ) -> RigResult<Self> {
        validate_name(&opts.name, config)?;
        if opts.length == 0 {
            return Err(RigError::configuration(format!(
                "scaffold '{}' needs at least one joint",
                opts.name
            )));
        }
        if opts.module_type == ModuleType::Root {
            return Err(RigError::configuration(
                "the root scaffold is created with make_root, not make",
            ));
        }
        let socket = match opts.socket {
            Some(s) => {
                if scene.node_kind(s)? != NodeKind::Joint {
                    return Err(RigError::configuration(format!(
                        "socket '{}' is not a joint",
                        scene.node_name(s)?
                    )));
                }
                s
            }
            None => Self::make_root(scene, config)?.root,
        };

        let name = unique_scaffold_name(scene, &opts.name);
        let chain = make_joint_chain(scene, &name, opts.length, &config.bind_suffix, 1.0)?;
        let root = chain[0];
        scene.set_parent(root, Some(socket))?;
        let socket_world = scene.world_matrix(socket)?;
        scene.match_world(root, &socket_world)?;

        for j in &chain {
            set_override_colour(scene, *j, &config.default_joint_colour)?;
        }
        let joint_colour = &config.default_joint_colour;
        add_display(scene, root, &name, DISPLAY_SIZE, joint_colour)?;
        set_override_colour(scene, root, &config.module_root_colour)?;
        set_outliner_colour(scene, root, &config.module_root_colour)?;
        tag(scene, root, opts.module_type, opts.include_end_joint)?;

        tracing::info!(
            scaffold = %name,
            joints = opts.length,
            module_type = %opts.module_type,
            "scaffold created"
        );
        Ok(Self { root })
    }

    /// Get or create the skeleton root joint, tagged as the root module.
    pub fn make_root(scene: &mut dyn SceneGraph, config: &RigConfig) -> RigResult<Self> {
        if let Some(root) = scene.find_node(&config.root_joint) {
            if !scene.has_attr(root, MODULE_ROOT_TAG) {
                tag(scene, root, ModuleType::Root, true)?;
            }
            return Ok(Self { root });
        }

        let root = scene.create_node(NodeKind::Joint, &config.root_joint)?;
        scene.set_attr(&Plug::new(root, "radius"), ROOT_JOINT_RADIUS.into())?;
        let name = module_name_from_node(&config.root_joint, config);
        let root_colour = &config.module_root_colour;
        add_display(scene, root, &name, ROOT_DISPLAY_SIZE, root_colour)?;
        set_override_colour(scene, root, &config.module_root_colour)?;
        set_outliner_colour(scene, root, &config.module_root_colour)?;
        tag(scene, root, ModuleType::Root, true)?;
        tracing::info!(root = %config.root_joint, "skeleton root created");
        Ok(Self { root })
    }

    /// View an existing module root.
    pub fn from_node(scene: &dyn SceneGraph, node: NodeId) -> RigResult<Self> {
        if !scene.has_attr(node, MODULE_ROOT_TAG) {
            return Err(RigError::configuration(format!(
                "'{}' is not a module root",
                scene.node_name(node)?
            )));
        }
        Ok(Self { root: node })
    }

    /// Module root joint.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Module nice name derived from the root joint's name.
    pub fn name(&self, scene: &dyn SceneGraph, config: &RigConfig) -> RigResult<String> {
        Ok(module_name_from_node(&scene.node_name(self.root)?, config))
    }

    /// Module type tag.
    pub fn module_type(&self, scene: &dyn SceneGraph) -> RigResult<ModuleType> {
        let value = scene.get_attr(&Plug::new(self.root, MODULE_TYPE_TAG))?;
        let tag = value.as_text().ok_or_else(|| {
            RigError::configuration(format!("module type tag on {} is not text", self.root))
        })?;
        ModuleType::from_tag(tag)
    }

    /// End joint flag (defaults to `true` when untagged).
    pub fn include_end_joint(&self, scene: &dyn SceneGraph) -> RigResult<bool> {
        if !scene.has_attr(self.root, INCLUDE_END_TAG) {
            return Ok(true);
        }
        Ok(scene
            .get_attr(&Plug::new(self.root, INCLUDE_END_TAG))?
            .as_bool()
            .unwrap_or(true))
    }

    /// Parent joint the module hangs from; `None` for the root module.
    pub fn socket(&self, scene: &dyn SceneGraph) -> RigResult<Option<NodeId>> {
        if self.module_type(scene)? == ModuleType::Root {
            return Ok(None);
        }
        scene.parent(self.root)
    }

    /// Joints owned by this module.
    pub fn chain(&self, scene: &dyn SceneGraph) -> RigResult<Vec<NodeId>> {
        module_chain(scene, self.root)
    }

    /// Snapshot used to construct a module.
    pub fn info(&self, scene: &dyn SceneGraph, config: &RigConfig) -> RigResult<ScaffoldInfo> {
        Ok(ScaffoldInfo {
            root: self.root,
            name: self.name(scene, config)?,
            module_type: self.module_type(scene)?,
            include_end_joint: self.include_end_joint(scene)?,
            socket: self.socket(scene)?,
            chain: self.chain(scene)?,
        })
    }

    /// Rename every joint (and the display shape) to the new prefix.
    pub fn set_name(
        &self,
        scene: &mut dyn SceneGraph,
        config: &RigConfig,
        new_name: &str,
    ) -> RigResult<()> {
        validate_name(new_name, config)?;
        let old = self.name(scene, config)?;
        let mut nodes = self.chain(scene)?;
        for j in nodes.clone() {
            for c in scene.children(j)? {
                if scene.node_kind(c)? == NodeKind::Shape {
                    nodes.push(c);
                }
            }
        }
        for n in nodes {
            let current = scene.node_name(n)?;
            if let Some(rest) = current.strip_prefix(old.as_str()) {
                scene.rename(n, &format!("{new_name}{rest}"))?;
            }
        }
        tracing::debug!(from = %old, to = new_name, "scaffold renamed");
        Ok(())
    }

    /// Move the module under another joint, keeping its world placement.
    pub fn set_socket(&self, scene: &mut dyn SceneGraph, socket: NodeId) -> RigResult<()> {
        if scene.node_kind(socket)? != NodeKind::Joint {
            return Err(RigError::configuration(format!(
                "socket '{}' is not a joint",
                scene.node_name(socket)?
            )));
        }
        let world = scene.world_matrix(self.root)?;
        scene.set_parent(self.root, Some(socket))?;
        scene.match_world(self.root, &world)
    }

    /// Re-tag the module type.
    pub fn set_module_type(
        &self,
        scene: &mut dyn SceneGraph,
        module_type: ModuleType,
    ) -> RigResult<()> {
        let current = self.module_type(scene)?;
        if (current == ModuleType::Root) != (module_type == ModuleType::Root) {
            return Err(RigError::configuration(format!(
                "cannot change module type from {current} to {module_type}"
            )));
        }
        put_tag(scene, self.root, MODULE_TYPE_TAG, module_type.tag().into())
    }

    /// Re-tag the end joint flag.
    pub fn set_include_end_joint(
        &self,
        scene: &mut dyn SceneGraph,
        include: bool,
    ) -> RigResult<()> {
        put_tag(scene, self.root, INCLUDE_END_TAG, include.into())
    }
}

/// Module nice name from a node name: the first `_` token, or the first two
/// when the first is a left/right prefix.
pub fn module_name_from_node(node_name: &str, config: &RigConfig) -> String {
    let mut parts = node_name.split('_');
    let first = parts.next().unwrap_or_default();
    let sided = first == config.left_prefix || first == config.right_prefix;
    match parts.next() {
        Some(second) if sided => format!("{first}_{second}"),
        _ => first.to_string(),
    }
}

/// `name`, or `name1`, `name2`, ... when nodes prefixed `{name}_` exist.
pub fn unique_scaffold_name(scene: &dyn SceneGraph, name: &str) -> String {
    let names: Vec<String> = scene
        .nodes()
        .into_iter()
        .filter_map(|n| scene.node_name(n).ok())
        .collect();
    let taken = |candidate: &str| {
        let prefix = format!("{candidate}_");
        names.iter().any(|n| n.starts_with(&prefix))
    };
    if !taken(name) {
        return name.to_string();
    }
    (1u32..)
        .map(|i| format!("{name}{i}"))
        .find(|n| !taken(n))
        .unwrap_or_else(|| name.to_string())
}

fn validate_name(name: &str, config: &RigConfig) -> RigResult<()> {
    if name.is_empty() {
        return Err(RigError::configuration("scaffold name is empty"));
    }
    if module_name_from_node(&format!("{name}_01"), config) != name {
        return Err(RigError::configuration(format!(
            "scaffold name '{name}' cannot contain '_' except after a '{}'/'{}' prefix",
            config.left_prefix, config.right_prefix
        )));
    }
    Ok(())
}

fn add_display(
    scene: &mut dyn SceneGraph,
    root: NodeId,
    name: &str,
    size: f64,
    colour: &str,
) -> RigResult<NodeId> {
    let shape = scene.create_node(NodeKind::Shape, &format!("{name}_display"))?;
    scene.set_attr(
        &Plug::new(shape, "points"),
        AttrValue::Points(shape_points("locator")?),
    )?;
    scale_shape(scene, shape, size, Some(DISPLAY_LINE_WIDTH))?;
    set_override_colour(scene, shape, colour)?;
    scene.set_parent(shape, Some(root))?;
    Ok(shape)
}

fn put_tag(
    scene: &mut dyn SceneGraph,
    node: NodeId,
    attr: &str,
    value: AttrValue,
) -> RigResult<()> {
    if scene.has_attr(node, attr) {
        scene.set_attr(&Plug::new(node, attr), value)
    } else {
        scene.add_attr(node, attr, value)
    }
}

fn tag(
    scene: &mut dyn SceneGraph,
    root: NodeId,
    module_type: ModuleType,
    include_end_joint: bool,
) -> RigResult<()> {
    put_tag(scene, root, MODULE_ROOT_TAG, true.into())?;
    put_tag(scene, root, MODULE_TYPE_TAG, module_type.tag().into())?;
    put_tag(scene, root, INCLUDE_END_TAG, include_end_joint.into())
}

#[cfg(test)]
#[path = "../../tests/unit/scaffold/scaffold.rs"]
mod tests;
