//! rigkit assembles animation rigs procedurally from tagged joint chains.
//!
//! A rig is described by scaffolds: joint chains whose root carries a module
//! type tag. Building turns every scaffold into a module that emits controllers
//! and a dataflow network driving its joints:
//!
//! - Create scaffolds with [`Scaffold::make`]
//! - Build them with [`batch_build`], which runs the root module first and then
//!   every other module through the five [`Stage`]s in lock-step
//! - Inspect or evaluate the result through any [`SceneGraph`] host, such as
//!   the bundled [`InMemoryScene`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod builder;
mod config;
mod foundation;
mod graph;
mod module;
mod rig;
mod scaffold;

pub use crate::foundation::error::{RigError, RigResult};
pub use crate::foundation::math::{
    AimSign, Axis, EPSILON, MIN_REACH, Mat4, STRETCH_LIMIT, Trs, TwoBoneInputs, TwoBoneSolution,
    Vec3, basis_matrix, compose_trs, decompose_trs, euler_to_rotation, inverse_or_identity,
    lerp_matrix, orthogonal_direction, project_pole_vector, solve_two_bone, translation_of,
};

pub use crate::config::palette::{colour_linear, colour_names, colour_rgb};
pub use crate::config::prefs::{RigConfig, RigNode, RigTree};
pub use crate::config::shapes::{SHAPE_NAMES, shape_points};

pub use crate::graph::fingerprint::{SceneFingerprint, fingerprint_scene};
pub use crate::graph::memory::{Connection, InMemoryScene, JournalEntry, NodeRecord};
pub use crate::graph::model::{
    AttrValue, Attribute, AverageOp, FloatOp, NodeId, NodeKind, Plug, ProductOp, ValueClass,
    VectorOp,
};
pub use crate::graph::ops::{Channel, Decomposed, Input, SkipAxes};
pub use crate::graph::scene::SceneGraph;

/// Helpers that emit dataflow operator nodes.
pub mod ops {
    pub use crate::graph::ops::{
        blend_two, clamp, compose, decompose, distance, drive_channels, feed, float_math,
        four_by_four, inverse, mult_matrix, multiply_divide, normalize, plus_minus, reverse,
        vector_product, wt_add,
    };
}

pub use crate::rig::constraint::{
    ConstraintOptions, blend_matrices, follow_with_offset, matrix_constraint,
};
pub use crate::rig::context::{OUTPUT_JOINTS_ATTR, OUTPUT_SLOTS_ATTR, RigContext};
pub use crate::rig::controller::{
    Controller, ControllerOptions, make_controller, scale_shape, set_outliner_colour,
    set_override_colour, unique_name,
};
pub use crate::rig::joints::{
    JOINT_SPACING, clean_joint_orients, clean_scale_compensate, make_joint_chain,
};

pub use crate::module::base::{
    COG_MATRIX_ATTR, CONTAINER_TYPE_ATTR, CONTROLS_MARKER, GLOBAL_MATRIX_ATTR, INPUT_MARKER,
    MODULE_GROUP_MARKER, ModuleBase, ModuleFlags, ModuleGlobals, OUTPUT_MARKER, SOCKET_MATRIX_ATTR,
};
pub use crate::module::lifecycle::{Module, ModuleState, Stage, run_all, run_stage};
pub use crate::module::passthrough::Passthrough;
pub use crate::module::registry::ModuleType;
pub use crate::module::root::{MODULES_GROUP_TAG, RootModule};
pub use crate::module::simple_fk::SimpleFk;
pub use crate::module::space_switch::{SPACE_BLEND_ATTR, SpaceSwitchChain};
pub use crate::module::two_bone_ik::{HUMERUS_ATTR, RADIUS_ATTR, STRETCH_ATTR, TwoBoneIk};

pub use crate::scaffold::discovery::{discover_scaffolds, module_chain, module_roots};
pub use crate::scaffold::scaffold::{
    INCLUDE_END_TAG, MODULE_ROOT_TAG, MODULE_TYPE_TAG, Scaffold, ScaffoldInfo, ScaffoldOptions,
    module_name_from_node, unique_scaffold_name,
};

pub use crate::builder::batch::{BuildReport, ModuleOutcome, ModuleReport, batch_build};
