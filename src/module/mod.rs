//! Rig modules and their five-stage lifecycle.

pub(crate) mod base;
pub(crate) mod lifecycle;
pub(crate) mod passthrough;
pub(crate) mod registry;
pub(crate) mod root;
pub(crate) mod simple_fk;
pub(crate) mod space_switch;
pub(crate) mod two_bone_ik;
