//! Scaffolds: tagged joint chains that modules are built from.

pub(crate) mod discovery;
#[allow(clippy::module_inception)]
pub(crate) mod scaffold;
