//! Naming conventions and static display tables.

pub(crate) mod palette;
pub(crate) mod prefs;
pub(crate) mod shapes;
