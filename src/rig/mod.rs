pub(crate) mod constraint;
pub(crate) mod context;
pub(crate) mod controller;
pub(crate) mod joints;
