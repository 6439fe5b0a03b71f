//! Scene graph surface, the in-memory host and dataflow emission helpers.

pub(crate) mod eval;
pub(crate) mod fingerprint;
pub(crate) mod memory;
pub(crate) mod model;
pub(crate) mod ops;
pub(crate) mod scene;
