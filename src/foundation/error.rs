/// Convenience result type used across rigkit.
pub type RigResult<T> = Result<T, RigError>;

/// Top-level error taxonomy used by scaffold, module and builder APIs.
#[derive(thiserror::Error, Debug)]
pub enum RigError {
    /// A node or attribute a module relies on does not exist.
    #[error("structural error in '{module}': {detail}")]
    Structural {
        /// Offending module instance.
        module: String,
        /// Missing element.
        detail: String,
    },

    /// A module socket or auxiliary plug could not be resolved while registering.
    #[error("registration error in '{module}': {detail}")]
    Registration {
        /// Offending module instance.
        module: String,
        /// Unresolved socket or plug.
        detail: String,
    },

    /// The module hierarchy lacks its input/output markers.
    #[error("encapsulation error in '{module}': {detail}")]
    Encapsulation {
        /// Offending module instance.
        module: String,
        /// Missing marker.
        detail: String,
    },

    /// A joint chain does not satisfy the module contract.
    #[error("validation error in '{module}': {detail}")]
    Validation {
        /// Offending module instance.
        module: String,
        /// Contract violation.
        detail: String,
    },

    /// A lifecycle stage was called out of order or re-entered.
    #[error("lifecycle error in '{module}': {detail}")]
    Lifecycle {
        /// Offending module instance.
        module: String,
        /// Stage ordering violation.
        detail: String,
    },

    /// A lifecycle stage failed during a batch build; the batch was rolled back.
    #[error("build failed at {stage} of '{module}': {source}")]
    BuildFailed {
        /// Module whose stage failed.
        module: String,
        /// Stage that failed.
        stage: String,
        /// Underlying failure.
        source: Box<RigError>,
    },

    /// Unknown module type, colour, shape or malformed options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Host scene-graph call failure (unknown node/attribute, double connection, cycle).
    #[error("graph error: {0}")]
    Graph(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RigError {
    /// Build a [`RigError::Structural`] value.
    pub fn structural(module: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Structural {
            module: module.into(),
            detail: detail.into(),
        }
    }

    /// Build a [`RigError::Registration`] value.
    pub fn registration(module: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Registration {
            module: module.into(),
            detail: detail.into(),
        }
    }

    /// Build a [`RigError::Encapsulation`] value.
    pub fn encapsulation(module: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Encapsulation {
            module: module.into(),
            detail: detail.into(),
        }
    }

    /// Build a [`RigError::Validation`] value.
    pub fn validation(module: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            module: module.into(),
            detail: detail.into(),
        }
    }

    /// Build a [`RigError::Lifecycle`] value.
    pub fn lifecycle(module: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Lifecycle {
            module: module.into(),
            detail: detail.into(),
        }
    }

    /// Build a [`RigError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`RigError::Graph`] value.
    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph(msg.into())
    }

    /// Build a [`RigError::BuildFailed`] value.
    pub fn build_failed(
        module: impl Into<String>,
        stage: impl Into<String>,
        source: RigError,
    ) -> Self {
        Self::BuildFailed {
            module: module.into(),
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Re-attribute a graph-level failure to a module so the report names it.
    ///
    /// Errors that already carry a module name are returned unchanged.
    pub fn in_module(self, module: &str) -> Self {
        match self {
            Self::Graph(detail) => Self::structural(module, detail),
            other => other,
        }
    }

    /// Whether this error is a chain-contract violation (skippable by the batch driver).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
