// src/error.rs
use thiserror::Error;

use crate::options::OptionKind;

/// Raised when a control is attached to an option of the wrong shape.
/// Always recoverable: the control stays in its default state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("option '{0}' does not exist")]
    Missing(String),
    #[error("option '{name}' is a {found}, expected a {expected}")]
    KindMismatch {
        name: String,
        expected: OptionKind,
        found: OptionKind,
    },
    #[error("option '{name}' cannot be read from JSON: {reason}")]
    InvalidJson { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("R code contains non-whitelisted function(s): {0}")]
    ForbiddenFunctions(String),
    #[error("R code contains a forbidden construct: {0}")]
    ForbiddenConstruct(String),
    #[error("R code is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModuleError {
    #[error("module '{module}' has no analysis matching '{reference}'")]
    EntryNotFound { module: String, reference: String },
    #[error("malformed analysis reference '{0}'")]
    MalformedReference(String),
    #[error("module '{0}' is not loaded")]
    NotLoaded(String),
}
