//! Error types for mutation generation and application

use std::path::PathBuf;
use thiserror::Error;

use crate::mutation::Location;

/// Errors that can occur while generating, applying or testing mutations
#[derive(Debug, Error)]
pub enum MutationError {
    /// Failed to parse source file as Rust
    #[error("Failed to parse '{}' as Rust: {error}", file.display())]
    ParseError { file: PathBuf, error: String },

    /// An operator failed while producing candidates
    #[error("Operator '{operator}' failed at {location}: {source}")]
    Operator {
        operator: String,
        location: Location,
        #[source]
        source: OperatorError,
    },

    /// A descriptor does not resolve against the tree it is applied to
    #[error("No {} at {location}: {reason}", location.kind)]
    LocationNotFound { location: Location, reason: String },

    /// The caller's callback failed; the tree was restored before this was returned
    #[error("Callback failed for mutation #{mutation}: {source}")]
    Callback {
        mutation: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Target file doesn't exist
    #[error("File not found: {}", file.display())]
    FileNotFound { file: PathBuf },

    /// Failed to read source file
    #[error("Failed to read file '{}': {error}", file.display())]
    FileReadError { file: PathBuf, error: String },

    /// Target function not found in file
    #[error("Function '{function}' not found in {}\n  Available functions: {}", file.display(), available_functions.join(", "))]
    FunctionNotFound {
        file: PathBuf,
        function: String,
        available_functions: Vec<String>,
    },

    /// Failed to write mutated file
    #[error("Failed to write mutated file '{}': {error}", file.display())]
    WriteError { file: PathBuf, error: String },

    /// Test execution failed
    #[error("Test execution failed: {error}")]
    TestExecutionError { error: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Failure reported by an operator's candidate iterator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct OperatorError {
    pub reason: String,
}

impl OperatorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A generation run that stopped on an error
///
/// `delivered` counts the mutations whose callback completed before the failure.
/// Those mutations remain valid.
#[derive(Debug, Error)]
#[error("Generation stopped after {delivered} mutation(s): {source}")]
pub struct GenerationError {
    pub delivered: usize,
    #[source]
    pub source: MutationError,
}

impl GenerationError {
    pub fn new(delivered: usize, source: MutationError) -> Self {
        Self { delivered, source }
    }
}

/// Result type for mutation operations
pub type Result<T> = std::result::Result<T, MutationError>;
