// SPDX-License-Identifier: MIT

//! Typed error handling for orra-rs
//!
//! Library code returns [`OrraError`]. Step bodies return the looser
//! [`StepError`] so authors can use `?` on whatever their step calls; the
//! engine wraps those failures with the name of the step that raised them.

use std::fmt;
use thiserror::Error;

/// Error type returned by step bodies
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for orra-rs
#[derive(Debug, Error)]
pub enum OrraError {
    /// Two steps registered under the same name
    #[error("Step '{name}' is already registered")]
    DuplicateStep { name: String },

    /// Step name cannot be used as a graph node or endpoint path
    #[error("Invalid step name '{name}': {reason}")]
    InvalidStepName { name: String, reason: String },

    /// Registration attempted after the workflow was compiled
    #[error("Cannot register step '{name}': workflow is already compiled")]
    RegistryFrozen { name: String },

    /// Workflow invoked or served before `compile`
    #[error("Workflow has not been compiled")]
    NotCompiled,

    /// Malformed workflow graph
    #[error("Graph validation failed: {0}")]
    GraphValidation(String),

    /// State does not match the declared schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A step body failed; subsequent steps were not run
    #[error("Step '{step}' failed: {source}")]
    StepExecution {
        step: String,
        #[source]
        source: StepError,
    },

    /// The invocation was cancelled before it could finish
    #[error("Invocation cancelled{}", at_step(.step))]
    Cancelled { step: Option<String> },

    /// Configuration errors (bad config file, bad env var)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking entry point used from inside an async runtime
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

fn at_step(step: &Option<String>) -> String {
    step.as_ref()
        .map(|s| format!(" at step '{}'", s))
        .unwrap_or_default()
}

impl OrraError {
    /// Create a step execution error
    pub fn step(step: impl Into<String>, source: impl Into<StepError>) -> Self {
        Self::StepExecution {
            step: step.into(),
            source: source.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a graph validation error
    pub fn graph(message: impl Into<String>) -> Self {
        Self::GraphValidation(message.into())
    }

    /// Whether this error means the invocation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path to the offending value, e.g. `["owner", "login"]` or `["items", "2"]`
    pub loc: Vec<String>,
    pub msg: String,
}

impl FieldError {
    pub fn new(loc: Vec<String>, msg: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
        }
    }

    /// Dotted form of the location
    pub fn path(&self) -> String {
        self.loc.join(".")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path(), self.msg)
    }
}

/// State failed schema validation; lists every offending field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Shorthand for a single error at the top level of the state
    pub fn single(msg: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(vec![], msg)])
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(
            f,
            "State validation failed ({} error{}): {}",
            self.errors.len(),
            if self.errors.len() == 1 { "" } else { "s" },
            fields.join("; ")
        )
    }
}

impl std::error::Error for ValidationError {}
