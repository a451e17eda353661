//! Error types for Mouse Flux

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Reshape,
    Merge,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Reshape => "reshape",
            Stage::Merge => "merge",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during a pipeline run
///
/// Every variant is fatal: the run stops at the first error and no output
/// file is left behind.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Input not found: {0}")]
    InputNotFound(String),

    #[error("Data format error during {stage}: {message}")]
    DataFormat { stage: Stage, message: String },

    #[error("Failed to write output {path}: {source}")]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ComputeError {
    pub(crate) fn data_format(stage: Stage, message: impl Into<String>) -> Self {
        ComputeError::DataFormat {
            stage,
            message: message.into(),
        }
    }

    /// Stage the error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            ComputeError::InputNotFound(_) | ComputeError::Config(_) => Stage::Load,
            ComputeError::DataFormat { stage, .. } => *stage,
            ComputeError::OutputWrite { .. } | ComputeError::JsonError(_) => Stage::Write,
        }
    }
}
