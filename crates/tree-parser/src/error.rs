//! Error types for tree-parser.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while obtaining the dependency tree text.
///
/// Parsing itself never fails. Variants are `Clone` so one result can be
/// handed to every caller waiting on the same invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Failed to spawn the maven process
    #[error("failed to spawn maven: {0}")]
    SpawnFailed(String),

    /// Maven exited with a non-zero status
    #[error("maven exited with {}: {output}", describe_exit(.code))]
    ExitStatus { code: Option<i32>, output: String },

    /// Maven succeeded but did not write the graph file
    #[error("dependency graph output is missing: {}", .0.display())]
    MissingOutput(PathBuf),

    /// Temporary directory or output file I/O failed
    #[error("i/o error: {0}")]
    Io(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

impl From<std::io::Error> for TreeError {
    fn from(e: std::io::Error) -> Self {
        TreeError::Io(e.to_string())
    }
}
