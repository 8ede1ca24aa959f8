//! Error types for pom-parser.

use thiserror::Error;

/// Errors raised while locating declarations inside a pom.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// The document does not have exactly one top-level element.
    #[error("only one root element is supported, found {0}")]
    RootCount(usize),

    /// The dependency is not literally declared in this file, e.g. it is
    /// inherited from a parent pom.
    #[error("dependency {group_id}:{artifact_id} is not declared in this file")]
    DependencyNotFound {
        group_id: String,
        artifact_id: String,
    },
}

impl LocateError {
    pub fn not_found(group_id: &str, artifact_id: &str) -> Self {
        LocateError::DependencyNotFound {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
        }
    }

    /// Structural errors are reported to the user, the rest are skipped.
    pub fn is_structural(&self) -> bool {
        matches!(self, LocateError::RootCount(_))
    }
}
