mod document;
mod workspace;

pub use document::{DeclaredDependency, Document};
pub use workspace::Workspace;
