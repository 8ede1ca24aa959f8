//! Dependency node types.

use serde::Serialize;

/// Index of a node inside its [`DependencyTree`](crate::DependencyTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Why maven left a node out of the resolved graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OmittedKind {
    #[default]
    Normal,
    Duplicate,
    Conflict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OmittedStatus {
    pub status: OmittedKind,
    /// The version maven actually uses for this artifact.
    pub effective_version: String,
    /// Annotation text without the parentheses, e.g. `omitted for conflict with 1.0`.
    pub description: String,
}

/// One dependency occurrence in the tree output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub group_id: String,
    pub artifact_id: String,
    /// For conflicts this is the effective version, see `requested_version`.
    pub version: String,
    pub scope: String,
    /// `groupId:artifactId:version:scope`
    pub full_artifact_name: String,
    /// Raw parenthetical annotation, empty when there is none.
    pub supplement_text: String,
    /// The version this path asked for and lost, set on conflicts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_version: Option<String>,
    pub omitted_status: OmittedStatus,
    #[serde(skip)]
    pub(crate) parent: Option<NodeId>,
    #[serde(skip)]
    pub(crate) children: Vec<NodeId>,
    #[serde(skip)]
    pub(crate) root: NodeId,
}

impl DependencyNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The top-level direct dependency that brought this node in.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn status(&self) -> OmittedKind {
        self.omitted_status.status
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == OmittedKind::Conflict
    }

    pub fn effective_version(&self) -> &str {
        &self.omitted_status.effective_version
    }

    pub fn is(&self, group_id: &str, artifact_id: &str) -> bool {
        self.group_id == group_id && self.artifact_id == artifact_id
    }

    /// `groupId:artifactId`
    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}
