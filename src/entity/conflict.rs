use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_parser::{DependencyTree, NodeId};

/// Diagnostic code of dependency conflict diagnostics, matched by the quick
/// fixes.
pub const CONFLICT_CODE: &str = "maven.dependency.conflict";
pub const DIAGNOSTIC_SOURCE: &str = "maven-appraiser";

static MESSAGE_RE: OnceLock<Regex> = OnceLock::new();

fn message_re() -> &'static Regex {
    MESSAGE_RE.get_or_init(|| {
        Regex::new(
            r"^(?P<root>[^:]+): (?P<group>[^:\s]+):(?P<artifact>[^:\s]+):(?P<requested>[^:\s]+) conflicts with (?P<effective>\S+)$",
        )
        .unwrap()
    })
}

/// A conflict reported against the direct dependency that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub root_group_id: String,
    pub root_artifact_id: String,
    pub group_id: String,
    pub artifact_id: String,
    pub requested_version: String,
    pub effective_version: String,
}

impl ConflictRecord {
    /// `None` unless `id` is a conflict node.
    pub fn from_node(tree: &DependencyTree, id: NodeId) -> Option<Self> {
        let node = tree.get(id)?;
        if !node.is_conflict() {
            return None;
        }
        let root = tree.node(node.root());
        Some(Self {
            root_group_id: root.group_id.clone(),
            root_artifact_id: root.artifact_id.clone(),
            group_id: node.group_id.clone(),
            artifact_id: node.artifact_id.clone(),
            requested_version: node.requested_version.clone()?,
            effective_version: node.effective_version().to_string(),
        })
    }

    pub fn message(&self) -> String {
        format!(
            "{}: {}:{}:{} conflicts with {}",
            self.root_artifact_id,
            self.group_id,
            self.artifact_id,
            self.requested_version,
            self.effective_version
        )
    }

    /// Identity of the diagnostic, stable across refreshes.
    pub fn id(&self) -> String {
        format!(
            "{}:{}/{}:{}:{}",
            self.root_group_id,
            self.root_artifact_id,
            self.group_id,
            self.artifact_id,
            self.requested_version
        )
    }

    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

/// The fields of a conflict message. The root is only known by artifact id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictMessage {
    pub root_artifact_id: String,
    pub group_id: String,
    pub artifact_id: String,
    pub requested_version: String,
    pub effective_version: String,
}

impl ConflictMessage {
    /// Complete the record with the root group id found in `tree`.
    pub fn into_record(self, tree: &DependencyTree) -> Option<ConflictRecord> {
        // prefer the root that actually carries this conflict
        let candidates: Vec<NodeId> = tree
            .roots()
            .iter()
            .copied()
            .filter(|id| tree.node(*id).artifact_id == self.root_artifact_id)
            .collect();
        let root = candidates
            .iter()
            .copied()
            .find(|id| {
                tree.conflicts_under(*id)
                    .iter()
                    .any(|c| tree.node(*c).is(&self.group_id, &self.artifact_id))
            })
            .or_else(|| candidates.first().copied())
            .map(|id| tree.node(id))?;
        Some(ConflictRecord {
            root_group_id: root.group_id.clone(),
            root_artifact_id: self.root_artifact_id,
            group_id: self.group_id,
            artifact_id: self.artifact_id,
            requested_version: self.requested_version,
            effective_version: self.effective_version,
        })
    }
}

/// Read a conflict diagnostic message back into its fields.
pub fn parse_conflict_message(message: &str) -> Option<ConflictMessage> {
    let caps = message_re().captures(message.trim())?;
    Some(ConflictMessage {
        root_artifact_id: caps["root"].to_string(),
        group_id: caps["group"].to_string(),
        artifact_id: caps["artifact"].to_string(),
        requested_version: caps["requested"].to_string(),
        effective_version: caps["effective"].to_string(),
    })
}
