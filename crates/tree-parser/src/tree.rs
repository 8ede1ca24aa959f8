//! DependencyTree: an arena of nodes with forest queries.

use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeSeq, SerializeStruct, Serializer};

use crate::node::{DependencyNode, NodeId, OmittedKind};

/// The dependency forest of one project, one root per direct dependency.
///
/// Nodes never move once inserted, so a [`NodeId`] stays valid for the
/// lifetime of the tree. Parent links are only used for upward walks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTree {
    pom_path: PathBuf,
    nodes: Vec<DependencyNode>,
    roots: Vec<NodeId>,
    normalized_text: String,
}

impl DependencyTree {
    /// Append `node` under `parent`, or as a new root. The node inherits the
    /// root of its parent.
    pub(crate) fn insert(&mut self, mut node: DependencyNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        node.children.clear();
        node.root = match parent {
            Some(p) => self.nodes[p.0].root,
            None => id,
        };
        self.nodes.push(node);
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub(crate) fn finish(mut self, pom_path: &Path, normalized_text: String) -> Self {
        self.pom_path = pom_path.to_path_buf();
        self.normalized_text = normalized_text;
        self
    }

    /// The pom the tree was resolved for.
    pub fn pom_path(&self) -> &Path {
        &self.pom_path
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics if `id` belongs to another tree.
    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.node(id).root
    }

    /// Iterate over all nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DependencyNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Number of parent links between `id` and its root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// The chain of nodes from the root down to `id`, both included.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Number of nodes below `id`.
    pub fn descendant_count(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut pending: Vec<NodeId> = self.children(id).to_vec();
        while let Some(next) = pending.pop() {
            count += 1;
            pending.extend_from_slice(self.children(next));
        }
        count
    }

    pub fn conflicts(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().filter(|(_, n)| n.is_conflict()).map(|(id, _)| id)
    }

    /// Conflicts introduced through the direct dependency `root`.
    pub fn conflicts_under(&self, root: NodeId) -> Vec<NodeId> {
        self.conflicts().filter(|id| self.root_of(*id) == root).collect()
    }

    /// Roots with the given coordinates.
    pub fn find_roots(&self, group_id: &str, artifact_id: &str) -> Vec<NodeId> {
        self.roots
            .iter()
            .copied()
            .filter(|id| self.node(*id).is(group_id, artifact_id))
            .collect()
    }

    /// Every version of an artifact mentioned anywhere in the tree, in order
    /// of first appearance. Versions that lost a conflict are included.
    pub fn versions_of(&self, group_id: &str, artifact_id: &str) -> Vec<String> {
        let needle = format!("{group_id}:{artifact_id}:");
        let text = self.normalized_text.as_str();
        let mut versions: Vec<String> = Vec::new();
        let mut push = |v: &str| {
            if !v.is_empty() && !versions.iter().any(|known| known == v) {
                versions.push(v.to_string());
            }
        };

        for (start, _) in text.match_indices(&needle) {
            let boundary = text[..start]
                .chars()
                .next_back()
                .map_or(true, char::is_whitespace);
            if !boundary {
                continue;
            }
            let line = &text[start..];
            let line = &line[..line.find('\n').unwrap_or(line.len())];
            let coordinates = line.split_whitespace().next().unwrap_or_default();
            let parts: Vec<&str> = coordinates.split(':').collect();
            let version = match parts.as_slice() {
                [_, _, v] | [_, _, v, _] => *v,
                [_, _, .., v, _] => *v,
                _ => continue,
            };
            push(version);
            if let Some(requested) = line
                .split_once("omitted for conflict with ")
                .and_then(|(_, rest)| rest.split(')').next())
            {
                push(requested);
            }
        }
        versions
    }

    /// Jump from a conflict to the node maven actually kept: the first
    /// non-omitted occurrence of the same artifact at the effective version.
    pub fn find_effective(&self, conflict: NodeId) -> Option<NodeId> {
        let node = self.node(conflict);
        let effective = node.effective_version();
        self.iter()
            .find(|(_, n)| {
                n.status() == OmittedKind::Normal
                    && n.is(&node.group_id, &node.artifact_id)
                    && n.version == effective
            })
            .map(|(id, _)| id)
    }

    /// The effective node for coordinates: resolved through the first conflict
    /// on the artifact, or its first non-omitted occurrence.
    pub fn effective_node(&self, group_id: &str, artifact_id: &str) -> Option<NodeId> {
        if let Some(conflict) = self
            .conflicts()
            .find(|id| self.node(*id).is(group_id, artifact_id))
        {
            return self.find_effective(conflict);
        }
        self.iter()
            .find(|(_, n)| n.status() == OmittedKind::Normal && n.is(group_id, artifact_id))
            .map(|(id, _)| id)
    }
}

/// A node with its children nested, for JSON output.
struct NestedNode<'a> {
    tree: &'a DependencyTree,
    id: NodeId,
}

impl Serialize for NestedNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.tree.node(self.id);
        let mut state = serializer.serialize_struct("DependencyNode", 3)?;
        state.serialize_field("node", node)?;
        state.serialize_field("depth", &self.tree.depth(self.id))?;
        state.serialize_field(
            "children",
            &NestedChildren {
                tree: self.tree,
                ids: node.children(),
            },
        )?;
        state.end()
    }
}

struct NestedChildren<'a> {
    tree: &'a DependencyTree,
    ids: &'a [NodeId],
}

impl Serialize for NestedChildren<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.ids.len()))?;
        for id in self.ids {
            seq.serialize_element(&NestedNode {
                tree: self.tree,
                id: *id,
            })?;
        }
        seq.end()
    }
}

/// Serializes as the list of roots, each with nested `children`.
impl Serialize for DependencyTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NestedChildren {
            tree: self,
            ids: &self.roots,
        }
        .serialize(serializer)
    }
}
