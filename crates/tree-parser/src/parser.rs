//! Parser for the depgraph-maven-plugin text output.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::node::{DependencyNode, NodeId, OmittedKind, OmittedStatus};
use crate::normalize::{marker_column, normalize_line, MARKER};
use crate::tree::DependencyTree;

const DUPLICATE_MARKER: &str = "omitted for duplicate";
const CONFLICT_MARKER: &str = "omitted for conflict";

static CONFLICT_WITH_RE: OnceLock<Regex> = OnceLock::new();

fn conflict_with_re() -> &'static Regex {
    CONFLICT_WITH_RE
        .get_or_init(|| Regex::new(r"omitted for conflict with (?P<requested>[^)\s]+)\)").unwrap())
}

/// Result of parsing one tree text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTreeOutput {
    pub tree: DependencyTree,
    /// Every conflict node, in document order.
    pub conflicts: Vec<NodeId>,
}

impl DependencyTreeOutput {
    /// The tree text after glyph and conflict normalization, header dropped.
    pub fn normalized_text(&self) -> &str {
        self.tree.normalized_text()
    }
}

/// Rebuild the dependency forest from `raw` tree text.
///
/// The first line labels the project itself and is dropped. Lines without a
/// branch marker or with fewer than three coordinates are skipped.
/// Never fails: empty input yields an empty forest.
pub fn parse_dependency_tree(raw: &str, root_pom_path: &Path) -> DependencyTreeOutput {
    let normalized: Vec<String> = raw.lines().skip(1).map(normalize_line).collect();

    let mut builder = TreeBuilder::default();
    for line in &normalized {
        let Some(column) = marker_column(line) else {
            if !line.trim().is_empty() {
                debug!("skip dependency tree line without marker: {}", line);
            }
            continue;
        };
        let Some(node) = parse_node(&line[column + MARKER.len()..]) else {
            debug!("skip dependency tree line without coordinates: {}", line);
            continue;
        };
        builder.push(column, node);
    }

    let mut normalized_text = normalized.join("\n");
    if !normalized_text.is_empty() {
        normalized_text.push('\n');
    }
    let tree = builder.finish(root_pom_path, normalized_text);
    let conflicts = tree
        .iter()
        .filter(|(_, n)| n.is_conflict())
        .map(|(id, _)| id)
        .collect();
    DependencyTreeOutput { tree, conflicts }
}

/// Parse `groupId:artifactId[:type[:classifier]]:version:scope (annotation)`.
fn parse_node(body: &str) -> Option<DependencyNode> {
    let body = body.trim();
    let (coordinates, supplement) = match body.find('(') {
        Some(i) => (body[..i].trim(), body[i..].trim()),
        None => (body, ""),
    };

    let parts: Vec<&str> = coordinates.split(':').collect();
    let (group_id, artifact_id, version, scope) = match parts.as_slice() {
        [g, a, v] => (*g, *a, *v, ""),
        [g, a, v, s] => (*g, *a, *v, *s),
        [g, a, .., v, s] => (*g, *a, *v, *s),
        _ => return None,
    };
    if group_id.is_empty() || artifact_id.is_empty() || version.is_empty() {
        return None;
    }

    let full_artifact_name = if scope.is_empty() {
        format!("{group_id}:{artifact_id}:{version}")
    } else {
        format!("{group_id}:{artifact_id}:{version}:{scope}")
    };
    let description = supplement
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string();
    let (status, requested_version) = classify(&full_artifact_name, version, supplement);

    Some(DependencyNode {
        group_id: group_id.to_string(),
        artifact_id: artifact_id.to_string(),
        version: version.to_string(),
        scope: scope.to_string(),
        full_artifact_name,
        supplement_text: supplement.to_string(),
        requested_version,
        omitted_status: OmittedStatus {
            status,
            effective_version: version.to_string(),
            description,
        },
        parent: None,
        children: Vec::new(),
        root: NodeId(0),
    })
}

/// Classify an annotation. The version of a conflict line is already the
/// effective one, the requested version is read back from the annotation.
fn classify(name: &str, version: &str, supplement: &str) -> (OmittedKind, Option<String>) {
    if supplement.contains(DUPLICATE_MARKER) {
        return (OmittedKind::Duplicate, None);
    }
    if !supplement.contains(CONFLICT_MARKER) {
        return (OmittedKind::Normal, None);
    }
    match conflict_with_re().captures(supplement) {
        Some(caps) if &caps["requested"] != version => {
            (OmittedKind::Conflict, Some(caps["requested"].to_string()))
        }
        Some(_) => {
            warn!("conflict annotation of {} names its own version, treated as normal", name);
            (OmittedKind::Normal, None)
        }
        None => {
            warn!("unrecognized conflict annotation on {}: {}", name, supplement);
            (OmittedKind::Normal, None)
        }
    }
}

/// Attaches nodes to the forest from their marker column.
#[derive(Default)]
struct TreeBuilder {
    tree: DependencyTree,
    /// The open ancestors of the next line with their columns, innermost last.
    ancestors: Vec<(NodeId, usize)>,
}

impl TreeBuilder {
    fn push(&mut self, column: usize, node: DependencyNode) {
        if column == 0 {
            self.ancestors.clear();
        }
        while self
            .ancestors
            .last()
            .is_some_and(|(_, ancestor_column)| *ancestor_column >= column)
        {
            self.ancestors.pop();
        }
        let parent = self.ancestors.last().map(|(id, _)| *id);
        if parent.is_none() && column != 0 {
            debug!("{} has no parent at column {}, starting a new root", node.full_artifact_name, column);
        }

        let id = self.tree.insert(node, parent);
        self.ancestors.push((id, column));
    }

    fn finish(self, pom_path: &Path, normalized_text: String) -> DependencyTree {
        self.tree.finish(pom_path, normalized_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "my-app
+- com.x:lib-a:1.0:compile
|  \\- com.y:lib-b:2.0:compile (omitted for conflict: 3.0)
+- com.z:lib-c:1.5:test
";

    fn parse(raw: &str) -> DependencyTreeOutput {
        parse_dependency_tree(raw, Path::new("/project/pom.xml"))
    }

    #[test]
    fn test_end_to_end_scenario() {
        let output = parse(SCENARIO);
        let tree = &output.tree;

        assert_eq!(tree.roots().len(), 2);
        let lib_a = tree.roots()[0];
        let lib_c = tree.roots()[1];
        assert_eq!(tree.node(lib_a).artifact_id, "lib-a");
        assert_eq!(tree.node(lib_c).artifact_id, "lib-c");
        assert!(tree.children(lib_c).is_empty());

        let children = tree.children(lib_a);
        assert_eq!(children.len(), 1);
        let lib_b = tree.node(children[0]);
        assert_eq!(lib_b.artifact_id, "lib-b");
        assert_eq!(lib_b.version, "3.0");
        assert_eq!(lib_b.status(), OmittedKind::Conflict);
        assert_eq!(lib_b.requested_version.as_deref(), Some("2.0"));
        assert_eq!(lib_b.root(), lib_a);

        assert_eq!(output.conflicts, vec![children[0]]);
    }

    #[test]
    fn test_conflict_fields() {
        let output = parse("p\n+- com.x:lib:1.0:compile (omitted for conflict: 2.0)\n");
        let node = output.tree.node(output.conflicts[0]);
        assert_eq!(node.version, "2.0");
        assert_eq!(node.effective_version(), "2.0");
        assert!(node.omitted_status.description.contains("conflict with 1.0"));
        assert_eq!(node.supplement_text, "(omitted for conflict with 1.0)");
        assert_eq!(node.full_artifact_name, "com.x:lib:2.0:compile");
        assert_ne!(node.requested_version.as_deref(), Some(node.effective_version()));
    }

    #[test]
    fn test_duplicate_preserves_version() {
        let output = parse("p\n+- com.x:lib:1.0:compile (omitted for duplicate)\n");
        let node = output.tree.node(output.tree.roots()[0]);
        assert_eq!(node.status(), OmittedKind::Duplicate);
        assert_eq!(node.effective_version(), node.version);
        assert!(output.conflicts.is_empty());
    }

    #[test]
    fn test_other_annotations_are_normal() {
        let output = parse("p\n+- com.x:lib:1.0:compile (version managed from 0.9)\n");
        let node = output.tree.node(output.tree.roots()[0]);
        assert_eq!(node.status(), OmittedKind::Normal);
        assert_eq!(node.omitted_status.description, "version managed from 0.9");
    }

    #[test]
    fn test_unrecognized_conflict_format_is_not_trusted() {
        let output = parse(
            "p
+- com.x:lib:1.0:compile (omitted for conflict)
+- com.x:lib:1.0:compile (omitted for conflict with 1.0)
",
        );
        assert!(output.conflicts.is_empty());
        for (_, node) in output.tree.iter() {
            assert_eq!(node.status(), OmittedKind::Normal);
            assert_eq!(node.effective_version(), node.version);
        }
    }

    #[test]
    fn test_round_trip_depth() {
        let raw = "p
+- g:a0:1:compile
|  \\- g:a1:1:compile
|     \\- g:a2:1:compile
|        \\- g:a3:1:compile
\\- g:b0:1:compile
   +- g:b1:1:compile
   |  \\- g:b2:1:compile
   \\- g:b3:1:compile
";
        let tree = parse(raw).tree;
        assert_eq!(tree.roots().len(), 2);

        let deepest = tree.iter().find(|(_, n)| n.artifact_id == "a3").unwrap().0;
        assert_eq!(tree.depth(deepest), 3);
        let max_depth = tree.iter().map(|(id, _)| tree.depth(id)).max();
        assert_eq!(max_depth, Some(3));

        for (id, node) in tree.iter() {
            let top = *tree.path_to(id).first().unwrap();
            assert_eq!(node.root(), top);
            assert_eq!(tree.depth(top), 0);
        }

        // ascend two levels from b2 back to b0
        let b0 = tree.roots()[1];
        let names: Vec<_> = tree
            .children(b0)
            .iter()
            .map(|c| tree.node(*c).artifact_id.as_str())
            .collect();
        assert_eq!(names, ["b1", "b3"]);
    }

    #[test]
    fn test_ascend_after_deep_jump() {
        let raw = "p
+- g:r:1.0:compile
      +- g:deep:1.0:compile
   +- g:mid:1.0:compile
";
        let tree = parse(raw).tree;
        assert_eq!(tree.roots().len(), 1);
        let r = tree.roots()[0];
        assert_eq!(tree.node(r).artifact_id, "r");

        let names: Vec<_> = tree
            .children(r)
            .iter()
            .map(|c| tree.node(*c).artifact_id.as_str())
            .collect();
        assert_eq!(names, ["deep", "mid"]);
        let mid = tree.children(r)[1];
        assert_eq!(tree.node(mid).root(), r);
    }

    #[test]
    fn test_scopeless_conflict_line() {
        let output = parse("p\n+- g:a:1.0 (omitted for conflict: 2.0)\n");
        let (_, node) = output.tree.iter().next().unwrap();
        assert_eq!(node.group_id, "g");
        assert_eq!(node.artifact_id, "a");
        assert_eq!(node.version, "2.0");
        assert_eq!(node.requested_version.as_deref(), Some("1.0"));
        assert_eq!(node.status(), OmittedKind::Conflict);
    }

    #[test]
    fn test_idempotence() {
        let first = parse(SCENARIO);
        let second = parse(SCENARIO);
        assert_eq!(first, second);
        assert_eq!(first.normalized_text(), second.normalized_text());
    }

    #[test]
    fn test_normalized_text() {
        let output = parse(SCENARIO);
        assert_eq!(
            output.normalized_text(),
            "+- com.x:lib-a:1.0:compile
   +- com.y:lib-b:3.0:compile (omitted for conflict with 2.0)
+- com.z:lib-c:1.5:test
"
        );
    }

    #[test]
    fn test_empty_input() {
        for raw in ["", "my-app", "my-app\n\n"] {
            let output = parse(raw);
            assert!(output.tree.is_empty());
            assert!(output.conflicts.is_empty());
        }
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let raw = "p
+- g:a:1:compile
   garbage without marker
   +- onlyone
   +- g:child:2
";
        let tree = parse(raw).tree;
        assert_eq!(tree.len(), 2);
        let child = tree.node(tree.children(tree.roots()[0])[0]);
        assert_eq!(child.artifact_id, "child");
        assert_eq!(child.scope, "");
        assert_eq!(child.full_artifact_name, "g:child:2");
    }

    #[test]
    fn test_type_and_classifier_coordinates() {
        let tree = parse("p\n+- g:a:jar:tests:1.0:test\n").tree;
        let node = tree.node(tree.roots()[0]);
        assert_eq!(node.version, "1.0");
        assert_eq!(node.scope, "test");
        assert_eq!(node.full_artifact_name, "g:a:1.0:test");
    }

    #[test]
    fn test_orphan_line_becomes_root() {
        let tree = parse("p\n   +- g:a:1:compile\n   +- g:b:1:compile\n").tree;
        assert_eq!(tree.roots().len(), 2);
    }
}
