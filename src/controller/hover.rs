use std::fmt::Write;

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};
use tree_parser::DependencyTree;

use crate::usecase::{DeclaredDependency, Document};

pub fn hover(doc: &Document, position: Position) -> Option<Hover> {
    let dep = doc.dependency_at(position)?;
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: dependency_markdown(&dep, doc.tree.as_ref()),
        }),
        range: Some(dep.range),
    })
}

fn dependency_markdown(dep: &DeclaredDependency, tree: Option<&DependencyTree>) -> String {
    let mut s = format!("**{}:{}**", dep.group_id, dep.artifact_id);
    let Some(tree) = tree else {
        if let Some(version) = &dep.version {
            let _ = write!(s, " `{}`", version);
        }
        return s;
    };

    let root = tree
        .find_roots(&dep.group_id, &dep.artifact_id)
        .first()
        .map(|id| tree.node(*id));
    match (root, &dep.version) {
        (Some(root), _) => {
            let _ = write!(s, " `{}`", root.version);
            if !root.scope.is_empty() {
                let _ = write!(s, " ({})", root.scope);
            }
        }
        (None, Some(version)) => {
            let _ = write!(s, " `{}`", version);
        }
        (None, None) => {}
    }
    s.push_str("\n\n");

    if let Some(id) = tree.find_roots(&dep.group_id, &dep.artifact_id).first() {
        let _ = writeln!(
            s,
            "transitive dependencies: {}",
            tree.descendant_count(*id)
        );
        let conflicts = tree.conflicts_under(*id);
        if !conflicts.is_empty() {
            s.push_str("\nconflicts:\n");
            for conflict in conflicts {
                let node = tree.node(conflict);
                let _ = writeln!(
                    s,
                    "- {}:{} conflicts with {}",
                    node.coordinates(),
                    node.requested_version.as_deref().unwrap_or(&node.version),
                    node.effective_version()
                );
            }
        }
    }

    let versions = tree.versions_of(&dep.group_id, &dep.artifact_id);
    if !versions.is_empty() {
        let _ = write!(s, "\nversions in tree: {}", versions.join(", "));
    }
    s
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tower_lsp::lsp_types::Range;
    use tree_parser::parse_dependency_tree;

    use super::*;

    const RAW: &str = "com.example:my-app:jar:1.0
+- com.x:lib-a:1.0:compile
|  +- com.q:lib-q:1.1:compile
|  \\- com.y:lib-b:2.0:compile (omitted for conflict: 3.0)
\\- com.y:lib-b:3.0:compile
";

    fn dep(group_id: &str, artifact_id: &str) -> DeclaredDependency {
        DeclaredDependency {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: Some("1.0".to_string()),
            range: Range::default(),
        }
    }

    #[test]
    fn test_hover_root_with_conflict() {
        let tree = parse_dependency_tree(RAW, Path::new("/p/pom.xml")).tree;
        let md = dependency_markdown(&dep("com.x", "lib-a"), Some(&tree));
        assert!(md.starts_with("**com.x:lib-a** `1.0` (compile)"));
        assert!(md.contains("transitive dependencies: 2"));
        assert!(md.contains("- com.y:lib-b:2.0 conflicts with 3.0"));
    }

    #[test]
    fn test_hover_versions_in_tree() {
        let tree = parse_dependency_tree(RAW, Path::new("/p/pom.xml")).tree;
        let md = dependency_markdown(&dep("com.y", "lib-b"), Some(&tree));
        assert!(md.contains("versions in tree: 3.0, 2.0"));
        assert!(!md.contains("conflicts:"));
    }

    #[test]
    fn test_hover_without_tree() {
        let md = dependency_markdown(&dep("com.x", "lib-a"), None);
        assert_eq!(md, "**com.x:lib-a** `1.0`");
    }
}
