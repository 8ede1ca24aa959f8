use serde_json::{json, Value};
use tower_lsp::lsp_types::{ExecuteCommandParams, Url};
use tree_parser::DependencyTree;

use crate::entity::{DEPENDENCY_TREE, GO_TO_EFFECTIVE, REFRESH};

/// A `workspace/executeCommand` request with its arguments decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteCommand {
    DependencyTree(Url),
    GoToEffective {
        uri: Url,
        group_id: String,
        artifact_id: String,
    },
    Refresh(Url),
}

impl ExecuteCommand {
    /// `None` for unknown commands and missing or mistyped arguments.
    pub fn parse(params: &ExecuteCommandParams) -> Option<Self> {
        let args = &params.arguments;
        let string_arg = |i: usize| args.get(i).and_then(Value::as_str);
        let uri = Url::parse(string_arg(0)?).ok()?;
        match params.command.as_str() {
            DEPENDENCY_TREE => Some(ExecuteCommand::DependencyTree(uri)),
            GO_TO_EFFECTIVE => Some(ExecuteCommand::GoToEffective {
                uri,
                group_id: string_arg(1)?.to_string(),
                artifact_id: string_arg(2)?.to_string(),
            }),
            REFRESH => Some(ExecuteCommand::Refresh(uri)),
            _ => None,
        }
    }
}

pub fn dependency_tree_json(tree: &DependencyTree) -> Option<Value> {
    serde_json::to_value(tree).ok()
}

/// The chain from the direct dependency down to the node maven kept for
/// `group_id:artifact_id`.
pub fn go_to_effective_json(
    tree: &DependencyTree,
    group_id: &str,
    artifact_id: &str,
) -> Option<Value> {
    let effective = tree.effective_node(group_id, artifact_id)?;
    let path: Vec<Value> = tree
        .path_to(effective)
        .into_iter()
        .map(|id| {
            let node = tree.node(id);
            json!({
                "groupId": node.group_id,
                "artifactId": node.artifact_id,
                "version": node.version,
                "scope": node.scope,
            })
        })
        .collect();
    Some(json!({
        "effectiveVersion": tree.node(effective).version,
        "path": path,
    }))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tree_parser::parse_dependency_tree;

    use super::*;

    const RAW: &str = "com.example:my-app:jar:1.0
+- com.x:lib-a:1.0:compile
|  \\- com.y:lib-b:2.0:compile (omitted for conflict: 3.0)
\\- com.z:lib-c:1.5:compile
   \\- com.y:lib-b:3.0:compile
";

    fn params(command: &str, arguments: Vec<Value>) -> ExecuteCommandParams {
        ExecuteCommandParams {
            command: command.to_string(),
            arguments,
            work_done_progress_params: Default::default(),
        }
    }

    #[test]
    fn test_parse_commands() {
        let uri = "file:///p/pom.xml";
        assert_eq!(
            ExecuteCommand::parse(&params(DEPENDENCY_TREE, vec![json!(uri)])),
            Some(ExecuteCommand::DependencyTree(Url::parse(uri).unwrap()))
        );
        assert_eq!(
            ExecuteCommand::parse(&params(
                GO_TO_EFFECTIVE,
                vec![json!(uri), json!("com.y"), json!("lib-b")]
            )),
            Some(ExecuteCommand::GoToEffective {
                uri: Url::parse(uri).unwrap(),
                group_id: "com.y".to_string(),
                artifact_id: "lib-b".to_string(),
            })
        );
        assert!(ExecuteCommand::parse(&params(GO_TO_EFFECTIVE, vec![json!(uri)])).is_none());
        assert!(ExecuteCommand::parse(&params(REFRESH, vec![json!(1)])).is_none());
        assert!(ExecuteCommand::parse(&params("other", vec![json!(uri)])).is_none());
    }

    #[test]
    fn test_go_to_effective_path() {
        let tree = parse_dependency_tree(RAW, Path::new("/p/pom.xml")).tree;
        let value = go_to_effective_json(&tree, "com.y", "lib-b").unwrap();
        assert_eq!(value["effectiveVersion"], "3.0");
        assert_eq!(value["path"][0]["artifactId"], "lib-c");
        assert_eq!(value["path"][1]["artifactId"], "lib-b");
        assert_eq!(value["path"].as_array().unwrap().len(), 2);

        assert!(go_to_effective_json(&tree, "com.none", "none").is_none());
    }

    #[test]
    fn test_dependency_tree_json() {
        let tree = parse_dependency_tree(RAW, Path::new("/p/pom.xml")).tree;
        let value = dependency_tree_json(&tree).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["node"]["artifactId"], "lib-a");
        assert_eq!(value[0]["children"][0]["node"]["requestedVersion"], "2.0");
    }
}
