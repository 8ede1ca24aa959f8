use std::collections::HashMap;

use pom_parser::{
    exclude_dependency, set_dependency_version, ByteEdit, LineIndex, Properties, XmlDocument,
};
use serde_json::Value;
use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionResponse, Diagnostic, TextEdit,
    Url, WorkspaceEdit,
};
use tracing::debug;
use tree_parser::DependencyTree;

use crate::entity::{parse_conflict_message, ConflictRecord};

use super::diagnostic::{is_conflict_diagnostic, ConflictDiagnostics};

/// Quick fixes for the conflict diagnostics in `diagnostics`.
pub fn code_action(
    uri: &Url,
    text: &str,
    diagnostics: &[Diagnostic],
    conflicts: &ConflictDiagnostics,
    tree: Option<&DependencyTree>,
) -> CodeActionResponse {
    let mut actions: CodeActionResponse = vec![];
    for diag in diagnostics.iter().filter(|d| is_conflict_diagnostic(d)) {
        let Some(record) = conflict_record(uri, diag, conflicts, tree) else {
            debug!("no conflict record for diagnostic {:?}", diag.message);
            continue;
        };
        for action in conflict_actions(uri, text, &record, diag) {
            let duplicated = actions.iter().any(|a| match (a, &action) {
                (CodeActionOrCommand::CodeAction(a), CodeActionOrCommand::CodeAction(b)) => {
                    a.title == b.title
                }
                _ => false,
            });
            if !duplicated {
                actions.push(action);
            }
        }
    }
    actions
}

/// The record behind `diag`, read from its `data`, or from its message when
/// the client dropped `data`.
fn conflict_record(
    uri: &Url,
    diag: &Diagnostic,
    conflicts: &ConflictDiagnostics,
    tree: Option<&DependencyTree>,
) -> Option<ConflictRecord> {
    if let Some(record) = diag
        .data
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|id| conflicts.record(uri, id))
    {
        return Some(record.clone());
    }
    parse_conflict_message(&diag.message)?.into_record(tree?)
}

fn conflict_actions(
    uri: &Url,
    text: &str,
    record: &ConflictRecord,
    diag: &Diagnostic,
) -> Vec<CodeActionOrCommand> {
    let index = LineIndex::new(text);
    let mut actions = vec![];

    match set_dependency_version(
        text,
        &record.group_id,
        &record.artifact_id,
        &record.effective_version,
    ) {
        Ok(Some(edit)) => actions.push(quick_fix(
            format!(
                "Set version of {} to {}",
                record.coordinates(),
                record.effective_version
            ),
            uri,
            &index,
            edit,
            diag,
        )),
        Ok(None) => {}
        Err(e) => debug!("set version of {}: {}", record.coordinates(), e),
    }

    let properties = Properties::from_document(&XmlDocument::parse(text));
    match exclude_dependency(
        text,
        &record.root_group_id,
        &record.root_artifact_id,
        &properties,
        &record.group_id,
        &record.artifact_id,
    ) {
        Ok(Some(edit)) => actions.push(quick_fix(
            format!(
                "Exclude {} from {}",
                record.coordinates(),
                record.root_artifact_id
            ),
            uri,
            &index,
            edit,
            diag,
        )),
        Ok(None) => {}
        Err(e) => debug!("exclude {}: {}", record.coordinates(), e),
    }

    actions
}

fn quick_fix(
    title: String,
    uri: &Url,
    index: &LineIndex<'_>,
    edit: ByteEdit,
    diag: &Diagnostic,
) -> CodeActionOrCommand {
    CodeAction {
        title,
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![diag.clone()]),
        edit: Some(WorkspaceEdit {
            changes: Some(HashMap::from([(
                uri.clone(),
                vec![TextEdit {
                    range: index.range(edit.range),
                    new_text: edit.new_text,
                }],
            )])),
            document_changes: None,
            change_annotations: None,
        }),
        ..Default::default()
    }
    .into()
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

    const POM: &str = "<project>
    <dependencies>
        <dependency>
            <groupId>com.x</groupId>
            <artifactId>lib-a</artifactId>
        </dependency>
        <dependency>
            <groupId>com.z</groupId>
            <artifactId>lib-c</artifactId>
        </dependency>
    </dependencies>
</project>
";

    fn setup() -> (Url, DependencyTree, ConflictDiagnostics, Vec<Diagnostic>) {
        let uri = Url::parse("file:///p/pom.xml").unwrap();
        let tree = parse_dependency_tree(RAW, Path::new("/p/pom.xml")).tree;
        let mut conflicts = ConflictDiagnostics::default();
        let diags = conflicts.refresh(&uri, POM, &tree).unwrap();
        (uri, tree, conflicts, diags)
    }

    fn titles(actions: &CodeActionResponse) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                CodeActionOrCommand::CodeAction(a) => Some(a.title.clone()),
                CodeActionOrCommand::Command(_) => None,
            })
            .collect()
    }

    fn edit_of(actions: &CodeActionResponse, title: &str, uri: &Url) -> TextEdit {
        let action = actions
            .iter()
            .find_map(|a| match a {
                CodeActionOrCommand::CodeAction(a) if a.title == title => Some(a),
                _ => None,
            })
            .unwrap();
        action.edit.as_ref().unwrap().changes.as_ref().unwrap()[uri][0].clone()
    }

    #[test]
    fn test_conflict_quick_fixes() {
        let (uri, tree, conflicts, diags) = setup();
        let actions = code_action(&uri, POM, &diags, &conflicts, Some(&tree));
        assert_eq!(
            titles(&actions),
            [
                "Set version of com.y:lib-b to 3.0",
                "Exclude com.y:lib-b from lib-a"
            ]
        );

        let pin = edit_of(&actions, "Set version of com.y:lib-b to 3.0", &uri);
        assert!(pin.new_text.contains("<dependencyManagement>"));
        assert!(pin.new_text.contains("<version>3.0</version>"));

        let exclude = edit_of(&actions, "Exclude com.y:lib-b from lib-a", &uri);
        assert!(exclude.new_text.contains("<exclusions>"));
        assert!(exclude.new_text.contains("<artifactId>lib-b</artifactId>"));
        // inside the lib-a dependency
        assert!(exclude.range.start.line >= 4 && exclude.range.start.line <= 5);
    }

    #[test]
    fn test_fallback_to_message() {
        let (uri, tree, _, mut diags) = setup();
        diags[0].data = None;
        let actions = code_action(
            &uri,
            POM,
            &diags,
            &ConflictDiagnostics::default(),
            Some(&tree),
        );
        assert_eq!(titles(&actions).len(), 2);

        // without data and tree there is nothing to fix
        let actions = code_action(&uri, POM, &diags, &ConflictDiagnostics::default(), None);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_ignores_other_diagnostics() {
        let (uri, tree, conflicts, mut diags) = setup();
        diags[0].code = None;
        assert!(code_action(&uri, POM, &diags, &conflicts, Some(&tree)).is_empty());
    }
}
