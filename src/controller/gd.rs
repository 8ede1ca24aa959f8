use pom_parser::{find_declaration_range, Properties, XmlDocument};
use tower_lsp::lsp_types::{GotoDefinitionResponse, Location, Position};
use tracing::debug;

use crate::usecase::Document;

/// From a direct dependency that loses a conflict, jump to the declaration
/// of the direct dependency that brings in the effective version.
pub fn goto_definition(doc: &Document, position: Position) -> Option<GotoDefinitionResponse> {
    let dep = doc.dependency_at(position)?;
    let tree = doc.tree.as_ref()?;

    let effective = tree
        .find_roots(&dep.group_id, &dep.artifact_id)
        .into_iter()
        .flat_map(|root| tree.conflicts_under(root))
        .find_map(|conflict| tree.find_effective(conflict))?;
    let root = tree.node(tree.root_of(effective));

    let properties = Properties::from_document(&XmlDocument::parse(doc.text()));
    let range = match find_declaration_range(
        doc.text(),
        &root.group_id,
        &root.artifact_id,
        &properties,
    ) {
        Ok(range) => range,
        Err(e) => {
            debug!("effective version of {} not declared: {}", dep.artifact_id, e);
            return None;
        }
    };
    Some(GotoDefinitionResponse::Scalar(Location {
        uri: doc.uri.clone(),
        range: doc.range(range),
    }))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tower_lsp::lsp_types::{Range, Url};
    use tree_parser::parse_dependency_tree;

    use crate::entity::CanonicalUri;

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
</project>";

    fn document() -> (tempfile::TempDir, Document) {
        let dir = tempfile::tempdir().unwrap();
        let pom = dir.path().join("pom.xml");
        std::fs::write(&pom, POM).unwrap();
        let mut doc = Document::new(
            Url::from_file_path(&pom).unwrap(),
            CanonicalUri::try_from_path(&pom).unwrap(),
            POM,
        );
        doc.tree = Some(parse_dependency_tree(RAW, &pom).tree);
        (dir, doc)
    }

    #[test]
    fn test_jump_to_effective_version() {
        let (_dir, doc) = document();
        let Some(GotoDefinitionResponse::Scalar(location)) =
            goto_definition(&doc, Position::new(4, 20))
        else {
            panic!("expected a location");
        };
        assert_eq!(location.uri, doc.uri);
        assert_eq!(
            location.range,
            Range::new(Position::new(8, 6), Position::new(8, 36))
        );
    }

    #[test]
    fn test_no_jump_without_conflict() {
        let (_dir, doc) = document();
        assert!(goto_definition(&doc, Position::new(8, 20)).is_none());

        let (_dir, mut doc) = document();
        doc.tree = None;
        assert!(goto_definition(&doc, Position::new(4, 20)).is_none());
    }
}
