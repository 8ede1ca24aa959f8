use std::path::PathBuf;

use pom_parser::{dependency_at_offset, ByteRange, LineIndex, Properties, XmlDocument};
use tower_lsp::lsp_types::{Position, Range, Url};
use tree_parser::DependencyTree;

use crate::entity::CanonicalUri;

/// An open pom and the last dependency tree resolved for it.
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Url,
    pub canonical_uri: CanonicalUri,
    pub rev: usize,
    text: String,
    pub tree: Option<DependencyTree>,
    /// A structural error was already shown for the current text.
    pub structure_reported: bool,
}

/// A `<dependency>` under the cursor, with placeholders resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub range: Range,
}

impl Document {
    pub fn new(uri: Url, canonical_uri: CanonicalUri, text: &str) -> Self {
        Self {
            uri,
            canonical_uri,
            rev: 0,
            text: text.to_string(),
            tree: None,
            structure_reported: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn update(&mut self, text: &str) {
        if self.text != text {
            self.structure_reported = false;
        }
        self.text = text.to_string();
        self.rev += 1;
    }

    pub fn pom_path(&self) -> Result<PathBuf, anyhow::Error> {
        self.canonical_uri.to_path_buf()
    }

    pub fn line_index(&self) -> LineIndex<'_> {
        LineIndex::new(&self.text)
    }

    pub fn range(&self, range: ByteRange) -> Range {
        self.line_index().range(range)
    }

    pub fn dependency_at(&self, position: Position) -> Option<DeclaredDependency> {
        let index = self.line_index();
        let doc = XmlDocument::parse(&self.text);
        let dependency = dependency_at_offset(&doc, index.offset(position))?;
        let properties = Properties::from_document(&doc);
        Some(DeclaredDependency {
            group_id: properties.resolve(dependency.group_id.as_deref()?),
            artifact_id: properties.resolve(dependency.artifact_id.as_deref()?),
            version: dependency.version.as_deref().map(|v| properties.resolve(v)),
            range: index.range(doc.get(dependency.element).range()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = "<project>
  <properties><g>com.x</g></properties>
  <dependencies>
    <dependency>
      <groupId>${g}</groupId>
      <artifactId>lib-a</artifactId>
    </dependency>
  </dependencies>
</project>";

    fn document(text: &str) -> (tempfile::TempDir, Document) {
        let dir = tempfile::tempdir().unwrap();
        let pom = dir.path().join("pom.xml");
        std::fs::write(&pom, text).unwrap();
        let canonical = CanonicalUri::try_from_path(&pom).unwrap();
        let uri = Url::from_file_path(&pom).unwrap();
        (dir, Document::new(uri, canonical, text))
    }

    #[test]
    fn test_dependency_at_position() {
        let (_dir, doc) = document(POM);
        let dep = doc.dependency_at(Position::new(5, 20)).unwrap();
        assert_eq!(dep.group_id, "com.x");
        assert_eq!(dep.artifact_id, "lib-a");
        assert_eq!(dep.version, None);
        assert_eq!(dep.range.start, Position::new(3, 4));
        assert_eq!(dep.range.end, Position::new(6, 17));

        assert!(doc.dependency_at(Position::new(1, 5)).is_none());
    }

    #[test]
    fn test_update_bumps_rev() {
        let (_dir, mut doc) = document(POM);
        doc.structure_reported = true;
        doc.update(POM);
        assert_eq!(doc.rev, 1);
        assert!(doc.structure_reported);
        doc.update("<project/>");
        assert_eq!(doc.rev, 2);
        assert!(!doc.structure_reported);
        assert_eq!(doc.pom_path().unwrap(), doc.canonical_uri.to_path_buf().unwrap());
    }
}
