//! Maps dependency coordinates back to their declaration in a pom buffer.

use tracing::trace;

use crate::error::LocateError;
use crate::pom::{declared_dependencies, project_element, PomDependency, Properties};
use crate::xml::{ByteRange, ElementId, XmlDocument};

/// Range of the `<artifactId>` element declaring `group_id:artifact_id` in
/// the project's direct `<dependencies>`.
pub fn find_declaration_range(
    text: &str,
    group_id: &str,
    artifact_id: &str,
    properties: &Properties,
) -> Result<ByteRange, LocateError> {
    let doc = XmlDocument::parse(text);
    let project = project_element(&doc)?;
    locate_in_document(&doc, project, group_id, artifact_id, properties)
}

/// Same as [`find_declaration_range`] on an already parsed document.
pub fn locate_in_document(
    doc: &XmlDocument,
    project: ElementId,
    group_id: &str,
    artifact_id: &str,
    properties: &Properties,
) -> Result<ByteRange, LocateError> {
    let dependency = find_declaration(doc, project, group_id, artifact_id, properties)?;
    // a declaration without <artifactId> cannot match, so this is always set
    let anchor = dependency.artifact_id_element.unwrap_or(dependency.element);
    trace!(
        "located {}:{} at {:?}",
        group_id,
        artifact_id,
        doc.get(anchor).range()
    );
    Ok(doc.get(anchor).range())
}

/// The direct dependency declaring `group_id:artifact_id`.
pub fn find_declaration(
    doc: &XmlDocument,
    project: ElementId,
    group_id: &str,
    artifact_id: &str,
    properties: &Properties,
) -> Result<PomDependency, LocateError> {
    declared_dependencies(doc, project)
        .into_iter()
        .find(|d| d.matches(group_id, artifact_id, properties))
        .ok_or_else(|| LocateError::not_found(group_id, artifact_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<project>
  <properties>
    <guava.group>com.google.guava</guava.group>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>lib-a</artifactId>
      <version>1.0</version>
    </dependency>
    <dependency>
      <groupId>${guava.group}</groupId>
      <artifactId>guava</artifactId>
    </dependency>
  </dependencies>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.example</groupId>
        <artifactId>managed-only</artifactId>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>"#;

    fn props() -> Properties {
        Properties::from_document(&XmlDocument::parse(POM))
    }

    #[test]
    fn test_range_covers_artifact_id_element() {
        let range = find_declaration_range(POM, "org.example", "lib-a", &props()).unwrap();
        assert_eq!(&POM[range.start..range.end], "<artifactId>lib-a</artifactId>");
    }

    #[test]
    fn test_placeholders_are_resolved() {
        let range = find_declaration_range(POM, "com.google.guava", "guava", &props()).unwrap();
        assert_eq!(&POM[range.start..range.end], "<artifactId>guava</artifactId>");

        // without the properties the literal placeholder does not match
        let err = find_declaration_range(POM, "com.google.guava", "guava", &Properties::new());
        assert!(matches!(err, Err(LocateError::DependencyNotFound { .. })));
    }

    #[test]
    fn test_managed_dependencies_are_not_declarations() {
        let err = find_declaration_range(POM, "org.example", "managed-only", &props()).unwrap_err();
        assert_eq!(err, LocateError::not_found("org.example", "managed-only"));
        assert!(!err.is_structural());
    }

    #[test]
    fn test_multiple_roots_is_structural_error() {
        let text = "<project><dependencies/></project>\n<project></project>";
        let err = find_declaration_range(text, "g", "a", &Properties::new()).unwrap_err();
        assert_eq!(err, LocateError::RootCount(2));
        assert!(err.is_structural());
        assert_eq!(err.to_string(), "only one root element is supported, found 2");
    }

    #[test]
    fn test_no_dependencies_section() {
        let err = find_declaration_range("<project/>", "g", "a", &Properties::new());
        assert!(matches!(err, Err(LocateError::DependencyNotFound { .. })));
    }

    #[test]
    fn test_located_while_later_text_is_half_typed() {
        let text = "<project><dependencies><dependency><groupId>g</groupId><artifactId>a</artifactId></dependency><depend";
        let range = find_declaration_range(text, "g", "a", &Properties::new()).unwrap();
        assert_eq!(&text[range.start..range.end], "<artifactId>a</artifactId>");
    }
}
