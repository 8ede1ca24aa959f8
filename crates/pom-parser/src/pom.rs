//! Maven specific queries over a parsed [`XmlDocument`].

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::LocateError;
use crate::xml::{ElementId, XmlDocument};

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap())
}

/// Nested placeholders are resolved at most this many times.
const MAX_RESOLVE_ROUNDS: usize = 8;

/// Property values used to resolve `${name}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Collect `<properties>` plus the `project.*` coordinates of the first
    /// `<project>` element.
    ///
    /// `project.groupId` and `project.version` fall back to the `<parent>`
    /// values, every `project.*` name is also available as `pom.*`.
    pub fn from_document(doc: &XmlDocument) -> Self {
        let mut properties = Self::new();
        let Some(project) = doc
            .top_level()
            .iter()
            .copied()
            .find(|id| doc.get(*id).tag_name == "project")
        else {
            return properties;
        };

        if let Some(props) = doc.child_by_tag(project, "properties") {
            for child in doc.get(props).children() {
                let element = doc.get(*child);
                let value = element.text.as_ref().map(|t| t.value.clone()).unwrap_or_default();
                properties.insert(element.tag_name.clone(), value);
            }
        }

        let parent = doc.child_by_tag(project, "parent");
        for field in ["groupId", "artifactId", "version"] {
            let Some(value) = parent.and_then(|p| doc.child_text(p, field)) else {
                continue;
            };
            properties.insert(format!("project.parent.{field}"), value);
            properties.insert(format!("pom.parent.{field}"), value);
        }

        for field in ["groupId", "artifactId", "version"] {
            let own = doc.child_text(project, field);
            let inherited = match field {
                "artifactId" => None,
                _ => parent.and_then(|p| doc.child_text(p, field)),
            };
            let Some(value) = own.or(inherited) else {
                continue;
            };
            properties.insert(format!("project.{field}"), value);
            properties.insert(format!("pom.{field}"), value);
        }

        properties
    }

    /// Replace known `${name}` placeholders, leaving unknown ones untouched.
    pub fn resolve(&self, raw: &str) -> String {
        let mut current = raw.to_string();
        for _ in 0..MAX_RESOLVE_ROUNDS {
            if !current.contains("${") {
                break;
            }
            let next = placeholder_re()
                .replace_all(&current, |caps: &Captures| {
                    self.get(&caps[1])
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

/// A `<dependency>` declaration with its raw (unresolved) coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDependency {
    pub element: ElementId,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub artifact_id_element: Option<ElementId>,
    pub version_element: Option<ElementId>,
}

impl PomDependency {
    pub fn from_element(doc: &XmlDocument, element: ElementId) -> Self {
        let artifact_id_element = doc.child_by_tag(element, "artifactId");
        let version_element = doc.child_by_tag(element, "version");
        Self {
            element,
            group_id: doc.child_text(element, "groupId").map(str::to_string),
            artifact_id: artifact_id_element
                .and_then(|e| doc.text_of(e))
                .map(str::to_string),
            version: version_element.and_then(|e| doc.text_of(e)).map(str::to_string),
            scope: doc.child_text(element, "scope").map(str::to_string),
            artifact_id_element,
            version_element,
        }
    }

    /// Whether the resolved coordinates equal `group_id:artifact_id`.
    pub fn matches(&self, group_id: &str, artifact_id: &str, properties: &Properties) -> bool {
        let (Some(g), Some(a)) = (&self.group_id, &self.artifact_id) else {
            return false;
        };
        properties.resolve(g) == group_id && properties.resolve(a) == artifact_id
    }
}

/// The single top-level element of a project descriptor.
pub fn project_element(doc: &XmlDocument) -> Result<ElementId, LocateError> {
    match doc.top_level() {
        [project] => Ok(*project),
        roots => Err(LocateError::RootCount(roots.len())),
    }
}

/// `project/dependencies/dependency` declarations.
pub fn declared_dependencies(doc: &XmlDocument, project: ElementId) -> Vec<PomDependency> {
    doc.child_by_tag(project, "dependencies")
        .map(|deps| dependencies_in(doc, deps))
        .unwrap_or_default()
}

/// `project/dependencyManagement/dependencies/dependency` declarations.
pub fn managed_dependencies(doc: &XmlDocument, project: ElementId) -> Vec<PomDependency> {
    doc.child_by_tag(project, "dependencyManagement")
        .and_then(|dm| doc.child_by_tag(dm, "dependencies"))
        .map(|deps| dependencies_in(doc, deps))
        .unwrap_or_default()
}

fn dependencies_in(doc: &XmlDocument, list: ElementId) -> Vec<PomDependency> {
    doc.children_by_tag(list, "dependency")
        .map(|d| PomDependency::from_element(doc, d))
        .collect()
}

/// The `<dependency>` enclosing `offset`, if any.
pub fn dependency_at_offset(doc: &XmlDocument, offset: usize) -> Option<PomDependency> {
    let node = doc.find_node_at_offset(offset)?;
    let dependency = doc.ancestor_by_tag(node, "dependency")?;
    Some(PomDependency::from_element(doc, dependency))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<project>
  <parent>
    <groupId>com.parent</groupId>
    <artifactId>parent-pom</artifactId>
    <version>7</version>
  </parent>
  <artifactId>app</artifactId>
  <properties>
    <lib.version>1.2</lib.version>
    <lib.group>com.lib</lib.group>
    <nested>${lib.version}-SNAPSHOT</nested>
  </properties>
  <dependencies>
    <dependency>
      <groupId>${lib.group}</groupId>
      <artifactId>core</artifactId>
      <version>${lib.version}</version>
      <scope>test</scope>
    </dependency>
    <dependency>
      <groupId>${project.groupId}</groupId>
      <artifactId>sibling</artifactId>
    </dependency>
  </dependencies>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.managed</groupId>
        <artifactId>bom</artifactId>
        <version>3</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>"#;

    #[test]
    fn test_properties_from_document() {
        let doc = XmlDocument::parse(POM);
        let props = Properties::from_document(&doc);
        assert_eq!(props.get("lib.version"), Some("1.2"));
        assert_eq!(props.get("project.groupId"), Some("com.parent"));
        assert_eq!(props.get("project.artifactId"), Some("app"));
        assert_eq!(props.get("project.version"), Some("7"));
        assert_eq!(props.get("pom.version"), Some("7"));
        assert_eq!(props.get("project.parent.artifactId"), Some("parent-pom"));
    }

    #[test]
    fn test_resolve_placeholders() {
        let doc = XmlDocument::parse(POM);
        let props = Properties::from_document(&doc);
        assert_eq!(props.resolve("${lib.group}"), "com.lib");
        assert_eq!(props.resolve("${nested}"), "1.2-SNAPSHOT");
        assert_eq!(props.resolve("${unknown}"), "${unknown}");
        assert_eq!(props.resolve("plain"), "plain");
    }

    #[test]
    fn test_resolve_self_reference_terminates() {
        let mut props = Properties::new();
        props.insert("a", "${a}");
        assert_eq!(props.resolve("${a}"), "${a}");
    }

    #[test]
    fn test_declared_and_managed_dependencies() {
        let doc = XmlDocument::parse(POM);
        let project = project_element(&doc).unwrap();
        let props = Properties::from_document(&doc);

        let declared = declared_dependencies(&doc, project);
        assert_eq!(declared.len(), 2);
        assert_eq!(declared[0].scope.as_deref(), Some("test"));
        assert!(declared[0].matches("com.lib", "core", &props));
        assert!(declared[1].matches("com.parent", "sibling", &props));
        assert!(!declared[1].matches("com.parent", "core", &props));

        let managed = managed_dependencies(&doc, project);
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].version.as_deref(), Some("3"));
    }

    #[test]
    fn test_project_element_requires_single_root() {
        let doc = XmlDocument::parse("<project/><project/>");
        assert_eq!(project_element(&doc), Err(LocateError::RootCount(2)));
        let doc = XmlDocument::parse("");
        assert_eq!(project_element(&doc), Err(LocateError::RootCount(0)));
    }

    #[test]
    fn test_dependency_at_offset() {
        let doc = XmlDocument::parse(POM);
        let offset = POM.find("sibling").unwrap();
        let dep = dependency_at_offset(&doc, offset).unwrap();
        assert_eq!(dep.artifact_id.as_deref(), Some("sibling"));

        let offset = POM.find("parent-pom").unwrap();
        assert!(dependency_at_offset(&doc, offset).is_none());
    }
}
