//! Text edits for the conflict quick fixes.
//!
//! Every builder returns a single [`ByteEdit`] against the text it was given,
//! or `None` when the pom already says what the edit would write.

use std::borrow::Cow;

use quick_xml::escape::escape;

use crate::error::LocateError;
use crate::locator::find_declaration;
use crate::pom::{managed_dependencies, project_element, Properties};
use crate::xml::{ByteRange, ElementId, XmlDocument};

const DEFAULT_INDENT_UNIT: &str = "    ";

/// Replace `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteEdit {
    pub range: ByteRange,
    pub new_text: String,
}

impl ByteEdit {
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + self.new_text.len());
        out.push_str(&text[..self.range.start]);
        out.push_str(&self.new_text);
        out.push_str(&text[self.range.end..]);
        out
    }
}

/// One line of an element snippet, `depth` levels below the snippet root.
type Line = (usize, String);

fn leaf(depth: usize, tag: &str, value: &str) -> Line {
    (depth, format!("<{tag}>{}</{tag}>", escape(value)))
}

fn wrap(tag: &str, inner: Vec<Line>) -> Vec<Line> {
    let mut lines = vec![(0, format!("<{tag}>"))];
    lines.extend(inner.into_iter().map(|(d, l)| (d + 1, l)));
    lines.push((0, format!("</{tag}>")));
    lines
}

fn coordinates(group_id: &str, artifact_id: &str) -> Vec<Line> {
    vec![
        leaf(0, "groupId", group_id),
        leaf(0, "artifactId", artifact_id),
    ]
}

/// Pin `group_id:artifact_id` to `version` in `<dependencyManagement>`.
///
/// An existing managed entry gets its version rewritten (or added), otherwise
/// a new entry is appended, creating the enclosing sections when missing.
pub fn set_dependency_version(
    text: &str,
    group_id: &str,
    artifact_id: &str,
    version: &str,
) -> Result<Option<ByteEdit>, LocateError> {
    let doc = XmlDocument::parse(text);
    let project = project_element(&doc)?;
    let properties = Properties::from_document(&doc);
    let writer = EditWriter::new(text, &doc, project);

    let managed = managed_dependencies(&doc, project)
        .into_iter()
        .find(|d| d.matches(group_id, artifact_id, &properties));
    if let Some(managed) = managed {
        if let Some(current) = &managed.version {
            if properties.resolve(current) == version {
                return Ok(None);
            }
        }
        let edit = match managed.version_element.map(|e| doc.get(e)) {
            Some(element) => ByteEdit {
                range: element.content_range().unwrap_or(element.range()),
                new_text: match element.content_range() {
                    Some(_) => escape(version).into_owned(),
                    None => leaf(0, "version", version).1,
                },
            },
            None => writer.append_child(managed.element, vec![leaf(0, "version", version)]),
        };
        return Ok(Some(edit));
    }

    let mut entry = coordinates(group_id, artifact_id);
    entry.push(leaf(0, "version", version));
    let entry = wrap("dependency", entry);

    let edit = match doc.child_by_tag(project, "dependencyManagement") {
        Some(dm) => match doc.child_by_tag(dm, "dependencies") {
            Some(deps) => writer.append_child(deps, entry),
            None => writer.append_child(dm, wrap("dependencies", entry)),
        },
        None => writer.append_child(
            project,
            wrap("dependencyManagement", wrap("dependencies", entry)),
        ),
    };
    Ok(Some(edit))
}

/// Add an `<exclusion>` of `group_id:artifact_id` to the direct dependency
/// `root_group_id:root_artifact_id`.
pub fn exclude_dependency(
    text: &str,
    root_group_id: &str,
    root_artifact_id: &str,
    properties: &Properties,
    group_id: &str,
    artifact_id: &str,
) -> Result<Option<ByteEdit>, LocateError> {
    let doc = XmlDocument::parse(text);
    let project = project_element(&doc)?;
    let root = find_declaration(&doc, project, root_group_id, root_artifact_id, properties)?;
    let writer = EditWriter::new(text, &doc, project);
    let exclusion = wrap("exclusion", coordinates(group_id, artifact_id));

    let Some(exclusions) = doc.child_by_tag(root.element, "exclusions") else {
        return Ok(Some(
            writer.append_child(root.element, wrap("exclusions", exclusion)),
        ));
    };
    let already = doc.children_by_tag(exclusions, "exclusion").any(|e| {
        doc.child_text(e, "groupId")
            .is_some_and(|g| properties.resolve(g) == group_id)
            && doc
                .child_text(e, "artifactId")
                .is_some_and(|a| properties.resolve(a) == artifact_id)
    });
    if already {
        return Ok(None);
    }
    Ok(Some(writer.append_child(exclusions, exclusion)))
}

/// Renders snippets with the indentation style of the document.
struct EditWriter<'a> {
    text: &'a str,
    doc: &'a XmlDocument,
    unit: Cow<'a, str>,
}

impl<'a> EditWriter<'a> {
    fn new(text: &'a str, doc: &'a XmlDocument, project: ElementId) -> Self {
        let unit = indent_unit(text, doc, project);
        Self { text, doc, unit }
    }

    /// Insert `lines` as the last child of `parent`.
    fn append_child(&self, parent: ElementId, lines: Vec<Line>) -> ByteEdit {
        let element = self.doc.get(parent);
        let parent_indent = line_indent(self.text, element.start);
        let child_indent = format!("{parent_indent}{}", self.unit);
        let body: String = lines
            .iter()
            .map(|(depth, line)| format!("\n{child_indent}{}{line}", self.unit.repeat(*depth)))
            .collect();

        match element.content_end {
            Some(content_end) => {
                // swallow the whitespace before the closing tag and re-indent it
                let content_start = element.content_start.unwrap_or(content_end);
                let trimmed = self.text[content_start..content_end].trim_end().len();
                ByteEdit {
                    range: ByteRange::new(content_start + trimmed, content_end),
                    new_text: format!("{body}\n{parent_indent}"),
                }
            }
            None => {
                let tag = &element.tag_name;
                ByteEdit {
                    range: element.range(),
                    new_text: format!("<{tag}>{body}\n{parent_indent}</{tag}>"),
                }
            }
        }
    }
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..];
    let len = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..len.min(offset - line_start)]
}

/// The extra indentation of the project's first child, 4 spaces if unknown.
fn indent_unit<'a>(text: &'a str, doc: &XmlDocument, project: ElementId) -> Cow<'a, str> {
    let outer = line_indent(text, doc.get(project).start);
    doc.get(project)
        .children()
        .first()
        .map(|c| line_indent(text, doc.get(*c).start))
        .and_then(|inner| inner.strip_prefix(outer))
        .filter(|unit| !unit.is_empty())
        .map(Cow::Borrowed)
        .unwrap_or(Cow::Borrowed(DEFAULT_INDENT_UNIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = "<project>
  <artifactId>app</artifactId>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>root</artifactId>
      <version>1.0</version>
    </dependency>
  </dependencies>
</project>
";

    #[test]
    fn test_set_version_creates_dependency_management() {
        let edit = set_dependency_version(POM, "com.lib", "core", "2.0")
            .unwrap()
            .unwrap();
        let updated = edit.apply(POM);
        assert!(updated.ends_with(
            "  </dependencies>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.lib</groupId>
        <artifactId>core</artifactId>
        <version>2.0</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>
"
        ));
    }

    #[test]
    fn test_set_version_rewrites_managed_version() {
        let text = "<project>
    <dependencyManagement>
        <dependencies>
            <dependency>
                <groupId>com.lib</groupId>
                <artifactId>core</artifactId>
                <version>1.0</version>
            </dependency>
        </dependencies>
    </dependencyManagement>
</project>";
        let edit = set_dependency_version(text, "com.lib", "core", "2.0")
            .unwrap()
            .unwrap();
        assert_eq!(edit.new_text, "2.0");
        assert_eq!(edit.apply(text), text.replace("1.0", "2.0"));

        assert_eq!(set_dependency_version(text, "com.lib", "core", "1.0"), Ok(None));
    }

    #[test]
    fn test_set_version_adds_missing_version_element() {
        let text = "<project>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.lib</groupId>
        <artifactId>core</artifactId>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>";
        let updated = set_dependency_version(text, "com.lib", "core", "2.0")
            .unwrap()
            .unwrap()
            .apply(text);
        assert!(updated.contains(
            "        <artifactId>core</artifactId>
        <version>2.0</version>
      </dependency>"
        ));
    }

    #[test]
    fn test_set_version_into_self_closing_section() {
        let text = "<project>\n  <dependencyManagement/>\n</project>";
        let updated = set_dependency_version(text, "g", "a", "1")
            .unwrap()
            .unwrap()
            .apply(text);
        assert_eq!(
            updated,
            "<project>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>g</groupId>
        <artifactId>a</artifactId>
        <version>1</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>"
        );
    }

    #[test]
    fn test_exclude_creates_exclusions() {
        let edit = exclude_dependency(POM, "org.example", "root", &Properties::new(), "com.lib", "core")
            .unwrap()
            .unwrap();
        let updated = edit.apply(POM);
        assert!(updated.contains(
            "      <version>1.0</version>
      <exclusions>
        <exclusion>
          <groupId>com.lib</groupId>
          <artifactId>core</artifactId>
        </exclusion>
      </exclusions>
    </dependency>"
        ));
    }

    #[test]
    fn test_exclude_appends_to_existing_exclusions() {
        let text = "<project>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>root</artifactId>
      <exclusions>
        <exclusion>
          <groupId>x</groupId>
          <artifactId>y</artifactId>
        </exclusion>
      </exclusions>
    </dependency>
  </dependencies>
</project>";
        let props = Properties::new();
        let updated = exclude_dependency(text, "org.example", "root", &props, "com.lib", "core")
            .unwrap()
            .unwrap()
            .apply(text);
        assert!(updated.contains(
            "        </exclusion>
        <exclusion>
          <groupId>com.lib</groupId>
          <artifactId>core</artifactId>
        </exclusion>
      </exclusions>"
        ));

        assert_eq!(
            exclude_dependency(text, "org.example", "root", &props, "x", "y"),
            Ok(None)
        );
    }

    #[test]
    fn test_exclude_from_undeclared_root() {
        let err = exclude_dependency(POM, "nope", "root", &Properties::new(), "g", "a");
        assert_eq!(err, Err(LocateError::not_found("nope", "root")));
    }

    #[test]
    fn test_indent_unit_detection() {
        let doc = XmlDocument::parse(POM);
        let project = project_element(&doc).unwrap();
        assert_eq!(indent_unit(POM, &doc, project), "  ");

        let flat = "<project><dependencies/></project>";
        let doc = XmlDocument::parse(flat);
        let project = project_element(&doc).unwrap();
        assert_eq!(indent_unit(flat, &doc, project), DEFAULT_INDENT_UNIT);
    }
}
