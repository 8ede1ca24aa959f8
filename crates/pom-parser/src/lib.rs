//! # pom-parser
//!
//! Positioned parsing of Maven `pom.xml` buffers.
//!
//! The XML parser keeps byte offsets for every element so editor features
//! (diagnostics, hover, quick fixes) can map dependency coordinates back to
//! the text the user is typing. It is tolerant: half-typed tags, unmatched
//! closing tags and truncated buffers produce a partial tree, never an error.
//!
//! ## Overview
//!
//! - **xml**: tokenizer and arena backed element tree with offsets
//! - **pom**: properties, `<dependency>` declarations, offset lookups
//! - **locator**: coordinates → `<artifactId>` range of a direct dependency
//! - **edit**: quick fix edits (pin a version, add an exclusion)
//! - **line_index**: byte offsets ↔ LSP positions
//!
//! ## Example
//!
//! ```ignore
//! use pom_parser::{find_declaration_range, LineIndex, Properties, XmlDocument};
//!
//! let doc = XmlDocument::parse(text);
//! let properties = Properties::from_document(&doc);
//! let range = find_declaration_range(text, "com.google.guava", "guava", &properties)?;
//! let lsp_range = LineIndex::new(text).range(range);
//! ```
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `XmlDocument::parse()` | O(n) |
//! | `find_node_at_offset()` | O(depth · log(children)) |
//! | `find_elements_by_tag()` | O(elements) |
//! | `find_declaration_range()` | O(n) |

mod edit;
mod error;
mod line_index;
mod locator;
mod pom;
pub mod xml;

pub use edit::{exclude_dependency, set_dependency_version, ByteEdit};
pub use error::LocateError;
pub use line_index::LineIndex;
pub use locator::{find_declaration, find_declaration_range, locate_in_document};
pub use pom::{
    declared_dependencies, dependency_at_offset, managed_dependencies, project_element,
    PomDependency, Properties,
};
pub use xml::{ByteRange, ElementId, XmlDocument, XmlElement};
