//! # tree-parser
//!
//! Run the depgraph Maven plugin and rebuild its text dependency tree.
//!
//! ## Overview
//!
//! - **normalize**: glyph cleanup and the conflict annotation rewrite
//! - **parser**: indentation driven reconstruction of the forest
//! - **tree**: the arena with forest queries (roots, paths, conflicts,
//!   "jump to effective version")
//! - **runner**: the maven subprocess, one invocation per pom at a time
//!
//! Conflict lines are rewritten before the tree is built so that a conflict
//! node carries the version maven kept as its `version`, and the version the
//! path asked for as `requested_version`:
//!
//! ```text
//! com.x:lib:1.0:compile (omitted for conflict: 2.0)
//! com.x:lib:2.0:compile (omitted for conflict with 1.0)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use tree_parser::{MavenRunner, RunnerConfig};
//! use std::path::Path;
//!
//! let runner = MavenRunner::new(RunnerConfig::default());
//! let output = runner.resolve(Path::new("/project/pom.xml")).await?;
//!
//! for conflict in &output.conflicts {
//!     let node = output.tree.node(*conflict);
//!     let root = output.tree.node(node.root());
//!     println!("{} brings {} {:?}", root.artifact_id, node.full_artifact_name, node.requested_version);
//! }
//! ```
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `parse_dependency_tree()` | O(lines · depth) |
//! | `node()`, `parent()`, `root_of()` | O(1) |
//! | `path_to()`, `depth()` | O(depth) |
//! | `find_effective()`, `versions_of()` | O(n) |

mod error;
mod node;
mod normalize;
mod parser;
mod runner;
mod tree;

pub use error::TreeError;
pub use node::{DependencyNode, NodeId, OmittedKind, OmittedStatus};
pub use normalize::{normalize_conflict, normalize_glyphs, INDENT_UNIT};
pub use parser::{parse_dependency_tree, DependencyTreeOutput};
pub use runner::{
    run_depgraph, MavenRunner, RunnerConfig, SingleFlight, DEFAULT_DEPGRAPH_VERSION,
};
pub use tree::DependencyTree;
