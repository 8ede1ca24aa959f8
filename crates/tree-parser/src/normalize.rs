//! Line normalization for the depgraph text format.
//!
//! The plugin draws the tree with `+- `, `\- ` and `|  ` groups. After
//! [`normalize_glyphs`] every branch is `+-` and continuation bars are blank,
//! so the column of the marker divided by [`INDENT_UNIT`] is the depth.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// Columns per depth level.
pub const INDENT_UNIT: usize = 3;

/// Branch marker after normalization.
pub const MARKER: &str = "+-";

static CONFLICT_RE: OnceLock<Regex> = OnceLock::new();

fn conflict_re() -> &'static Regex {
    CONFLICT_RE.get_or_init(|| {
        Regex::new(
            r"^(?P<head>[\s|+\\-]*)(?P<coordinates>[^\s(]+)(?P<gap>\s+)\(omitted for conflict: (?P<effective>[^)\s]+)\)",
        )
        .unwrap()
    })
}

/// Rewrite the glyph prefix of a line, leaving the coordinates untouched.
pub fn normalize_glyphs(line: &str) -> String {
    let body_start = line
        .char_indices()
        .find(|(_, c)| c.is_alphanumeric())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    let (prefix, body) = line.split_at(body_start);
    let mut out = prefix.replace("\\-", MARKER).replace('|', " ");
    out.push_str(body);
    out
}

/// Swap the requested and effective versions of a conflict line.
///
/// `g:a:1.0:compile (omitted for conflict: 2.0)` becomes
/// `g:a:2.0:compile (omitted for conflict with 1.0)`. Any other line,
/// including one already rewritten, is returned unchanged.
pub fn normalize_conflict(line: &str) -> Cow<'_, str> {
    let Some(caps) = conflict_re().captures(line) else {
        return Cow::Borrowed(line);
    };
    let coordinates = caps.name("coordinates").map_or("", |m| m.as_str());
    let mut parts: Vec<&str> = coordinates.split(':').collect();
    let Some(slot) = version_slot(parts.len()) else {
        return Cow::Borrowed(line);
    };
    let requested = parts[slot];
    parts[slot] = caps.name("effective").map_or("", |m| m.as_str());

    let end = caps.get(0).map_or(line.len(), |m| m.end());
    Cow::Owned(format!(
        "{}{}{}(omitted for conflict with {}){}",
        caps.name("head").map_or("", |m| m.as_str()),
        parts.join(":"),
        caps.name("gap").map_or(" ", |m| m.as_str()),
        requested,
        &line[end..],
    ))
}

/// Index of the version among `len` colon separated coordinate parts:
/// `g:a:v`, `g:a:v:scope` and `g:a:type[:classifier]:v:scope`.
fn version_slot(len: usize) -> Option<usize> {
    match len {
        3 | 4 => Some(2),
        n if n >= 5 => Some(n - 2),
        _ => None,
    }
}

/// Glyphs first, then the conflict rewrite.
pub fn normalize_line(line: &str) -> String {
    let line = normalize_glyphs(line);
    match normalize_conflict(&line) {
        Cow::Borrowed(_) => line,
        Cow::Owned(rewritten) => rewritten,
    }
}

/// Column of the branch marker in a normalized line.
pub fn marker_column(line: &str) -> Option<usize> {
    line.find(MARKER)
}
