//! Marker-code reader: recovers expected-diagnostic positions from test
//! fragments and infers document names via lightweight lexical scanning.
//!
//! The heuristics here are deliberately not a parse; they only need enough
//! signal to name synthesized documents consistently.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::source::LineCol;

/// Reserved glyph marking "diagnostic expected here" in test fragments.
pub const MARKER: char = '↓';

/// File name used when a fragment declares no recognizable type.
pub const DEFAULT_FILE_NAME: &str = "Test.cl";

/// Namespace sentinel used when a fragment declares none.
pub const UNKNOWN_NAMESPACE: &str = "Unknown";

static TYPE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b(?:class|struct|enum|interface)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:<\s*([^<>]+?)\s*>)?")
        .unwrap()
});

static NAMESPACE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\bnamespace\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)").unwrap()
});

static ASSEMBLY_TITLE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"\[assembly:\s*AssemblyTitle\(\s*"([^"]+)"\s*\)\s*\]"#).unwrap()
});

/// Positions of every marker glyph, 1-based. A newline advances the line and
/// resets the column; every other character advances the column; the glyph
/// itself does not.
#[must_use]
pub fn extract_positions(text: &str) -> Vec<LineCol> {
    let mut positions = Vec::new();
    let mut line = 1;
    let mut column = 1;
    for ch in text.chars() {
        match ch {
            MARKER => positions.push(LineCol::new(line, column)),
            '\n' => {
                line += 1;
                column = 1;
            }
            _ => column += 1,
        }
    }
    positions
}

/// Remove every marker glyph.
#[must_use]
pub fn strip_markers(text: &str) -> String {
    text.chars().filter(|ch| *ch != MARKER).collect()
}

#[must_use]
pub fn contains_marker(text: &str) -> bool {
    text.contains(MARKER)
}

/// A fragment with its markers scanned out.
#[derive(Clone, Debug)]
pub struct MarkedFragment {
    /// The fragment with all marker glyphs removed.
    pub text: String,
    /// Line/column of each marker, in source order.
    pub positions: Vec<LineCol>,
    /// Byte offset of each marker within the stripped text.
    pub offsets: Vec<usize>,
}

impl MarkedFragment {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let positions = extract_positions(raw);
        let mut text = String::with_capacity(raw.len());
        let mut offsets = Vec::with_capacity(positions.len());
        for ch in raw.chars() {
            if ch == MARKER {
                offsets.push(text.len());
            } else {
                text.push(ch);
            }
        }
        Self {
            text,
            positions,
            offsets,
        }
    }

    /// The single marker position, enforcing the one-marker calling
    /// convention.
    pub fn single_position(&self) -> Result<LineCol> {
        match self.positions.as_slice() {
            [position] => Ok(*position),
            [] => Err(Error::setup(
                "expected one error position indicated with '↓', found none",
            )),
            many => Err(Error::setup(format!(
                "expected one error position indicated with '↓', found {}",
                many.len()
            ))),
        }
    }

    /// The single marker byte offset within the stripped text.
    pub fn single_offset(&self) -> Result<usize> {
        self.single_position()?;
        Ok(self.offsets[0])
    }
}

/// Infer a document file name from the first type declaration, falling back
/// to [`DEFAULT_FILE_NAME`]. Generic parameter lists are folded into the name
/// the way the compiler mangles metadata names: `Cache<TKey, TValue>` becomes
/// `Cache{TKey,TValue}.cl`.
#[must_use]
pub fn infer_file_name(text: &str) -> String {
    let Some(captures) = TYPE_DECLARATION.captures(text) else {
        return DEFAULT_FILE_NAME.to_string();
    };
    let name = &captures[1];
    match captures.get(2) {
        Some(parameters) => {
            let folded: Vec<&str> = parameters.as_str().split(',').map(str::trim).collect();
            format!("{name}{{{}}}.cl", folded.join(","))
        }
        None => format!("{name}.cl"),
    }
}

/// Infer the declared namespace: a `namespace` declaration first, then an
/// assembly-title attribute, then [`UNKNOWN_NAMESPACE`].
#[must_use]
pub fn infer_namespace(text: &str) -> String {
    if let Some(captures) = NAMESPACE_DECLARATION.captures(text) {
        return captures[1].to_string();
    }
    if let Some(captures) = ASSEMBLY_TITLE.captures(text) {
        return captures[1].to_string();
    }
    UNKNOWN_NAMESPACE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_positions_without_advancing_on_the_glyph() {
        let positions = extract_positions("class ↓C { }");
        assert_eq!(positions, vec![LineCol::new(1, 7)]);

        let positions = extract_positions("namespace N;\n\nclass C\n{\n    ↓int x;\n}\n");
        assert_eq!(positions, vec![LineCol::new(5, 5)]);
    }

    #[test]
    fn consecutive_markers_share_a_column() {
        let positions = extract_positions("a↓↓b");
        assert_eq!(
            positions,
            vec![LineCol::new(1, 2), LineCol::new(1, 2)],
            "the glyph must not advance the column counter"
        );
    }

    #[test]
    fn strip_removes_every_marker() {
        assert_eq!(strip_markers("class ↓C { }"), "class C { }");
        assert_eq!(strip_markers("no markers"), "no markers");
        let raw = "↓a↓b↓";
        assert_eq!(strip_markers(raw), "ab");
        assert_eq!(
            strip_markers(raw).len(),
            raw.len() - 3 * MARKER.len_utf8(),
            "length shrinks by the glyph count"
        );
    }

    #[test]
    fn marker_round_trip_reinserts_at_extracted_offsets() {
        let raw = "class ↓C\n{\n    ↓int x;\n}\n";
        let fragment = MarkedFragment::parse(raw);
        let mut rebuilt = fragment.text.clone();
        for offset in fragment.offsets.iter().rev() {
            rebuilt.insert(*offset, MARKER);
        }
        assert_eq!(rebuilt, raw);
    }

    #[test]
    fn single_position_enforces_the_one_marker_contract() {
        let none = MarkedFragment::parse("class C { }");
        let err = none.single_position().unwrap_err();
        assert!(err.is_setup(), "missing marker is a setup error: {err}");
        assert!(err.to_string().contains("found none"));

        let two = MarkedFragment::parse("↓class ↓C { }");
        let err = two.single_position().unwrap_err();
        assert!(err.to_string().contains("found 2"), "{err}");

        let one = MarkedFragment::parse("class ↓C { }");
        assert_eq!(one.single_position().unwrap(), LineCol::new(1, 7));
        assert_eq!(one.single_offset().unwrap(), 6);
    }

    #[test]
    fn infers_file_names_from_type_declarations() {
        assert_eq!(infer_file_name("class C { }"), "C.cl");
        assert_eq!(infer_file_name("public struct Point { }"), "Point.cl");
        assert_eq!(infer_file_name("enum Color { Red }"), "Color.cl");
        assert_eq!(infer_file_name("interface IGreeter { }"), "IGreeter.cl");
        assert_eq!(
            infer_file_name("class Cache<TKey, TValue> { }"),
            "Cache{TKey,TValue}.cl"
        );
        assert_eq!(infer_file_name("int x;"), DEFAULT_FILE_NAME);
    }

    #[test]
    fn first_declaration_wins() {
        let text = "namespace N;\n\nclass First { }\n\nclass Second { }\n";
        assert_eq!(infer_file_name(text), "First.cl");
    }

    #[test]
    fn infers_namespace_with_fallbacks() {
        assert_eq!(infer_namespace("namespace A.B.C;\nclass X { }"), "A.B.C");
        assert_eq!(
            infer_namespace("[assembly: AssemblyTitle(\"MyLib\")]\nclass X { }"),
            "MyLib"
        );
        assert_eq!(infer_namespace("class X { }"), UNKNOWN_NAMESPACE);
    }
}
