//! Expected-diagnostic value model and the pairing of expectations with the
//! source fragments they apply to.

use std::path::Path;

use crate::analyze::Diagnostic;
use crate::error::{Error, Result};
use crate::marker::{self, MarkedFragment};
use crate::source::LineCol;

/// Expected position: optional document path plus 1-based start/end.
/// `path == None` means "match any document".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedSpan {
    pub path: Option<String>,
    pub start: LineCol,
    pub end: LineCol,
}

/// One expected diagnostic. `message == None` means "don't check the message
/// text"; `span == None` means "don't check the position".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedDiagnostic {
    pub id: String,
    pub message: Option<String>,
    pub span: Option<ExpectedSpan>,
}

impl ExpectedDiagnostic {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: None,
            span: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Expect the diagnostic at a point position in any document.
    #[must_use]
    pub fn at(mut self, line: usize, column: usize) -> Self {
        let position = LineCol::new(line, column);
        self.span = Some(ExpectedSpan {
            path: self.span.and_then(|span| span.path),
            start: position,
            end: position,
        });
        self
    }

    /// Expect the diagnostic to cover `start..end`.
    #[must_use]
    pub fn spanning(mut self, start: LineCol, end: LineCol) -> Self {
        self.span = Some(ExpectedSpan {
            path: self.span.and_then(|span| span.path),
            start,
            end,
        });
        self
    }

    /// Pin the expectation to one document.
    #[must_use]
    pub fn in_file(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.span = Some(match self.span {
            Some(mut span) => {
                span.path = Some(path);
                span
            }
            None => ExpectedSpan {
                path: Some(path),
                start: LineCol::new(1, 1),
                end: LineCol::new(1, 1),
            },
        });
        self
    }

    /// Build an expectation that exactly describes an actual diagnostic.
    #[must_use]
    pub fn from_actual(actual: &Diagnostic) -> Self {
        let mut expected = Self::new(actual.id.clone()).with_message(actual.message.clone());
        if let Some(location) = &actual.location {
            expected.span = Some(ExpectedSpan {
                path: Some(location.path.display().to_string()),
                start: location.start,
                end: location.end,
            });
        }
        expected
    }

    /// Id, then message if specified, then position if specified. The end
    /// position only participates when the expectation is not a point.
    #[must_use]
    pub fn matches(&self, actual: &Diagnostic) -> bool {
        if self.id != actual.id {
            return false;
        }
        if let Some(message) = &self.message {
            if *message != actual.message {
                return false;
            }
        }
        if let Some(span) = &self.span {
            let Some(location) = &actual.location else {
                return false;
            };
            if let Some(path) = &span.path {
                if Path::new(path) != location.path {
                    return false;
                }
            }
            if span.start != location.start {
                return false;
            }
            if span.start != span.end && span.end != location.end {
                return false;
            }
        }
        true
    }

    #[must_use]
    pub fn has_position(&self) -> bool {
        self.span.is_some()
    }
}

/// The unit of verifier input: expected diagnostics paired with the cleaned
/// source fragments. Positions come either from markers scanned out of the
/// code or from one explicit caller-supplied expectation — never both.
#[derive(Clone, Debug)]
pub struct DiagnosticsAndSources {
    pub expected: Vec<ExpectedDiagnostic>,
    pub code: Vec<String>,
}

impl DiagnosticsAndSources {
    /// Scan markers out of the fragments; one expected diagnostic per
    /// marker, pinned to the fragment it was found in.
    pub fn from_markers(id: &str, message: Option<&str>, code: &[&str]) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::setup("expected diagnostic id must not be empty"));
        }
        if code.is_empty() {
            return Err(Error::setup("at least one code fragment is required"));
        }
        let mut expected = Vec::new();
        let mut cleaned = Vec::with_capacity(code.len());
        for fragment in code {
            let parsed = MarkedFragment::parse(fragment);
            let file_name = marker::infer_file_name(&parsed.text);
            for position in &parsed.positions {
                let mut item = ExpectedDiagnostic::new(id)
                    .in_file(file_name.clone())
                    .at(position.line, position.column);
                if let Some(message) = message {
                    item = item.with_message(message);
                }
                expected.push(item);
            }
            cleaned.push(parsed.text);
        }
        if expected.is_empty() {
            return Err(Error::setup(
                "expected at least one error position indicated with '↓'",
            ));
        }
        Ok(Self {
            expected,
            code: cleaned,
        })
    }

    /// Pair explicit expectations with marker-free code.
    pub fn explicit(expected: Vec<ExpectedDiagnostic>, code: &[&str]) -> Result<Self> {
        if expected.is_empty() {
            return Err(Error::setup("at least one expected diagnostic is required"));
        }
        if code.is_empty() {
            return Err(Error::setup("at least one code fragment is required"));
        }
        if code.iter().any(|fragment| marker::contains_marker(fragment)) {
            return Err(Error::setup(
                "code contains '↓' markers and explicit expected diagnostics were supplied; \
                 positions must come from exactly one source",
            ));
        }
        if code.len() > 1 {
            if let Some(unpinned) = expected
                .iter()
                .find(|item| item.has_position() && item.span.as_ref().is_some_and(|s| s.path.is_none()))
            {
                return Err(Error::setup(format!(
                    "expected diagnostic `{}` has a position but no file path; with {} fragments \
                     every positioned expectation must name its document",
                    unpinned.id,
                    code.len()
                )));
            }
        }
        Ok(Self {
            expected,
            code: code.iter().map(|fragment| (*fragment).to_string()).collect(),
        })
    }

    pub fn code_refs(&self) -> Vec<&str> {
        self.code.iter().map(String::as_str).collect()
    }
}
