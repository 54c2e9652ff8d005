//! The compiler seam. The real semantic engine is an external collaborator;
//! this trait captures the one contract the toolkit relies on: given a
//! project, produce the compiler's own diagnostics.

use crate::analyze::{Diagnostic, DiagnosticDescriptor, Location, Severity};
use crate::settings::CompileOptions;
use crate::source::Span;
use crate::workspace::{Document, Project};

/// Result of compiling one project.
#[derive(Clone, Debug, Default)]
pub struct Compilation {
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles a project and reports the compiler's native diagnostics.
///
/// Returning `None` signals that no compilation could be produced at all; the
/// analysis runner treats that as an internal invariant violation, since a
/// synthesized project must always compile to *something*.
pub trait Host: Send + Sync {
    fn compile(&self, project: &Project, options: &CompileOptions) -> Option<Compilation>;
}

/// Diagnostic for an unbalanced `{`, `(`, or `[`.
pub const UNBALANCED_DELIMITER: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "CHC0001",
    title: "unbalanced delimiter",
    category: "syntax",
    default_severity: Severity::Error,
    enabled_by_default: true,
};

/// Diagnostic for trailing whitespace at the end of a line.
pub const TRAILING_WHITESPACE: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "CHC0002",
    title: "trailing whitespace",
    category: "style",
    default_severity: Severity::Warning,
    enabled_by_default: true,
};

/// Default host: lexical well-formedness checks only. Enough to exercise the
/// no-regression invariant and the suppression runner without the full
/// semantic engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntaxHost;

impl Host for SyntaxHost {
    fn compile(&self, project: &Project, _options: &CompileOptions) -> Option<Compilation> {
        if project.documents.is_empty() {
            return None;
        }
        let mut diagnostics = Vec::new();
        for document in &project.documents {
            check_delimiters(document, &mut diagnostics);
            check_trailing_whitespace(document, &mut diagnostics);
        }
        Some(Compilation { diagnostics })
    }
}

fn closer_for(open: char) -> char {
    match open {
        '{' => '}',
        '(' => ')',
        _ => ']',
    }
}

fn check_delimiters(document: &Document, diagnostics: &mut Vec<Diagnostic>) {
    let text = document.text.as_str();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut in_string = false;
    let mut in_comment = false;
    while let Some((offset, ch)) = chars.next() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            match ch {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '/' if matches!(chars.peek(), Some((_, '/'))) => in_comment = true,
            '{' | '(' | '[' => stack.push((ch, offset)),
            '}' | ')' | ']' => match stack.pop() {
                Some((open, _)) if closer_for(open) == ch => {}
                mismatch => {
                    report_delimiter(
                        document,
                        diagnostics,
                        Span::new(offset, offset + ch.len_utf8()),
                        format!("unexpected `{ch}`"),
                    );
                    if let Some(entry) = mismatch {
                        stack.push(entry);
                    }
                }
            },
            _ => {}
        }
    }
    for (open, offset) in stack {
        report_delimiter(
            document,
            diagnostics,
            Span::new(offset, offset + open.len_utf8()),
            format!("unclosed `{open}`"),
        );
    }
}

fn report_delimiter(
    document: &Document,
    diagnostics: &mut Vec<Diagnostic>,
    span: Span,
    message: String,
) {
    let mut diagnostic = Diagnostic::new(
        UNBALANCED_DELIMITER.id,
        message,
        UNBALANCED_DELIMITER.default_severity,
    );
    if let Some(location) = Location::in_document(document, span) {
        diagnostic = diagnostic.with_location(location);
    }
    diagnostics.push(diagnostic);
}

fn check_trailing_whitespace(document: &Document, diagnostics: &mut Vec<Diagnostic>) {
    for line_number in 1..=document.text.line_count() {
        let Some((start, end)) = document.text.line_bounds(line_number) else {
            continue;
        };
        let Some(line) = document.text.line(line_number) else {
            continue;
        };
        let content = line.trim_end_matches('\n');
        let trimmed = content.trim_end_matches([' ', '\t']);
        if trimmed.len() == content.len() || content.trim().is_empty() {
            continue;
        }
        let span = Span::new(start + trimmed.len(), start + content.len());
        debug_assert!(span.end <= end);
        let mut diagnostic = Diagnostic::new(
            TRAILING_WHITESPACE.id,
            "trailing whitespace",
            TRAILING_WHITESPACE.default_severity,
        );
        if let Some(location) = Location::in_document(document, span) {
            diagnostic = diagnostic.with_location(location);
        }
        diagnostics.push(diagnostic);
    }
}
