//! Reconciliation of expected vs. actual diagnostics, and the plain-text
//! mismatch reports surfaced to the test author.

use std::fmt::Write as _;
use std::path::Path;

use crate::analyze::Diagnostic;
use crate::error::{Error, Result};
use crate::expected::{ExpectedDiagnostic, ExpectedSpan};
use crate::source::LineCol;
use crate::workspace::{Document, Solution};

/// Bipartite existential match: every actual diagnostic must match at least
/// one expectation and every expectation must match at least one actual
/// diagnostic. No optimal assignment is attempted when cardinalities differ.
pub fn verify(
    expected: &[ExpectedDiagnostic],
    actual: &[Diagnostic],
    solution: &Solution,
) -> Result<()> {
    let every_actual_matched = actual
        .iter()
        .all(|diagnostic| expected.iter().any(|item| item.matches(diagnostic)));
    let every_expected_matched = expected
        .iter()
        .all(|item| actual.iter().any(|diagnostic| item.matches(diagnostic)));
    if every_actual_matched && every_expected_matched {
        return Ok(());
    }

    if let [item] = expected {
        if let [diagnostic] = actual {
            if positions_agree(item, diagnostic) && messages_differ(item, diagnostic) {
                return Err(Error::assertion(message_diff(item, diagnostic)));
            }
        }
    }

    Err(Error::assertion(mismatch_report(expected, actual, solution)))
}

/// Fail with a listing of every diagnostic when any are present.
pub fn assert_no_diagnostics(
    actual: &[Diagnostic],
    solution: &Solution,
    heading: &str,
) -> Result<()> {
    if actual.is_empty() {
        return Ok(());
    }
    let mut report = String::from(heading);
    report.push('\n');
    push_actual_listing(&mut report, actual, solution);
    Err(Error::assertion(report))
}

fn positions_agree(expected: &ExpectedDiagnostic, actual: &Diagnostic) -> bool {
    if expected.id != actual.id {
        return false;
    }
    let positional = ExpectedDiagnostic {
        message: None,
        ..expected.clone()
    };
    positional.matches(actual)
}

fn messages_differ(expected: &ExpectedDiagnostic, actual: &Diagnostic) -> bool {
    expected
        .message
        .as_ref()
        .is_some_and(|message| *message != actual.message)
}

fn message_diff(expected: &ExpectedDiagnostic, actual: &Diagnostic) -> String {
    let expected_message = expected.message.as_deref().unwrap_or_default();
    format!(
        "Expected and actual diagnostic messages do not match.\nExpected: {expected_message}\nActual:   {}",
        actual.message
    )
}

/// The generic dual-listing report: sorted expected items with source
/// context, sorted actual items with severity-qualified messages.
#[must_use]
pub fn mismatch_report(
    expected: &[ExpectedDiagnostic],
    actual: &[Diagnostic],
    solution: &Solution,
) -> String {
    let mut report = String::from("Expected and actual diagnostics do not match.\nExpected:\n");
    let mut expected_sorted: Vec<&ExpectedDiagnostic> = expected.iter().collect();
    expected_sorted.sort_by_key(|item| {
        item.span
            .as_ref()
            .map(|span| (span.path.clone(), span.start))
    });
    if expected_sorted.is_empty() {
        report.push_str("  (none)\n");
    }
    for item in expected_sorted {
        push_expected_item(&mut report, item, solution);
    }
    report.push_str("Actual:\n");
    push_actual_listing(&mut report, actual, solution);
    report
}

fn push_expected_item(report: &mut String, item: &ExpectedDiagnostic, solution: &Solution) {
    let _ = write!(report, "  {}", item.id);
    if let Some(span) = &item.span {
        let _ = write!(report, " at {}:{}", span_path(span), span.start);
    }
    if let Some(message) = &item.message {
        let _ = write!(report, ": {message}");
    }
    report.push('\n');
    if let Some(span) = &item.span {
        if let Some(document) = locate(solution, span.path.as_deref()) {
            push_context(report, document, span.start, span.end);
        }
    }
}

fn push_actual_listing(report: &mut String, actual: &[Diagnostic], _solution: &Solution) {
    if actual.is_empty() {
        report.push_str("  (none)\n");
        return;
    }
    let mut sorted: Vec<&Diagnostic> = actual.iter().collect();
    sorted.sort_by_key(|diagnostic| {
        diagnostic
            .location
            .as_ref()
            .map(|location| (location.path.clone(), location.span))
    });
    for diagnostic in sorted {
        let _ = write!(
            report,
            "  {} {}: {}",
            diagnostic.severity.as_str(),
            diagnostic.id,
            diagnostic.message
        );
        if let Some(location) = &diagnostic.location {
            let _ = write!(report, " at {}:{}", location.path.display(), location.start);
        }
        if let Some(justification) = &diagnostic.suppression {
            let _ = write!(report, " (suppressed: {justification})");
        }
        report.push('\n');
    }
}

fn span_path(span: &ExpectedSpan) -> &str {
    span.path.as_deref().unwrap_or("<any>")
}

fn locate<'a>(solution: &'a Solution, path: Option<&str>) -> Option<&'a Document> {
    match path {
        Some(path) => solution.document(Path::new(path)),
        None => {
            let mut documents = solution.documents();
            let first = documents.next();
            // Ambiguous without a path unless there is exactly one document.
            documents.next().is_none().then_some(first).flatten()
        }
    }
}

fn push_context(report: &mut String, document: &Document, start: LineCol, end: LineCol) {
    let Some(line) = document.text.line(start.line) else {
        return;
    };
    let line = line.trim_end_matches('\n');
    let _ = writeln!(report, "    {line}");
    let caret_count = if end.line == start.line && end.column > start.column {
        end.column - start.column
    } else {
        1
    };
    let _ = writeln!(
        report,
        "    {}{}",
        " ".repeat(start.column.saturating_sub(1)),
        "^".repeat(caret_count)
    );
}
