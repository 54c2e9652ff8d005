//! Shared analyzers, fix providers, refactorings, and suppressors used by
//! the integration tests. They are deliberately small lexical components;
//! the toolkit under test treats them as black boxes.

#![allow(dead_code)]

use chic_asserts::analyze::{AnalysisContext, Analyzer, DiagnosticDescriptor, Severity};
use chic_asserts::fix::{CodeAction, FixContext, FixProvider, TextEdit, WorkspaceEdit};
use chic_asserts::refactor::{RefactoringContext, RefactoringProvider};
use chic_asserts::source::Span;
use chic_asserts::suppress::{SuppressionContext, SuppressionDescriptor, Suppressor};

pub const EMPTY_TYPE: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "EMPTY001",
    title: "type has no members",
    category: "design",
    default_severity: Severity::Warning,
    enabled_by_default: true,
};

/// Flags every `class X { }` declaration with an empty body, at the type
/// name.
pub struct EmptyTypeAnalyzer;

impl Analyzer for EmptyTypeAnalyzer {
    fn supported_diagnostics(&self) -> &[DiagnosticDescriptor] {
        std::slice::from_ref(&EMPTY_TYPE)
    }

    fn analyze(&self, ctx: &mut AnalysisContext<'_>) {
        let text = ctx.document().text.as_str().to_string();
        let mut search = 0;
        while let Some(found) = text[search..].find("class ") {
            let name_start = search + found + "class ".len();
            let name_end = name_start
                + text[name_start..]
                    .find(|ch: char| !ch.is_alphanumeric() && ch != '_')
                    .unwrap_or(text.len() - name_start);
            if text[name_end..].trim_start().starts_with("{ }") {
                let name = &text[name_start..name_end];
                ctx.report(
                    &EMPTY_TYPE,
                    Span::new(name_start, name_end),
                    format!("class '{name}' is empty"),
                );
            }
            search = name_end;
        }
    }
}

/// The empty body following a flagged type name, if any.
fn empty_body(text: &str, from: usize) -> Option<Span> {
    let relative = text[from..].find("{ }")?;
    Some(Span::new(from + relative, from + relative + "{ }".len()))
}

/// Replaces the empty body with a placeholder member.
pub struct InsertMemberFix;

impl FixProvider for InsertMemberFix {
    fn fixable_ids(&self) -> &[&'static str] {
        &["EMPTY001"]
    }

    fn register_fixes(&self, ctx: &mut FixContext<'_>) {
        let text = ctx.document().text.as_str().to_string();
        let path = ctx.document().path.clone();
        for diagnostic in ctx.diagnostics().to_vec() {
            let Some(location) = &diagnostic.location else {
                continue;
            };
            let Some(body) = empty_body(&text, location.span.end) else {
                continue;
            };
            let edit = WorkspaceEdit::new()
                .with_edit(&path, TextEdit::replace(body, "{ int placeholder; }"));
            ctx.register(
                CodeAction::new("Add placeholder member", edit)
                    .with_equivalence_key("add-placeholder"),
            );
        }
    }
}

/// Registers two differently titled fixes for the same diagnostic.
pub struct TwoTitleFix;

impl FixProvider for TwoTitleFix {
    fn fixable_ids(&self) -> &[&'static str] {
        &["EMPTY001"]
    }

    fn register_fixes(&self, ctx: &mut FixContext<'_>) {
        let text = ctx.document().text.as_str().to_string();
        let path = ctx.document().path.clone();
        for diagnostic in ctx.diagnostics().to_vec() {
            let Some(location) = &diagnostic.location else {
                continue;
            };
            let Some(body) = empty_body(&text, location.span.end) else {
                continue;
            };
            let a = WorkspaceEdit::new().with_edit(&path, TextEdit::replace(body, "{ int a; }"));
            let b = WorkspaceEdit::new().with_edit(&path, TextEdit::replace(body, "{ int b; }"));
            ctx.register(CodeAction::new("Fix A", a));
            ctx.register(CodeAction::new("Fix B", b));
        }
    }
}

/// Claims the id but never registers an action.
pub struct NoActionFix;

impl FixProvider for NoActionFix {
    fn fixable_ids(&self) -> &[&'static str] {
        &["EMPTY001"]
    }

    fn register_fixes(&self, _ctx: &mut FixContext<'_>) {}
}

/// Registers an action whose edit changes nothing.
pub struct NoProgressFix;

impl FixProvider for NoProgressFix {
    fn fixable_ids(&self) -> &[&'static str] {
        &["EMPTY001"]
    }

    fn register_fixes(&self, ctx: &mut FixContext<'_>) {
        if !ctx.diagnostics().is_empty() {
            ctx.register(CodeAction::new("Do nothing", WorkspaceEdit::new()));
        }
    }
}

/// Replaces the empty body with a member carrying trailing whitespace, so
/// the fixed code trips the compiler's style warning.
pub struct SloppyFix;

impl FixProvider for SloppyFix {
    fn fixable_ids(&self) -> &[&'static str] {
        &["EMPTY001"]
    }

    fn register_fixes(&self, ctx: &mut FixContext<'_>) {
        let text = ctx.document().text.as_str().to_string();
        let path = ctx.document().path.clone();
        for diagnostic in ctx.diagnostics().to_vec() {
            let Some(location) = &diagnostic.location else {
                continue;
            };
            let Some(body) = empty_body(&text, location.span.end) else {
                continue;
            };
            let edit =
                WorkspaceEdit::new().with_edit(&path, TextEdit::replace(body, "{ int x; } \n"));
            ctx.register(CodeAction::new("Add member, sloppily", edit));
        }
    }
}

fn lowercase_identifier(text: &str, span: Span) -> Option<&str> {
    let word = text.get(span.start..span.end)?;
    let first = word.chars().next()?;
    if first.is_lowercase() && word.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
        Some(word)
    } else {
        None
    }
}

/// Offers to uppercase the lowercase identifier under the cursor.
pub struct UppercaseRefactoring;

impl RefactoringProvider for UppercaseRefactoring {
    fn register(&self, ctx: &mut RefactoringContext<'_>) {
        let span = ctx.span();
        let text = ctx.document().text.as_str().to_string();
        let path = ctx.document().path.clone();
        let Some(word) = lowercase_identifier(&text, span) else {
            return;
        };
        let edit =
            WorkspaceEdit::new().with_edit(&path, TextEdit::replace(span, word.to_uppercase()));
        ctx.register(CodeAction::new("Uppercase name", edit));
    }
}

/// Offers two actions on the same identifier, forcing the caller to pick.
pub struct TwoRefactorings;

impl RefactoringProvider for TwoRefactorings {
    fn register(&self, ctx: &mut RefactoringContext<'_>) {
        let span = ctx.span();
        let text = ctx.document().text.as_str().to_string();
        let path = ctx.document().path.clone();
        let Some(word) = lowercase_identifier(&text, span) else {
            return;
        };
        let uppercase =
            WorkspaceEdit::new().with_edit(&path, TextEdit::replace(span, word.to_uppercase()));
        ctx.register(CodeAction::new("Uppercase name", uppercase));
        let prefixed = WorkspaceEdit::new().with_edit(&path, TextEdit::insert(span.start, "_"));
        ctx.register(CodeAction::new("Prefix with underscore", prefixed));
    }
}

pub const SUPPRESS_TRAILING: SuppressionDescriptor = SuppressionDescriptor {
    id: "SUP0001",
    suppressed_id: "CHC0002",
    justification: "trailing whitespace is tolerated after an ok-marker",
};

/// Suppresses trailing-whitespace warnings on lines ending in `// ok`.
pub struct OkMarkerSuppressor;

impl Suppressor for OkMarkerSuppressor {
    fn suppressions(&self) -> &[SuppressionDescriptor] {
        std::slice::from_ref(&SUPPRESS_TRAILING)
    }

    fn report_suppressions(&self, ctx: &mut SuppressionContext<'_>) {
        let flagged: Vec<usize> = ctx
            .candidates()
            .iter()
            .enumerate()
            .filter(|(_, diagnostic)| {
                diagnostic.location.as_ref().is_some_and(|location| {
                    ctx.document()
                        .text
                        .line(location.start.line)
                        .is_some_and(|line| line.trim_end().ends_with("// ok"))
                })
            })
            .map(|(index, _)| index)
            .collect();
        for index in flagged {
            ctx.suppress(index, &SUPPRESS_TRAILING);
        }
    }
}
