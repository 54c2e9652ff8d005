//! Refactoring engine: cursor-driven discovery of code actions, walking
//! outward through lexically enclosing scopes.

use std::path::Path;

use crate::error::{Error, Result};
use crate::fix::{self, CodeAction};
use crate::source::Span;
use crate::workspace::{Document, Solution};

/// A pluggable component that proposes transformations for a cursor
/// position or span, unconditioned on diagnostics.
pub trait RefactoringProvider {
    fn register(&self, ctx: &mut RefactoringContext<'_>);
}

/// Registration context: one document and the span under consideration.
pub struct RefactoringContext<'a> {
    document: &'a Document,
    span: Span,
    actions: Vec<CodeAction>,
}

impl<'a> RefactoringContext<'a> {
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }

    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn register(&mut self, action: CodeAction) {
        self.actions.push(action);
    }
}

/// How the caller picks among several registered refactorings.
#[derive(Clone, Copy, Debug)]
pub enum ActionSelection<'a> {
    /// Exactly one action must have been registered.
    Unique,
    /// Pick by exact title.
    Title(&'a str),
    /// Pick by zero-based registration index.
    Index(usize),
}

/// Walk from the most specific lexical element at `offset` outward through
/// enclosing scopes, registering once per scope and accumulating actions,
/// until a scope yields an action anchored at the queried position.
pub fn discover_at_position(
    provider: &dyn RefactoringProvider,
    solution: &Solution,
    path: &Path,
    offset: usize,
) -> Result<Vec<CodeAction>> {
    let document = solution.document(path).ok_or_else(|| {
        Error::internal(format!("no document at `{}`", path.display()))
    })?;
    let mut collected = Vec::new();
    for scope in enclosing_spans(document.text.as_str(), offset) {
        let mut ctx = RefactoringContext {
            document,
            span: scope,
            actions: Vec::new(),
        };
        provider.register(&mut ctx);
        let anchored = ctx
            .actions
            .iter()
            .any(|action| action_anchor(action, path) == Some(offset));
        collected.extend(ctx.actions);
        if anchored {
            break;
        }
    }
    Ok(collected)
}

/// Explicit-span discovery: a single registration call covering exactly the
/// given span.
pub fn discover_at_span(
    provider: &dyn RefactoringProvider,
    solution: &Solution,
    path: &Path,
    span: Span,
) -> Result<Vec<CodeAction>> {
    let document = solution.document(path).ok_or_else(|| {
        Error::internal(format!("no document at `{}`", path.display()))
    })?;
    let mut ctx = RefactoringContext {
        document,
        span,
        actions: Vec::new(),
    };
    provider.register(&mut ctx);
    Ok(ctx.actions)
}

/// Disambiguate refactoring actions. Unlike fixes, refactorings also allow
/// selection by index.
pub fn select(actions: Vec<CodeAction>, selection: ActionSelection<'_>) -> Result<CodeAction> {
    if actions.is_empty() {
        return Err(Error::assertion(
            "Expected a refactoring, but none was registered.",
        ));
    }
    match selection {
        ActionSelection::Unique => {
            if actions.len() == 1 {
                let mut actions = actions;
                Ok(actions.remove(0))
            } else {
                Err(Error::assertion(format!(
                    "More than one refactoring was registered; pass a title or index to disambiguate.\nRegistered refactorings:\n{}",
                    titles_listing(&actions)
                )))
            }
        }
        ActionSelection::Title(title) => {
            let mut matching: Vec<CodeAction> = actions
                .iter()
                .filter(|action| action.title == title)
                .cloned()
                .collect();
            match matching.len() {
                1 => Ok(matching.remove(0)),
                0 => Err(Error::assertion(format!(
                    "No refactoring with the title \"{title}\" was registered.\nRegistered refactorings:\n{}",
                    titles_listing(&actions)
                ))),
                _ => Err(Error::assertion(format!(
                    "{} refactorings share the title \"{title}\"; titles must disambiguate.",
                    matching.len()
                ))),
            }
        }
        ActionSelection::Index(index) => {
            if index < actions.len() {
                let mut actions = actions;
                Ok(actions.remove(index))
            } else {
                Err(Error::assertion(format!(
                    "Refactoring index {index} is out of range; {} registered.",
                    actions.len()
                )))
            }
        }
    }
}

/// Apply the chosen refactoring, yielding a new solution.
pub fn apply(action: &CodeAction, solution: &Solution) -> Result<Solution> {
    fix::apply(action, solution)
}

fn titles_listing(actions: &[CodeAction]) -> String {
    let mut titles: Vec<&str> = actions.iter().map(|action| action.title.as_str()).collect();
    titles.sort_unstable();
    titles
        .iter()
        .map(|title| format!("  {title}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn action_anchor(action: &CodeAction, path: &Path) -> Option<usize> {
    let edit = action.solution_edit().ok()?;
    edit.edits_for(path)
        .iter()
        .map(|edit| edit.span.start)
        .min()
}

/// Lexically enclosing spans at `offset`, innermost first: the identifier or
/// token under the cursor, then each enclosing delimiter region, then the
/// whole document. A best-effort outline, not a parse.
#[must_use]
pub fn enclosing_spans(text: &str, offset: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    if let Some(word) = word_span(text, offset) {
        spans.push(word);
    }
    let mut regions = delimiter_regions(text, offset);
    regions.sort_by_key(|span| span.len());
    spans.extend(regions);
    let whole = Span::new(0, text.len());
    if spans.last() != Some(&whole) {
        spans.push(whole);
    }
    spans.dedup();
    spans
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn word_span(text: &str, offset: usize) -> Option<Span> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let at = text[offset..].chars().next().filter(|ch| is_word_char(*ch))?;
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_word_char(*ch))
        .last()
        .map_or(offset, |(idx, _)| idx);
    let end = offset
        + at.len_utf8()
        + text[offset + at.len_utf8()..]
            .char_indices()
            .take_while(|(_, ch)| is_word_char(*ch))
            .last()
            .map_or(0, |(idx, ch)| idx + ch.len_utf8());
    Some(Span::new(start, end))
}

fn delimiter_regions(text: &str, offset: usize) -> Vec<Span> {
    let mut regions = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    for (idx, ch) in text.char_indices() {
        match ch {
            '{' | '(' | '[' => stack.push(idx),
            '}' | ')' | ']' => {
                if let Some(start) = stack.pop() {
                    let region = Span::new(start, idx + ch.len_utf8());
                    if region.contains(offset) {
                        regions.push(region);
                    }
                }
            }
            _ => {}
        }
    }
    regions
}
