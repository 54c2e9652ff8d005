//! Code actions, workspace edits, the fix-provider contract, and the three
//! fixing strategies: single-diagnostic, iterative one-by-one, and
//! scope-batched fix-all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::analyze::{self, Analyzer, Diagnostic};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::source::Span;
use crate::workspace::{Document, Solution};

/// One textual replacement inside a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    #[must_use]
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::point(offset), text)
    }

    #[must_use]
    pub fn delete(span: Span) -> Self {
        Self::replace(span, "")
    }
}

/// Edits grouped per document. Applying yields a new solution; the input
/// graph is never mutated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceEdit {
    changes: BTreeMap<PathBuf, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_edit(mut self, path: impl Into<PathBuf>, edit: TextEdit) -> Self {
        self.push(path, edit);
        self
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, edit: TextEdit) {
        self.changes.entry(path.into()).or_default().push(edit);
    }

    /// Fold another edit in, dropping exact duplicates so that several
    /// diagnostics proposing the same change batch into one operation.
    pub fn merge(&mut self, other: WorkspaceEdit) {
        for (path, edits) in other.changes {
            let entry = self.changes.entry(path).or_default();
            for edit in edits {
                if !entry.contains(&edit) {
                    entry.push(edit);
                }
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.values().all(Vec::is_empty)
    }

    /// Edits targeting one document.
    #[must_use]
    pub fn edits_for(&self, path: &Path) -> &[TextEdit] {
        self.changes.get(path).map_or(&[], Vec::as_slice)
    }

    /// Apply every edit, per document in descending position order so spans
    /// stay valid. Overlapping edits indicate a defect in the engine, not in
    /// the provider under test.
    pub fn apply(&self, solution: &Solution) -> Result<Solution> {
        let mut current = solution.clone();
        for (path, edits) in &self.changes {
            if edits.is_empty() {
                continue;
            }
            let document = current
                .document(path)
                .ok_or_else(|| {
                    Error::internal(format!("edit targets unknown document `{}`", path.display()))
                })?;
            let new_text = apply_to_text(document, edits, path)?;
            current = current.with_document_text(path, new_text)?;
        }
        Ok(current)
    }
}

fn apply_to_text(document: &Document, edits: &[TextEdit], path: &Path) -> Result<String> {
    let text = document.text.as_str();
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|edit| (edit.span.start, edit.span.end));
    for window in sorted.windows(2) {
        if window[0].span.end > window[1].span.start {
            return Err(Error::internal(format!(
                "overlapping edits in `{}`: {}..{} and {}..{}",
                path.display(),
                window[0].span.start,
                window[0].span.end,
                window[1].span.start,
                window[1].span.end
            )));
        }
    }
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in &sorted {
        let Some(prefix) = text.get(cursor..edit.span.start) else {
            return Err(Error::internal(format!(
                "edit span {}..{} is outside `{}`",
                edit.span.start,
                edit.span.end,
                path.display()
            )));
        };
        result.push_str(prefix);
        result.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    let Some(suffix) = text.get(cursor..) else {
        return Err(Error::internal(format!(
            "edit span ends past `{}`",
            path.display()
        )));
    };
    result.push_str(suffix);
    Ok(result)
}

/// What applying a code action does. Only `ApplyEdit` changes the solution.
#[derive(Clone, Debug)]
pub enum Operation {
    ApplyEdit(WorkspaceEdit),
    /// Host-side command with no effect on the solution (navigation,
    /// telemetry); not supported by the apply step.
    Command(String),
}

/// A remediation registered by a fix or refactoring provider. Created fresh
/// per analysis call and discarded after one use.
#[derive(Clone, Debug)]
pub struct CodeAction {
    pub title: String,
    pub equivalence_key: Option<String>,
    pub operations: Vec<Operation>,
}

impl CodeAction {
    #[must_use]
    pub fn new(title: impl Into<String>, edit: WorkspaceEdit) -> Self {
        Self {
            title: title.into(),
            equivalence_key: None,
            operations: vec![Operation::ApplyEdit(edit)],
        }
    }

    #[must_use]
    pub fn with_equivalence_key(mut self, key: impl Into<String>) -> Self {
        self.equivalence_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_command(mut self, name: impl Into<String>) -> Self {
        self.operations.push(Operation::Command(name.into()));
        self
    }

    /// Key used to group diagnostics fixable by "the same" remediation.
    #[must_use]
    pub fn batch_key(&self) -> &str {
        self.equivalence_key.as_deref().unwrap_or(&self.title)
    }

    /// The single solution-changing operation. Zero or several is a defect
    /// in the engine or a deliberate misuse of the action model.
    pub fn solution_edit(&self) -> Result<&WorkspaceEdit> {
        let mut edits = self.operations.iter().filter_map(|op| match op {
            Operation::ApplyEdit(edit) => Some(edit),
            Operation::Command(_) => None,
        });
        match (edits.next(), edits.next()) {
            (Some(edit), None) => Ok(edit),
            (None, _) => Err(Error::internal(format!(
                "code action `{}` registered no solution-changing operation",
                self.title
            ))),
            (Some(_), Some(_)) => Err(Error::internal(format!(
                "code action `{}` registered more than one solution-changing operation",
                self.title
            ))),
        }
    }
}

/// A pluggable component that proposes remediations for diagnostics.
pub trait FixProvider {
    /// Diagnostic ids this provider can fix.
    fn fixable_ids(&self) -> &[&'static str];

    fn register_fixes(&self, ctx: &mut FixContext<'_>);
}

/// Registration context: one document and the diagnostics targeted at it.
pub struct FixContext<'a> {
    document: &'a Document,
    diagnostics: &'a [Diagnostic],
    actions: Vec<CodeAction>,
}

impl<'a> FixContext<'a> {
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics
    }

    pub fn register(&mut self, action: CodeAction) {
        self.actions.push(action);
    }
}

/// Breadth over which a batched fix is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixAllScope {
    Document,
    Project,
    Solution,
}

impl FixAllScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FixAllScope::Document => "document",
            FixAllScope::Project => "project",
            FixAllScope::Solution => "solution",
        }
    }
}

/// Invoke the provider's registration callback for diagnostics in one
/// document, collecting every proposed action.
pub fn discover(
    provider: &dyn FixProvider,
    solution: &Solution,
    path: &Path,
    diagnostics: &[Diagnostic],
) -> Result<Vec<CodeAction>> {
    let document = solution.document(path).ok_or_else(|| {
        Error::internal(format!(
            "diagnostic targets unknown document `{}`",
            path.display()
        ))
    })?;
    let mut ctx = FixContext {
        document,
        diagnostics,
        actions: Vec::new(),
    };
    provider.register_fixes(&mut ctx);
    Ok(ctx.actions)
}

/// Disambiguate the discovered actions: exact title when one was supplied,
/// otherwise the single registered action.
pub fn select(actions: Vec<CodeAction>, title: Option<&str>) -> Result<CodeAction> {
    if actions.is_empty() {
        return Err(Error::assertion(
            "Expected a code fix, but none was registered.",
        ));
    }
    match title {
        Some(title) => {
            let mut matching: Vec<CodeAction> = actions
                .iter()
                .filter(|action| action.title == title)
                .cloned()
                .collect();
            match matching.len() {
                1 => Ok(matching.remove(0)),
                0 => Err(Error::assertion(format!(
                    "No code fix with the title \"{title}\" was registered.\nRegistered fixes:\n{}",
                    titles_listing(&actions)
                ))),
                _ => Err(Error::assertion(format!(
                    "{} code fixes share the title \"{title}\"; titles must disambiguate.",
                    matching.len()
                ))),
            }
        }
        None => {
            if actions.len() == 1 {
                let mut actions = actions;
                Ok(actions.remove(0))
            } else {
                Err(Error::assertion(format!(
                    "More than one code fix was registered; pass a fix title to disambiguate.\nRegistered fixes:\n{}",
                    titles_listing(&actions)
                )))
            }
        }
    }
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

/// Apply the chosen action's single solution-changing operation.
pub fn apply(action: &CodeAction, solution: &Solution) -> Result<Solution> {
    debug!(title = action.title.as_str(), "applying code action");
    action.solution_edit()?.apply(solution)
}

/// Analyzer diagnostics the provider can fix, sorted by source position.
pub fn fixable_diagnostics(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    solution: &Solution,
    settings: &Settings,
) -> Result<Vec<Diagnostic>> {
    let grouped = analyze::analyzer_diagnostics(analyzer, solution, settings)?;
    let mut fixable: Vec<Diagnostic> = analyze::flatten(grouped)
        .into_iter()
        .filter(|diagnostic| provider.fixable_ids().contains(&diagnostic.id.as_str()))
        .collect();
    analyze::sort_by_position(&mut fixable);
    Ok(fixable)
}

fn diagnostic_path(diagnostic: &Diagnostic) -> Result<PathBuf> {
    diagnostic
        .location
        .as_ref()
        .map(|location| location.path.clone())
        .ok_or_else(|| {
            Error::internal(format!(
                "fixable diagnostic `{}` has no location",
                diagnostic.id
            ))
        })
}

/// Single strategy: discover, disambiguate, and apply one action for one
/// target diagnostic.
pub fn fix_single(
    provider: &dyn FixProvider,
    solution: &Solution,
    diagnostic: &Diagnostic,
    title: Option<&str>,
) -> Result<Solution> {
    let path = diagnostic_path(diagnostic)?;
    let actions = discover(provider, solution, &path, std::slice::from_ref(diagnostic))?;
    let action = select(actions, title)?;
    apply(&action, solution)
}

/// One-by-one strategy: fix the first fixable diagnostic, re-analyze,
/// repeat. A pass that fails to shrink the fixable set while it is still
/// non-empty means the fix makes no progress and fails hard.
pub fn fix_one_by_one(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    solution: &Solution,
    title: Option<&str>,
    settings: &Settings,
) -> Result<Solution> {
    let mut current = solution.clone();
    let mut previous_count: Option<usize> = None;
    loop {
        let fixable = fixable_diagnostics(analyzer, provider, &current, settings)?;
        if fixable.is_empty() {
            return Ok(current);
        }
        if let Some(previous) = previous_count {
            if fixable.len() >= previous {
                return Err(Error::assertion(format!(
                    "The fix did not make progress: {} fixable diagnostics remain after fixing one by one.",
                    fixable.len()
                )));
            }
        }
        previous_count = Some(fixable.len());
        current = fix_single(provider, &current, &fixable[0], title)?;
    }
}

/// Scope-batch strategy: one batched operation per pass over the scope,
/// restricted to diagnostics whose registered action shares the
/// representative action's equivalence key, repeated to the fixed point.
pub fn fix_all_scope(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    solution: &Solution,
    scope: FixAllScope,
    title: Option<&str>,
    settings: &Settings,
) -> Result<Solution> {
    let mut current = solution.clone();
    let mut previous_count: Option<usize> = None;
    loop {
        let fixable = fixable_diagnostics(analyzer, provider, &current, settings)?;
        if fixable.is_empty() {
            return Ok(current);
        }
        if let Some(previous) = previous_count {
            if fixable.len() >= previous {
                return Err(Error::assertion(format!(
                    "The batch fix over the {} scope did not make progress: {} fixable diagnostics remain.",
                    scope.as_str(),
                    fixable.len()
                )));
            }
        }
        previous_count = Some(fixable.len());

        let representative = &fixable[0];
        let representative_path = diagnostic_path(representative)?;
        let actions = discover(
            provider,
            &current,
            &representative_path,
            std::slice::from_ref(representative),
        )?;
        let chosen = select(actions, title)?;
        let key = chosen.batch_key().to_string();
        let scope_paths = paths_in_scope(&current, scope, &representative_path)?;

        let mut batched = WorkspaceEdit::new();
        for diagnostic in &fixable {
            let path = diagnostic_path(diagnostic)?;
            if !scope_paths.contains(&path) {
                continue;
            }
            let candidates = discover(provider, &current, &path, std::slice::from_ref(diagnostic))?;
            let Some(compatible) = candidates
                .into_iter()
                .find(|action| action.batch_key() == key)
            else {
                continue;
            };
            batched.merge(compatible.solution_edit()?.clone());
        }
        if batched.is_empty() {
            return Err(Error::assertion(format!(
                "The batch fix over the {} scope produced no edits for \"{}\".",
                scope.as_str(),
                chosen.title
            )));
        }
        debug!(scope = scope.as_str(), key = key.as_str(), "applying batched fix");
        current = batched.apply(&current)?;
    }
}

fn paths_in_scope(
    solution: &Solution,
    scope: FixAllScope,
    representative: &Path,
) -> Result<Vec<PathBuf>> {
    match scope {
        FixAllScope::Document => Ok(vec![representative.to_path_buf()]),
        FixAllScope::Project => {
            let project = solution
                .projects
                .iter()
                .find(|project| project.document(representative).is_some())
                .ok_or_else(|| {
                    Error::internal(format!(
                        "no project contains `{}`",
                        representative.display()
                    ))
                })?;
            Ok(project
                .documents
                .iter()
                .map(|document| document.path.clone())
                .collect())
        }
        FixAllScope::Solution => Ok(solution
            .documents()
            .map(|document| document.path.clone())
            .collect()),
    }
}
