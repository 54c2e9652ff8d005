//! The public assertion surface. Every entry point comes in two flavors: a
//! short form running with `Settings::default()` and a `_with` form taking
//! explicit settings. All of them return `Err` instead of panicking so that
//! callers decide how a failed assertion surfaces.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::analyze::{self, Analyzer, Diagnostic};
use crate::error::{Error, Result};
use crate::expected::{DiagnosticsAndSources, ExpectedDiagnostic};
use crate::fix::{self, FixAllScope, FixProvider};
use crate::marker::{self, MarkedFragment};
use crate::refactor::{self, ActionSelection, RefactoringProvider};
use crate::settings::{AllowedCompilerDiagnostics, Settings};
use crate::source::Span;
use crate::suppress::{self, Suppressor};
use crate::verify;
use crate::workspace::Solution;

/// Assert that the analyzer reports exactly the diagnostics indicated by the
/// marker glyphs in `code`. The expected id is the analyzer's single
/// supported id.
pub fn diagnostics(analyzer: &dyn Analyzer, code: &[&str]) -> Result<()> {
    diagnostics_with(analyzer, code, &Settings::default())
}

pub fn diagnostics_with(analyzer: &dyn Analyzer, code: &[&str], settings: &Settings) -> Result<()> {
    let id = analyze::single_supported_id(analyzer)?;
    let input = DiagnosticsAndSources::from_markers(id, None, code)?;
    run_and_verify(analyzer, &input, settings)
}

/// Like [`diagnostics`], additionally checking every marked diagnostic's
/// message against `message`.
pub fn diagnostics_with_message(
    analyzer: &dyn Analyzer,
    message: &str,
    code: &[&str],
) -> Result<()> {
    diagnostics_with_message_and_settings(analyzer, message, code, &Settings::default())
}

pub fn diagnostics_with_message_and_settings(
    analyzer: &dyn Analyzer,
    message: &str,
    code: &[&str],
    settings: &Settings,
) -> Result<()> {
    let id = analyze::single_supported_id(analyzer)?;
    let input = DiagnosticsAndSources::from_markers(id, Some(message), code)?;
    run_and_verify(analyzer, &input, settings)
}

/// Assert against explicit expected diagnostics; `code` must carry no
/// markers.
pub fn diagnostics_match(
    analyzer: &dyn Analyzer,
    expected: Vec<ExpectedDiagnostic>,
    code: &[&str],
) -> Result<()> {
    diagnostics_match_with(analyzer, expected, code, &Settings::default())
}

pub fn diagnostics_match_with(
    analyzer: &dyn Analyzer,
    expected: Vec<ExpectedDiagnostic>,
    code: &[&str],
    settings: &Settings,
) -> Result<()> {
    for item in &expected {
        if !analyze::supports(analyzer, &item.id) {
            return Err(Error::setup(format!(
                "the analyzer does not support `{}`; supported ids: {}",
                item.id,
                supported_listing(analyzer)
            )));
        }
    }
    let input = DiagnosticsAndSources::explicit(expected, code)?;
    run_and_verify(analyzer, &input, settings)
}

/// Assert that the analyzer stays silent on `code`.
pub fn no_analyzer_diagnostics(analyzer: &dyn Analyzer, code: &[&str]) -> Result<()> {
    no_analyzer_diagnostics_with(analyzer, code, &Settings::default())
}

pub fn no_analyzer_diagnostics_with(
    analyzer: &dyn Analyzer,
    code: &[&str],
    settings: &Settings,
) -> Result<()> {
    let solution = synthesize_clean(code, settings)?;
    let actual = analyze::flatten(analyze::analyzer_diagnostics(analyzer, &solution, settings)?);
    verify::assert_no_diagnostics(&actual, &solution, "Expected no analyzer diagnostics, found:")
}

/// Assert that the analyzer stays silent and the code satisfies the compiler
/// diagnostic policy of the settings.
pub fn valid(analyzer: &dyn Analyzer, code: &[&str]) -> Result<()> {
    valid_with(analyzer, code, &Settings::default())
}

pub fn valid_with(analyzer: &dyn Analyzer, code: &[&str], settings: &Settings) -> Result<()> {
    let solution = synthesize_clean(code, settings)?;
    let actual = analyze::flatten(analyze::analyzer_diagnostics(analyzer, &solution, settings)?);
    verify::assert_no_diagnostics(&actual, &solution, "Expected no analyzer diagnostics, found:")?;
    let compiler = analyze::flatten(analyze::compiler_diagnostics(&solution, settings)?);
    let offending = disallowed(&compiler, settings);
    verify::assert_no_diagnostics(
        &offending,
        &solution,
        "The code does not satisfy the compiler diagnostic policy:",
    )
}

/// Assert that applying the provider's fix to the single marked diagnostic
/// yields `fixed_code`, without introducing new compiler diagnostics.
pub fn code_fix(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
) -> Result<()> {
    code_fix_with(analyzer, provider, code, fixed_code, None, &Settings::default())
}

pub fn code_fix_with(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
    title: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    ensure_fixable_overlap(analyzer, provider)?;
    let id = analyze::single_supported_id(analyzer)?;
    let input = DiagnosticsAndSources::from_markers(id, None, code)?;
    if input.expected.len() != 1 {
        return Err(Error::setup(format!(
            "expected exactly one error position indicated with '↓', found {}",
            input.expected.len()
        )));
    }
    let solution = Solution::synthesize(&input.code_refs(), settings)?;
    let before = analyze::flatten(analyze::compiler_diagnostics(&solution, settings)?);
    let actual = analyze::flatten(analyze::analyzer_diagnostics(analyzer, &solution, settings)?);
    verify::verify(&input.expected, &actual, &solution)?;

    let fixable = fix::fixable_diagnostics(analyzer, provider, &solution, settings)?;
    let Some(target) = fixable.first() else {
        return Err(Error::assertion(
            "The analyzer produced no diagnostic the fix provider can fix.",
        ));
    };
    debug!(id = target.id.as_str(), "applying single code fix");
    let fixed = fix::fix_single(provider, &solution, target, title)?;
    assert_fixed_code(&fixed, fixed_code)?;
    assert_no_new_compiler_diagnostics(&before, &fixed, settings)
}

/// Assert that the provider registers no action for any of the marked
/// diagnostics.
pub fn no_fix(analyzer: &dyn Analyzer, provider: &dyn FixProvider, code: &[&str]) -> Result<()> {
    no_fix_with(analyzer, provider, code, &Settings::default())
}

pub fn no_fix_with(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    settings: &Settings,
) -> Result<()> {
    ensure_fixable_overlap(analyzer, provider)?;
    let id = analyze::single_supported_id(analyzer)?;
    let input = DiagnosticsAndSources::from_markers(id, None, code)?;
    let solution = Solution::synthesize(&input.code_refs(), settings)?;
    let actual = analyze::flatten(analyze::analyzer_diagnostics(analyzer, &solution, settings)?);
    verify::verify(&input.expected, &actual, &solution)?;

    let fixable = fix::fixable_diagnostics(analyzer, provider, &solution, settings)?;
    let mut titles = Vec::new();
    for diagnostic in &fixable {
        let path = diagnostic_path(diagnostic)?;
        let actions = fix::discover(provider, &solution, &path, std::slice::from_ref(diagnostic))?;
        titles.extend(actions.into_iter().map(|action| action.title));
    }
    if titles.is_empty() {
        return Ok(());
    }
    titles.sort_unstable();
    Err(Error::assertion(format!(
        "Expected no code fix to be registered, found:\n{}",
        titles
            .iter()
            .map(|title| format!("  {title}"))
            .collect::<Vec<_>>()
            .join("\n")
    )))
}

/// Assert that fixing diagnostics one at a time, re-analyzing between
/// applications, converges on `fixed_code`.
pub fn fix_all(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
) -> Result<()> {
    fix_all_with(analyzer, provider, code, fixed_code, None, &Settings::default())
}

pub fn fix_all_with(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
    title: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    ensure_fixable_overlap(analyzer, provider)?;
    let id = analyze::single_supported_id(analyzer)?;
    let input = DiagnosticsAndSources::from_markers(id, None, code)?;
    let solution = Solution::synthesize(&input.code_refs(), settings)?;
    let before = analyze::flatten(analyze::compiler_diagnostics(&solution, settings)?);
    let actual = analyze::flatten(analyze::analyzer_diagnostics(analyzer, &solution, settings)?);
    verify::verify(&input.expected, &actual, &solution)?;

    let fixed = fix::fix_one_by_one(analyzer, provider, &solution, title, settings)?;
    assert_fixed_code(&fixed, fixed_code)?;
    assert_no_new_compiler_diagnostics(&before, &fixed, settings)
}

pub fn fix_all_in_document(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
) -> Result<()> {
    fix_all_by_scope(
        analyzer,
        provider,
        code,
        fixed_code,
        FixAllScope::Document,
        None,
        &Settings::default(),
    )
}

pub fn fix_all_in_project(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
) -> Result<()> {
    fix_all_by_scope(
        analyzer,
        provider,
        code,
        fixed_code,
        FixAllScope::Project,
        None,
        &Settings::default(),
    )
}

pub fn fix_all_in_solution(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
) -> Result<()> {
    fix_all_by_scope(
        analyzer,
        provider,
        code,
        fixed_code,
        FixAllScope::Solution,
        None,
        &Settings::default(),
    )
}

/// Assert that batched fixing over `scope` converges on `fixed_code`. Each
/// pass applies one batched operation covering every diagnostic whose
/// registered action shares the representative's equivalence key.
pub fn fix_all_by_scope(
    analyzer: &dyn Analyzer,
    provider: &dyn FixProvider,
    code: &[&str],
    fixed_code: &[&str],
    scope: FixAllScope,
    title: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    ensure_fixable_overlap(analyzer, provider)?;
    let id = analyze::single_supported_id(analyzer)?;
    let input = DiagnosticsAndSources::from_markers(id, None, code)?;
    let solution = Solution::synthesize(&input.code_refs(), settings)?;
    let before = analyze::flatten(analyze::compiler_diagnostics(&solution, settings)?);
    let actual = analyze::flatten(analyze::analyzer_diagnostics(analyzer, &solution, settings)?);
    verify::verify(&input.expected, &actual, &solution)?;

    let fixed = fix::fix_all_scope(analyzer, provider, &solution, scope, title, settings)?;
    assert_fixed_code(&fixed, fixed_code)?;
    assert_no_new_compiler_diagnostics(&before, &fixed, settings)
}

/// Assert that the single refactoring registered at the marked cursor
/// position transforms the document into `fixed_code`.
pub fn refactoring(
    provider: &dyn RefactoringProvider,
    code: &str,
    fixed_code: &str,
) -> Result<()> {
    refactoring_with(provider, code, fixed_code, ActionSelection::Unique, &Settings::default())
}

/// Select the refactoring by exact title.
pub fn refactoring_with_title(
    provider: &dyn RefactoringProvider,
    code: &str,
    fixed_code: &str,
    title: &str,
) -> Result<()> {
    refactoring_with(
        provider,
        code,
        fixed_code,
        ActionSelection::Title(title),
        &Settings::default(),
    )
}

/// Select the refactoring by zero-based registration index.
pub fn refactoring_at_index(
    provider: &dyn RefactoringProvider,
    code: &str,
    fixed_code: &str,
    index: usize,
) -> Result<()> {
    refactoring_with(
        provider,
        code,
        fixed_code,
        ActionSelection::Index(index),
        &Settings::default(),
    )
}

pub fn refactoring_with(
    provider: &dyn RefactoringProvider,
    code: &str,
    fixed_code: &str,
    selection: ActionSelection<'_>,
    settings: &Settings,
) -> Result<()> {
    if marker::contains_marker(fixed_code) {
        return Err(Error::setup("refactored code must not contain '↓' markers"));
    }
    let fragment = MarkedFragment::parse(code);
    let offset = fragment.single_offset()?;
    let solution = Solution::synthesize(&[fragment.text.as_str()], settings)?;
    let path = first_document_path(&solution);
    let actions = refactor::discover_at_position(provider, &solution, &path, offset)?;
    let action = refactor::select(actions, selection)?;
    let transformed = refactor::apply(&action, &solution)?;
    assert_fixed_code(&transformed, &[fixed_code])
}

/// Assert that the refactoring registered for the span delimited by the two
/// markers transforms the document into `fixed_code`. Unlike the cursor
/// form, discovery makes a single registration call covering exactly that
/// span, with no outward walk.
pub fn refactoring_at_span(
    provider: &dyn RefactoringProvider,
    code: &str,
    fixed_code: &str,
) -> Result<()> {
    refactoring_at_span_with(
        provider,
        code,
        fixed_code,
        ActionSelection::Unique,
        &Settings::default(),
    )
}

pub fn refactoring_at_span_with(
    provider: &dyn RefactoringProvider,
    code: &str,
    fixed_code: &str,
    selection: ActionSelection<'_>,
    settings: &Settings,
) -> Result<()> {
    if marker::contains_marker(fixed_code) {
        return Err(Error::setup("refactored code must not contain '↓' markers"));
    }
    let fragment = MarkedFragment::parse(code);
    let [start, end] = fragment.offsets.as_slice() else {
        return Err(Error::setup(format!(
            "expected two '↓' markers delimiting the refactoring span, found {}",
            fragment.offsets.len()
        )));
    };
    let span = Span::new(*start, *end);
    let solution = Solution::synthesize(&[fragment.text.as_str()], settings)?;
    let path = first_document_path(&solution);
    let actions = refactor::discover_at_span(provider, &solution, &path, span)?;
    let action = refactor::select(actions, selection)?;
    let transformed = refactor::apply(&action, &solution)?;
    assert_fixed_code(&transformed, &[fixed_code])
}

/// Assert that no refactoring is registered at the marked cursor position.
pub fn no_refactoring(provider: &dyn RefactoringProvider, code: &str) -> Result<()> {
    no_refactoring_with(provider, code, &Settings::default())
}

pub fn no_refactoring_with(
    provider: &dyn RefactoringProvider,
    code: &str,
    settings: &Settings,
) -> Result<()> {
    let fragment = MarkedFragment::parse(code);
    let offset = fragment.single_offset()?;
    let solution = Solution::synthesize(&[fragment.text.as_str()], settings)?;
    let path = first_document_path(&solution);
    let actions = refactor::discover_at_position(provider, &solution, &path, offset)?;
    if actions.is_empty() {
        return Ok(());
    }
    let mut titles: Vec<&str> = actions.iter().map(|action| action.title.as_str()).collect();
    titles.sort_unstable();
    Err(Error::assertion(format!(
        "Expected no refactoring to be registered, found:\n{}",
        titles
            .iter()
            .map(|title| format!("  {title}"))
            .collect::<Vec<_>>()
            .join("\n")
    )))
}

/// Assert that the suppressor suppresses every diagnostic it declares. A
/// baseline pass without the suppressor must produce those diagnostics
/// first.
pub fn suppressed(suppressor: &dyn Suppressor, code: &[&str]) -> Result<()> {
    suppressed_with(suppressor, code, &Settings::default())
}

pub fn suppressed_with(
    suppressor: &dyn Suppressor,
    code: &[&str],
    settings: &Settings,
) -> Result<()> {
    let solution = synthesize_clean(code, settings)?;
    suppress::baseline(suppressor, &solution, settings)?;
    let diagnostics = suppress::run(suppressor, &solution, settings)?;
    let unsuppressed: Vec<Diagnostic> = targets(suppressor, &diagnostics)
        .filter(|diagnostic| !diagnostic.is_suppressed())
        .cloned()
        .collect();
    verify::assert_no_diagnostics(
        &unsuppressed,
        &solution,
        "Expected every declared diagnostic to be suppressed, found unsuppressed:",
    )
}

/// Assert that the suppressor leaves its declared diagnostics alone on this
/// code. The baseline precondition still applies.
pub fn not_suppressed(suppressor: &dyn Suppressor, code: &[&str]) -> Result<()> {
    not_suppressed_with(suppressor, code, &Settings::default())
}

pub fn not_suppressed_with(
    suppressor: &dyn Suppressor,
    code: &[&str],
    settings: &Settings,
) -> Result<()> {
    let solution = synthesize_clean(code, settings)?;
    suppress::baseline(suppressor, &solution, settings)?;
    let diagnostics = suppress::run(suppressor, &solution, settings)?;
    let suppressed: Vec<Diagnostic> = targets(suppressor, &diagnostics)
        .filter(|diagnostic| diagnostic.is_suppressed())
        .cloned()
        .collect();
    verify::assert_no_diagnostics(
        &suppressed,
        &solution,
        "Expected no diagnostic to be suppressed, found:",
    )
}

fn targets<'a>(
    suppressor: &'a dyn Suppressor,
    diagnostics: &'a [Diagnostic],
) -> impl Iterator<Item = &'a Diagnostic> {
    diagnostics.iter().filter(move |diagnostic| {
        suppressor
            .suppressions()
            .iter()
            .any(|descriptor| descriptor.suppressed_id == diagnostic.id)
    })
}

fn run_and_verify(
    analyzer: &dyn Analyzer,
    input: &DiagnosticsAndSources,
    settings: &Settings,
) -> Result<()> {
    let solution = Solution::synthesize(&input.code_refs(), settings)?;
    let actual = analyze::flatten(analyze::analyzer_diagnostics(analyzer, &solution, settings)?);
    verify::verify(&input.expected, &actual, &solution)
}

fn synthesize_clean(code: &[&str], settings: &Settings) -> Result<Solution> {
    if code.iter().any(|fragment| marker::contains_marker(fragment)) {
        return Err(Error::setup(
            "code passed to a no-diagnostic assertion must not contain '↓' markers",
        ));
    }
    Solution::synthesize(code, settings)
}

fn supported_listing(analyzer: &dyn Analyzer) -> String {
    analyzer
        .supported_diagnostics()
        .iter()
        .map(|descriptor| descriptor.id)
        .collect::<Vec<_>>()
        .join(", ")
}

fn ensure_fixable_overlap(analyzer: &dyn Analyzer, provider: &dyn FixProvider) -> Result<()> {
    if provider
        .fixable_ids()
        .iter()
        .any(|id| analyze::supports(analyzer, id))
    {
        return Ok(());
    }
    Err(Error::setup(format!(
        "the fix provider fixes [{}] but the analyzer supports [{}]; they share no diagnostic id",
        provider.fixable_ids().join(", "),
        supported_listing(analyzer)
    )))
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

fn first_document_path(solution: &Solution) -> PathBuf {
    // Synthesis guarantees at least one document.
    solution
        .documents()
        .map(|document| document.path.clone())
        .next()
        .unwrap_or_default()
}

/// Compare the transformed solution against the expected after-code,
/// pairing fragments with documents by (namespace, file name) and falling
/// back to positional order when a fragment's identity changed.
fn assert_fixed_code(fixed: &Solution, expected_code: &[&str]) -> Result<()> {
    if expected_code.len() != fixed.document_count() {
        return Err(Error::setup(format!(
            "expected {} fixed fragments for {} documents",
            expected_code.len(),
            fixed.document_count()
        )));
    }
    let documents: Vec<_> = fixed.documents().collect();
    for (index, fragment) in expected_code.iter().enumerate() {
        if marker::contains_marker(fragment) {
            return Err(Error::setup("fixed code must not contain '↓' markers"));
        }
        let identity = (marker::infer_namespace(fragment), marker::infer_file_name(fragment));
        let document = documents
            .iter()
            .find(|document| {
                document.identity() == (identity.0.as_str(), identity.1.as_str())
            })
            .or_else(|| documents.get(index))
            .ok_or_else(|| Error::internal("document pairing failed"))?;
        let actual = document.text.as_str();
        if actual != *fragment {
            return Err(Error::assertion(code_diff(&document.name, fragment, actual)));
        }
    }
    Ok(())
}

fn code_diff(name: &str, expected: &str, actual: &str) -> String {
    let mut report = format!("Applying the fix did not produce the expected code for `{name}`.\n");
    for (number, (expected_line, actual_line)) in expected
        .lines()
        .map(Some)
        .chain(std::iter::repeat(None))
        .zip(actual.lines().map(Some).chain(std::iter::repeat(None)))
        .take_while(|(e, a)| e.is_some() || a.is_some())
        .enumerate()
    {
        if expected_line != actual_line {
            report.push_str(&format!(
                "Mismatch on line {}.\nExpected: {}\nActual:   {}\n",
                number + 1,
                expected_line.unwrap_or("<end of code>"),
                actual_line.unwrap_or("<end of code>")
            ));
            break;
        }
    }
    report.push_str(&format!("Expected:\n{expected}\nActual:\n{actual}"));
    report
}

/// Compiler diagnostics the fixed code may not introduce under the current
/// policy. Occurrences are budgeted per id against the pre-fix count, so a
/// fix that multiplies instances of a pre-existing diagnostic still fails.
/// Explicitly allowed ids are exempt.
fn assert_no_new_compiler_diagnostics(
    before: &[Diagnostic],
    fixed: &Solution,
    settings: &Settings,
) -> Result<()> {
    if settings.allowed_compiler_diagnostics == AllowedCompilerDiagnostics::WarningsAndErrors {
        return Ok(());
    }
    let after = analyze::flatten(analyze::compiler_diagnostics(fixed, settings)?);
    let mut carried: BTreeMap<&str, usize> = BTreeMap::new();
    for diagnostic in before {
        *carried.entry(diagnostic.id.as_str()).or_insert(0) += 1;
    }
    let new: Vec<Diagnostic> = after
        .into_iter()
        .filter(|diagnostic| match carried.get_mut(diagnostic.id.as_str()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .filter(|diagnostic| !settings.allowed_ids.contains(&diagnostic.id))
        .filter(|diagnostic| {
            settings.allowed_compiler_diagnostics == AllowedCompilerDiagnostics::None
                || diagnostic.severity.is_error()
        })
        .collect();
    verify::assert_no_diagnostics(
        &new,
        fixed,
        "Applying the fix introduced new compiler diagnostics:",
    )
}

fn disallowed(compiler: &[Diagnostic], settings: &Settings) -> Vec<Diagnostic> {
    compiler
        .iter()
        .filter(|diagnostic| !settings.allowed_ids.contains(&diagnostic.id))
        .filter(|diagnostic| match settings.allowed_compiler_diagnostics {
            AllowedCompilerDiagnostics::None => true,
            AllowedCompilerDiagnostics::Warnings => diagnostic.severity.is_error(),
            AllowedCompilerDiagnostics::WarningsAndErrors => false,
        })
        .cloned()
        .collect()
}
