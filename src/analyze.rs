//! Diagnostic model, the analyzer extension-point contract, and the
//! analysis runner that drives analyzers over a synthesized solution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::source::{LineCol, Span};
use crate::workspace::{Document, Solution};

/// Severity of a reported diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }

    fn rank(self) -> u8 {
        match self {
            Severity::Error => 3,
            Severity::Warning => 2,
            Severity::Note => 1,
            Severity::Help => 0,
        }
    }

    /// The stronger of two severities.
    #[must_use]
    pub fn at_least(self, floor: Severity) -> Severity {
        if self.rank() >= floor.rank() {
            self
        } else {
            floor
        }
    }
}

/// Static description of one diagnostic an analyzer can produce, mirroring
/// the compiler's lint-descriptor tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiagnosticDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub default_severity: Severity,
    pub enabled_by_default: bool,
}

/// A resolved diagnostic location: document path, byte span, and the
/// corresponding line/column positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub span: Span,
    pub start: LineCol,
    pub end: LineCol,
}

impl Location {
    /// Resolve a byte span against a document. `None` when the span does not
    /// lie on character boundaries of the document text.
    #[must_use]
    pub fn in_document(document: &Document, span: Span) -> Option<Self> {
        let start = document.text.line_col(span.start)?;
        let end = document.text.line_col(span.end)?;
        Some(Self {
            path: document.path.clone(),
            span,
            start,
            end,
        })
    }
}

/// A diagnostic observed during analysis. Owned by the analysis result and
/// read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub location: Option<Location>,
    /// Suppression justification when a suppressor marked this diagnostic.
    pub suppression: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(id: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            severity,
            location: None,
            suppression: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppression.is_some()
    }
}

/// Effective per-id severity for one assertion call: every id supported by
/// the registered analyzer is raised to at least warning so that
/// disabled-by-default descriptors still surface, and suppressed ids are
/// dropped entirely.
#[derive(Clone, Debug, Default)]
pub struct SeverityConfig {
    configured: BTreeMap<String, Option<Severity>>,
}

impl SeverityConfig {
    #[must_use]
    pub fn for_analyzer(analyzer: &dyn Analyzer, settings: &Settings) -> Self {
        let mut configured = BTreeMap::new();
        for descriptor in analyzer.supported_diagnostics() {
            let effective = if settings.suppressed_ids.contains(descriptor.id) {
                None
            } else {
                Some(descriptor.default_severity.at_least(Severity::Warning))
            };
            configured.insert(descriptor.id.to_string(), effective);
        }
        Self { configured }
    }

    /// `None` means "suppressed". Ids absent from the configuration fall
    /// back to their declared default when enabled by default and stay
    /// silent otherwise; only the per-assertion raise in [`for_analyzer`]
    /// force-enables a disabled descriptor.
    ///
    /// [`for_analyzer`]: SeverityConfig::for_analyzer
    #[must_use]
    pub fn effective(&self, descriptor: &DiagnosticDescriptor) -> Option<Severity> {
        match self.configured.get(descriptor.id) {
            Some(configured) => *configured,
            None if descriptor.enabled_by_default => Some(descriptor.default_severity),
            None => None,
        }
    }
}

/// A pluggable component that inspects documents and reports diagnostics.
pub trait Analyzer {
    fn supported_diagnostics(&self) -> &[DiagnosticDescriptor];

    fn analyze(&self, ctx: &mut AnalysisContext<'_>);
}

/// Per-document callback context handed to analyzers. Enforces the host
/// contract: an analyzer may only report ids it declared in
/// `supported_diagnostics`.
pub struct AnalysisContext<'a> {
    document: &'a Document,
    supported: &'a [DiagnosticDescriptor],
    config: &'a SeverityConfig,
    diagnostics: Vec<Diagnostic>,
    violations: Vec<String>,
}

impl<'a> AnalysisContext<'a> {
    fn new(
        document: &'a Document,
        supported: &'a [DiagnosticDescriptor],
        config: &'a SeverityConfig,
    ) -> Self {
        Self {
            document,
            supported,
            config,
            diagnostics: Vec::new(),
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }

    pub fn report(
        &mut self,
        descriptor: &DiagnosticDescriptor,
        span: Span,
        message: impl Into<String>,
    ) {
        if !self.supported.iter().any(|d| d.id == descriptor.id) {
            self.violations.push(format!(
                "analyzer reported `{}` which is not in its supported diagnostics",
                descriptor.id
            ));
            return;
        }
        let Some(severity) = self.config.effective(descriptor) else {
            return;
        };
        let mut diagnostic = Diagnostic::new(descriptor.id, message, severity);
        if let Some(location) = Location::in_document(self.document, span) {
            diagnostic = diagnostic.with_location(location);
        } else {
            self.violations.push(format!(
                "analyzer reported `{}` with span {}..{} outside `{}`",
                descriptor.id,
                span.start,
                span.end,
                self.document.path.display()
            ));
            return;
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Diagnostics for one project, in document order.
#[derive(Clone, Debug)]
pub struct ProjectDiagnostics {
    pub project: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Flatten grouped diagnostics, preserving project order.
#[must_use]
pub fn flatten(grouped: Vec<ProjectDiagnostics>) -> Vec<Diagnostic> {
    grouped
        .into_iter()
        .flat_map(|project| project.diagnostics)
        .collect()
}

/// Sort diagnostics by (path, span start) for deterministic reporting.
pub fn sort_by_position(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        let key = |d: &Diagnostic| {
            d.location
                .as_ref()
                .map(|loc| (loc.path.clone(), loc.span.start, loc.span.end))
        };
        key(a).cmp(&key(b))
    });
}

/// Run one analyzer over every document of every project, preserving project
/// order.
pub fn analyzer_diagnostics(
    analyzer: &dyn Analyzer,
    solution: &Solution,
    settings: &Settings,
) -> Result<Vec<ProjectDiagnostics>> {
    let config = SeverityConfig::for_analyzer(analyzer, settings);
    let supported = analyzer.supported_diagnostics();
    let mut grouped = Vec::with_capacity(solution.projects.len());
    for project in &solution.projects {
        let mut diagnostics = Vec::new();
        for document in &project.documents {
            let mut ctx = AnalysisContext::new(document, supported, &config);
            analyzer.analyze(&mut ctx);
            if let Some(violation) = ctx.violations.first() {
                return Err(Error::setup(violation.clone()));
            }
            diagnostics.extend(ctx.diagnostics);
        }
        sort_by_position(&mut diagnostics);
        debug!(
            project = project.name.as_str(),
            count = diagnostics.len(),
            "analyzer pass complete"
        );
        grouped.push(ProjectDiagnostics {
            project: project.name.clone(),
            diagnostics,
        });
    }
    Ok(grouped)
}

/// Run the compiler host over every project. Suppressed ids are removed from
/// the result, matching the compilation-wide severity overrides.
pub fn compiler_diagnostics(
    solution: &Solution,
    settings: &Settings,
) -> Result<Vec<ProjectDiagnostics>> {
    let mut grouped = Vec::with_capacity(solution.projects.len());
    for project in &solution.projects {
        let Some(compilation) = settings.host().compile(project, &settings.compile) else {
            return Err(Error::internal(format!(
                "project `{}` produced no compilation",
                project.name
            )));
        };
        let mut diagnostics: Vec<Diagnostic> = compilation
            .diagnostics
            .into_iter()
            .filter(|diagnostic| !settings.suppressed_ids.contains(&diagnostic.id))
            .collect();
        sort_by_position(&mut diagnostics);
        grouped.push(ProjectDiagnostics {
            project: project.name.clone(),
            diagnostics,
        });
    }
    Ok(grouped)
}

/// The full diagnostic set per project: compiler diagnostics plus, when an
/// analyzer is given, its diagnostics. Used for no-regression checks after a
/// fix is applied.
pub fn all_diagnostics(
    analyzer: Option<&dyn Analyzer>,
    solution: &Solution,
    settings: &Settings,
) -> Result<Vec<ProjectDiagnostics>> {
    let mut grouped = compiler_diagnostics(solution, settings)?;
    if let Some(analyzer) = analyzer {
        let analyzer_grouped = analyzer_diagnostics(analyzer, solution, settings)?;
        for (all, extra) in grouped.iter_mut().zip(analyzer_grouped) {
            all.diagnostics.extend(extra.diagnostics);
            sort_by_position(&mut all.diagnostics);
        }
    }
    Ok(grouped)
}

/// The analyzer's single supported id, for entry points that let the id be
/// implied.
pub fn single_supported_id(analyzer: &dyn Analyzer) -> Result<&'static str> {
    match analyzer.supported_diagnostics() {
        [descriptor] => Ok(descriptor.id),
        [] => Err(Error::setup("analyzer supports no diagnostics")),
        many => Err(Error::setup(format!(
            "analyzer supports {} diagnostics ({}); pass expected diagnostics explicitly",
            many.len(),
            many.iter()
                .map(|d| d.id)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Whether the analyzer declares support for a diagnostic id.
#[must_use]
pub fn supports(analyzer: &dyn Analyzer, id: &str) -> bool {
    analyzer
        .supported_diagnostics()
        .iter()
        .any(|descriptor| descriptor.id == id)
}
