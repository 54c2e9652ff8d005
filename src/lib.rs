//! Assertion toolkit for testing Chic diagnostic analyzers, code-fix
//! providers, refactoring providers, and diagnostic suppressors.
//!
//! Test code marks expected diagnostic positions with the `↓` glyph; the
//! toolkit strips the markers, synthesizes an in-memory solution, runs the
//! component under test, and reconciles what it reported against what the
//! markers promised. Failures come back as [`error::Error`] values carrying
//! a full plain-text report, never as panics.
//!
//! ```
//! use chic_asserts::analyze::{AnalysisContext, Analyzer, DiagnosticDescriptor, Severity};
//! use chic_asserts::source::Span;
//!
//! const EMPTY_BODY: DiagnosticDescriptor = DiagnosticDescriptor {
//!     id: "DEMO001",
//!     title: "empty class body",
//!     category: "demo",
//!     default_severity: Severity::Warning,
//!     enabled_by_default: true,
//! };
//!
//! struct Demo;
//!
//! impl Analyzer for Demo {
//!     fn supported_diagnostics(&self) -> &[DiagnosticDescriptor] {
//!         std::slice::from_ref(&EMPTY_BODY)
//!     }
//!
//!     fn analyze(&self, ctx: &mut AnalysisContext<'_>) {
//!         if let Some(offset) = ctx.document().text.as_str().find("{ }") {
//!             ctx.report(&EMPTY_BODY, Span::new(offset, offset + 3), "empty body");
//!         }
//!     }
//! }
//!
//! chic_asserts::asserts::diagnostics(&Demo, &["class C ↓{ }"]).unwrap();
//! ```
#![deny(warnings)]
#![deny(clippy::all, clippy::pedantic, clippy::perf, clippy::suspicious)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod analyze;
pub mod asserts;
pub mod error;
pub mod expected;
pub mod fix;
pub mod host;
pub mod marker;
pub mod refactor;
pub mod settings;
pub mod source;
pub mod suppress;
pub mod verify;
pub mod workspace;

pub use error::{Error, Result};
pub use expected::ExpectedDiagnostic;
pub use settings::{AllowedCompilerDiagnostics, Settings};
