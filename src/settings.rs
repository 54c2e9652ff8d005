//! Explicit, caller-constructed configuration passed into every entry point.
//! There is no process-wide mutable state; a fresh `Settings::default()` is
//! always a valid starting point.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::host::{Host, SyntaxHost};

/// A linked library the synthesized project references.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LibraryReference {
    pub name: String,
}

impl LibraryReference {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Compiler options forwarded to the host untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub language_version: Option<String>,
    pub defines: Vec<String>,
}

/// Which compiler diagnostics a fixed solution is allowed to introduce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AllowedCompilerDiagnostics {
    /// The fixed code must introduce no new compiler diagnostics at all.
    #[default]
    None,
    /// New warnings are tolerated, new errors are not.
    Warnings,
    /// Both are tolerated; the caller has waived the no-regression check.
    WarningsAndErrors,
}

/// Per-call configuration: suppressed diagnostic ids, library references,
/// compile options, the no-regression policy, and the compiler host.
#[derive(Clone)]
pub struct Settings {
    pub suppressed_ids: BTreeSet<String>,
    pub references: Vec<LibraryReference>,
    pub compile: CompileOptions,
    pub allowed_compiler_diagnostics: AllowedCompilerDiagnostics,
    /// Compiler diagnostic ids exempt from the no-regression check even when
    /// the policy is `None`.
    pub allowed_ids: BTreeSet<String>,
    host: Arc<dyn Host>,
}

impl Settings {
    #[must_use]
    pub fn with_suppressed_id(mut self, id: impl Into<String>) -> Self {
        self.suppressed_ids.insert(id.into());
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: LibraryReference) -> Self {
        self.references.push(reference);
        self
    }

    #[must_use]
    pub fn with_compile_options(mut self, compile: CompileOptions) -> Self {
        self.compile = compile;
        self
    }

    #[must_use]
    pub fn with_allowed_compiler_diagnostics(
        mut self,
        allowed: AllowedCompilerDiagnostics,
    ) -> Self {
        self.allowed_compiler_diagnostics = allowed;
        self
    }

    #[must_use]
    pub fn with_allowed_id(mut self, id: impl Into<String>) -> Self {
        self.allowed_ids.insert(id.into());
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            suppressed_ids: BTreeSet::new(),
            references: Vec::new(),
            compile: CompileOptions::default(),
            allowed_compiler_diagnostics: AllowedCompilerDiagnostics::default(),
            allowed_ids: BTreeSet::new(),
            host: Arc::new(SyntaxHost),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("suppressed_ids", &self.suppressed_ids)
            .field("references", &self.references)
            .field("compile", &self.compile)
            .field(
                "allowed_compiler_diagnostics",
                &self.allowed_compiler_diagnostics,
            )
            .field("allowed_ids", &self.allowed_ids)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_accumulate() {
        let settings = Settings::default()
            .with_suppressed_id("CHC0002")
            .with_reference(LibraryReference::new("Std"))
            .with_allowed_id("CHC0100");
        assert!(settings.suppressed_ids.contains("CHC0002"));
        assert_eq!(settings.references[0].name, "Std");
        assert!(settings.allowed_ids.contains("CHC0100"));
        assert_eq!(
            settings.allowed_compiler_diagnostics,
            AllowedCompilerDiagnostics::None
        );
    }

    #[test]
    fn compile_options_deserialize_with_defaults() {
        let options: CompileOptions =
            serde_yaml::from_str("language_version: \"1.2\"").expect("valid yaml");
        assert_eq!(options.language_version.as_deref(), Some("1.2"));
        assert!(options.defines.is_empty());
    }
}
