//! In-memory solution model: one project per assertion call, one document
//! per source fragment. The graph is immutable; every edit returns a new
//! graph and never mutates the old one in place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::marker::{infer_file_name, infer_namespace};
use crate::settings::{LibraryReference, Settings};
use crate::source::SourceText;

pub const PROJECT_MANIFEST_BASENAME: &str = "manifest.yaml";

const DEFAULT_PROJECT_NAME: &str = "TestProject";

/// One compilation unit inside a project.
#[derive(Clone, Debug)]
pub struct Document {
    /// File name derived from the primary type declaration, e.g. `C.cl`.
    pub name: String,
    /// Declared (or inferred) namespace, used to pair before/after fragments.
    pub namespace: String,
    pub path: PathBuf,
    pub text: SourceText,
}

impl Document {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let name = infer_file_name(&text);
        let namespace = infer_namespace(&text);
        let path = PathBuf::from(&name);
        Self {
            name,
            namespace,
            path,
            text: SourceText::new(text),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Identity used when fragment order is not guaranteed.
    #[must_use]
    pub fn identity(&self) -> (&str, &str) {
        (&self.namespace, &self.name)
    }
}

#[derive(Clone, Debug)]
pub struct Project {
    pub name: String,
    pub documents: Vec<Document>,
    pub references: Vec<LibraryReference>,
}

impl Project {
    #[must_use]
    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.path == path)
    }
}

#[derive(Clone, Debug)]
pub struct Solution {
    pub projects: Vec<Project>,
}

impl Solution {
    /// Build a solution from marker-free source fragments: one project, one
    /// document per fragment, named via the lexical heuristics of
    /// [`crate::marker`].
    pub fn synthesize(fragments: &[&str], settings: &Settings) -> Result<Self> {
        if fragments.is_empty() {
            return Err(Error::setup("at least one code fragment is required"));
        }
        let mut documents = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let document = Document::new(*fragment);
            if let Some(existing) = documents
                .iter()
                .find(|doc: &&Document| doc.identity() == document.identity())
            {
                return Err(Error::setup(format!(
                    "expected unique type names across fragments; `{}.{}` appears more than once",
                    existing.namespace, existing.name
                )));
            }
            documents.push(document);
        }
        Ok(Self {
            projects: vec![Project {
                name: DEFAULT_PROJECT_NAME.to_string(),
                documents,
                references: settings.references.clone(),
            }],
        })
    }

    /// Load a solution from an on-disk project manifest (the compiler's
    /// `manifest.yaml` descriptor).
    pub fn load(manifest_path: &Path, settings: &Settings) -> Result<Self> {
        let contents = fs::read_to_string(manifest_path)?;
        let manifest: ProjectManifest = serde_yaml::from_str(&contents)
            .map_err(|err| Error::manifest(manifest_path, err.to_string()))?;
        if manifest.sources.is_empty() {
            return Err(Error::manifest(
                manifest_path,
                "manifest lists no `sources`",
            ));
        }
        let root = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let mut documents = Vec::with_capacity(manifest.sources.len());
        for source in &manifest.sources {
            let full = root.join(source);
            let text = fs::read_to_string(&full)?;
            let namespace = infer_namespace(&text);
            let name = full
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| infer_file_name(&text));
            documents.push(Document {
                name,
                namespace,
                path: source.clone(),
                text: SourceText::new(text),
            });
        }
        Ok(Self {
            projects: vec![Project {
                name: manifest.package.name,
                documents,
                references: settings.references.clone(),
            }],
        })
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.projects.iter().flat_map(|project| &project.documents)
    }

    #[must_use]
    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.projects
            .iter()
            .find_map(|project| project.document(path))
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.projects
            .iter()
            .map(|project| project.documents.len())
            .sum()
    }

    /// Functional update: a new solution with one document's text replaced.
    pub fn with_document_text(&self, path: &Path, text: impl Into<String>) -> Result<Self> {
        let mut updated = self.clone();
        for project in &mut updated.projects {
            if let Some(document) = project.documents.iter_mut().find(|doc| doc.path == path) {
                document.text = SourceText::new(text.into());
                return Ok(updated);
            }
        }
        Err(Error::internal(format!(
            "no document at `{}` in the synthesized solution",
            path.display()
        )))
    }
}

#[derive(Debug, Deserialize)]
struct ProjectManifest {
    package: PackageSection,
    #[serde(default)]
    sources: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PackageSection {
    name: String,
}
