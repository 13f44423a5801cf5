//! Per-document record threaded through one compilation run.

use crate::slug::slugify;
use serde::Serialize;
use std::path::Path;

/// A single source page
///
/// Pages are created from file names before any content is read, so the
/// complete id set is known when links get resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Canonical id (e.g. "rust-safety"), also the output file stem
    pub id: String,

    /// Source path relative to the input root
    pub source_path: String,

    /// Text as loaded, before includes and pragmas
    #[serde(skip)]
    pub raw_source: Option<String>,

    /// Text after include expansion and pragma extraction
    #[serde(skip)]
    pub processed_text: Option<String>,

    /// Display title; the id unless a `#title` pragma overrides it
    pub title: String,
}

impl Page {
    pub fn new(id: impl Into<String>, source_path: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            source_path: source_path.into(),
            raw_source: None,
            processed_text: None,
        }
    }

    /// Create a page from its source file name: `My Page.md` gets id `my-page`
    pub fn from_filename(path: &str) -> Self {
        let stem = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path);
        Self::new(slugify(stem), path)
    }

    /// Output file name, relative to the output root
    pub fn output_path(&self) -> String {
        format!("{}.html", self.id)
    }
}
