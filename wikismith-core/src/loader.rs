//! Source loading: pages, include fragments, templates and binary assets.

use glob::{MatchOptions, Pattern};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl LoadError {
    fn from_io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_string(),
            }
        } else {
            LoadError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Read access to the source tree. All paths are relative to the tree root.
pub trait Loader {
    /// Load a UTF-8 text file.
    fn load(&self, path: &str) -> Result<String, LoadError>;

    /// Load a file as raw bytes.
    fn load_binary(&self, path: &str) -> Result<Vec<u8>, LoadError>;

    /// List files matching `pattern`, relative to the root, `/`-separated.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, LoadError>;
}

/// Loader backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl FsLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            excluded: Vec::new(),
        }
    }

    /// Leave `dir` (relative to the root) out of glob results, e.g. an
    /// output folder that lives inside the source tree
    pub fn excluding<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.excluded.push(self.root.join(dir));
        self
    }
}

impl Loader for FsLoader {
    fn load(&self, path: &str) -> Result<String, LoadError> {
        fs::read_to_string(self.root.join(path)).map_err(|e| LoadError::from_io(path, e))
    }

    fn load_binary(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        fs::read(self.root.join(path)).map_err(|e| LoadError::from_io(path, e))
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, LoadError> {
        let patterns = expand_braces(pattern)
            .into_iter()
            .map(|p| {
                Pattern::new(&p).map_err(|source| LoadError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::default()
        };

        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.excluded.iter().any(|dir| e.path() == dir))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if patterns.iter().any(|p| p.matches_with(&rel, options)) {
                matches.push(rel);
            }
        }

        matches.sort();
        matches.dedup();
        tracing::debug!("Glob {} matched {} files", pattern, matches.len());
        Ok(matches)
    }
}

/// Expand `{a,b}` alternatives into separate patterns.
///
/// `**/*.{css,png}` becomes `**/*.css` and `**/*.png`. Groups may repeat;
/// they are expanded left to right.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}
