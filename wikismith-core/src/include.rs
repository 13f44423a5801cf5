//! Include expansion for `{{name}}` and `{{name|arg1|arg2}}` invocations.
//!
//! An invocation is replaced by the fragment stored in `_{name}.html`, with
//! the fragment's `{{#N}}` / `{{#N|default}}` placeholders filled from the
//! invocation's arguments. Fragments may invoke further fragments, so
//! expansion repeats until a round finds no invocation left. The number of
//! rounds is bounded, which turns include cycles into an error instead of an
//! endless loop.

use crate::loader::{LoadError, Loader};
use crate::pipe::{split_pipes_str, unescape_pipes};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Default maximum number of expansion rounds per page
pub const DEFAULT_INCLUDE_LIMIT: usize = 500;

#[derive(Error, Debug)]
pub enum IncludeError {
    #[error("Encountered likely infinite include chain (gave up after {limit} rounds)")]
    Overflow { limit: usize },

    #[error("Failed to load include fragment: {0}")]
    Load(#[from] LoadError),
}

static INVOCATION_REGEX: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn invocation_regex() -> &'static Regex {
    INVOCATION_REGEX.get_or_init(|| {
        Regex::new(r"\{\{([^#{}|\n][^{}|\n]*)(?:\|([^{}\n]*))?\}\}").expect("valid include regex")
    })
}

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{\{#(\d+)(?:\|([^{}\n]*?))?\}\}").expect("valid placeholder regex")
    })
}

/// File name of the fragment for include `name`
pub fn fragment_path(name: &str) -> String {
    format!("_{name}.html")
}

/// Fragments loaded during one compilation run, keyed by include name
#[derive(Debug, Default, Clone)]
pub struct IncludeCache {
    fragments: HashMap<String, String>,
}

impl IncludeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fragments.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, fragment: impl Into<String>) {
        self.fragments.insert(name.into(), fragment.into());
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Expands include invocations against a shared [`IncludeCache`]
pub struct IncludeExpander<'a> {
    cache: &'a mut IncludeCache,
    limit: usize,
}

impl<'a> IncludeExpander<'a> {
    pub fn new(cache: &'a mut IncludeCache) -> Self {
        Self {
            cache,
            limit: DEFAULT_INCLUDE_LIMIT,
        }
    }

    /// Set the maximum number of expansion rounds
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Expand every invocation in `text`, recursively.
    ///
    /// Each round first loads the fragments the current text needs and then
    /// substitutes all invocations, so substitution never sees a name that is
    /// not cached yet.
    pub fn expand(&mut self, text: &str, loader: &dyn Loader) -> Result<String, IncludeError> {
        let mut text = text.to_string();
        let mut rounds = 0;

        loop {
            let names = invoked_names(&text);
            if names.is_empty() {
                return Ok(text);
            }
            if rounds == self.limit {
                return Err(IncludeError::Overflow { limit: self.limit });
            }
            rounds += 1;

            for name in names {
                if !self.cache.contains(&name) {
                    tracing::debug!("Loading include fragment {}", name);
                    let fragment = loader.load(&fragment_path(&name))?;
                    self.cache.insert(name, fragment);
                }
            }

            text = substitute(&text, self.cache);
        }
    }
}

/// Distinct include names invoked in `text`, in order of first appearance
fn invoked_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in invocation_regex().captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Replace every invocation in `text` with its cached fragment
fn substitute(text: &str, cache: &IncludeCache) -> String {
    invocation_regex()
        .replace_all(text, |caps: &Captures| {
            let Some(fragment) = cache.get(&caps[1]) else {
                // Names are loaded before substitution; keep the text if not
                return caps[0].to_string();
            };
            let args: Vec<String> = match caps.get(2).map(|m| m.as_str()) {
                Some(list) if !list.is_empty() => split_pipes_str(list, None)
                    .into_iter()
                    .map(unescape_pipes)
                    .collect(),
                _ => Vec::new(),
            };
            fill_placeholders(fragment, &args)
        })
        .into_owned()
}

/// Fill `{{#N}}` / `{{#N|default}}` placeholders with 1-based arguments
pub fn fill_placeholders(fragment: &str, args: &[String]) -> String {
    placeholder_regex()
        .replace_all(fragment, |caps: &Captures| {
            let arg = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| args.get(idx));
            match arg {
                Some(value) => value.clone(),
                None => caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            }
        })
        .into_owned()
}
