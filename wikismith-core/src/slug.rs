//! Slug generation for page ids and link destinations.

use regex::Regex;
use std::sync::OnceLock;

static SEPARATOR_REGEX: OnceLock<Regex> = OnceLock::new();

fn separator_regex() -> &'static Regex {
    SEPARATOR_REGEX.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid separator regex"))
}

/// Convert a string to the canonical page id
///
/// Rules:
/// - Every run of characters outside `[A-Za-z0-9]` becomes one hyphen
/// - Leading/trailing hyphens are trimmed
/// - Lowercase
///
/// Page ids (from filenames) and wiki-link destinations both go through this
/// function, so a link matches a page iff their names normalize equally.
///
/// # Examples
///
/// ```
/// use wikismith_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Foo? Bar!"), "foo-bar");
/// assert_eq!(slugify("C++ Programming"), "c-programming");
/// ```
pub fn slugify(input: &str) -> String {
    let collapsed = separator_regex().replace_all(input, "-");
    collapsed.trim_matches('-').to_ascii_lowercase()
}
