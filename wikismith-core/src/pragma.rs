//! Line-level page directives (`#title My Page`).

use regex::{Captures, Regex};
use std::sync::OnceLock;

static PRAGMA_REGEX: OnceLock<Regex> = OnceLock::new();

fn pragma_regex() -> &'static Regex {
    PRAGMA_REGEX.get_or_init(|| Regex::new(r"(?m)^#(\w+)(.*)$").expect("valid pragma regex"))
}

/// Metadata collected from a page's directives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pragmas {
    pub title: Option<String>,
}

/// Strip recognized directives from `text` and collect their values.
///
/// A directive is `#keyword rest-of-line` at the start of a line. `#title`
/// sets the page title and its line is blanked; the line break stays so the
/// surrounding markdown keeps its block structure. Every other keyword is
/// left in place: `#toc` and friends are meaningful further down the
/// pipeline.
///
/// ```
/// use wikismith_core::extract_pragmas;
///
/// let (text, pragmas) = extract_pragmas("#title Hello\n\nBody");
/// assert_eq!(text, "\n\nBody");
/// assert_eq!(pragmas.title.as_deref(), Some("Hello"));
/// ```
pub fn extract_pragmas(text: &str) -> (String, Pragmas) {
    let mut pragmas = Pragmas::default();

    let stripped = pragma_regex().replace_all(text, |caps: &Captures| match &caps[1] {
        "title" => {
            pragmas.title = Some(caps[2].trim().to_string());
            String::new()
        }
        _ => caps[0].to_string(),
    });

    (stripped.into_owned(), pragmas)
}
