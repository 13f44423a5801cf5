//! Escape-aware splitting on `|`.
//!
//! Wiki links (`[[Destination|Label]]`) and include invocations
//! (`{{name|arg1|arg2}}`) both separate their parts with pipes. A pipe
//! preceded by an odd number of backslashes is escaped and does not split;
//! `\\|` is an escaped backslash followed by a real delimiter.

use std::ops::Range;

/// Split `text` on unescaped pipes, returning byte ranges into `text`.
///
/// With `limit`, at most `limit` segments are produced: once `limit - 1`
/// segments exist, the remainder (pipes included) becomes the last one. A
/// limit of 0 or 1 returns the whole input as a single segment. The result is
/// never empty; an empty input yields one empty range.
///
/// ```
/// use wikismith_core::split_pipes;
///
/// assert_eq!(split_pipes("foo|bar", None), vec![0..3, 4..7]);
/// assert_eq!(split_pipes("foo|bar|baz", Some(2)), vec![0..3, 4..11]);
/// ```
pub fn split_pipes(text: &str, limit: Option<usize>) -> Vec<Range<usize>> {
    let mut segments = Vec::new();
    let mut segment_start = 0;
    let mut backslashes = 0usize;

    for (idx, byte) in text.bytes().enumerate() {
        match byte {
            b'\\' => backslashes += 1,
            b'|' if backslashes % 2 == 0 => {
                if let Some(limit) = limit {
                    if segments.len() + 1 >= limit {
                        break;
                    }
                }
                segments.push(segment_start..idx);
                segment_start = idx + 1;
                backslashes = 0;
            }
            _ => backslashes = 0,
        }
    }

    segments.push(segment_start..text.len());
    segments
}

/// Same as [`split_pipes`], returning the segments as string slices.
///
/// ```
/// use wikismith_core::split_pipes_str;
///
/// assert_eq!(split_pipes_str("foo\\|bar", None), vec!["foo\\|bar"]);
/// assert_eq!(split_pipes_str("foo\\\\|bar", None), vec!["foo\\\\", "bar"]);
/// ```
pub fn split_pipes_str(text: &str, limit: Option<usize>) -> Vec<&str> {
    split_pipes(text, limit)
        .into_iter()
        .map(|range| &text[range])
        .collect()
}

/// Turn escaped pipes (`\|`) back into literal pipes.
pub fn unescape_pipes(text: &str) -> String {
    text.replace("\\|", "|")
}
