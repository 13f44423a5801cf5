//! Wikilink rule for `[[target]]`, `[[target#anchor]]` and `[[target|label]]`.

use super::inline::{InlineRule, InlineState};
use super::token::{Nesting, Token, TokenKind};
use crate::pipe::split_pipes;
use crate::slug::slugify;

/// Page that broken links are redirected to when it exists
pub const NOT_FOUND_PAGE: &str = "404";

/// Inline rule turning `[[...]]` into links between pages
#[derive(Debug, Default, Clone, Copy)]
pub struct WikiLinkRule;

impl WikiLinkRule {
    pub fn new() -> Self {
        Self
    }
}

impl InlineRule for WikiLinkRule {
    fn name(&self) -> &str {
        "wikilink"
    }

    fn parse(&self, state: &mut InlineState<'_>, probe: bool) -> bool {
        let start = state.pos;
        let max = state.pos_max;
        let src = state.src;
        let bytes = src.as_bytes();

        // Shortest link is `[[x]]`
        if max < start + 5 || !bytes[start..].starts_with(b"[[") {
            return false;
        }
        if probe || state.link_level > 0 {
            return false;
        }

        let content_start = start + 2;
        state.pos = content_start;
        let mut close = None;
        while state.pos + 1 < max {
            if bytes[state.pos..].starts_with(b"]]") {
                close = Some(state.pos);
                break;
            }
            state.skip_token();
        }
        state.pos = start;

        let Some(close) = close else {
            return false;
        };
        if close == content_start {
            return false;
        }
        let end = close + 2;

        let content = &src[content_start..close];
        if has_unescaped_newline(content) || !state.is_balanced(start, end) {
            return false;
        }

        let segments = split_pipes(content, Some(2));
        let dest_segment = &content[segments[0].clone()];
        let label = segments
            .get(1)
            .map(|range| content_start + range.start..content_start + range.end);
        if let Some(label) = &label {
            if !state.is_balanced(label.start, label.end) {
                return false;
            }
        }

        let (destination, anchor) = match dest_segment.split_once('#') {
            Some((destination, anchor)) => (destination, format!("#{anchor}")),
            None => (dest_segment, String::new()),
        };
        let slug = slugify(destination);

        let (href, class) = if state.env.has_page(&slug) {
            (format!("{slug}.html{anchor}"), "wiki-link")
        } else if state.env.has_page(NOT_FOUND_PAGE) {
            tracing::debug!("Broken wiki link to {}", destination);
            (
                format!("{NOT_FOUND_PAGE}.html#{destination}"),
                "wiki-link broken",
            )
        } else {
            tracing::debug!("Broken wiki link to {}", destination);
            (format!("{slug}.html{anchor}"), "wiki-link broken")
        };

        state.push(
            Token::new(TokenKind::LinkOpen, "a", Nesting::Open)
                .with_attr("href", href)
                .with_attr("class", class),
        );

        match label {
            Some(label) => {
                let old_max = state.pos_max;
                state.pos = label.start;
                state.pos_max = label.end;
                state.link_level += 1;
                state.tokenize();
                state.link_level -= 1;
                state.pos_max = old_max;
            }
            None => state.push_text(destination),
        }

        state.push(Token::new(TokenKind::LinkClose, "a", Nesting::Close));
        state.pos = end;
        true
    }
}

/// A line break not preceded by an odd number of backslashes
fn has_unescaped_newline(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().any(|(idx, &b)| {
        b == b'\n' && bytes[..idx].iter().rev().take_while(|&&c| c == b'\\').count() % 2 == 0
    })
}
