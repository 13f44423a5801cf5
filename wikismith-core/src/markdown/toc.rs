//! Table of contents insertion at `#toc` markers.
//!
//! `#toc` lists every heading of the document at the top level; `#toc N`
//! lists headings down to level N. The marker can sit in a paragraph or in a
//! raw HTML block. Text around the marker stays where it was.

use super::token::{Token, TokenKind};
use super::{MarkdownEngine, RenderEnv};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

static TOC_REGEX: OnceLock<Regex> = OnceLock::new();

fn toc_regex() -> &'static Regex {
    TOC_REGEX.get_or_init(|| Regex::new(r"#toc(?:\s+(\d))?").expect("valid toc regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TocEntry {
    level: u8,
    id: String,
    text: String,
}

/// Rewrites token streams, replacing `#toc` markers with nested lists
pub struct TocGenerator<'e> {
    engine: &'e MarkdownEngine,
}

impl<'e> TocGenerator<'e> {
    pub fn new(engine: &'e MarkdownEngine) -> Self {
        Self { engine }
    }

    pub fn rewrite(&self, tokens: &[Token], env: &RenderEnv) -> Vec<Token> {
        let entries = collect_headings(tokens);
        let min_level = entries.iter().map(|e| e.level).min().unwrap_or(1);

        let mut result = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !matches!(token.kind, TokenKind::Inline | TokenKind::HtmlBlock) {
                result.push(token.clone());
                continue;
            }
            if !toc_regex().is_match(&token.content) {
                result.push(token.clone());
                continue;
            }

            let mut last = 0;
            for caps in toc_regex().captures_iter(&token.content) {
                let Some(marker) = caps.get(0) else {
                    continue;
                };
                let requested = caps
                    .get(1)
                    .and_then(|m| m.as_str().parse::<u8>().ok())
                    .unwrap_or(min_level);

                let before = &token.content[last..marker.start()];
                if !before.is_empty() {
                    result.push(self.fragment(token, before, env));
                }
                result.extend(self.list(&entries, min_level, requested, env));
                last = marker.end();
            }

            let after = &token.content[last..];
            if !after.is_empty() {
                result.push(self.fragment(token, after, env));
            }
        }
        result
    }

    /// Nested ordered list for every entry at or above `requested`
    fn list(
        &self,
        entries: &[TocEntry],
        min_level: u8,
        requested: u8,
        env: &RenderEnv,
    ) -> Vec<Token> {
        let mut markdown = String::new();
        let mut prev_depth: Option<usize> = None;

        for entry in entries.iter().filter(|e| e.level <= requested) {
            let depth = usize::from(entry.level - min_level);
            let depth = match prev_depth {
                Some(prev) => depth.min(prev + 1),
                None => 0,
            };
            prev_depth = Some(depth);
            let indent = "   ".repeat(depth);
            let _ = writeln!(markdown, "{indent}1. [{}](#{})", entry.text, entry.id);
        }

        if markdown.is_empty() {
            return Vec::new();
        }

        let mut list = self.engine.tokenize(&markdown, env);
        if let Some(root) = list.first_mut() {
            root.attr_join("class", "table-of-contents");
        }
        list
    }

    /// Copy of `token` holding only `content`
    fn fragment(&self, token: &Token, content: &str, env: &RenderEnv) -> Token {
        let mut fragment = token.clone().with_content(content);
        if fragment.kind == TokenKind::Inline {
            fragment.children = Some(self.engine.tokenize_inline(content, env));
        }
        fragment
    }
}

fn collect_headings(tokens: &[Token]) -> Vec<TocEntry> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| token.kind == TokenKind::HeadingOpen)
        .filter_map(|(idx, token)| {
            let level = token.heading_level()?;
            let text = tokens
                .get(idx + 1)
                .filter(|next| next.kind == TokenKind::Inline)
                .map(|next| next.content.clone())
                .unwrap_or_default();
            Some(TocEntry {
                level,
                id: token.attr_get("id").unwrap_or_default().to_string(),
                text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> String {
        let engine = MarkdownEngine::wiki();
        let env = RenderEnv::new(["page"]);
        let tokens = engine.tokenize(md, &env);
        let tokens = TocGenerator::new(&engine).rewrite(&tokens, &env);
        engine.render(&tokens)
    }

    #[test]
    fn test_top_level_entries() {
        assert_eq!(
            render("# foo\n#toc\n## bar"),
            "<h1 id=\"foo\">foo</h1>\n<p>\n<ol class=\"table-of-contents\">\n\
             <li><a href=\"#foo\">foo</a></li>\n</ol>\n</p>\n<h2 id=\"bar\">bar</h2>\n"
        );
    }

    #[test]
    fn test_requested_level_nests() {
        assert_eq!(
            render("#toc 2\n# foo\n## bar\n### baz\n# qux"),
            "<p>\n<ol class=\"table-of-contents\">\n\
             <li><a href=\"#foo\">foo</a>\n<ol>\n<li><a href=\"#bar\">bar</a></li>\n</ol>\n</li>\n\
             <li><a href=\"#qux\">qux</a></li>\n</ol>\n</p>\n\
             <h1 id=\"foo\">foo</h1>\n<h2 id=\"bar\">bar</h2>\n<h3 id=\"baz\">baz</h3>\n\
             <h1 id=\"qux\">qux</h1>\n"
        );
    }

    #[test]
    fn test_marker_without_headings_disappears() {
        assert_eq!(render("#toc"), "<p></p>\n");
    }

    #[test]
    fn test_marker_in_html_block() {
        assert_eq!(
            render("# foo\n\n<div>\n#toc\n</div>\n"),
            "<h1 id=\"foo\">foo</h1>\n<div>\n<ol class=\"table-of-contents\">\n\
             <li><a href=\"#foo\">foo</a></li>\n</ol>\n\n</div>\n"
        );
    }

    #[test]
    fn test_surrounding_text_is_kept() {
        let out = render("# foo\n\nbefore *x* #toc [[page]] after");
        assert!(out.starts_with("<h1 id=\"foo\">foo</h1>\n<p>before <em>x</em> <ol"));
        assert!(out.ends_with(
            "</ol>\n <a href=\"page.html\" class=\"wiki-link\">page</a> after</p>\n"
        ));
    }

    #[test]
    fn test_every_marker_is_replaced() {
        let out = render("# a\n\n#toc\n#toc 2");
        assert_eq!(out.matches("<ol class=\"table-of-contents\">").count(), 2);
        assert!(!out.contains("#toc"));

        let out = render("# a\n\nsee #toc and #toc");
        assert_eq!(out.matches("<ol class=\"table-of-contents\">").count(), 2);
        assert!(out.contains("<p>see <ol"));
        assert!(out.contains("</ol>\n and <ol"));
        assert!(!out.contains("#toc"));
    }

    #[test]
    fn test_depth_never_jumps() {
        let engine = MarkdownEngine::new();
        let env = RenderEnv::default();
        let tokens = engine.tokenize("# a\n### deep\n#toc 3", &env);
        let entries = collect_headings(&tokens);
        let list = TocGenerator::new(&engine).list(&entries, 1, 3, &env);
        let nested_lists = list
            .iter()
            .filter(|t| t.kind == TokenKind::OrderedListOpen)
            .count();
        assert_eq!(nested_lists, 2);
        assert!(!list.iter().any(|t| t.kind == TokenKind::CodeBlock));
    }

    #[test]
    fn test_heading_entries() {
        let engine = MarkdownEngine::new();
        let tokens = engine.tokenize("# One\ntext\n## Two", &RenderEnv::default());
        assert_eq!(
            collect_headings(&tokens),
            vec![
                TocEntry {
                    level: 1,
                    id: "one".to_string(),
                    text: "One".to_string()
                },
                TocEntry {
                    level: 2,
                    id: "two".to_string(),
                    text: "Two".to_string()
                },
            ]
        );
    }
}
