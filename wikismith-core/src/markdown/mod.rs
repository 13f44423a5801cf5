//! Markdown engine: token stream, inline rule hook, HTML renderer.
//!
//! Documents are parsed with pulldown-cmark and flattened into [`Token`]s.
//! Inline content is re-walked by [`InlineState`] so registered
//! [`InlineRule`]s can claim syntax the host parser does not know about.

mod block;
pub mod inline;
pub mod render;
pub mod toc;
pub mod token;
pub mod wikilinks;

use crate::slug::slugify;
use pulldown_cmark::Options;
use std::collections::{BTreeSet, HashSet};

pub use inline::{InlineRule, InlineState};
pub use toc::TocGenerator;
pub use token::{Nesting, Token, TokenKind};
pub use wikilinks::WikiLinkRule;

/// Render-time environment: the ids of every page in the current run
#[derive(Debug, Clone, Default)]
pub struct RenderEnv {
    pages: BTreeSet<String>,
}

impl RenderEnv {
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_page(&self, id: &str) -> bool {
        self.pages.contains(id)
    }
}

/// Markdown tokenizer and renderer with pluggable inline rules
pub struct MarkdownEngine {
    options: Options,
    rules: Vec<Box<dyn InlineRule>>,
}

impl MarkdownEngine {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self {
            options,
            rules: Vec::new(),
        }
    }

    /// Engine with the wiki link rule registered
    pub fn wiki() -> Self {
        Self::new().with_rule(WikiLinkRule::new())
    }

    pub fn with_rule<R: InlineRule + 'static>(mut self, rule: R) -> Self {
        self.register_rule(Box::new(rule));
        self
    }

    /// Add an inline rule. Rules are tried in registration order.
    pub fn register_rule(&mut self, rule: Box<dyn InlineRule>) {
        tracing::debug!("Registering inline rule {}", rule.name());
        self.rules.push(rule);
    }

    /// Tokenize a document into block tokens. Headings get `id` attributes.
    pub fn tokenize(&self, text: &str, env: &RenderEnv) -> Vec<Token> {
        let mut tokens = block::tokenize_blocks(text, self.options, &self.rules, env);
        annotate_heading_ids(&mut tokens);
        tokens
    }

    /// Tokenize a snippet of inline text.
    ///
    /// The snippet is parsed as a paragraph; when it turns out to be some
    /// other block (a heading, a list item, ...) it is kept as plain text.
    /// Surrounding whitespace is preserved.
    pub fn tokenize_inline(&self, text: &str, env: &RenderEnv) -> Vec<Token> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return if text.is_empty() {
                Vec::new()
            } else {
                vec![Token::text(text)]
            };
        }

        let leading = &text[..text.len() - text.trim_start().len()];
        let trailing = &text[text.trim_end().len()..];

        let blocks = block::tokenize_blocks(trimmed, self.options, &self.rules, env);
        let mut children = match blocks.as_slice() {
            [open, inline, close]
                if open.kind == TokenKind::ParagraphOpen
                    && inline.kind == TokenKind::Inline
                    && close.kind == TokenKind::ParagraphClose =>
            {
                inline.children.clone().unwrap_or_default()
            }
            _ => vec![Token::text(trimmed)],
        };

        if !leading.is_empty() {
            children.insert(0, Token::text(leading));
        }
        if !trailing.is_empty() {
            children.push(Token::text(trailing));
        }
        children
    }

    pub fn render(&self, tokens: &[Token]) -> String {
        render::render(tokens)
    }
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Give every heading a unique `id`: explicit `{#id}` attributes are kept,
/// the rest are slugs of the heading text with `-1`, `-2`, ... on repeats.
fn annotate_heading_ids(tokens: &mut [Token]) {
    let mut used: HashSet<String> = HashSet::new();

    for idx in 0..tokens.len() {
        if tokens[idx].kind != TokenKind::HeadingOpen {
            continue;
        }
        if let Some(id) = tokens[idx].attr_get("id") {
            used.insert(id.to_string());
            continue;
        }

        let text = tokens
            .get(idx + 1)
            .filter(|next| next.kind == TokenKind::Inline)
            .map(Token::plain_text)
            .unwrap_or_default();
        let slug = slugify(&text);

        let mut id = slug.clone();
        let mut n = 1;
        while used.contains(&id) {
            id = format!("{slug}-{n}");
            n += 1;
        }
        used.insert(id.clone());
        tokens[idx].attr_set("id", id);
    }
}
