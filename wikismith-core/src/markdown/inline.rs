//! Cursor-based inline tokenization with pluggable rules.
//!
//! pulldown-cmark resolves emphasis, code spans, links and friends for a whole
//! inline run at once. Those constructs are recorded as [`InlineUnit`]s with
//! source spans, and [`InlineState`] walks the run with a cursor: at every
//! position the registered [`InlineRule`]s get a chance to claim the source
//! first, otherwise the cursor steps over one unit (one character inside
//! plain text) and emits it.

use super::token::{Nesting, Token, TokenKind};
use super::RenderEnv;
use pulldown_cmark::{Event, LinkType, Tag, TagEnd};
use std::ops::Range;

/// An inline syntax extension
pub trait InlineRule: Send + Sync {
    fn name(&self) -> &str;

    /// Try to match at `state.pos`.
    ///
    /// On a match the rule pushes its tokens, moves the cursor past the
    /// consumed source and returns true. On a non-match it must leave the
    /// cursor and the token list untouched. With `probe` set the rule is only
    /// asked whether it would consume the source (see
    /// [`InlineState::skip_token`]) and must not emit tokens.
    fn parse(&self, state: &mut InlineState<'_>, probe: bool) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    /// Text content. `literal` text equals its source slice and can be
    /// entered at any character; other text (escapes, entities) is atomic.
    Text { content: String, literal: bool },
    Open(Token),
    Close(Token),
    Leaf(Token),
}

/// A construct recognized by the host parser, with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct InlineUnit {
    pub start: usize,
    pub end: usize,
    pub kind: UnitKind,
}

impl InlineUnit {
    fn is_literal_text(&self) -> bool {
        matches!(self.kind, UnitKind::Text { literal: true, .. })
    }

    fn is_break(&self) -> bool {
        matches!(
            &self.kind,
            UnitKind::Leaf(token) if matches!(token.kind, TokenKind::Softbreak | TokenKind::Hardbreak)
        )
    }
}

/// Cursor over one inline run
pub struct InlineState<'a> {
    /// Full source document; positions index into it
    pub src: &'a str,
    pub pos: usize,
    pub pos_max: usize,
    pub env: &'a RenderEnv,
    /// Number of enclosing links
    pub link_level: usize,
    pub tokens: Vec<Token>,
    pending: String,
    units: &'a [InlineUnit],
    rules: &'a [Box<dyn InlineRule>],
}

impl<'a> InlineState<'a> {
    pub(crate) fn new(
        src: &'a str,
        range: Range<usize>,
        units: &'a [InlineUnit],
        rules: &'a [Box<dyn InlineRule>],
        env: &'a RenderEnv,
    ) -> Self {
        Self {
            src,
            pos: range.start,
            pos_max: range.end,
            env,
            link_level: 0,
            tokens: Vec::new(),
            pending: String::new(),
            units,
            rules,
        }
    }

    /// Push a token, flushing pending text first
    pub fn push(&mut self, token: Token) {
        self.flush_pending();
        self.tokens.push(token);
    }

    /// Append text to the pending text token
    pub fn push_text(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.tokens.push(Token::text(text));
        }
    }

    /// Tokenize from `pos` up to `pos_max`
    pub fn tokenize(&mut self) {
        let rules = self.rules;
        while self.pos < self.pos_max {
            if !rules.iter().any(|rule| rule.parse(self, false)) {
                self.step(true);
            }
        }
        self.flush_pending();
    }

    /// Advance past one token without emitting anything
    pub fn skip_token(&mut self) {
        if self.pos >= self.pos_max {
            return;
        }
        let start = self.pos;
        let rules = self.rules;
        for rule in rules {
            if rule.parse(self, true) && self.pos > start {
                return;
            }
            self.pos = start;
        }
        self.step(false);
    }

    fn step(&mut self, emit: bool) {
        let units = self.units;
        let idx = units.partition_point(|unit| unit.end <= self.pos);
        let Some(unit) = units.get(idx) else {
            self.pos = self.pos_max;
            return;
        };

        if unit.start > self.pos {
            // Container prefixes and escape backslashes
            self.pos = unit.start.min(self.pos_max).max(self.pos + 1);
            return;
        }

        match &unit.kind {
            UnitKind::Text {
                literal: true, ..
            } => {
                let ch = self.src.get(self.pos..).and_then(|rest| rest.chars().next());
                match ch {
                    Some(ch) => {
                        if emit {
                            self.pending.push(ch);
                        }
                        self.pos += ch.len_utf8();
                    }
                    None => self.pos = unit.end,
                }
            }
            UnitKind::Text { content, .. } => {
                if emit && self.pos == unit.start {
                    self.pending.push_str(content);
                }
                self.pos = unit.end;
            }
            UnitKind::Open(token) | UnitKind::Close(token) | UnitKind::Leaf(token) => {
                if emit {
                    match token.kind {
                        TokenKind::LinkOpen => self.link_level += 1,
                        TokenKind::LinkClose => self.link_level = self.link_level.saturating_sub(1),
                        _ => {}
                    }
                    self.push(token.clone());
                }
                self.pos = unit.end;
            }
        }
    }

    /// Whether `start..end` can be replaced wholesale without leaving half of
    /// a host construct behind: every container opened inside is closed
    /// inside, and no atomic unit crosses either boundary.
    pub fn is_balanced(&self, start: usize, end: usize) -> bool {
        let first = self.units.partition_point(|unit| unit.end <= start);
        let mut depth: isize = 0;

        for unit in self.units[first..].iter().take_while(|unit| unit.start < end) {
            if unit.start < start || unit.end > end {
                if unit.is_literal_text() {
                    continue;
                }
                return false;
            }
            match unit.kind {
                UnitKind::Open(_) => depth += 1,
                UnitKind::Close(_) => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }

        depth == 0
    }

    /// Finish and return the emitted tokens
    pub fn into_tokens(mut self) -> Vec<Token> {
        self.flush_pending();
        self.tokens
    }
}

/// Record the inline events of one run as units
pub(crate) fn build_units(src: &str, events: &[(Event<'_>, Range<usize>)]) -> Vec<InlineUnit> {
    let mut builder = UnitBuilder::default();
    let mut iter = events.iter();

    while let Some((event, range)) = iter.next() {
        match event {
            Event::Text(text) => {
                let literal = src.get(range.clone()) == Some(&**text);
                builder.push(
                    range.clone(),
                    UnitKind::Text {
                        content: text.to_string(),
                        literal,
                    },
                );
            }
            Event::Code(code) => builder.leaf(
                range.clone(),
                Token::new(TokenKind::CodeInline, "code", Nesting::Leaf).with_content(code.to_string()),
            ),
            Event::InlineHtml(html) | Event::Html(html) => builder.leaf(
                range.clone(),
                Token::new(TokenKind::HtmlInline, "", Nesting::Leaf).with_content(html.to_string()),
            ),
            Event::SoftBreak => builder.leaf(
                range.clone(),
                Token::new(TokenKind::Softbreak, "br", Nesting::Leaf),
            ),
            Event::HardBreak => builder.leaf(
                range.clone(),
                Token::new(TokenKind::Hardbreak, "br", Nesting::Leaf),
            ),
            Event::Start(Tag::Emphasis) => {
                builder.open(range.clone(), Token::new(TokenKind::EmOpen, "em", Nesting::Open))
            }
            Event::Start(Tag::Strong) => builder.open(
                range.clone(),
                Token::new(TokenKind::StrongOpen, "strong", Nesting::Open),
            ),
            Event::Start(Tag::Strikethrough) => builder.open(
                range.clone(),
                Token::new(TokenKind::StrikethroughOpen, "s", Nesting::Open),
            ),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            }) => {
                let dest: &str = dest_url;
                let href = match link_type {
                    LinkType::Email => format!("mailto:{dest}"),
                    _ => dest.to_string(),
                };
                let mut token =
                    Token::new(TokenKind::LinkOpen, "a", Nesting::Open).with_attr("href", href);
                if !title.is_empty() {
                    token.attr_push("title", title.to_string());
                }
                builder.open(range.clone(), token);
            }
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                let alt = image_alt(&mut iter);
                let mut token = Token::new(TokenKind::Image, "img", Nesting::Leaf)
                    .with_attr("src", dest_url.to_string())
                    .with_attr("alt", alt.as_str());
                if !title.is_empty() {
                    token.attr_push("title", title.to_string());
                }
                if !alt.is_empty() {
                    token.children = Some(vec![Token::text(alt)]);
                }
                builder.leaf(range.clone(), token);
            }
            Event::End(TagEnd::Emphasis) => {
                builder.close(Token::new(TokenKind::EmClose, "em", Nesting::Close))
            }
            Event::End(TagEnd::Strong) => {
                builder.close(Token::new(TokenKind::StrongClose, "strong", Nesting::Close))
            }
            Event::End(TagEnd::Strikethrough) => {
                builder.close(Token::new(TokenKind::StrikethroughClose, "s", Nesting::Close))
            }
            Event::End(TagEnd::Link) => {
                builder.close(Token::new(TokenKind::LinkClose, "a", Nesting::Close))
            }
            _ => {}
        }
    }

    builder.units
}

/// Plain alt text of an image whose start event was just consumed
fn image_alt(iter: &mut std::slice::Iter<'_, (Event<'_>, Range<usize>)>) -> String {
    let mut alt = String::new();
    let mut depth = 1;
    for (event, _) in iter.by_ref() {
        match event {
            Event::Start(Tag::Image { .. }) => depth += 1,
            Event::End(TagEnd::Image) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Text(text) | Event::Code(text) => alt.push_str(&**text),
            Event::SoftBreak | Event::HardBreak => alt.push('\n'),
            _ => {}
        }
    }
    alt
}

#[derive(Default)]
struct UnitBuilder {
    units: Vec<InlineUnit>,
    /// Element end offsets of the open containers
    open: Vec<usize>,
    /// Open unit whose span ends where its first child starts
    unterminated: Option<usize>,
}

impl UnitBuilder {
    fn terminate_open(&mut self, next_start: usize) {
        if let Some(idx) = self.unterminated.take() {
            let unit = &mut self.units[idx];
            unit.end = next_start.max(unit.start + 1);
        }
    }

    fn push(&mut self, range: Range<usize>, kind: UnitKind) {
        self.terminate_open(range.start);
        self.units.push(InlineUnit {
            start: range.start,
            end: range.end.max(range.start + 1),
            kind,
        });
    }

    fn leaf(&mut self, range: Range<usize>, token: Token) {
        self.push(range, UnitKind::Leaf(token));
    }

    fn open(&mut self, range: Range<usize>, token: Token) {
        self.terminate_open(range.start);
        self.open.push(range.end);
        self.unterminated = Some(self.units.len());
        self.units.push(InlineUnit {
            start: range.start,
            end: range.start + 1,
            kind: UnitKind::Open(token),
        });
    }

    fn close(&mut self, token: Token) {
        self.terminate_open(0);
        let prev_end = self.units.last().map_or(0, |unit| unit.end);
        let element_end = self.open.pop().unwrap_or(prev_end + 1);
        let start = prev_end.min(element_end.saturating_sub(1));
        self.units.push(InlineUnit {
            start,
            end: element_end.max(start + 1),
            kind: UnitKind::Close(token),
        });
    }
}

/// Source text of a run, with line breaks normalized to `\n` and the
/// container prefixes of continuation lines left out
pub(crate) fn run_content(src: &str, units: &[InlineUnit]) -> String {
    let mut out = String::new();
    let mut prev: Option<&InlineUnit> = None;

    for unit in units {
        if let Some(prev) = prev {
            if unit.start > prev.end && !prev.is_break() {
                out.push_str(src.get(prev.end..unit.start).unwrap_or_default());
            }
        }
        if unit.is_break() {
            out.push('\n');
        } else {
            let start = prev.map_or(unit.start, |p| unit.start.max(p.end));
            out.push_str(src.get(start..unit.end).unwrap_or_default());
        }
        prev = Some(unit);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{Options, Parser};

    fn inline_events(src: &str) -> Vec<(Event<'_>, Range<usize>)> {
        Parser::new_ext(src, Options::ENABLE_STRIKETHROUGH)
            .into_offset_iter()
            .filter(|(event, _)| {
                !matches!(
                    event,
                    Event::Start(Tag::Paragraph) | Event::End(TagEnd::Paragraph)
                )
            })
            .collect()
    }

    fn units(src: &str) -> Vec<InlineUnit> {
        build_units(src, &inline_events(src))
    }

    fn tokenize(src: &str) -> Vec<Token> {
        let units = units(src);
        let env = RenderEnv::default();
        let mut state = InlineState::new(src, 0..src.trim_end().len(), &units, &[], &env);
        state.tokenize();
        state.into_tokens()
    }

    fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens.iter().map(|t| t.kind.as_str()).collect()
    }

    #[test]
    fn test_emphasis_spans() {
        let units = units("a *b* c");
        let spans: Vec<(usize, usize)> = units.iter().map(|u| (u.start, u.end)).collect();
        assert_eq!(spans, vec![(0, 2), (2, 3), (3, 4), (4, 5), (5, 7)]);
        assert!(matches!(units[1].kind, UnitKind::Open(_)));
        assert!(matches!(units[3].kind, UnitKind::Close(_)));
    }

    #[test]
    fn test_link_close_covers_destination() {
        let units = units("[foo](bar.html)");
        let last = units.last().unwrap();
        assert!(matches!(last.kind, UnitKind::Close(_)));
        assert_eq!((last.start, last.end), (4, 15));
    }

    #[test]
    fn test_tokenize_merges_text() {
        let tokens = tokenize("hello *big* world");
        assert_eq!(kinds(&tokens), vec!["text", "em_open", "text", "em_close", "text"]);
        assert_eq!(tokens[0].content, "hello ");
        assert_eq!(tokens[2].content, "big");
        assert_eq!(tokens[4].content, " world");
    }

    #[test]
    fn test_escapes_are_resolved() {
        let tokens = tokenize(r"a \*b\* &amp; c");
        assert_eq!(kinds(&tokens), vec!["text"]);
        assert_eq!(tokens[0].content, "a *b* & c");
    }

    #[test]
    fn test_code_and_breaks() {
        let tokens = tokenize("`x` y\nz");
        assert_eq!(kinds(&tokens), vec!["code_inline", "text", "softbreak", "text"]);
        assert_eq!(tokens[0].content, "x");
    }

    #[test]
    fn test_image_alt() {
        let tokens = tokenize("![a *b*](pic.png)");
        assert_eq!(kinds(&tokens), vec!["image"]);
        assert_eq!(tokens[0].attr_get("src"), Some("pic.png"));
        assert_eq!(tokens[0].attr_get("alt"), Some("a b"));
    }

    #[test]
    fn test_balance() {
        let src = "*[[foo*]]";
        let units = units(src);
        let env = RenderEnv::default();
        let state = InlineState::new(src, 0..src.len(), &units, &[], &env);
        assert!(state.is_balanced(0, src.len()));
        assert!(!state.is_balanced(1, src.len()));
        // Literal text may be cut anywhere
        assert!(state.is_balanced(2, 5));
    }

    #[test]
    fn test_run_content() {
        let src = r"a \*b* `c`";
        assert_eq!(run_content(src, &units(src)), src);
    }
}
