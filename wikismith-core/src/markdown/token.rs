//! Flat token stream produced by the markdown engine.
//!
//! Block structure is expressed with paired open/close tokens; the inline
//! content of a paragraph, heading or table cell is a single `Inline` token
//! whose children hold the inline tokens.

/// Token type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    ParagraphOpen,
    ParagraphClose,
    HeadingOpen,
    HeadingClose,
    BlockquoteOpen,
    BlockquoteClose,
    BulletListOpen,
    BulletListClose,
    OrderedListOpen,
    OrderedListClose,
    ListItemOpen,
    ListItemClose,
    TableOpen,
    TableClose,
    TheadOpen,
    TheadClose,
    TbodyOpen,
    TbodyClose,
    TrOpen,
    TrClose,
    ThOpen,
    ThClose,
    TdOpen,
    TdClose,
    Hr,
    CodeBlock,
    Fence,
    HtmlBlock,
    Inline,

    Text,
    CodeInline,
    HtmlInline,
    Softbreak,
    Hardbreak,
    EmOpen,
    EmClose,
    StrongOpen,
    StrongClose,
    StrikethroughOpen,
    StrikethroughClose,
    LinkOpen,
    LinkClose,
    Image,
}

impl TokenKind {
    /// markdown-it style type name, e.g. `heading_open`
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::ParagraphOpen => "paragraph_open",
            TokenKind::ParagraphClose => "paragraph_close",
            TokenKind::HeadingOpen => "heading_open",
            TokenKind::HeadingClose => "heading_close",
            TokenKind::BlockquoteOpen => "blockquote_open",
            TokenKind::BlockquoteClose => "blockquote_close",
            TokenKind::BulletListOpen => "bullet_list_open",
            TokenKind::BulletListClose => "bullet_list_close",
            TokenKind::OrderedListOpen => "ordered_list_open",
            TokenKind::OrderedListClose => "ordered_list_close",
            TokenKind::ListItemOpen => "list_item_open",
            TokenKind::ListItemClose => "list_item_close",
            TokenKind::TableOpen => "table_open",
            TokenKind::TableClose => "table_close",
            TokenKind::TheadOpen => "thead_open",
            TokenKind::TheadClose => "thead_close",
            TokenKind::TbodyOpen => "tbody_open",
            TokenKind::TbodyClose => "tbody_close",
            TokenKind::TrOpen => "tr_open",
            TokenKind::TrClose => "tr_close",
            TokenKind::ThOpen => "th_open",
            TokenKind::ThClose => "th_close",
            TokenKind::TdOpen => "td_open",
            TokenKind::TdClose => "td_close",
            TokenKind::Hr => "hr",
            TokenKind::CodeBlock => "code_block",
            TokenKind::Fence => "fence",
            TokenKind::HtmlBlock => "html_block",
            TokenKind::Inline => "inline",
            TokenKind::Text => "text",
            TokenKind::CodeInline => "code_inline",
            TokenKind::HtmlInline => "html_inline",
            TokenKind::Softbreak => "softbreak",
            TokenKind::Hardbreak => "hardbreak",
            TokenKind::EmOpen => "em_open",
            TokenKind::EmClose => "em_close",
            TokenKind::StrongOpen => "strong_open",
            TokenKind::StrongClose => "strong_close",
            TokenKind::StrikethroughOpen => "s_open",
            TokenKind::StrikethroughClose => "s_close",
            TokenKind::LinkOpen => "link_open",
            TokenKind::LinkClose => "link_close",
            TokenKind::Image => "image",
        }
    }
}

/// Whether a token opens, closes, or stands alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    Open,
    Leaf,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// HTML tag name, empty for tokens without one
    pub tag: &'static str,
    pub nesting: Nesting,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
    pub content: String,
    /// Fence info string (language)
    pub info: String,
    pub children: Option<Vec<Token>>,
    /// Block-level token (affects newlines when rendering)
    pub block: bool,
    /// Rendered without its tag (paragraphs of tight lists)
    pub hidden: bool,
}

impl Token {
    pub fn new(kind: TokenKind, tag: &'static str, nesting: Nesting) -> Self {
        Self {
            kind,
            tag,
            nesting,
            attrs: Vec::new(),
            content: String::new(),
            info: String::new(),
            children: None,
            block: false,
            hidden: false,
        }
    }

    /// New block-level token
    pub fn block(kind: TokenKind, tag: &'static str, nesting: Nesting) -> Self {
        Self {
            block: true,
            ..Self::new(kind, tag, nesting)
        }
    }

    /// Inline text token
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::new(TokenKind::Text, "", Nesting::Leaf)
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attr_push(name, value);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn attr_get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.push((name.into(), value.into()));
    }

    /// Set an attribute, replacing the first existing value
    pub fn attr_set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Append to a space-separated attribute (e.g. `class`)
    pub fn attr_join(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(value);
            }
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Heading level parsed from the tag (`h2` -> 2)
    pub fn heading_level(&self) -> Option<u8> {
        self.tag
            .strip_prefix('h')
            .and_then(|level| level.parse::<u8>().ok())
            .filter(|level| (1..=6).contains(level))
    }

    /// Concatenated text of the children, ignoring markup
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        if let Some(children) = &self.children {
            for child in children {
                match child.kind {
                    TokenKind::Text | TokenKind::CodeInline => out.push_str(&child.content),
                    TokenKind::Softbreak | TokenKind::Hardbreak => out.push(' '),
                    TokenKind::Image => out.push_str(&child.plain_text()),
                    _ => {}
                }
            }
        }
        out
    }
}

/// Static tag name for a heading level
pub fn heading_tag(level: u8) -> &'static str {
    match level {
        1 => "h1",
        2 => "h2",
        3 => "h3",
        4 => "h4",
        5 => "h5",
        _ => "h6",
    }
}
