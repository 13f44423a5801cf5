//! Block structure: pulldown-cmark events to the flat token stream.

use super::inline::{build_units, run_content, InlineRule, InlineState};
use super::token::{heading_tag, Nesting, Token, TokenKind};
use super::RenderEnv;
use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::ops::Range;

/// Tokenize a whole document
pub(crate) fn tokenize_blocks(
    src: &str,
    options: Options,
    rules: &[Box<dyn InlineRule>],
    env: &RenderEnv,
) -> Vec<Token> {
    let mut builder = BlockBuilder::new(src, rules, env);
    for (event, range) in Parser::new_ext(src, options).into_offset_iter() {
        builder.process_event(event, range);
    }
    builder.finish()
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    cell: usize,
    in_head: bool,
    body_open: bool,
}

impl TableState {
    fn cell_style(&self) -> Option<&'static str> {
        match self.alignments.get(self.cell) {
            Some(Alignment::Left) => Some("text-align:left"),
            Some(Alignment::Center) => Some("text-align:center"),
            Some(Alignment::Right) => Some("text-align:right"),
            _ => None,
        }
    }
}

struct BlockBuilder<'a, 'r> {
    src: &'a str,
    rules: &'r [Box<dyn InlineRule>],
    env: &'r RenderEnv,
    tokens: Vec<Token>,
    /// Inline events of the current run
    run: Vec<(Event<'a>, Range<usize>)>,
    /// Inline content directly inside a list item, wrapped in a hidden paragraph
    hidden_open: bool,
    /// Code or HTML block collecting its text
    literal: Option<Token>,
    table: TableState,
}

impl<'a, 'r> BlockBuilder<'a, 'r> {
    fn new(src: &'a str, rules: &'r [Box<dyn InlineRule>], env: &'r RenderEnv) -> Self {
        Self {
            src,
            rules,
            env,
            tokens: Vec::new(),
            run: Vec::new(),
            hidden_open: false,
            literal: None,
            table: TableState::default(),
        }
    }

    fn process_event(&mut self, event: Event<'a>, range: Range<usize>) {
        match event {
            Event::Text(text) | Event::Html(text) if self.literal.is_some() => {
                if let Some(literal) = self.literal.as_mut() {
                    literal.content.push_str(&text);
                }
            }
            Event::Start(tag) => self.start_tag(tag, range),
            Event::End(tag) => self.end_tag(tag, range),
            Event::Html(html) => {
                self.close_hidden();
                let token = Token::block(TokenKind::HtmlBlock, "", Nesting::Leaf)
                    .with_content(html.to_string());
                self.tokens.push(token);
            }
            Event::Rule => {
                self.close_hidden();
                self.tokens.push(Token::block(TokenKind::Hr, "hr", Nesting::Leaf));
            }
            inline => self.inline_event(inline, range),
        }
    }

    fn start_tag(&mut self, tag: Tag<'a>, range: Range<usize>) {
        match tag {
            Tag::Emphasis
            | Tag::Strong
            | Tag::Strikethrough
            | Tag::Superscript
            | Tag::Subscript
            | Tag::Link { .. }
            | Tag::Image { .. } => self.inline_event(Event::Start(tag), range),
            Tag::Paragraph => {
                self.close_hidden();
                self.open(TokenKind::ParagraphOpen, "p");
            }
            Tag::Heading {
                level, id, classes, ..
            } => {
                self.close_hidden();
                let mut token =
                    Token::block(TokenKind::HeadingOpen, heading_tag(level as u8), Nesting::Open);
                if let Some(id) = id {
                    token.attr_push("id", id.to_string());
                }
                for class in classes {
                    token.attr_join("class", &class);
                }
                self.tokens.push(token);
            }
            Tag::BlockQuote(_) => {
                self.close_hidden();
                self.open(TokenKind::BlockquoteOpen, "blockquote");
            }
            Tag::CodeBlock(kind) => {
                self.close_hidden();
                self.literal = Some(match kind {
                    CodeBlockKind::Fenced(info) => Token {
                        info: info.to_string(),
                        ..Token::block(TokenKind::Fence, "code", Nesting::Leaf)
                    },
                    CodeBlockKind::Indented => {
                        Token::block(TokenKind::CodeBlock, "code", Nesting::Leaf)
                    }
                });
            }
            Tag::HtmlBlock => {
                self.close_hidden();
                self.literal = Some(Token::block(TokenKind::HtmlBlock, "", Nesting::Leaf));
            }
            Tag::List(start) => {
                self.close_hidden();
                match start {
                    Some(start) => {
                        let mut token =
                            Token::block(TokenKind::OrderedListOpen, "ol", Nesting::Open);
                        if start != 1 {
                            token.attr_push("start", start.to_string());
                        }
                        self.tokens.push(token);
                    }
                    None => self.open(TokenKind::BulletListOpen, "ul"),
                }
            }
            Tag::Item => {
                self.close_hidden();
                self.open(TokenKind::ListItemOpen, "li");
            }
            Tag::Table(alignments) => {
                self.close_hidden();
                self.table = TableState {
                    alignments,
                    ..TableState::default()
                };
                self.open(TokenKind::TableOpen, "table");
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell = 0;
                self.open(TokenKind::TheadOpen, "thead");
                self.open(TokenKind::TrOpen, "tr");
            }
            Tag::TableRow => {
                if !self.table.body_open {
                    self.table.body_open = true;
                    self.open(TokenKind::TbodyOpen, "tbody");
                }
                self.table.cell = 0;
                self.open(TokenKind::TrOpen, "tr");
            }
            Tag::TableCell => {
                let (kind, tag) = if self.table.in_head {
                    (TokenKind::ThOpen, "th")
                } else {
                    (TokenKind::TdOpen, "td")
                };
                let mut token = Token::block(kind, tag, Nesting::Open);
                if let Some(style) = self.table.cell_style() {
                    token.attr_push("style", style);
                }
                self.tokens.push(token);
            }
            Tag::FootnoteDefinition(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::MetadataBlock(_) => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd, range: Range<usize>) {
        match tag {
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Superscript
            | TagEnd::Subscript
            | TagEnd::Link
            | TagEnd::Image => self.inline_event(Event::End(tag), range),
            TagEnd::Paragraph => {
                self.flush_run();
                self.close(TokenKind::ParagraphClose, "p");
            }
            TagEnd::Heading(level) => {
                self.flush_run();
                self.close(TokenKind::HeadingClose, heading_tag(level as u8));
            }
            TagEnd::BlockQuote(_) => {
                self.close_hidden();
                self.close(TokenKind::BlockquoteClose, "blockquote");
            }
            TagEnd::CodeBlock | TagEnd::HtmlBlock => {
                if let Some(token) = self.literal.take() {
                    self.tokens.push(token);
                }
            }
            TagEnd::List(ordered) => {
                self.close_hidden();
                if ordered {
                    self.close(TokenKind::OrderedListClose, "ol");
                } else {
                    self.close(TokenKind::BulletListClose, "ul");
                }
            }
            TagEnd::Item => {
                self.close_hidden();
                self.close(TokenKind::ListItemClose, "li");
            }
            TagEnd::Table => {
                if self.table.body_open {
                    self.close(TokenKind::TbodyClose, "tbody");
                }
                self.close(TokenKind::TableClose, "table");
                self.table = TableState::default();
            }
            TagEnd::TableHead => {
                self.close(TokenKind::TrClose, "tr");
                self.close(TokenKind::TheadClose, "thead");
                self.table.in_head = false;
            }
            TagEnd::TableRow => self.close(TokenKind::TrClose, "tr"),
            TagEnd::TableCell => {
                self.flush_run();
                if self.table.in_head {
                    self.close(TokenKind::ThClose, "th");
                } else {
                    self.close(TokenKind::TdClose, "td");
                }
                self.table.cell += 1;
            }
            TagEnd::FootnoteDefinition
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::MetadataBlock(_) => {}
        }
    }

    fn inline_event(&mut self, event: Event<'a>, range: Range<usize>) {
        let in_block = matches!(
            self.tokens.last().map(|t| t.kind),
            Some(
                TokenKind::ParagraphOpen
                    | TokenKind::HeadingOpen
                    | TokenKind::ThOpen
                    | TokenKind::TdOpen
            )
        );
        if !in_block && !self.hidden_open && self.run.is_empty() {
            // Tight list item content
            let mut token = Token::block(TokenKind::ParagraphOpen, "p", Nesting::Open);
            token.hidden = true;
            self.tokens.push(token);
            self.hidden_open = true;
        }
        self.run.push((event, range));
    }

    fn close_hidden(&mut self) {
        if self.hidden_open {
            self.flush_run();
            let mut token = Token::block(TokenKind::ParagraphClose, "p", Nesting::Close);
            token.hidden = true;
            self.tokens.push(token);
            self.hidden_open = false;
        }
    }

    /// Turn the collected inline events into one `inline` token
    fn flush_run(&mut self) {
        let events = std::mem::take(&mut self.run);
        let units = build_units(self.src, &events);

        let mut token = Token::new(TokenKind::Inline, "", Nesting::Leaf);
        token.content = run_content(self.src, &units);
        token.children = Some(match (units.first(), units.last()) {
            (Some(first), Some(last)) => {
                let mut state =
                    InlineState::new(self.src, first.start..last.end, &units, self.rules, self.env);
                state.tokenize();
                state.into_tokens()
            }
            _ => Vec::new(),
        });
        self.tokens.push(token);
    }

    fn open(&mut self, kind: TokenKind, tag: &'static str) {
        self.tokens.push(Token::block(kind, tag, Nesting::Open));
    }

    fn close(&mut self, kind: TokenKind, tag: &'static str) {
        self.tokens.push(Token::block(kind, tag, Nesting::Close));
    }

    fn finish(mut self) -> Vec<Token> {
        self.close_hidden();
        self.tokens
    }
}
