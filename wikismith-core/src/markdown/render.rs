//! HTML output for token streams.

use super::token::{Nesting, Token, TokenKind};

/// Render a block-level token stream to HTML
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();

    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Inline => {
                render_inline(token.children.as_deref().unwrap_or_default(), &mut out)
            }
            TokenKind::CodeBlock => {
                out.push_str("<pre><code>");
                out.push_str(&escape_html(&token.content));
                out.push_str("</code></pre>\n");
            }
            TokenKind::Fence => render_fence(token, &mut out),
            TokenKind::HtmlBlock => out.push_str(&token.content),
            _ => render_token(tokens, idx, &mut out),
        }
    }

    out
}

/// Render inline tokens (the children of an `inline` token)
pub fn render_inline(tokens: &[Token], out: &mut String) {
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Text => out.push_str(&escape_html(&token.content)),
            TokenKind::CodeInline => {
                out.push_str("<code");
                render_attrs(token, out);
                out.push('>');
                out.push_str(&escape_html(&token.content));
                out.push_str("</code>");
            }
            TokenKind::HtmlInline => out.push_str(&token.content),
            TokenKind::Softbreak => out.push('\n'),
            TokenKind::Hardbreak => out.push_str("<br>\n"),
            _ => render_token(tokens, idx, out),
        }
    }
}

fn render_fence(token: &Token, out: &mut String) {
    let lang = token.info.split_whitespace().next().unwrap_or_default();
    out.push_str("<pre><code");
    if !lang.is_empty() {
        out.push_str(" class=\"language-");
        out.push_str(&escape_html(lang));
        out.push('"');
    }
    out.push('>');
    out.push_str(&escape_html(&token.content));
    out.push_str("</code></pre>\n");
}

/// Generic tag output. Block tokens get a line break after the tag unless an
/// opening tag is directly followed by its inline content or its own closing
/// tag.
fn render_token(tokens: &[Token], idx: usize, out: &mut String) {
    let token = &tokens[idx];
    if token.hidden {
        return;
    }

    // Separate a hidden paragraph from a following block tag
    if token.block && token.nesting != Nesting::Close && idx > 0 && tokens[idx - 1].hidden {
        out.push('\n');
    }

    out.push_str(if token.nesting == Nesting::Close { "</" } else { "<" });
    out.push_str(token.tag);
    render_attrs(token, out);

    let mut need_lf = false;
    if token.block {
        need_lf = true;
        if token.nesting == Nesting::Open {
            if let Some(next) = tokens.get(idx + 1) {
                if next.kind == TokenKind::Inline || next.hidden {
                    need_lf = false;
                } else if next.nesting == Nesting::Close && next.tag == token.tag {
                    need_lf = false;
                }
            }
        }
    }

    out.push_str(if need_lf { ">\n" } else { ">" });
}

fn render_attrs(token: &Token, out: &mut String) {
    for (name, value) in &token.attrs {
        out.push(' ');
        out.push_str(&escape_html(name));
        out.push_str("=\"");
        out.push_str(&escape_html(value));
        out.push('"');
    }
}

/// Escape text for HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
