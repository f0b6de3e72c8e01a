//! Message markup handling: sanitizing remote HTML and turning it into
//! styled terminal lines.
//!
//! Remote message bodies are untrusted. They pass through three steps before
//! they reach the screen:
//! - one leading line-break tag is removed
//! - the markup is cleaned with `ammonia` (scripts, event handlers and other
//!   dangerous markup are dropped, benign formatting is kept)
//! - the cleaned markup is flattened into `ratatui` lines, with any terminal
//!   control characters removed from the text

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

/// Removes exactly one `<br>`, `<br/>` or `<br />` (any case) at the very
/// start of `input`.
pub fn strip_leading_break(input: &str) -> &str {
    let bytes = input.as_bytes();
    if bytes.len() < 4 || !bytes[..3].eq_ignore_ascii_case(b"<br") {
        return input;
    }
    let mut pos = 3;
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'/' {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'>' {
        &input[pos + 1..]
    } else {
        input
    }
}

/// Cleans untrusted markup. Idempotent.
pub fn sanitize_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Leading break removal followed by sanitizing.
pub fn clean_message(raw: &str) -> String {
    sanitize_html(strip_leading_break(raw))
}

/// Renders a raw message body as styled terminal lines.
pub fn message_lines(raw: &str) -> Vec<Line<'static>> {
    markup_to_lines(&clean_message(raw))
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    bold: usize,
    italic: usize,
    underline: usize,
}

impl LineBuilder {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.underline > 0 {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        style
    }

    fn text(&mut self, text: &str) {
        let text = strip_control(text);
        if text.is_empty() {
            return;
        }
        let style = self.style();
        self.spans.push(Span::styled(text, style));
    }

    fn line_is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.content.trim().is_empty())
    }

    fn hard_break(&mut self) {
        let spans = std::mem::take(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn soft_break(&mut self) {
        if !self.line_is_empty() {
            self.hard_break();
        } else {
            self.spans.clear();
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.spans.is_empty() {
            self.hard_break();
        }
        while self
            .lines
            .last()
            .is_some_and(|l| l.spans.iter().all(|s| s.content.trim().is_empty()))
        {
            self.lines.pop();
        }
        self.lines
    }

    fn tag(&mut self, name: &str, closing: bool) {
        let counter = match name {
            "b" | "strong" => Some(&mut self.bold),
            "i" | "em" => Some(&mut self.italic),
            "u" | "ins" => Some(&mut self.underline),
            _ => None,
        };
        if let Some(counter) = counter {
            if closing {
                *counter = counter.saturating_sub(1);
            } else {
                *counter += 1;
            }
            return;
        }
        match name {
            "br" => self.hard_break(),
            "li" if !closing => {
                self.soft_break();
                self.text("• ");
            }
            "p" | "div" | "li" | "tr" | "ul" | "ol" | "blockquote" | "pre" | "h1" | "h2"
            | "h3" | "h4" | "h5" | "h6" => self.soft_break(),
            _ => {}
        }
    }
}

/// Flattens (already sanitized) markup into styled lines.
pub fn markup_to_lines(markup: &str) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::default();
    let mut rest = markup;

    while !rest.is_empty() {
        match rest.find('<') {
            Some(0) => {
                let Some(end) = rest.find('>') else {
                    builder.text(&decode_entities(rest));
                    break;
                };
                let inner = &rest[1..end];
                let closing = inner.starts_with('/');
                let name: String = inner
                    .trim_start_matches('/')
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                builder.tag(&name, closing);
                rest = &rest[end + 1..];
            }
            Some(idx) => {
                builder.text(&decode_entities(&rest[..idx]));
                rest = &rest[idx..];
            }
            None => {
                builder.text(&decode_entities(rest));
                break;
            }
        }
    }

    builder.finish()
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let chr = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            chr.map(|c| (c, end))
        });
        match decoded {
            Some((chr, end)) => {
                out.push(chr);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// Markup whitespace becomes a space, every other control character (ESC
// included) is dropped.
fn strip_control(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}
