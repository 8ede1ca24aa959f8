//! Low-level XML lexer producing positioned tokens.

use std::borrow::Cow;

use tracing::trace;

/// A lexical token with inclusive byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name ...>` or `<name .../>`. `start` is the `<`, `end` is the `>`.
    ElementOpen {
        name: String,
        start: usize,
        end: usize,
        self_closing: bool,
    },
    /// `name="value"` inside the most recent opening tag.
    Attribute {
        name: String,
        value: String,
        start: usize,
        end: usize,
    },
    /// Non-blank character data, trimmed. Offsets cover the trimmed text.
    Text {
        value: String,
        start: usize,
        end: usize,
    },
    /// `</name>`. `start` is the `<`, `end` is the `>`.
    ElementClose {
        name: String,
        start: usize,
        end: usize,
    },
}

impl Token {
    pub fn start(&self) -> usize {
        match self {
            Token::ElementOpen { start, .. }
            | Token::Attribute { start, .. }
            | Token::Text { start, .. }
            | Token::ElementClose { start, .. } => *start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Token::ElementOpen { end, .. }
            | Token::Attribute { end, .. }
            | Token::Text { end, .. }
            | Token::ElementClose { end, .. } => *end,
        }
    }
}

/// Split `text` into tokens.
///
/// Comments, processing instructions and `<!DOCTYPE>` are skipped, CDATA
/// sections become [`Token::Text`]. Lexing stops at the first unterminated
/// construct, so the tokens produced so far are still usable.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while self.pos < self.bytes.len() {
            let keep_going = if self.bytes[self.pos] == b'<' {
                self.markup()
            } else {
                self.text_run();
                true
            };
            if !keep_going {
                trace!("xml lexer stopped at unterminated markup, offset {}", self.pos);
                break;
            }
        }
        self.tokens
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn find_from(&self, from: usize, pattern: &str) -> Option<usize> {
        self.text[from..].find(pattern).map(|i| from + i)
    }

    /// Returns false when the markup is not terminated.
    fn markup(&mut self) -> bool {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            return self.skip_past(self.pos + 4, "-->");
        }
        if rest.starts_with("<![CDATA[") {
            let body_start = self.pos + 9;
            let Some(close) = self.find_from(body_start, "]]>") else {
                return false;
            };
            let body = &self.text[body_start..close];
            if !body.trim().is_empty() {
                self.tokens.push(Token::Text {
                    value: body.to_string(),
                    start: self.pos,
                    end: close + 2,
                });
            }
            self.pos = close + 3;
            return true;
        }
        if rest.starts_with("<?") {
            return self.skip_past(self.pos + 2, "?>");
        }
        if rest.starts_with("<!") {
            return self.skip_past(self.pos + 2, ">");
        }
        if rest.starts_with("</") {
            let Some(gt) = self.find_from(self.pos + 2, ">") else {
                return false;
            };
            let name = self.text[self.pos + 2..gt].trim().to_string();
            self.tokens.push(Token::ElementClose {
                name,
                start: self.pos,
                end: gt,
            });
            self.pos = gt + 1;
            return true;
        }
        self.open_tag()
    }

    fn skip_past(&mut self, from: usize, terminator: &str) -> bool {
        match self.find_from(from, terminator) {
            Some(i) => {
                self.pos = i + terminator.len();
                true
            }
            None => false,
        }
    }

    fn open_tag(&mut self) -> bool {
        let start = self.pos;
        let Some(gt) = self.tag_end(start + 1) else {
            // half-typed tag, resume at the next markup if there is any
            return match self.find_from(start + 1, "<") {
                Some(next) => {
                    self.pos = next;
                    true
                }
                None => false,
            };
        };

        let name_start = start + 1;
        let mut name_end = name_start;
        while name_end < gt && !is_name_terminator(self.bytes[name_end]) {
            name_end += 1;
        }
        if name_end == name_start {
            // a stray `<`, keep it as text
            self.push_text(start, gt + 1);
            self.pos = gt + 1;
            return true;
        }

        let self_closing = self.text[name_end..gt].trim_end().ends_with('/');
        self.tokens.push(Token::ElementOpen {
            name: self.text[name_start..name_end].to_string(),
            start,
            end: gt,
            self_closing,
        });
        self.attributes(name_end, gt);
        self.pos = gt + 1;
        true
    }

    /// Find the `>` closing a tag, ignoring any inside quoted attribute values.
    fn tag_end(&self, from: usize) -> Option<usize> {
        let mut quote: Option<u8> = None;
        for (i, &b) in self.bytes[from..].iter().enumerate() {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => return Some(from + i),
                None if b == b'<' => return None,
                None => {}
            }
        }
        None
    }

    fn attributes(&mut self, mut i: usize, end: usize) {
        while i < end {
            while i < end && (self.bytes[i].is_ascii_whitespace() || self.bytes[i] == b'/') {
                i += 1;
            }
            if i >= end {
                break;
            }
            let name_start = i;
            while i < end
                && self.bytes[i] != b'='
                && !self.bytes[i].is_ascii_whitespace()
                && self.bytes[i] != b'/'
            {
                i += 1;
            }
            let name = self.text[name_start..i].to_string();
            while i < end && self.bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= end || self.bytes[i] != b'=' {
                // attribute without a value
                self.tokens.push(Token::Attribute {
                    name,
                    value: String::new(),
                    start: name_start,
                    end: i.saturating_sub(1).max(name_start),
                });
                continue;
            }
            i += 1;
            while i < end && self.bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= end {
                break;
            }
            let quote = self.bytes[i];
            if quote != b'"' && quote != b'\'' {
                let value_start = i;
                while i < end && !self.bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                self.tokens.push(Token::Attribute {
                    name,
                    value: decode(&self.text[value_start..i]).into_owned(),
                    start: name_start,
                    end: i - 1,
                });
                continue;
            }
            let value_start = i + 1;
            let value_end = self.bytes[value_start..end]
                .iter()
                .position(|&b| b == quote)
                .map(|p| value_start + p)
                .unwrap_or(end);
            self.tokens.push(Token::Attribute {
                name,
                value: decode(&self.text[value_start..value_end]).into_owned(),
                start: name_start,
                end: value_end.min(end - 1),
            });
            i = value_end + 1;
        }
    }

    fn text_run(&mut self) {
        let start = self.pos;
        let end = self
            .bytes
            .iter()
            .skip(start)
            .position(|&b| b == b'<')
            .map(|p| start + p)
            .unwrap_or(self.bytes.len());
        self.push_text(start, end);
        self.pos = end;
    }

    /// Push the trimmed text in `[from, to)`, unless it is blank.
    fn push_text(&mut self, from: usize, to: usize) {
        let raw = &self.text[from..to];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        let start = from + (raw.len() - raw.trim_start().len());
        let end = start + trimmed.len() - 1;
        self.tokens.push(Token::Text {
            value: decode(trimmed).into_owned(),
            start,
            end,
        });
    }
}

fn is_name_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Decode entity references, keeping the raw text when it is not valid.
fn decode(raw: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw))
}
