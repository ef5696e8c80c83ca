//! Lexical pass over YAML text that finds scalar values and decodes their
//! quoting.
//!
//! It runs without the YAML loader, so it also covers documents the loader
//! rejects. Comments are skipped; plain, quoted and block scalars are
//! reported with the byte range of their content.

use super::embedded::closing_brace;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawScalar {
    pub style: ScalarStyle,
    /// Content only, quotes and block headers excluded.
    pub span: Span,
}

/// Scalar text after YAML unquoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Decoded {
    pub text: String,
    /// Document offset each byte of `text` came from, plus one entry for the
    /// end of the scalar.
    pub offsets: Vec<usize>,
    // Bytes before this index came from escapes and survive line folding
    kept: usize,
}

impl Decoded {
    fn new() -> Self {
        Decoded {
            text: String::new(),
            offsets: Vec::new(),
            kept: 0,
        }
    }

    fn push_verbatim(&mut self, ch: char, at: usize) {
        self.offsets.extend((0..ch.len_utf8()).map(|k| at + k));
        self.text.push(ch);
    }

    fn push_escaped(&mut self, ch: char, at: usize) {
        self.offsets.extend((0..ch.len_utf8()).map(|_| at));
        self.text.push(ch);
        self.kept = self.text.len();
    }

    fn trim_trailing_blanks(&mut self) {
        while self.text.len() > self.kept && self.text.ends_with([' ', '\t']) {
            self.text.pop();
            self.offsets.pop();
        }
    }
}

impl RawScalar {
    pub fn decode(&self, text: &str) -> Decoded {
        let raw = &text[self.span.start..self.span.end];
        let base = self.span.start;
        let mut out = Decoded::new();

        match self.style {
            ScalarStyle::Plain | ScalarStyle::Block => {
                out.text = raw.to_string();
                out.offsets = (base..self.span.end).collect();
            }
            ScalarStyle::SingleQuoted => decode_single(raw, base, &mut out),
            ScalarStyle::DoubleQuoted => decode_double(raw, base, &mut out),
        }
        out.offsets.push(self.span.end);
        out
    }
}

fn decode_single(raw: &str, base: usize, out: &mut Decoded) {
    let mut i = 0;
    while let Some(ch) = raw[i..].chars().next() {
        match ch {
            '\'' if raw[i + 1..].starts_with('\'') => {
                out.push_escaped('\'', base + i);
                i += 2;
            }
            '\n' | '\r' => i = fold(raw, i, base, out),
            _ => {
                out.push_verbatim(ch, base + i);
                i += ch.len_utf8();
            }
        }
    }
}

fn decode_double(raw: &str, base: usize, out: &mut Decoded) {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while let Some(ch) = raw[i..].chars().next() {
        match ch {
            '\\' => match raw[i + 1..].chars().next() {
                // Escaped line break: the lines join without a space
                Some('\n' | '\r') => {
                    i += 1;
                    while matches!(bytes.get(i), Some(b'\r' | b'\n')) {
                        i += 1;
                        if bytes.get(i - 1) == Some(&b'\n') {
                            break;
                        }
                    }
                    while matches!(bytes.get(i), Some(b' ' | b'\t')) {
                        i += 1;
                    }
                    out.kept = out.text.len();
                }
                Some(next) => match escape(raw, i + 1, next) {
                    Some((decoded, len)) => {
                        out.push_escaped(decoded, base + i);
                        i += 1 + len;
                    }
                    None => {
                        out.push_verbatim('\\', base + i);
                        i += 1;
                    }
                },
                None => {
                    out.push_verbatim('\\', base + i);
                    i += 1;
                }
            },
            '\n' | '\r' => i = fold(raw, i, base, out),
            _ => {
                out.push_verbatim(ch, base + i);
                i += ch.len_utf8();
            }
        }
    }
}

/// The character a double-quoted escape stands for and the length of the
/// escape after its backslash.
fn escape(raw: &str, at: usize, ch: char) -> Option<(char, usize)> {
    let simple = match ch {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0b',
        'f' => '\x0c',
        'r' => '\r',
        'e' => '\x1b',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{a0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        'x' | 'u' | 'U' => {
            let digits = match ch {
                'x' => 2,
                'u' => 4,
                _ => 8,
            };
            let hex = raw.get(at + 1..at + 1 + digits)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?;
            return Some((decoded, 1 + digits));
        }
        _ => return None,
    };
    Some((simple, ch.len_utf8()))
}

/// Folds a line break inside a quoted scalar. Blanks around it go; a single
/// break becomes a space and every further empty line a newline.
fn fold(raw: &str, at: usize, base: usize, out: &mut Decoded) -> usize {
    out.trim_trailing_blanks();
    let bytes = raw.as_bytes();
    let mut i = at;
    let mut breaks = 0;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\n' => breaks += 1,
            b' ' | b'\t' | b'\r' => {}
            _ => break,
        }
        i += 1;
    }
    if breaks <= 1 {
        out.push_escaped(' ', base + at);
    } else {
        for _ in 1..breaks {
            out.push_escaped('\n', base + at);
        }
    }
    i
}

/// Every scalar value in `text`, in document order.
pub(crate) fn scan(text: &str) -> Vec<RawScalar> {
    let mut scanner = Scanner {
        bytes: text.as_bytes(),
        pos: 0,
        flow_depth: 0,
        token_start: true,
        found: Vec::new(),
    };
    scanner.run();
    scanner.found
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    flow_depth: usize,
    // A quote, block indicator or collection opener here starts a node
    token_start: bool,
    found: Vec<RawScalar>,
}

impl Scanner<'_> {
    fn byte(&self, at: usize) -> Option<u8> {
        self.bytes.get(at).copied()
    }

    fn blank_at(&self, at: usize) -> bool {
        matches!(self.byte(at), None | Some(b' ' | b'\t' | b'\r' | b'\n'))
    }

    fn line_end(&self, from: usize) -> usize {
        self.bytes[from..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.bytes.len(), |n| from + n)
    }

    fn indent_of_line(&self, at: usize) -> usize {
        let start = self.bytes[..at]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |n| n + 1);
        self.bytes[start..].iter().take_while(|&&b| b == b' ').count()
    }

    fn push(&mut self, style: ScalarStyle, start: usize, end: usize) {
        self.found.push(RawScalar {
            style,
            span: Span::new(start, end),
        });
    }

    fn run(&mut self) {
        while let Some(b) = self.byte(self.pos) {
            match b {
                b'\n' => {
                    self.pos += 1;
                    self.token_start = true;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'#' if self.pos == 0 || self.blank_at(self.pos - 1) => {
                    self.pos = self.line_end(self.pos);
                }
                b'"' | b'\'' if self.token_start => self.quoted(b),
                b'|' | b'>' if self.token_start && self.flow_depth == 0 => self.block(),
                b'-' | b'?' if self.token_start && self.blank_at(self.pos + 1) => self.pos += 1,
                b':' if self.flow_depth > 0 || self.blank_at(self.pos + 1) => {
                    self.pos += 1;
                    self.token_start = true;
                }
                b'[' | b'{' if self.token_start => {
                    self.flow_depth += 1;
                    self.pos += 1;
                }
                b']' | b'}' if self.flow_depth > 0 => {
                    self.flow_depth -= 1;
                    self.pos += 1;
                    self.token_start = false;
                }
                b',' if self.flow_depth > 0 => {
                    self.pos += 1;
                    self.token_start = true;
                }
                // Anchor or tag in front of a node
                b'&' | b'!' if self.token_start => {
                    while !self.blank_at(self.pos) {
                        self.pos += 1;
                    }
                }
                _ => self.plain(),
            }
        }
    }

    /// Single- or double-quoted scalar. Without a closing quote it ends at
    /// the end of its first line.
    fn quoted(&mut self, quote: u8) {
        let start = self.pos + 1;
        let mut i = start;
        let close = loop {
            match self.byte(i) {
                None => break None,
                Some(b'\\') if quote == b'"' => i += 2,
                Some(b) if b == quote => {
                    if quote == b'\'' && self.byte(i + 1) == Some(b'\'') {
                        i += 2;
                    } else {
                        break Some(i);
                    }
                }
                Some(_) => i += 1,
            }
        };

        let style = if quote == b'"' {
            ScalarStyle::DoubleQuoted
        } else {
            ScalarStyle::SingleQuoted
        };
        match close {
            Some(close) => {
                self.push(style, start, close);
                self.pos = close + 1;
            }
            None => {
                let line_end = self.line_end(start);
                let end = if line_end > start && self.bytes[line_end - 1] == b'\r' {
                    line_end - 1
                } else {
                    line_end
                };
                self.push(style, start, end);
                self.pos = line_end;
            }
        }
        self.token_start = false;
    }

    /// `|` or `>` scalar: every following line indented deeper than the
    /// header's line, blank lines included.
    fn block(&mut self) {
        let indent = self.indent_of_line(self.pos);
        let header_end = self.line_end(self.pos);
        let start = (header_end + 1).min(self.bytes.len());
        let mut line = start;
        let mut end = start;

        while line < self.bytes.len() {
            let line_end = self.line_end(line);
            let content = &self.bytes[line..line_end];
            let spaces = content.iter().take_while(|&&b| b == b' ').count();
            let blank = content.iter().all(u8::is_ascii_whitespace);
            if !blank && spaces <= indent {
                break;
            }
            if !blank {
                end = line_end;
            }
            line = line_end + 1;
        }

        if end > start {
            self.push(ScalarStyle::Block, start, end);
        }
        self.pos = line.min(self.bytes.len());
        self.token_start = true;
    }

    /// Plain scalar up to a comment, a `: ` or the end of the line. A
    /// `${...}` region is taken whole, so `${a ? b : c}` stays one scalar.
    fn plain(&mut self) {
        let start = self.pos;
        let line_end = self.line_end(start);
        let mut i = start;
        let mut end = start;

        while i < line_end {
            match self.bytes[i] {
                b'$' if self.byte(i + 1) == Some(b'{') => {
                    i = closing_brace(self.bytes, i + 2, line_end).map_or(line_end, |close| close + 1);
                    end = i;
                    continue;
                }
                b'#' if i > start && self.blank_at(i - 1) => break,
                b':' if self.blank_at(i + 1) => break,
                b',' | b'[' | b']' | b'{' | b'}' if self.flow_depth > 0 => break,
                b' ' | b'\t' | b'\r' => {}
                _ => end = i + 1,
            }
            i += 1;
        }

        if end > start {
            self.push(ScalarStyle::Plain, start, end);
        }
        self.pos = i.max(start + 1);
        self.token_start = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str) -> Vec<String> {
        scan(text).iter().map(|s| s.decode(text).text).collect()
    }

    #[test]
    fn test_comments_are_skipped() {
        let text = "# ${a}\nkey: value # ${b}\nurl: http://x#y\n";
        assert_eq!(values(text), vec!["key", "value", "url", "http://x#y"]);
    }

    #[test]
    fn test_double_quoted_escapes() {
        let text = r#"k: "a \"b\" \\ A\tc""#;
        let scalars = scan(text);
        let decoded = scalars[1].decode(text);
        assert_eq!(decoded.text, "a \"b\" \\ A\tc");

        // The decoded quote maps back to its backslash
        let quote = decoded.text.find('"').unwrap();
        assert_eq!(&text[decoded.offsets[quote]..decoded.offsets[quote] + 2], "\\\"");
        assert_eq!(*decoded.offsets.last().unwrap(), text.len() - 1);
    }

    #[test]
    fn test_single_quoted_doubling() {
        let text = "k: 'it''s'";
        assert_eq!(values(text), vec!["k", "it's"]);
    }

    #[test]
    fn test_quoted_line_folding() {
        let text = "k: \"a\n    b\n\n    c\"";
        assert_eq!(values(text), vec!["k", "a b\nc"]);
    }

    #[test]
    fn test_block_scalar_extent() {
        let text = "a: |\n  one ${x}\n  two\nb: c\n";
        let scalars = scan(text);
        assert_eq!(scalars[1].style, ScalarStyle::Block);
        assert_eq!(scalars[1].decode(text).text, "  one ${x}\n  two");
        assert_eq!(&values(text)[2..], &["b", "c"]);
    }

    #[test]
    fn test_flow_collections() {
        let text = "k: [a, \"${b}\", {c: d}]";
        assert_eq!(values(text), vec!["k", "a", "${b}", "c", "d"]);
    }

    #[test]
    fn test_plain_expression_spans_colon() {
        let text = "- log: ${a ? b : c} # done";
        assert_eq!(values(text), vec!["log", "${a ? b : c}"]);
    }
}
