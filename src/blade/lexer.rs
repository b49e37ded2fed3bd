//! Splits a template into inline text and embedded PHP code islands
//!
//! Only inline text goes through the directive and echo passes, so directive
//! look-alikes inside hand-written `<?php ... ?>` code are never rewritten.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Template markup, compiled by the passes
    InlineText,
    /// Host code between `<?php` / `<?=` and `?>`, emitted unchanged
    CodeIsland,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
    /// Line the segment starts on
    pub line: usize,
}

impl Segment {
    pub fn new(kind: SegmentKind, content: String, line: usize) -> Self {
        Self {
            kind,
            content,
            line,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at line {}", self.kind, self.line)
    }
}

/// Lexer for template source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Move one character forward, appending it to `buffer`
    fn advance_into(&mut self, buffer: &mut String) {
        if let Some(ch) = self.current() {
            if ch == '\n' {
                self.line += 1;
            }
            buffer.push(ch);
            self.position += 1;
        }
    }

    fn starts_with(&self, pattern: &str) -> bool {
        let mut offset = self.position;
        for expected in pattern.chars() {
            match self.input.get(offset) {
                Some(ch) if ch.eq_ignore_ascii_case(&expected) => offset += 1,
                _ => return false,
            }
        }
        true
    }

    /// `<?=` or `<?php` followed by whitespace or end of input
    fn at_open_tag(&self) -> bool {
        if self.starts_with("<?=") {
            return true;
        }
        if self.starts_with("<?php") {
            return match self.input.get(self.position + 5) {
                None => true,
                Some(ch) => ch.is_whitespace(),
            };
        }
        false
    }

    fn read_inline(&mut self) -> Segment {
        let line = self.line;
        let mut content = String::new();

        while self.current().is_some() && !self.at_open_tag() {
            self.advance_into(&mut content);
        }

        Segment::new(SegmentKind::InlineText, content, line)
    }

    fn read_code_island(&mut self) -> Segment {
        let line = self.line;
        let mut content = String::new();

        let tag_len = if self.starts_with("<?=") { 3 } else { 5 };
        for _ in 0..tag_len {
            self.advance_into(&mut content);
        }

        while let Some(ch) = self.current() {
            match ch {
                '\'' | '"' => self.read_quoted(ch, &mut content),
                '/' if self.peek() == Some('*') => self.read_block_comment(&mut content),
                '/' if self.peek() == Some('/') => self.read_line_comment(&mut content),
                '#' => self.read_line_comment(&mut content),
                '?' if self.peek() == Some('>') => {
                    self.advance_into(&mut content);
                    self.advance_into(&mut content);
                    // The newline right after a close tag belongs to it
                    if self.starts_with("\r\n") {
                        self.advance_into(&mut content);
                        self.advance_into(&mut content);
                    } else if self.current() == Some('\n') {
                        self.advance_into(&mut content);
                    }
                    break;
                }
                _ => self.advance_into(&mut content),
            }
        }

        Segment::new(SegmentKind::CodeIsland, content, line)
    }

    fn read_quoted(&mut self, quote: char, content: &mut String) {
        self.advance_into(content);
        while let Some(ch) = self.current() {
            self.advance_into(content);
            if ch == '\\' {
                self.advance_into(content);
            } else if ch == quote {
                break;
            }
        }
    }

    fn read_block_comment(&mut self, content: &mut String) {
        self.advance_into(content);
        self.advance_into(content);
        while self.current().is_some() {
            if self.starts_with("*/") {
                self.advance_into(content);
                self.advance_into(content);
                break;
            }
            self.advance_into(content);
        }
    }

    /// Line comments stop at a newline or right before `?>`
    fn read_line_comment(&mut self, content: &mut String) {
        while let Some(ch) = self.current() {
            if ch == '\n' || self.starts_with("?>") {
                break;
            }
            self.advance_into(content);
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<Segment> {
        let mut segments = Vec::new();

        while self.current().is_some() {
            let segment = if self.at_open_tag() {
                self.read_code_island()
            } else {
                self.read_inline()
            };
            segments.push(segment);
        }

        segments
    }
}

/// Split `input` into inline text and code island segments
pub fn tokenize(input: &str) -> Vec<Segment> {
    Lexer::new(input).tokenize()
}
