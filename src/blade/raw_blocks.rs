//! Extraction of regions that must bypass every compile pass
//!
//! `@verbatim ... @endverbatim` content is swapped for a placeholder before
//! lexing and put back untouched once the template is compiled. Raw
//! `@php ... @endphp` blocks use the same mechanism so their statements are
//! never reprocessed.

use crate::error::{Error, Result};

// Delimited by U+0001 so no directive or echo pattern can touch them
pub const VERBATIM_PLACEHOLDER: &str = "\u{1}__verbatim__\u{1}";
pub const PHP_PLACEHOLDER: &str = "\u{1}__php__\u{1}";
pub const ECHO_PLACEHOLDER: &str = "\u{1}__echo__\u{1}";

/// Finds `open ... close` regions and replaces them with a placeholder
#[derive(Debug, Clone)]
pub struct BlockExtractor {
    open: &'static str,
    close: &'static str,
    placeholder: &'static str,
    kind: BlockKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Verbatim,
    Php,
}

impl BlockExtractor {
    pub fn verbatim() -> Self {
        Self {
            open: "@verbatim",
            close: "@endverbatim",
            placeholder: VERBATIM_PLACEHOLDER,
            kind: BlockKind::Verbatim,
        }
    }

    pub fn php() -> Self {
        Self {
            open: "@php",
            close: "@endphp",
            placeholder: PHP_PLACEHOLDER,
            kind: BlockKind::Php,
        }
    }

    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    /// Swap every block for the placeholder, pushing its content to `blocks`
    pub fn extract(&self, text: &str, blocks: &mut Vec<String>) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut search_from = 0;

        while let Some(found) = text[search_from..].find(self.open) {
            let start = search_from + found;
            let body_start = start + self.open.len();
            search_from = body_start;

            if !self.is_opening_marker(text, start) {
                continue;
            }

            let body_end = match text[body_start..].find(self.close) {
                Some(offset) => body_start + offset,
                None => {
                    log::warn!(
                        "Unterminated {} block left as text at byte {}",
                        self.open,
                        start
                    );
                    break;
                }
            };

            let body = &text[body_start..body_end];
            blocks.push(match self.kind {
                BlockKind::Verbatim => body.to_string(),
                BlockKind::Php => format!("<?php{}?>", body),
            });
            result.push_str(&text[cursor..start]);
            result.push_str(self.placeholder);

            cursor = body_end + self.close.len();
            search_from = cursor;
        }

        result.push_str(&text[cursor..]);
        result
    }

    fn is_opening_marker(&self, text: &str, start: usize) -> bool {
        // `@@verbatim` is an escaped marker
        if text[..start].ends_with('@') {
            return false;
        }

        let rest = &text[start + self.open.len()..];
        match rest.chars().next() {
            // `@verbatimly` is some other word
            Some(c) if c.is_alphanumeric() || c == '_' => false,
            // `@php(...)` and `@php (...)` are the inline statement form
            _ if self.kind == BlockKind::Php => {
                !rest.trim_start_matches([' ', '\t']).starts_with('(')
            }
            _ => true,
        }
    }

    /// Put stored blocks back in first-in first-out order and drain them
    pub fn restore(&self, text: &str, blocks: &mut Vec<String>) -> Result<String> {
        restore_blocks(self.placeholder, text, blocks)
    }
}

/// Replace each `placeholder` in `text` with the next stored block
///
/// The number of placeholders must equal the number of blocks; anything else
/// means a pass dropped or duplicated a placeholder.
pub fn restore_blocks(placeholder: &str, text: &str, blocks: &mut Vec<String>) -> Result<String> {
    let found = text.matches(placeholder).count();
    if found != blocks.len() {
        return Err(Error::RawBlockMismatch {
            placeholder: placeholder.escape_default().to_string(),
            expected: blocks.len(),
            found,
        });
    }

    if found == 0 {
        return Ok(text.to_string());
    }

    let mut pieces = text.split(placeholder);
    let mut result = String::with_capacity(text.len());
    if let Some(first) = pieces.next() {
        result.push_str(first);
    }
    for (block, piece) in blocks.drain(..).zip(pieces) {
        result.push_str(&block);
        result.push_str(piece);
    }

    Ok(result)
}
