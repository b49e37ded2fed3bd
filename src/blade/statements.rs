//! Directive recognition
//!
//! Scans inline text for `@name` optionally followed by a parenthesised
//! argument list and hands every known directive to its handler. Argument
//! lists are matched by counting parentheses (quoted strings excluded) up
//! to a configured nesting depth.

use super::directives::Directives;
use super::state::CompileState;
use crate::error::{Error, Result};

/// Outcome of scanning an argument list that starts at `(`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentScan {
    /// Balanced list ending right before `end`, nesting `depth` levels
    Balanced { end: usize, depth: usize },
    /// Input ended before the list closed
    Unterminated,
}

/// Scan the argument list whose `(` sits at byte `open`
pub fn scan_arguments(text: &str, open: usize) -> ArgumentScan {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut index = open;

    while index < bytes.len() {
        let byte = bytes[index];

        if let Some(q) = quote {
            if byte == b'\\' {
                index += 1;
            } else if byte == q {
                quote = None;
            }
            index += 1;
            continue;
        }

        match byte {
            b'\'' | b'"' => quote = Some(byte),
            b'(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return ArgumentScan::Balanced {
                        end: index + 1,
                        depth: max_depth,
                    };
                }
            }
            _ => {}
        }
        index += 1;
    }

    ArgumentScan::Unterminated
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn preceded_by_word(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .map(|c| c.is_alphanumeric() || c == '_')
        .unwrap_or(false)
}

/// Compiles the directives of one inline text segment
pub struct StatementCompiler<'a> {
    directives: &'a Directives,
    max_depth: usize,
    strict_nesting: bool,
}

impl<'a> StatementCompiler<'a> {
    pub fn new(directives: &'a Directives, max_depth: usize, strict_nesting: bool) -> Self {
        Self {
            directives,
            max_depth,
            strict_nesting,
        }
    }

    pub fn compile(&self, text: &str, state: &mut CompileState) -> Result<String> {
        let bytes = text.as_bytes();
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut search_from = 0;

        while let Some(found) = text[search_from..].find('@') {
            let at = search_from + found;
            search_from = at + 1;

            if preceded_by_word(text, at) {
                // `a@@if` is plain text, the second `@` included
                if bytes.get(at + 1) == Some(&b'@') {
                    search_from = at + 2;
                }
                continue;
            }

            // `@@name` prints `@name` untouched
            let escaped = bytes.get(at + 1) == Some(&b'@');
            let name_start = if escaped { at + 2 } else { at + 1 };
            let name_len = bytes[name_start.min(bytes.len())..]
                .iter()
                .take_while(|b| is_word_byte(**b))
                .count();
            if name_len == 0 {
                continue;
            }

            let name_end = name_start + name_len;
            let name = &text[name_start..name_end];
            let spaces = bytes[name_end..]
                .iter()
                .take_while(|b| **b == b' ' || **b == b'\t')
                .count();
            let args_start = name_end + spaces;

            let arguments = if bytes.get(args_start) == Some(&b'(') {
                Some(scan_arguments(text, args_start))
            } else {
                None
            };

            if escaped {
                let end = match arguments {
                    Some(ArgumentScan::Balanced { end, .. }) => end,
                    _ => name_end,
                };
                result.push_str(&text[cursor..at]);
                result.push_str(&text[at + 1..end]);
                cursor = end;
                search_from = end;
                continue;
            }

            let handler = match self.directives.get(name) {
                Some(handler) => handler,
                None => {
                    // Unknown directives stay as written, arguments included
                    if let Some(ArgumentScan::Balanced { end, .. }) = arguments {
                        search_from = end;
                    }
                    continue;
                }
            };

            match arguments {
                None => {
                    log::trace!("Compiling @{}", name);
                    let compiled = handler(None, &mut *state)?;
                    result.push_str(&text[cursor..at]);
                    result.push_str(&compiled);
                    cursor = name_end;
                    search_from = name_end;
                }
                Some(ArgumentScan::Balanced { end, depth }) if depth <= self.max_depth => {
                    let expression = &text[args_start..end];
                    log::trace!("Compiling @{}{}", name, expression);
                    let compiled = handler(Some(expression), &mut *state)?;
                    result.push_str(&text[cursor..at]);
                    result.push_str(&compiled);
                    cursor = end;
                    search_from = end;
                }
                Some(ArgumentScan::Balanced { end, depth }) => {
                    if self.strict_nesting {
                        return Err(Error::DirectiveNesting {
                            name: name.to_string(),
                            depth,
                            limit: self.max_depth,
                        });
                    }
                    log::warn!(
                        "@{} arguments nest {} levels (limit {}), left uncompiled",
                        name,
                        depth,
                        self.max_depth
                    );
                    search_from = end;
                }
                Some(ArgumentScan::Unterminated) => {
                    log::warn!("@{} has an unterminated argument list, left uncompiled", name);
                    search_from = name_end;
                }
            }
        }

        result.push_str(&text[cursor..]);
        Ok(result)
    }
}
