use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Mutable state of a single compile call
///
/// Created fresh by every `compile_string` / `compile` invocation and
/// dropped once the output string is produced.
#[derive(Debug, Default)]
pub struct CompileState {
    forelse_counter: usize,
    footer: Vec<String>,
    pub(crate) verbatim_blocks: Vec<String>,
    pub(crate) php_blocks: Vec<String>,
    pub(crate) echo_literals: Vec<String>,
    current_path: Option<PathBuf>,
}

impl CompileState {
    pub fn new(current_path: Option<PathBuf>) -> Self {
        Self {
            current_path,
            ..Self::default()
        }
    }

    /// Path of the template being compiled, if it came from a file
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Open a `@forelse` and return the suffix of its empty flag
    pub fn open_forelse(&mut self) -> usize {
        self.forelse_counter += 1;
        self.forelse_counter
    }

    /// Reach the `@empty` of the innermost open `@forelse`
    pub fn close_forelse(&mut self) -> Result<usize> {
        if self.forelse_counter == 0 {
            return Err(Error::UnmatchedEmpty);
        }
        let suffix = self.forelse_counter;
        self.forelse_counter -= 1;
        Ok(suffix)
    }

    pub fn open_forelse_count(&self) -> usize {
        self.forelse_counter
    }

    /// Queue a statement to run after the template body
    pub fn push_footer(&mut self, code: String) {
        self.footer.push(code);
    }

    pub fn footer(&self) -> &[String] {
        &self.footer
    }

    /// Append the footer to the compiled body, latest registration first
    pub(crate) fn apply_footer(&self, body: String) -> String {
        if self.footer.is_empty() {
            return body;
        }

        let mut result = body.trim_start_matches(['\r', '\n']).to_string();
        let footer: Vec<&str> = self.footer.iter().rev().map(String::as_str).collect();
        result.push('\n');
        result.push_str(&footer.join("\n"));
        result
    }
}
