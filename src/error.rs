use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the template compiler
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read template source '{}': {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Structural template errors
    #[error("@empty without an open @forelse")]
    UnmatchedEmpty,

    #[error("Raw block mismatch for '{placeholder}': {expected} stored, {found} placeholders found")]
    RawBlockMismatch {
        placeholder: String,
        expected: usize,
        found: usize,
    },

    #[error("Arguments of @{name} nest {depth} levels deep (limit {limit})")]
    DirectiveNesting {
        name: String,
        depth: usize,
        limit: usize,
    },

    #[error("Invalid echo tags: {0}")]
    InvalidTags(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    // Error with context chain
    #[error("{message}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_tags(msg: impl Into<String>) -> Self {
        Self::InvalidTags(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn source_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Wrap this error with an additional context message
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let context = context.into();
        Self::WithContext {
            message: format!("{}: {}", context, self),
            source: Box::new(self),
        }
    }

    /// True for errors raised by malformed template structure rather than
    /// by configuration or I/O
    pub fn is_structural(&self) -> bool {
        match self {
            Error::UnmatchedEmpty
            | Error::RawBlockMismatch { .. }
            | Error::DirectiveNesting { .. } => true,
            Error::WithContext { source, .. } => source.is_structural(),
            _ => false,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Io(_) => "E_IO",
            Error::Config(_) => "E_CONFIG",
            Error::SourceUnreadable { .. } => "E_SOURCE_UNREADABLE",
            Error::UnmatchedEmpty => "E_UNMATCHED_EMPTY",
            Error::RawBlockMismatch { .. } => "E_RAW_BLOCK_MISMATCH",
            Error::DirectiveNesting { .. } => "E_DIRECTIVE_NESTING",
            Error::InvalidTags(_) => "E_INVALID_TAGS",
            Error::Regex(_) => "E_REGEX",
            Error::Internal(_) => "E_INTERNAL",
            Error::WithContext { source, .. } => source.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::UnmatchedEmpty.error_code(), "E_UNMATCHED_EMPTY");
        assert_eq!(Error::config("bad").error_code(), "E_CONFIG");
    }

    #[test]
    fn test_context_keeps_code_and_kind() {
        let err = Error::UnmatchedEmpty.with_context("Compiling views/list.blade.php");
        assert_eq!(err.error_code(), "E_UNMATCHED_EMPTY");
        assert!(err.is_structural());
        assert_eq!(
            err.to_string(),
            "Compiling views/list.blade.php: @empty without an open @forelse"
        );
    }

    #[test]
    fn test_nesting_message() {
        let err = Error::DirectiveNesting {
            name: "if".to_string(),
            depth: 4,
            limit: 3,
        };
        assert_eq!(
            err.to_string(),
            "Arguments of @if nest 4 levels deep (limit 3)"
        );
    }
}
