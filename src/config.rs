use crate::error::{Error, Result};
use crate::utils::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Opening and closing delimiter of an echo placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub open: String,
    pub close: String,
}

impl TagPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Compiler configuration
///
/// Loaded once and handed to [`crate::BladeCompiler::with_config`]; the
/// compiler never reads global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Directory that receives compiled artifacts (None disables caching)
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    #[serde(default = "default_compiled_extension")]
    pub compiled_extension: String,

    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    /// Unescaped echo tags
    #[serde(default = "default_content_tags")]
    pub content_tags: TagPair,

    /// Escaped echo tags
    #[serde(default = "default_escaped_tags")]
    pub escaped_tags: TagPair,

    /// Wrapper applied to escaped echoes, `%s` is the expression
    #[serde(default = "default_echo_format")]
    pub echo_format: String,

    /// Parenthesis levels accepted in directive arguments, outer list included
    #[serde(default = "default_max_directive_depth")]
    pub max_directive_depth: usize,

    /// Fail instead of passing through known directives nested too deeply
    #[serde(default = "default_strict_nesting")]
    pub strict_nesting: bool,
}

fn default_compiled_extension() -> String {
    ".php".to_string()
}

fn default_content_tags() -> TagPair {
    TagPair::new("{{", "}}")
}

fn default_escaped_tags() -> TagPair {
    TagPair::new("{{{", "}}}")
}

fn default_echo_format() -> String {
    "e(%s)".to_string()
}

fn default_max_directive_depth() -> usize {
    3
}

fn default_strict_nesting() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            compiled_extension: default_compiled_extension(),
            hash_algorithm: HashAlgorithm::default(),
            content_tags: default_content_tags(),
            escaped_tags: default_escaped_tags(),
            echo_format: default_echo_format(),
            max_directive_depth: default_max_directive_depth(),
            strict_nesting: default_strict_nesting(),
        }
    }
}

impl CompilerConfig {
    /// Default configuration caching compiled artifacts under `cache_path`
    pub fn with_cache_path(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: Some(cache_path.into()),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    #[cfg(feature = "config")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let content = std::fs::read_to_string(path_ref).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}. Make sure the file exists and is readable.",
                path_ref.display(),
                e
            ))
        })?;

        let mut config = Self::from_toml_str(&content)
            .map_err(|e| e.with_context(format!("Loading '{}'", path_ref.display())))?;

        // Relative cache directories are resolved against the config file
        if let (Some(cache), Some(parent)) = (config.cache_path.as_ref(), path_ref.parent()) {
            if cache.is_relative() {
                config.cache_path = Some(parent.join(cache));
            }
        }

        log::debug!(
            "Successfully loaded compiler configuration from: {}",
            path_ref.display()
        );
        Ok(config)
    }

    /// Parse configuration from TOML text and validate it
    #[cfg(feature = "config")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CompilerConfig = toml::from_str(content).map_err(|e| {
            Error::config(format!("Failed to parse compiler configuration: {}. Check TOML syntax.", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration with environment variable overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BLADE_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = env::var("BLADE_CACHE_PATH") {
            self.cache_path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }

        if let Ok(ext) = env::var("BLADE_COMPILED_EXTENSION") {
            self.compiled_extension = ext;
        }

        if let Ok(algorithm) = env::var("BLADE_HASH_ALGORITHM") {
            self.hash_algorithm = algorithm
                .parse::<HashAlgorithm>()
                .map_err(|e| e.with_context("BLADE_HASH_ALGORITHM"))?;
        }

        if let Ok(depth) = env::var("BLADE_MAX_DIRECTIVE_DEPTH") {
            self.max_directive_depth = depth.parse().map_err(|_| {
                Error::config(format!("Invalid BLADE_MAX_DIRECTIVE_DEPTH '{}'", depth))
            })?;
        }

        if let Ok(strict) = env::var("BLADE_STRICT_NESTING") {
            self.strict_nesting = match strict.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(Error::config(format!(
                        "Invalid BLADE_STRICT_NESTING '{}'",
                        strict
                    )))
                }
            };
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_tags(&self.content_tags, &self.escaped_tags)?;

        if self.max_directive_depth == 0 {
            return Err(Error::config("max_directive_depth must be at least 1"));
        }

        if !self.echo_format.contains("%s") {
            return Err(Error::config(format!(
                "echo_format '{}' must contain the %s expression marker",
                self.echo_format
            )));
        }

        Ok(())
    }
}

/// Both pairs need non-empty delimiters and must be distinguishable
pub(crate) fn validate_tags(content: &TagPair, escaped: &TagPair) -> Result<()> {
    for tags in [content, escaped] {
        if tags.open.is_empty() || tags.close.is_empty() {
            return Err(Error::invalid_tags(format!(
                "delimiters cannot be empty (got '{}' '{}')",
                tags.open, tags.close
            )));
        }
    }

    if content == escaped {
        return Err(Error::invalid_tags(format!(
            "escaped and unescaped tags are both '{} {}'",
            content.open, content.close
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.content_tags, TagPair::new("{{", "}}"));
        assert_eq!(config.escaped_tags, TagPair::new("{{{", "}}}"));
        assert_eq!(config.compiled_extension, ".php");
        assert_eq!(config.max_directive_depth, 3);
        assert!(config.strict_nesting);
        assert!(config.cache_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_identical_tags_rejected() {
        let config = CompilerConfig {
            escaped_tags: TagPair::new("{{", "}}"),
            ..CompilerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidTags(_))));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = CompilerConfig {
            max_directive_depth: 0,
            ..CompilerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CompilerConfig::from_toml_str(
            r#"
            cache_path = "storage/views"
            hash_algorithm = "md5"

            [content_tags]
            open = "[["
            close = "]]"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache_path, Some(PathBuf::from("storage/views")));
        assert_eq!(config.hash_algorithm, HashAlgorithm::Md5);
        assert_eq!(config.content_tags, TagPair::new("[[", "]]"));
        assert_eq!(config.escaped_tags, TagPair::new("{{{", "}}}"));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_relative_cache_path_resolved_against_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("blade.toml");
        std::fs::write(&file, "cache_path = \"compiled\"\n").unwrap();

        let config = CompilerConfig::from_file(&file).unwrap();
        assert_eq!(config.cache_path, Some(dir.path().join("compiled")));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_invalid_toml_reports_config_error() {
        let err = CompilerConfig::from_toml_str("max_directive_depth = \"deep\"").unwrap_err();
        assert_eq!(err.error_code(), "E_CONFIG");
    }
}
