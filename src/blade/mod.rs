//! Blade template compiler
//!
//! Turns a template into PHP source in five steps:
//! 1. `@verbatim` and `@php` blocks are swapped for placeholders
//! 2. The remaining text is split into inline text and PHP code islands
//! 3. Each inline segment runs through extensions, directives, comments and
//!    echoes, in that order; code islands are copied as they are
//! 4. Placeholders are restored
//! 5. Deferred footer statements (`@extends`) are appended
//!
//! A [`BladeCompiler`] is configured through `&mut self` methods and then
//! shared; compiling only needs `&self` and keeps its mutable bookkeeping in
//! a [`CompileState`] created for the call.

pub mod directives;
pub mod echo;
pub mod lexer;
pub mod raw_blocks;
pub mod state;
pub mod statements;

pub use directives::{DirectiveHandler, Directives};
pub use lexer::{Segment, SegmentKind};
pub use state::CompileState;

use crate::cache::{ExpirationCache, TemplateCompiler};
use crate::config::{validate_tags, CompilerConfig, TagPair};
use crate::error::{Error, Result};
use crate::filesystem::FileStore;
use echo::EchoPatterns;
use raw_blocks::{restore_blocks, BlockExtractor, ECHO_PLACEHOLDER};
use regex::Regex;
use statements::StatementCompiler;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Custom compile pass run on inline text before the built-in passes
pub type Extension = Box<dyn Fn(&str, &BladeCompiler) -> String + Send + Sync>;

pub struct BladeCompiler {
    cache: ExpirationCache,
    config: CompilerConfig,
    extensions: Vec<Extension>,
    directives: Directives,
    echoes: EchoPatterns,
}

impl fmt::Debug for BladeCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BladeCompiler")
            .field("config", &self.config)
            .field("extensions", &self.extensions.len())
            .field("directives", &self.directives)
            .finish()
    }
}

impl BladeCompiler {
    /// Compiler with the default configuration (no artifact caching)
    pub fn new(files: Arc<dyn FileStore>) -> Result<Self> {
        Self::with_config(files, CompilerConfig::default())
    }

    pub fn with_config(files: Arc<dyn FileStore>, config: CompilerConfig) -> Result<Self> {
        config.validate()?;

        let cache = ExpirationCache::new(
            files,
            config.cache_path.clone(),
            config.compiled_extension.clone(),
            config.hash_algorithm,
        );
        let echoes = EchoPatterns::new(
            &config.content_tags,
            &config.escaped_tags,
            &config.echo_format,
        )?;

        log::debug!(
            "Blade compiler ready (cache: {})",
            config
                .cache_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "disabled".to_string())
        );

        Ok(Self {
            cache,
            config,
            extensions: Vec::new(),
            directives: Directives::builtin(),
            echoes,
        })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn cache(&self) -> &ExpirationCache {
        &self.cache
    }

    /// Register a compile pass; extensions run in registration order
    pub fn extend<F>(&mut self, extension: F)
    where
        F: Fn(&str, &BladeCompiler) -> String + Send + Sync + 'static,
    {
        self.extensions.push(Box::new(extension));
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Register a custom directive, replacing any handler with that name
    ///
    /// The handler receives the argument list with its parentheses, or
    /// `None` when the directive was written bare.
    ///
    /// ```
    /// use rustf_blade::{BladeCompiler, MemoryFileStore};
    /// use std::sync::Arc;
    ///
    /// let mut blade = BladeCompiler::new(Arc::new(MemoryFileStore::new())).unwrap();
    /// blade.directive("datetime", |expression| {
    ///     format!("<?php echo {}->format('m/d/Y H:i'); ?>", expression.unwrap_or("now()"))
    /// });
    ///
    /// assert_eq!(
    ///     blade.compile_string("@datetime($when)").unwrap(),
    ///     "<?php echo ($when)->format('m/d/Y H:i'); ?>"
    /// );
    /// ```
    pub fn directive<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Option<&str>) -> String + Send + Sync + 'static,
    {
        let name = name.into();
        log::debug!("Registering directive @{}", name);
        self.directives
            .register(name, move |expression, _state| Ok(handler(expression)));
    }

    /// Replace a directive handler with one that can touch the compile state
    pub fn directive_with_state<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Option<&str>, &mut CompileState) -> Result<String> + Send + Sync + 'static,
    {
        self.directives.register(name, handler);
    }

    /// Change the unescaped (`escaped == false`) or escaped echo tags
    pub fn set_content_tags(
        &mut self,
        open: impl Into<String>,
        close: impl Into<String>,
        escaped: bool,
    ) -> Result<()> {
        let tags = TagPair::new(open, close);
        let (content, escaped_tags) = if escaped {
            (self.config.content_tags.clone(), tags)
        } else {
            (tags, self.config.escaped_tags.clone())
        };

        validate_tags(&content, &escaped_tags)?;
        self.echoes = EchoPatterns::new(&content, &escaped_tags, &self.config.echo_format)?;
        self.config.content_tags = content;
        self.config.escaped_tags = escaped_tags;
        Ok(())
    }

    /// Change the escaped echo tags
    pub fn set_escaped_content_tags(
        &mut self,
        open: impl Into<String>,
        close: impl Into<String>,
    ) -> Result<()> {
        self.set_content_tags(open, close, true)
    }

    pub fn content_tags(&self) -> &TagPair {
        &self.config.content_tags
    }

    pub fn escaped_tags(&self) -> &TagPair {
        &self.config.escaped_tags
    }

    /// Wrapper for escaped echoes; `%s` stands for the expression
    pub fn set_echo_format(&mut self, format: impl Into<String>) -> Result<()> {
        let format = format.into();
        if !format.contains("%s") {
            return Err(Error::config(format!(
                "echo_format '{}' must contain the %s expression marker",
                format
            )));
        }

        self.echoes = EchoPatterns::new(
            &self.config.content_tags,
            &self.config.escaped_tags,
            &format,
        )?;
        self.config.echo_format = format;
        Ok(())
    }

    pub fn echo_format(&self) -> &str {
        &self.config.echo_format
    }

    /// `@name(...)` preceded by optional whitespace
    ///
    /// Group 1 is the leading whitespace, group 2 the argument list.
    pub fn create_matcher(&self, name: &str) -> Result<Regex> {
        Ok(Regex::new(&format!(
            r"\B(\s*)@{}(\s*\(.*\))",
            regex::escape(name)
        ))?)
    }

    /// Like [`create_matcher`](Self::create_matcher) but the final `)` is
    /// left out of group 2, so extensions can append arguments
    pub fn create_open_matcher(&self, name: &str) -> Result<Regex> {
        Ok(Regex::new(&format!(
            r"\B(\s*)@{}(\s*\(.*)\)",
            regex::escape(name)
        ))?)
    }

    /// Bare `@name`; group 1 is the leading, group 2 the trailing whitespace
    pub fn create_plain_matcher(&self, name: &str) -> Result<Regex> {
        Ok(Regex::new(&format!(
            r"\B(\s*)@{}(\s*)",
            regex::escape(name)
        ))?)
    }

    /// Compile template text into PHP source
    pub fn compile_string(&self, value: &str) -> Result<String> {
        self.compile_source(value, CompileState::new(None))
    }

    pub fn compiled_path(&self, path: &Path) -> Option<PathBuf> {
        self.cache.compiled_path(path)
    }

    pub fn is_expired(&self, path: &Path) -> Result<bool> {
        self.cache.is_expired(path)
    }

    /// Compile `path` if its artifact is missing or stale
    ///
    /// Returns whether a compile happened.
    pub fn compile_if_expired(&self, path: &Path) -> Result<bool> {
        if !self.cache.is_expired(path)? {
            log::trace!("'{}' is up to date", path.display());
            return Ok(false);
        }
        TemplateCompiler::compile(self, path)?;
        Ok(true)
    }

    fn compile_source(&self, value: &str, mut state: CompileState) -> Result<String> {
        let verbatim = BlockExtractor::verbatim();
        let php = BlockExtractor::php();

        let value = verbatim.extract(value, &mut state.verbatim_blocks);
        let value = php.extract(&value, &mut state.php_blocks);

        let mut result = String::with_capacity(value.len());
        for segment in lexer::tokenize(&value) {
            match segment.kind {
                SegmentKind::InlineText => {
                    let compiled = self
                        .compile_inline(&segment.content, &mut state)
                        .map_err(|e| e.with_context(format!("line {}", segment.line)))?;
                    result.push_str(&compiled);
                }
                SegmentKind::CodeIsland => result.push_str(&segment.content),
            }
        }

        let result = restore_blocks(ECHO_PLACEHOLDER, &result, &mut state.echo_literals)?;
        let result = php.restore(&result, &mut state.php_blocks)?;
        let result = verbatim.restore(&result, &mut state.verbatim_blocks)?;

        if state.open_forelse_count() > 0 {
            log::warn!(
                "{} @forelse block(s) without @empty in {}",
                state.open_forelse_count(),
                state
                    .current_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "template string".to_string())
            );
        }

        Ok(state.apply_footer(result))
    }

    fn compile_inline(&self, text: &str, state: &mut CompileState) -> Result<String> {
        let mut value = text.to_string();
        for extension in &self.extensions {
            value = extension(&value, self);
        }

        let value = StatementCompiler::new(
            &self.directives,
            self.config.max_directive_depth,
            self.config.strict_nesting,
        )
        .compile(&value, state)?;
        let value = self.echoes.compile_comments(&value);
        Ok(self.echoes.compile_echoes(&value, state))
    }
}

impl TemplateCompiler for BladeCompiler {
    fn compiled_path(&self, path: &Path) -> Option<PathBuf> {
        self.cache.compiled_path(path)
    }

    fn is_expired(&self, path: &Path) -> Result<bool> {
        self.cache.is_expired(path)
    }

    fn compile(&self, path: &Path) -> Result<()> {
        log::debug!("Compiling template '{}'", path.display());

        let source = self.cache.files().get(path)?;
        let compiled = self
            .compile_source(&source, CompileState::new(Some(path.to_path_buf())))
            .map_err(|e| e.with_context(format!("compiling '{}'", path.display())))?;

        if self.cache.store(path, &compiled)?.is_none() {
            log::debug!(
                "No cache directory configured, '{}' compiled without writing",
                path.display()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFileStore;

    fn blade() -> BladeCompiler {
        BladeCompiler::new(Arc::new(MemoryFileStore::new())).unwrap()
    }

    #[test]
    fn test_directives_and_echoes_in_one_line() {
        assert_eq!(
            blade()
                .compile_string("Hello @if($show){{ $name }}@endif")
                .unwrap(),
            "Hello <?php if($show): ?><?php echo $name; ?><?php endif; ?>"
        );
    }

    #[test]
    fn test_code_islands_are_untouched() {
        let source = "<?php $a = '@if($x) {{ $y }}'; ?>\n@if($x)";
        assert_eq!(
            blade().compile_string(source).unwrap(),
            "<?php $a = '@if($x) {{ $y }}'; ?>\n<?php if($x): ?>"
        );
    }

    #[test]
    fn test_at_escaped_echo_restored_literally() {
        assert_eq!(
            blade().compile_string("@{{ $a }} {{ $b }}").unwrap(),
            "{{ $a }} <?php echo $b; ?>"
        );
    }

    #[test]
    fn test_extensions_run_before_directives() {
        let mut blade = blade();
        blade.extend(|value, compiler| {
            let matcher = compiler.create_plain_matcher("now").unwrap();
            matcher
                .replace_all(value, "$1@php(echo time())$2")
                .into_owned()
        });

        assert_eq!(
            blade.compile_string("at @now done").unwrap(),
            "at <?php (echo time()); ?> done"
        );
    }

    #[test]
    fn test_matchers_respect_word_boundary() {
        let blade = blade();
        let matcher = blade.create_matcher("money").unwrap();
        assert!(matcher.is_match("Total @money($x)"));
        assert!(!matcher.is_match("mail@money($x)"));

        let caps = matcher.captures(" @money ($x)").unwrap();
        assert_eq!(&caps[1], " ");
        assert_eq!(&caps[2], " ($x)");

        let open = blade.create_open_matcher("money").unwrap();
        let caps = open.captures("@money($x, 2)").unwrap();
        assert_eq!(&caps[2], "($x, 2");
    }

    #[test]
    fn test_custom_directive_overrides_builtin() {
        let mut blade = blade();
        blade.directive("include", |expression| {
            format!("<?php partial{}; ?>", expression.unwrap_or("()"))
        });

        assert_eq!(
            blade.compile_string("@include('nav')").unwrap(),
            "<?php partial('nav'); ?>"
        );
    }

    #[test]
    fn test_set_content_tags() {
        let mut blade = blade();
        blade.set_content_tags("[[", "]]", false).unwrap();
        blade.set_content_tags("[[[", "]]]", true).unwrap();

        assert_eq!(
            blade.compile_string("[[ $a ]] [[[ $b ]]] {{ $c }}").unwrap(),
            "<?php echo $a; ?> <?php echo e($b); ?> {{ $c }}"
        );
        assert_eq!(blade.content_tags(), &TagPair::new("[[", "]]"));
    }

    #[test]
    fn test_identical_tags_rejected() {
        let mut blade = blade();
        let err = blade.set_content_tags("{{{", "}}}", false).unwrap_err();
        assert!(matches!(err, Error::InvalidTags(_)));
        assert_eq!(blade.content_tags(), &TagPair::new("{{", "}}"));
    }

    #[test]
    fn test_echo_format() {
        let mut blade = blade();
        blade.set_echo_format("htmlentities(%s)").unwrap();
        assert_eq!(
            blade.compile_string("{{{ $a }}}").unwrap(),
            "<?php echo htmlentities($a); ?>"
        );
        assert!(blade.set_echo_format("nothing").is_err());
    }

    #[test]
    fn test_unmatched_empty_fails() {
        let err = blade().compile_string("@empty").unwrap_err();
        assert!(matches!(err, Error::WithContext { .. }));
        assert_eq!(err.error_code(), "E_UNMATCHED_EMPTY");
        assert!(err.is_structural());
    }

    #[test]
    fn test_compiler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BladeCompiler>();
    }
}
