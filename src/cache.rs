//! Expiration cache for compiled templates
//!
//! Shared by every compiler variant: it names compiled artifacts after a
//! digest of the source path and decides when a source must be recompiled
//! by comparing modification times.

use crate::error::Result;
use crate::filesystem::FileStore;
use crate::utils::{hash_hex, HashAlgorithm};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Interface shared by template compilers that persist their output
pub trait TemplateCompiler {
    /// Location of the compiled artifact for `path`, if caching is enabled
    fn compiled_path(&self, path: &Path) -> Option<PathBuf>;

    /// Whether `path` has to be compiled again
    fn is_expired(&self, path: &Path) -> Result<bool>;

    /// Compile `path` and persist the artifact
    fn compile(&self, path: &Path) -> Result<()>;
}

/// Artifact naming and staleness checks
#[derive(Clone)]
pub struct ExpirationCache {
    files: Arc<dyn FileStore>,
    cache_path: Option<PathBuf>,
    extension: String,
    algorithm: HashAlgorithm,
}

impl ExpirationCache {
    pub fn new(
        files: Arc<dyn FileStore>,
        cache_path: Option<PathBuf>,
        extension: impl Into<String>,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            files,
            cache_path,
            extension: extension.into(),
            algorithm,
        }
    }

    pub fn files(&self) -> &Arc<dyn FileStore> {
        &self.files
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// `cache_dir/digest(path)+extension`
    pub fn compiled_path(&self, path: &Path) -> Option<PathBuf> {
        let cache_dir = self.cache_path.as_ref()?;
        let name = hash_hex(self.algorithm, &path.to_string_lossy());
        Some(cache_dir.join(format!("{}{}", name, self.extension)))
    }

    /// A source is expired when caching is off, its artifact is missing, or
    /// the source is at least as new as the artifact
    pub fn is_expired(&self, path: &Path) -> Result<bool> {
        let compiled = match self.compiled_path(path) {
            Some(compiled) => compiled,
            None => return Ok(true),
        };

        if !self.files.exists(&compiled) {
            log::debug!("No compiled artifact for '{}'", path.display());
            return Ok(true);
        }

        let source_modified = self.files.last_modified(path)?;
        let compiled_modified = self.files.last_modified(&compiled)?;

        log::trace!(
            "'{}' modified at {}, artifact at {}",
            path.display(),
            source_modified,
            compiled_modified
        );

        Ok(source_modified >= compiled_modified)
    }

    /// Write the compiled artifact for `path`; returns where it went
    pub fn store(&self, path: &Path, contents: &str) -> Result<Option<PathBuf>> {
        let compiled = match self.compiled_path(path) {
            Some(compiled) => compiled,
            None => return Ok(None),
        };

        self.files.put(&compiled, contents)?;
        log::debug!(
            "Wrote compiled template for '{}' to '{}'",
            path.display(),
            compiled.display()
        );
        Ok(Some(compiled))
    }
}
