//! rustf-blade - Blade-style template compiler for RustF views
//!
//! Compiles templates made of markup, `{{ }}` echo placeholders and
//! `@directive` control constructs into PHP source that renders the
//! template against a `$__env` view environment:
//! - Conditionals, loops and `@forelse` blocks
//! - Template inheritance with deferred `@extends` footers
//! - Sections, stacks and includes
//! - Verbatim and raw `@php` blocks
//! - Timestamp based expiration of compiled artifacts

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod blade;
pub mod cache;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod utils;

pub use blade::{BladeCompiler, CompileState};
pub use cache::{ExpirationCache, TemplateCompiler};
pub use config::{CompilerConfig, TagPair};
pub use error::{Error, Result};
pub use filesystem::{FileStore, LocalFileStore, MemoryFileStore};
