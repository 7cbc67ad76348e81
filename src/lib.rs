//! # terrace
//!
//! Compilers for two indentation-sensitive languages.
//!
//! The markup compiler turns a terse tag language (`%p.note Hello`) into HTML interleaved
//! with host template expressions, and the stylesheet compiler turns nested rule/attribute
//! blocks (with arithmetic over typed CSS values) into flat CSS.
//!
//! File Layout
//!
//!     Both compilers share the same shape: source text is cut into lines, each line gets
//!     an indentation depth, the lines are folded into a tree, and the tree is walked to
//!     produce output. The shared pieces live in their own modules:
//!
//!     src/
//!       ├── lexing       Source lines and indentation counting
//!       ├── tree         Arena tree rebuilt from (depth, payload) pairs
//!       ├── calculator   Typed arithmetic used by computed stylesheet attributes
//!       ├── cache        Content-hash and timestamp artifact caches
//!       ├── stylesheet   Stylesheet compiler and its four renderers
//!       ├── markup       Markup compiler, code generator and host runtime
//!       └── config       Layered configuration (embedded defaults + user files)
//!
//! For test helpers shared by unit and integration tests, see [testing].

#![allow(rustdoc::invalid_html_tags)]

pub mod cache;
pub mod calculator;
pub mod config;
pub mod lexing;
pub mod markup;
pub mod stylesheet;
pub mod testing;
pub mod tree;

use thiserror::Error;

pub use config::{Loader, MarkupConfig, StylesheetConfig, TerraceConfig};
pub use markup::{Bindings, CompiledTemplate, MarkupEngine};
pub use stylesheet::StylesheetCompiler;

/// Crate-level error, mostly useful for binaries juggling both compilers.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Stylesheet(#[from] stylesheet::StylesheetError),
    #[error(transparent)]
    Markup(#[from] markup::MarkupError),
    #[error(transparent)]
    Config(#[from] ::config::ConfigError),
}
