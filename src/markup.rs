//! Markup compiler
//!
//!     Compiles an indentation-based markup language into HTML mixed with host template
//!     code:
//!
//!         !!! 5
//!         %html
//!           %body
//!             #main.content
//!               - for post in posts
//!                 %h2= post.title
//!                 %p{:class => intro} Read on
//!
//!     compiles to
//!
//!         <!DOCTYPE html>
//!         <html>
//!           <body>
//!             <div class="content" id="main">
//!         {% for post in posts %}      <h2>{{ post.title }}</h2>
//!               <p class="intro">Read on</p>
//!         {% endfor %}    </div>
//!           </body>
//!         </html>
//!
//!     and is then rendered with the engine's bindings by the host runtime (Tera).
//!     Instruction tags produce no output of their own, so the rendered lines keep the
//!     indentation of the elements around them.
//!
//! Pipeline
//!
//!     source -> normalized lines (normalization: continuations, depth overrides, static
//!            includes) -> markup tree (node) -> host template (codegen) -> output filters
//!            -> [optional timestamp cache] -> rendered text (runtime)
//!
//!     Each stage is usable on its own; [MarkupEngine] strings them together.

pub mod bindings;
pub mod codegen;
pub mod engine;
pub mod line_classification;
pub mod node;
pub mod normalization;
pub mod registry;
pub mod runtime;
pub mod tag;

use std::path::PathBuf;
use thiserror::Error;

pub use bindings::Bindings;
pub use engine::{CompiledTemplate, MarkupEngine};
pub use registry::{FilterRegistry, TextBlockRegistry};
pub use runtime::{FunctionRegistry, HostRuntime, TeraRuntime};

use crate::cache::CacheError;

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("template not found: {path}")]
    SourceNotFound { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: unterminated attribute options in '{text}'")]
    MalformedOptions { line: usize, text: String },
    #[error("includes still unresolved after {passes} passes, is a file including itself?")]
    CyclicInclude { passes: usize },
    #[error("line {line}: unknown text block ':{name}'")]
    UnknownTextBlock { name: String, line: usize },
    #[error("line {line}: text block ':{name}' failed: {message}")]
    TextBlock {
        name: String,
        line: usize,
        message: String,
    },
    #[error("line {line}: '- {keyword}' has no counterpart in the host template language")]
    UnsupportedInstruction { keyword: String, line: usize },
    #[error("failed to render '{name}': {message}")]
    Render { name: String, message: String },
    #[error(transparent)]
    Cache(#[from] CacheError),
}
