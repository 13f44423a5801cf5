//! # wikismith-core
//!
//! Core library for the wikismith static wiki compiler.
//!
//! This crate turns a directory of markdown pages into linked HTML pages. It
//! provides the include expander, page pragmas, the markdown engine with its
//! wiki-link rule and table-of-contents rewriter, and the compiler that
//! threads them together for one run.

pub mod compiler;
pub mod config;
pub mod include;
pub mod loader;
pub mod markdown;
pub mod page;
pub mod pipe;
pub mod pragma;
pub mod saver;
pub mod slug;

pub use compiler::{CompileError, CompileReport, Compiler, PageError};
pub use config::{Config, ConfigError};
pub use include::{IncludeCache, IncludeError, IncludeExpander};
pub use loader::{FsLoader, LoadError, Loader};
pub use markdown::{MarkdownEngine, RenderEnv, Token, TokenKind};
pub use page::Page;
pub use pipe::{split_pipes, split_pipes_str, unescape_pipes};
pub use pragma::{extract_pragmas, Pragmas};
pub use saver::{FsSaver, SaveError, Saver};
pub use slug::slugify;
