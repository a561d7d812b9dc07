//! CLI support for ck-query
//!
//! Provides programmatic access to the `ckq` commands so other tools can
//! render and check listings without shelling out.

mod check;
mod convert;
mod docs;
mod render;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{json_to_value, parse_keyword, value_to_json};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};
pub use render::{RenderOptions, execute_render};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("compile error: {0}")]
    Compile(#[from] crate::CompileError),

    #[error("invalid JSON argument: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("no listing provided. Pass a file or pipe a listing to stdin.")]
    NoInput,

    /// A `--kwarg` without the `NAME=JSON` shape
    #[error("invalid keyword argument '{0}', expected NAME=JSON")]
    InvalidKeyword(String),

    #[error("unknown category: '{0}'\nRun 'ckq docs' to see available categories.")]
    UnknownCategory(String),
}
