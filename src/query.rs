//! Rendering entry points.

use thiserror::Error;
use tracing::debug;

use crate::{
    machine::CompileError,
    parser::ParseError,
    template::{Arguments, Template},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

/// Compiles `template` with `args` and renders one complete statement.
///
/// A node result renders as a statement; a native result is boxed as a
/// literal first, so it renders as `select <literal>`.
pub fn render(template: &Template, args: &Arguments) -> Result<String, CompileError> {
    let outcome = template.build().call(args)?;
    let query = outcome.render_statement()?;
    debug!(template = template.name(), %query, "rendered statement");
    Ok(query)
}

/// Like [`render`], in expression position: statements come back parenthesised.
pub fn render_expression(template: &Template, args: &Arguments) -> Result<String, CompileError> {
    let outcome = template.build().call(args)?;
    let expression = outcome.render_expression()?;
    debug!(template = template.name(), %expression, "rendered expression");
    Ok(expression)
}

/// Parses a listing and renders it in one step.
pub fn render_listing(listing: &str, args: &Arguments) -> Result<String, QueryError> {
    let template: Template = listing.parse()?;
    Ok(render(&template, args)?)
}
