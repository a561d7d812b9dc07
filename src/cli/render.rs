//! Render a listing into dialect text

use serde_json::json;
use tracing::debug;

use super::{CliError, json_to_value, parse_keyword};
use crate::{Arguments, Outcome, Template};

/// Options for the render command
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// The instruction listing
    pub listing: String,
    /// Positional arguments, one JSON document each
    pub args: Vec<String>,
    /// Keyword arguments as `NAME=JSON`
    pub kwargs: Vec<String>,
    /// Render in expression position instead of as a statement
    pub expression: bool,
    /// Wrap the output in a JSON envelope
    pub json: bool,
}

impl RenderOptions {
    fn arguments(&self) -> Result<Arguments, CliError> {
        let mut arguments = Arguments::new();
        for raw in &self.args {
            arguments = arguments.arg(json_to_value(serde_json::from_str(raw)?));
        }
        for raw in &self.kwargs {
            let (name, value) = parse_keyword(raw)?;
            arguments = arguments.kwarg(name, value);
        }
        Ok(arguments)
    }
}

/// Execute a render operation, returning the text to print
pub fn execute_render(options: &RenderOptions) -> Result<String, CliError> {
    let template: Template = options.listing.parse()?;
    let arguments = options.arguments()?;
    debug!(
        template = template.name(),
        args = arguments.positional.len(),
        kwargs = arguments.keyword.len(),
        "rendering listing"
    );

    let outcome = template.build().call(&arguments)?;
    let query = if options.expression {
        outcome.render_expression()
    } else {
        outcome.render_statement()
    }
    .map_err(crate::CompileError::from)?;

    if !options.json {
        return Ok(query);
    }

    let kind = match outcome {
        Outcome::Node(node) if node.is_statement() => "statement",
        Outcome::Node(_) => "expression",
        Outcome::Native(_) => "native",
    };
    let envelope = json!({
        "template": template.name(),
        "query": query,
        "kind": kind,
    });
    Ok(serde_json::to_string_pretty(&envelope)?)
}
