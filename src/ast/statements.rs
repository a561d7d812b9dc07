use crate::{
    ast::{Node, RenderError},
    escape::escape_text,
};

/// Statement node: a complete query form, built clause by clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Statement kind; underscores separate words
    ///
    /// # Example
    /// ```text
    /// select_distinct  ->  select distinct
    /// ```
    Initial(String),

    /// Bare clause keyword appended to a statement
    ///
    /// # Example
    /// ```text
    /// select + from_  ->  select from
    /// ```
    SimpleClause { previous: Box<Statement>, name: String },

    /// Comma-separated arguments and `value as name` aliases appended to a statement
    ///
    /// # Example
    /// ```text
    /// select `x`, plus(`y`, 1) as `z`
    /// ```
    ListClause {
        previous: Box<Statement>,
        args: Vec<Node>,
        aliases: Vec<(String, Node)>,
    },
}

/// Splits a keyword on underscores, drops empty parts, and joins with spaces.
fn spaced(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Statement {
    pub fn render_statement(&self) -> Result<String, RenderError> {
        match self {
            Statement::Initial(name) => Ok(spaced(name)),
            Statement::SimpleClause { previous, name } => {
                Ok(format!("{} {}", previous.render_statement()?, spaced(name)))
            }
            Statement::ListClause {
                previous,
                args,
                aliases,
            } => {
                if previous.is_list_clause() {
                    return Err(RenderError::ClauseChaining {
                        previous: previous.render_statement()?,
                    });
                }

                let previous_text = previous.render_statement()?;
                let mut members = args
                    .iter()
                    .map(Node::render_expression)
                    .collect::<Result<Vec<_>, _>>()?;
                for (name, value) in aliases {
                    members.push(format!(
                        "{} as {}",
                        value.render_expression()?,
                        escape_text(name, '`')
                    ));
                }

                if members.is_empty() {
                    Ok(previous_text)
                } else {
                    Ok(format!("{previous_text} {}", members.join(", ")))
                }
            }
        }
    }

    /// A statement in value position is a parenthesised subquery.
    pub fn render_expression(&self) -> Result<String, RenderError> {
        Ok(format!("({})", self.render_statement()?))
    }

    /// Whether another list clause would have to wait for a keyword first.
    pub fn is_list_clause(&self) -> bool {
        matches!(self, Statement::ListClause { .. })
    }
}

/// Names that start a statement, bound before anything else when a template runs.
pub fn keywords() -> [(&'static str, Statement); 4] {
    [
        ("with_", Statement::Initial("with".to_string())),
        ("select", Statement::Initial("select".to_string())),
        ("select_distinct", Statement::Initial("select_distinct".to_string())),
        ("insert_into", Statement::Initial("insert_into".to_string())),
    ]
}
