//! Compilable templates and the builders that replay them.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    ast::{Expression, Node, RenderError},
    function::{CallError, Function},
    instruction::Instruction,
    lexer::Lexer,
    machine::{CompileError, Machine, initial_context},
    parser::{ParseError, Parser},
    value::Value,
};

/// Errors raised while binding call arguments to parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("{template}() takes {expected} positional argument(s) but {given} were given")]
    TooManyArguments {
        template: String,
        expected: usize,
        given: usize,
    },

    #[error("{template}() missing required argument '{name}'")]
    Missing { template: String, name: String },

    #[error("{template}() got an unexpected keyword argument '{name}'")]
    UnexpectedKeyword { template: String, name: String },

    #[error("{template}() got multiple values for argument '{name}'")]
    Duplicate { template: String, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Value>,
}

/// Call-time arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub keyword: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }
}

/// A function body as an instruction trace, with its signature and the
/// global and closure bindings it captured.
///
/// # Examples
///
/// ```
/// use ck_query::{Arguments, Template};
///
/// let template: Template = "
///     def double(x):
///     LOAD_FAST x
///     LOAD_CONST 2
///     BINARY_MULTIPLY
///     RETURN_VALUE
/// "
/// .parse()
/// .unwrap();
///
/// let outcome = template.build().call(&Arguments::new().arg(21)).unwrap();
/// assert_eq!(outcome.render_expression().unwrap(), "multiply(21, 2)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    params: Vec<Parameter>,
    globals: Vec<(String, Value)>,
    closure: Vec<(String, Value)>,
    code: Vec<Instruction>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Template {
            name: name.into(),
            params: Vec::new(),
            globals: Vec::new(),
            closure: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn with_param(self, name: impl Into<String>) -> Self {
        self.with_parameter(Parameter {
            name: name.into(),
            default: None,
        })
    }

    pub fn with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.with_parameter(Parameter {
            name: name.into(),
            default: Some(default.into()),
        })
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.params.push(parameter);
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.push((name.into(), value.into()));
        self
    }

    pub fn with_closure(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.closure.push((name.into(), value.into()));
        self
    }

    pub fn with_code(mut self, code: impl IntoIterator<Item = Instruction>) -> Self {
        self.code.extend(code);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn globals(&self) -> &[(String, Value)] {
        &self.globals
    }

    pub fn closure(&self) -> &[(String, Value)] {
        &self.closure
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Binds call arguments to parameters, applying defaults.
    pub fn bind(&self, args: &Arguments) -> Result<Vec<(String, Value)>, BindError> {
        if args.positional.len() > self.params.len() {
            return Err(BindError::TooManyArguments {
                template: self.name.clone(),
                expected: self.params.len(),
                given: args.positional.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = args
            .positional
            .iter()
            .cloned()
            .map(Some)
            .chain(std::iter::repeat(None))
            .take(self.params.len())
            .collect();

        for (name, value) in &args.keyword {
            let Some(index) = self.params.iter().position(|param| &param.name == name) else {
                return Err(BindError::UnexpectedKeyword {
                    template: self.name.clone(),
                    name: name.clone(),
                });
            };
            if slots[index].is_some() {
                return Err(BindError::Duplicate {
                    template: self.name.clone(),
                    name: name.clone(),
                });
            }
            slots[index] = Some(value.clone());
        }

        self.params
            .iter()
            .zip(slots)
            .map(|(param, slot)| match slot.or_else(|| param.default.clone()) {
                Some(value) => Ok((param.name.clone(), value)),
                None => Err(BindError::Missing {
                    template: self.name.clone(),
                    name: param.name.clone(),
                }),
            })
            .collect()
    }

    /// A reusable builder over this template.
    pub fn build(&self) -> Builder {
        Builder {
            template: Arc::new(self.clone()),
        }
    }

    /// Wraps the template as a lambda-capable host function, so one template
    /// can call (or render) another.
    pub fn into_function(self) -> Function {
        let builder = Builder {
            template: Arc::new(self),
        };
        let params: Vec<String> = builder
            .template
            .params
            .iter()
            .map(|param| param.name.clone())
            .collect();
        let name = builder.template.name.clone();

        Function::lambda(name, params, move |positional, keyword| {
            let args = Arguments { positional, keyword };
            builder
                .call(&args)
                .map(Outcome::into_value)
                .map_err(|e| CallError::Failed(e.to_string()))
        })
    }
}

impl FromStr for Template {
    type Err = ParseError;

    fn from_str(listing: &str) -> Result<Self, Self::Err> {
        Parser::new(Lexer::new(listing))?.parse_template()
    }
}

/// Result of replaying a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Node(Node),
    /// The trace returned a plain host value
    Native(Value),
}

impl Outcome {
    fn from_node(node: Node) -> Self {
        match node {
            Node::Expression(Expression::Value(value)) => Outcome::Native(value),
            node => Outcome::Node(node),
        }
    }

    pub fn into_node(self) -> Node {
        match self {
            Outcome::Node(node) => node,
            Outcome::Native(value) => Node::Expression(Expression::Value(value)),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Outcome::Node(node) => Value::from(node),
            Outcome::Native(value) => value,
        }
    }

    pub fn render_statement(&self) -> Result<String, RenderError> {
        match self {
            Outcome::Node(node) => node.render_statement(),
            Outcome::Native(value) => Expression::Value(value.clone()).render_statement(),
        }
    }

    pub fn render_expression(&self) -> Result<String, RenderError> {
        match self {
            Outcome::Node(node) => node.render_expression(),
            Outcome::Native(value) => Expression::Value(value.clone()).render_expression(),
        }
    }
}

/// Replays a shared template; cheap to clone and safe to call from several threads.
#[derive(Debug, Clone)]
pub struct Builder {
    template: Arc<Template>,
}

impl Builder {
    pub fn template(&self) -> &Template {
        &self.template
    }

    #[instrument(level = "debug", skip_all, fields(template = %self.template.name))]
    pub fn call(&self, args: &Arguments) -> Result<Outcome, CompileError> {
        let bound = self.template.bind(args)?;
        let layers = self
            .template
            .globals
            .iter()
            .chain(&self.template.closure)
            .cloned()
            .chain(bound);
        let context = initial_context(layers);

        let node = Machine::new(&self.template.code, context).run()?;
        let outcome = Outcome::from_node(node);
        debug!(native = matches!(outcome, Outcome::Native(_)), "template replayed");
        Ok(outcome)
    }
}
