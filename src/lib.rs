pub mod ast;
pub mod builtins;
#[cfg(feature = "cli")]
pub mod cli;
pub mod escape;
pub mod function;
pub mod instruction;
pub mod lexer;
pub mod machine;
pub mod methods;
pub mod parser;
pub mod query;
pub mod template;
pub mod token;
pub mod value;

pub use ast::{BinaryOp, Callee, CompareOp, Expression, Node, RenderError, Statement, UnaryOp};
pub use escape::{escape_buffer, escape_text, escape_value, format_float};
pub use function::{CallError, Function};
pub use instruction::{Construct, Container, Conversion, Instruction, Merge, Scope};
pub use lexer::{LexError, Lexer, Position};
pub use machine::{CompileError, Machine};
pub use parser::{ParseError, Parser};
pub use query::{QueryError, render, render_expression, render_listing};
pub use template::{Arguments, BindError, Builder, Outcome, Parameter, Template};
pub use token::Token;
pub use value::{SizeError, Value};
