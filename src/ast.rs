//! # Query AST
//!
//! The node hierarchy the compiler builds and renders into dialect text.
//!
//! ## Architecture Overview
//!
//! - **[node]** - [`Node`], the unit the operand stack holds, and rendering errors
//! - **[expressions]** - value expressions: literals, identifiers, calls
//! - **[statements]** - statement forms: initial keyword, simple and list clauses
//! - **[operators]** - host operators and their dialect function names
//! - **[builder]** - constructors, operator overloads and clause chaining
//!
//! ## Two families
//!
//! An *expression* denotes a value (`plus(`x`, 1)`); a *statement* denotes a
//! complete query form (`select x from t`). Each can stand in for the other:
//!
//! ```text
//! statement as expression  ->  (select 1)
//! expression as statement  ->  select plus(`x`, 1)
//! ```
//!
//! ## Clause chaining
//!
//! Statements grow left to right. An attribute adds a bare clause keyword and
//! a call adds a comma-separated list:
//!
//! ```text
//! select(x, y).from_(t).where_(c)  ->  select `x`, `y` from `t` where `c`
//! ```
//!
//! Two lists can never touch: a list clause must follow an initial keyword or
//! a simple clause.
//!
//! ## Examples
//!
//! ```
//! use ck_query::ast::{select, Node};
//!
//! let x = Node::identifier("x");
//! let query = select()
//!     .list([Node::from(x + 1)])
//!     .unwrap()
//!     .method("from_", [Node::identifier("t")])
//!     .unwrap();
//!
//! assert_eq!(query.render_statement().unwrap(), "select plus(`x`, 1) from `t`");
//! ```
pub mod builder;
pub mod expressions;
pub mod node;
pub mod operators;
pub mod statements;

pub use builder::{insert_into, select, select_distinct, with_};
pub use expressions::{Callee, Expression};
pub use node::{Node, RenderError};
pub use operators::{BinaryOp, CompareOp, UnaryOp};
pub use statements::Statement;
