//! Common items related to Genetic Programming.
//!
//! Expressions are binary trees over two input variables and numeric constants. Internal nodes
//! hold an operator whose arity determines the number of children (`abs` takes one, the rest
//! take two).

pub mod expr;
pub mod gen;
pub mod op;
