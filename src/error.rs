//! The error type shared by the crate.

use crate::gp::expr::Op;
use thiserror::Error;

/// Errors that may occur while constructing expressions or configuring a simulation.
///
/// Evaluation and the genetic operators never fail, so every variant here is raised
/// synchronously at the point of construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A postfix token that is neither a variable, an operator nor a numeric literal.
    #[error("unknown expression token {0:?}")]
    UnknownToken(String),
    /// An operator found fewer operands on the stack than its arity requires.
    #[error("operator `{op}` is missing an operand")]
    MissingOperand { op: Op },
    /// More than one expression remained once all tokens were consumed.
    #[error("expression left {0} unconnected operands")]
    DanglingOperands(usize),
    /// The expression contained no tokens at all.
    #[error("expression is empty")]
    EmptyExpression,
    /// A simulation was configured with parameters it cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Shorthand for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;
