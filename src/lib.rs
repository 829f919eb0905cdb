//! Evolve symbolic control policies with genetic programming.
//!
//! - `gp` holds the expression tree, its random generator and the genetic operators.
//! - `env` describes the control task a tree is evaluated against.
//! - `ga` runs the generational loop.
//!
//! All randomness is drawn from a single generator passed explicitly to every call, so a run is
//! fully reproducible for a given seed.

pub mod env;
pub mod error;
pub mod ga;
pub mod gp;

pub use crate::env::Environment;
pub use crate::error::{Error, Result};
pub use crate::ga::{Config, GenerationReport, Simulation};
pub use crate::gp::expr::Tree;
