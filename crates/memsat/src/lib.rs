//! memsat: satisfiability of quantified formulas over one membership
//! predicate.
//!
//! The engine decides satisfiability of closed formulas built from atoms
//! `x<y` ("x is a member of y"), Boolean operators, and existential /
//! universal quantifiers. A driver constructs the formula incrementally
//! through [`Calculator`]; internally the formula lives as a stack of
//! disjunctive-normal-form expressions over [`Model`]s whose pairwise
//! combination and scope-closure steps run on a bounded worker pool.
//!
//! ```
//! use memsat::Calculator;
//!
//! let mut calc: Calculator<&str> = Calculator::new();
//! // ∃x (x < x): satisfiable without a foundation axiom.
//! calc.exists(|c, x| c.atom(x, true)).unwrap();
//! assert!(calc.is_satisfiable());
//! ```
//!
//! Unsatisfiability of a sub-formula is observed through check tokens:
//! the driver registers a token at the depth it is about to build, and
//! the token comes back as [`CalculatorError::Check`] if that
//! sub-expression resolves to the empty disjunction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calculator;
pub mod error;
mod pool;

pub use calculator::{Calculator, Expression, Var, DEFAULT_WORKERS};
pub use error::{CalculatorError, Step};
pub use memsat_core::{Cloud, Kind, Model, Probe};
