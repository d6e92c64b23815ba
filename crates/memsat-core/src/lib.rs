//! memsat-core: the leaf algebra of the membership satisfiability engine.
//!
//! Two pure data structures, no I/O and no synchronization:
//!
//! - [`Cloud`]: a tri-state sparse bitset over `u64` indices with a
//!   canonical allocated form, bitwise union, a two-policy intersection
//!   probe, and a downward shift with bottom-bit leak detection.
//! - [`Model`]: a conjunction of membership atoms held as sixteen kind
//!   slots of clouds, with a declarative cross-kind incompatibility table
//!   and the `lift` operation that closes the innermost quantifier scope.
//!
//! The engine crate (`memsat`) layers the expression calculator and its
//! worker pool on top of these.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cloud;
pub mod model;

pub use cloud::{Cloud, Probe, NO_INDEX};
pub use model::{Kind, Model, KIND_COUNT};
