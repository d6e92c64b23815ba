//! Error types surfaced by the calculator.

use thiserror::Error;

/// Errors raised while building or resolving an expression.
///
/// The first three variants are engine-raised misuse of the binding
/// discipline; `Check` carries a user-registered token back out of
/// resolution when the sub-expression it guards is proven unsatisfiable.
/// All of them unwind the driver's call chain; none are recovered inside
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculatorError<E> {
    /// The referenced variable is not bound by any enclosing scope.
    #[error("referenced variable is not in scope")]
    Indefinition,
    /// The atom refers to the scope currently being defined.
    #[error("atom refers to its own binding scope")]
    Circularity,
    /// A universal scope placed its own variable as a member of a
    /// universal variable, a degenerate atom with no kind.
    #[error("degenerate universal-universal atom")]
    Collapse,
    /// A registered check fired: the expression at its depth resolved to
    /// the empty disjunction.
    #[error("checked sub-expression is unsatisfiable")]
    Check(E),
}

/// Outcome of a single calculator operation.
pub type Step<E> = Result<(), CalculatorError<E>>;
