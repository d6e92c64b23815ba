//! The expression calculator.
//!
//! A driver builds a closed formula by calling the operator and
//! quantifier methods; the calculator keeps the partial results as a
//! stack of expressions in disjunctive normal form (each expression a
//! set of [`Model`]s) and resolves the stack after every push.
//!
//! ## Discipline
//!
//! Three parallel stacks carry the syntactic state: `exprs` holds the
//! DNF expressions, `ops` counts the pending operators of each open
//! scope, and `vars` records each scope's accumulated negation parity.
//! `for_all` is `op_not` around `exists`; the inner semantic negation of
//! `∀x φ = ¬∃x ¬φ` is not a second syntactic operator but the parity
//! `exists` pushes for the new scope, which flips how atoms inside are
//! stored and how operator steps fold.
//!
//! Folding a pending operator either merges the top expression into the
//! one below (a disjunction step) or hands every pairwise model
//! combination to the worker pool and swaps in the combined result (a
//! conjunction step across a negation boundary). When a scope's operator
//! count reaches zero its variable is eliminated: every model of the top
//! expression is lifted in parallel and the scope is popped.
//!
//! ## Checks
//!
//! `check` registers a user token at the current `(variables, operators)`
//! depth. When resolution later installs a result at that depth, an empty
//! result surfaces the token as [`CalculatorError::Check`]: the
//! sub-formula the driver guarded is unsatisfiable. A registration fires
//! at most once.

use crate::error::{CalculatorError, Step};
use crate::pool::{Job, WorkerPool};
use memsat_core::Model;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// A disjunction of models; empty means unsatisfiable at its scope.
pub type Expression = BTreeSet<Model>;

/// Workers backing a calculator when none are configured explicitly.
pub const DEFAULT_WORKERS: usize = 4;

/// A variable handle: the binding depth a quantifier passed to its
/// predicate. Handles stay valid for the lifetime of their scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(pub u64);

/// Syntactic depth a check is registered at.
type Depth = (u64, u64);

/// Incremental satisfiability calculator for quantified membership
/// formulas.
///
/// `E` is the driver's check-token type, surfaced verbatim through
/// [`CalculatorError::Check`].
pub struct Calculator<E> {
    exprs: Vec<Expression>,
    /// Pending-operator counts, one per open scope plus the root context.
    ops: Vec<u64>,
    /// Negation parity per scope; index 0 is the phantom root.
    vars: Vec<bool>,
    checks: FxHashMap<Depth, E>,
    pool: WorkerPool,
}

impl<E> Calculator<E> {
    /// A calculator backed by [`DEFAULT_WORKERS`] workers.
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }

    /// A calculator backed by `n_workers` pooled workers (at least one).
    pub fn with_workers(n_workers: usize) -> Self {
        Calculator {
            exprs: Vec::new(),
            ops: vec![0, 0],
            vars: vec![false],
            checks: FxHashMap::default(),
            pool: WorkerPool::new(n_workers),
        }
    }

    /// Number of scopes, counting the phantom root.
    fn n_vars(&self) -> u64 {
        self.vars.len() as u64
    }

    /// Pending operators of the current scope.
    fn n_ops(&self) -> u64 {
        *self.ops.last().expect("operator stack is never empty")
    }

    fn is_neg_syn(&self) -> bool {
        self.n_ops() & 1 == 1
    }

    fn is_neg_sem(&self) -> bool {
        *self.vars.last().expect("scope stack is never empty")
    }

    fn is_neg(&self) -> bool {
        self.is_neg_syn() ^ self.is_neg_sem()
    }

    fn depth(&self) -> Depth {
        (self.n_vars(), self.n_ops())
    }

    fn bump(&mut self, n_operators: u64) {
        *self.ops.last_mut().expect("operator stack is never empty") += n_operators;
    }

    fn top(&self) -> &Expression {
        self.exprs
            .last()
            .expect("operator applied to an empty expression stack")
    }

    /// Binds an atomic formula relating the current scope's variable to
    /// the variable behind `var`. With `is_member` the referenced
    /// variable sits on the member (left) side of `<`, otherwise on the
    /// container side.
    pub fn atom(&mut self, var: Var, is_member: bool) -> Step<E> {
        let n = self.n_vars();
        if var.0 > n {
            return Err(CalculatorError::Indefinition);
        }
        if var.0 == n {
            return Err(CalculatorError::Circularity);
        }
        debug_assert!(var.0 >= 1, "handles are 1-based binding depths");
        let neg_scope = self.is_neg_sem();
        let neg_var = self.vars[var.0 as usize];
        if neg_scope && neg_var && !is_member {
            return Err(CalculatorError::Collapse);
        }
        let model = Model::atom(n - 1 - var.0, is_member, neg_scope, neg_var, self.is_neg_syn());
        self.push_expr(Expression::from([model]))
    }

    /// Joint denial of two sub-expressions; the primitive every other
    /// operator is built from. One operator is charged to the current
    /// scope, then both arguments are evaluated in order.
    pub fn op_nor<F0, F1>(&mut self, mut e0: F0, mut e1: F1) -> Step<E>
    where
        F0: FnMut(&mut Self) -> Step<E>,
        F1: FnMut(&mut Self) -> Step<E>,
    {
        self.bump(1);
        e0(self)?;
        e1(self)
    }

    /// Negation: a NOR of the argument with a duplicate of its result.
    pub fn op_not<F>(&mut self, e: F) -> Step<E>
    where
        F: FnMut(&mut Self) -> Step<E>,
    {
        self.op_nor(e, |c: &mut Self| {
            let dup = c.top().clone();
            c.push_expr(dup)
        })
    }

    /// Disjunction.
    pub fn op_or<F0, F1>(&mut self, e0: F0, e1: F1) -> Step<E>
    where
        F0: FnMut(&mut Self) -> Step<E>,
        F1: FnMut(&mut Self) -> Step<E>,
    {
        let (mut e0, mut e1) = (e0, e1);
        self.op_not(move |c| c.op_nor(&mut e0, &mut e1))
    }

    /// Conjunction.
    pub fn op_and<F0, F1>(&mut self, e0: F0, e1: F1) -> Step<E>
    where
        F0: FnMut(&mut Self) -> Step<E>,
        F1: FnMut(&mut Self) -> Step<E>,
    {
        let (mut e0, mut e1) = (e0, e1);
        self.op_nor(move |c| c.op_not(&mut e0), move |c| c.op_not(&mut e1))
    }

    /// Alternative denial.
    pub fn op_nand<F0, F1>(&mut self, e0: F0, e1: F1) -> Step<E>
    where
        F0: FnMut(&mut Self) -> Step<E>,
        F1: FnMut(&mut Self) -> Step<E>,
    {
        let (mut e0, mut e1) = (e0, e1);
        self.op_not(move |c| c.op_and(&mut e0, &mut e1))
    }

    /// Implication `e0 → e1`.
    pub fn op_imp<F0, F1>(&mut self, e0: F0, e1: F1) -> Step<E>
    where
        F0: FnMut(&mut Self) -> Step<E>,
        F1: FnMut(&mut Self) -> Step<E>,
    {
        let mut e0 = e0;
        self.op_or(move |c| c.op_not(&mut e0), e1)
    }

    /// Biconditional `e0 ↔ e1`: three operators up front, both arguments,
    /// then the re-evaluation against a stashed copy of the first pass.
    pub fn op_bimp<F0, F1>(&mut self, mut e0: F0, mut e1: F1) -> Step<E>
    where
        F0: FnMut(&mut Self) -> Step<E>,
        F1: FnMut(&mut Self) -> Step<E>,
    {
        self.bump(3);
        e0(self)?;
        e1(self)?;
        let stash = self.top().clone();
        e0(self)?;
        self.bump(1);
        e1(self)?;
        self.push_expr(stash)
    }

    /// Opens an existential scope and evaluates `p` with the new
    /// variable's handle. The scope inherits the surrounding negation
    /// parity and closes on its own once its expression completes.
    pub fn exists<F>(&mut self, mut p: F) -> Step<E>
    where
        F: FnMut(&mut Self, Var) -> Step<E>,
    {
        self.vars.push(self.is_neg());
        self.ops.push(0);
        let var = Var(self.vars.len() as u64 - 1);
        p(self, var)
    }

    /// Opens a universal scope: negation around an existential scope,
    /// with the inner negation carried by the scope parity.
    pub fn for_all<F>(&mut self, p: F) -> Step<E>
    where
        F: FnMut(&mut Self, Var) -> Step<E>,
    {
        let mut p = p;
        self.op_not(move |c| c.exists(&mut p))
    }

    /// Registers `err` to fire if the expression at the current depth
    /// resolves to the empty disjunction. A later registration at the
    /// same depth replaces the earlier one.
    pub fn check(&mut self, err: E) {
        let depth = self.depth();
        self.checks.insert(depth, err);
    }

    /// Whether the (resolved) formula has at least one model.
    pub fn is_satisfiable(&self) -> bool {
        self.exprs.last().is_some_and(|e| !e.is_empty())
    }

    /// The current top expression, if any.
    pub fn models(&self) -> Option<&Expression> {
        self.exprs.last()
    }

    /// Consumes the calculator and returns the resolved expression.
    pub fn into_models(mut self) -> Expression {
        self.exprs.pop().unwrap_or_default()
    }

    fn push_expr(&mut self, expr: Expression) -> Step<E> {
        self.exprs.push(expr);
        self.resolve()
    }

    /// Folds pending operators and closes completed scopes until a full
    /// pass makes no progress.
    fn resolve(&mut self) -> Step<E> {
        loop {
            let mut progress = false;
            while self.n_ops() > 0 && self.exprs.len() > 1 {
                if self.is_neg() {
                    self.combine_top_pair()?;
                } else {
                    let top = self.exprs.pop().expect("two expressions on the stack");
                    self.exprs
                        .last_mut()
                        .expect("two expressions on the stack")
                        .extend(top);
                }
                *self.ops.last_mut().expect("operator stack is never empty") -= 1;
                progress = true;
            }
            while self.n_ops() == 0 && self.n_vars() > 1 && !self.exprs.is_empty() {
                self.close_scope()?;
                progress = true;
            }
            if !progress {
                return Ok(());
            }
        }
    }

    /// Conjunction step across a negation boundary: every model of the
    /// top expression against every model of the one below, in parallel.
    fn combine_top_pair(&mut self) -> Step<E> {
        let right: Arc<Vec<Model>> = Arc::new(
            self.exprs
                .pop()
                .expect("two expressions on the stack")
                .into_iter()
                .collect(),
        );
        let left: Arc<Vec<Model>> = Arc::new(
            self.exprs
                .pop()
                .expect("two expressions on the stack")
                .into_iter()
                .collect(),
        );
        debug!(
            left = left.len(),
            right = right.len(),
            "combining expressions"
        );
        for i in 0..left.len() {
            for j in 0..right.len() {
                self.pool.dispatch(Job::Combine {
                    left: Arc::clone(&left),
                    i,
                    right: Arc::clone(&right),
                    j,
                });
            }
        }
        let result = self.pool.barrier();
        self.take(result)
    }

    /// Eliminates the innermost variable: lifts every model of the top
    /// expression in parallel, then pops the scope.
    fn close_scope(&mut self) -> Step<E> {
        let top = self.exprs.pop().expect("scope closure needs an expression");
        debug!(models = top.len(), scopes = self.vars.len(), "closing scope");
        for model in top {
            self.pool.dispatch(Job::Lift(model));
        }
        let result = self.pool.barrier();
        self.take(result)?;
        self.ops.pop();
        self.vars.pop();
        Ok(())
    }

    /// Installs a phase result as the new top and fires any check
    /// registered at the current depth against it.
    fn take(&mut self, result: Expression) -> Step<E> {
        self.exprs.push(result);
        if let Some(err) = self.checks.remove(&self.depth()) {
            if self.top().is_empty() {
                self.exprs.pop();
                return Err(CalculatorError::Check(err));
            }
        }
        Ok(())
    }
}

impl<E> Default for Calculator<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_existential_atom_is_satisfiable() {
        let mut calc: Calculator<&str> = Calculator::new();
        calc.exists(|c, x| c.atom(x, true)).unwrap();
        assert!(calc.is_satisfiable());
        assert_eq!(calc.models().map(BTreeSet::len), Some(1));
    }

    #[test]
    fn out_of_scope_handles_are_rejected() {
        let mut calc: Calculator<&str> = Calculator::new();
        let err = calc
            .exists(|c, x| c.atom(Var(x.0 + 1), true))
            .unwrap_err();
        assert_eq!(err, CalculatorError::Circularity);

        let mut calc: Calculator<&str> = Calculator::new();
        let err = calc
            .exists(|c, x| c.atom(Var(x.0 + 2), true))
            .unwrap_err();
        assert_eq!(err, CalculatorError::Indefinition);
    }

    #[test]
    fn degenerate_universal_atom_collapses() {
        // ∀x with x placed as a member of a universal container: the one
        // atom shape without a kind.
        let mut calc: Calculator<&str> = Calculator::new();
        let err = calc.for_all(|c, x| c.atom(x, false)).unwrap_err();
        assert_eq!(err, CalculatorError::Collapse);
    }

    #[test]
    fn check_registration_is_overwritten_at_same_depth() {
        let mut calc: Calculator<u32> = Calculator::new();
        calc.check(1);
        calc.check(2);
        assert_eq!(calc.checks.len(), 1);
    }

    #[test]
    fn stacks_return_to_quiescence_after_a_formula() {
        let mut calc: Calculator<&str> = Calculator::new();
        calc.exists(|c, x| c.atom(x, true)).unwrap();
        assert_eq!(calc.ops, vec![0, 0]);
        assert_eq!(calc.vars, vec![false]);
        assert_eq!(calc.exprs.len(), 1);
    }
}
