//! The Leibniz-equality demo: extensionally equal sets are members of the
//! same sets.
//!
//! Builds `∀x ∀y ((∀z(z<x ⇔ z<y)) → (∀z(x<z ⇔ y<z)))` and reports
//! whether the engine finds it satisfiable.

use memsat::{Calculator, Step, Var};

type Calc = Calculator<&'static str>;

/// `∀z (z<x ⇔ z<y)`: x and y contain the same members.
fn same_members(c: &mut Calc, x: Var, y: Var) -> Step<&'static str> {
    c.for_all(move |c, _z| c.op_bimp(move |c| c.atom(x, false), move |c| c.atom(y, false)))
}

/// `∀z (x<z ⇔ y<z)`: x and y belong to the same sets.
fn same_hosts(c: &mut Calc, x: Var, y: Var) -> Step<&'static str> {
    c.for_all(move |c, _z| c.op_bimp(move |c| c.atom(x, true), move |c| c.atom(y, true)))
}

fn main() {
    let mut calc = Calc::new();
    let outcome = calc.for_all(|c, x| {
        c.for_all(move |c, y| {
            c.op_imp(
                move |c| same_members(c, x, y),
                move |c| same_hosts(c, x, y),
            )
        })
    });
    match outcome {
        Ok(()) => {
            let verdict = if calc.is_satisfiable() {
                "satisfiable"
            } else {
                "unsatisfiable"
            };
            println!(
                "leibniz equality: {verdict} ({} model(s))",
                calc.models().map_or(0, |e| e.len())
            );
        }
        Err(err) => eprintln!("leibniz equality: {err}"),
    }
}
