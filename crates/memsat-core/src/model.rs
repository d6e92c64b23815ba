//! Conjunctions of membership atoms, classified into sixteen kinds.
//!
//! A [`Model`] is a conjunction of atomic facts about the membership
//! predicate, stored as a fixed array of [`Cloud`]s, one per [`Kind`]
//! plus one per negated kind at `kind + KIND_COUNT`. Each cloud holds the
//! scope distances of the variables the atoms of that kind refer to.
//!
//! Two models combine by per-slot union (conjunction of conjunctions).
//! Whether two models can coexist is decided by a fixed table of
//! cross-kind cloud probes encoding the quantifier semantics; closing the
//! innermost quantifier scope is [`Model::lift`], which promotes the
//! both-existential evidence into root/branch form and shifts every
//! surviving distance down by one.

use crate::cloud::{Cloud, Probe};
use std::cmp::Ordering;

/// Number of positive kinds; a kind's negation lives at `kind + KIND_COUNT`.
pub const KIND_COUNT: usize = 8;

const SLOT_COUNT: usize = 2 * KIND_COUNT;

/// The positive atom kinds, in slot order.
///
/// `UnivMember`/`UnivHost` carry atoms with one universal participant, on
/// the member (left of `<`) or container side respectively. `Synthesis`/
/// `Analysis` carry both-existential atoms keyed by which side the
/// current scope's variable occupies. `Root`/`Branch` and `Multiverse`/
/// `Dark` only ever appear as products of [`Model::lift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Kind {
    /// Commitment left behind when a member-side universal atom's scope
    /// closes over it. Full- or empty-valued.
    Multiverse,
    /// Commitment left behind when a container-side universal atom's
    /// scope closes over it. Full- or empty-valued.
    Dark,
    /// Atoms whose universal participant is the member.
    UnivMember,
    /// Atoms whose universal participant is the container.
    UnivHost,
    /// Analysis evidence promoted by a scope closure.
    Root,
    /// Synthesis evidence promoted by a scope closure.
    Branch,
    /// Both-existential atoms with the current scope's variable as member.
    Synthesis,
    /// Both-existential atoms with the referenced variable as member.
    Analysis,
}

use Kind::*;

/// Slot index of a positive kind.
fn pos(kind: Kind) -> usize {
    kind as usize
}

/// Slot index of a negated kind.
fn neg(kind: Kind) -> usize {
    kind as usize + KIND_COUNT
}

/// How a clash-table entry probes its two kinds.
#[derive(Debug, Clone, Copy)]
enum Clash {
    /// Probe the two positive slots under the given policy.
    Straight(Probe),
    /// Probe positive-against-negated in both polarities.
    Contra,
}

/// The cross-kind incompatibility table. An entry `(k0, k1, clash)` fires
/// when the probed slots of the two models touch; any firing entry makes
/// the models incompatible. The table is run in both operand orders, so
/// incompatibility is symmetric by construction.
const CLASH_TABLE: [(Kind, Kind, Clash); 18] = [
    // Scope-boundary crossings: the witness is the pair of least members.
    (Multiverse, Dark, Clash::Straight(Probe::CrossSpan)),
    (Multiverse, UnivHost, Clash::Straight(Probe::CrossSpan)),
    (UnivMember, Dark, Clash::Straight(Probe::CrossSpan)),
    (UnivMember, UnivHost, Clash::Straight(Probe::CrossSpan)),
    // Blocking overlaps between positive kinds.
    (UnivMember, UnivHost, Clash::Straight(Probe::SharedBit)),
    (UnivMember, Root, Clash::Straight(Probe::SharedBit)),
    (UnivMember, Analysis, Clash::Straight(Probe::SharedBit)),
    (UnivHost, Branch, Clash::Straight(Probe::SharedBit)),
    (UnivHost, Synthesis, Clash::Straight(Probe::SharedBit)),
    (Synthesis, Analysis, Clash::Straight(Probe::SharedBit)),
    // Direct contradictions between a kind and a negation.
    (UnivMember, UnivMember, Clash::Contra),
    (UnivHost, UnivHost, Clash::Contra),
    (Synthesis, Synthesis, Clash::Contra),
    (Analysis, Analysis, Clash::Contra),
    (UnivMember, Branch, Clash::Contra),
    (UnivMember, Synthesis, Clash::Contra),
    (UnivHost, Root, Clash::Contra),
    (UnivHost, Analysis, Clash::Contra),
];

/// A conjunction of membership atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    slots: [Cloud; SLOT_COUNT],
}

impl Model {
    /// The trivially true conjunction: every slot empty.
    fn unit() -> Self {
        Model {
            slots: std::array::from_fn(|_| Cloud::Empty),
        }
    }

    /// A single atomic formula relating the current scope's variable to
    /// the variable `var_id` scopes below the current one (0 refers to
    /// the current scope itself).
    ///
    /// `is_member` says the referenced variable sits on the member (left)
    /// side of `<`; `neg_scope` and `neg_var` are the accumulated
    /// negation parities of the current scope and of the referenced
    /// variable's scope; `negated` is the syntactic polarity of the atom,
    /// normalized against the scope parity before the slot is chosen.
    pub fn atom(var_id: u64, is_member: bool, neg_scope: bool, neg_var: bool, negated: bool) -> Self {
        debug_assert!(
            var_id != 0 || neg_var == neg_scope,
            "a self-reference cannot disagree with its own scope parity"
        );
        let negated = negated ^ neg_scope;
        let (kind, value) = if neg_scope {
            (if is_member { UnivHost } else { UnivMember }, var_id)
        } else if neg_var {
            // A universal variable seen from an existential scope loses
            // its distance; the leak on the next closure materializes it.
            (if is_member { UnivMember } else { UnivHost }, 0)
        } else if is_member {
            (Analysis, var_id)
        } else {
            (Synthesis, var_id)
        };
        let mut model = Model::unit();
        let slot = if negated { neg(kind) } else { pos(kind) };
        model.slots[slot] = Cloud::singleton(value);
        model
    }

    /// The conjunction of two models: per-slot cloud union.
    pub fn conjoin(&self, other: &Model) -> Model {
        Model {
            slots: std::array::from_fn(|i| &self.slots[i] | &other.slots[i]),
        }
    }

    /// Whether this model and `other` cannot hold together.
    pub fn is_incompatible(&self, other: &Model) -> bool {
        self.clash_witness(other).is_some()
    }

    /// The witness pair of the first clash-table entry that fires, if
    /// any. The engine only consumes the boolean; the indices are kept
    /// for diagnostics.
    pub fn clash_witness(&self, other: &Model) -> Option<(u64, u64)> {
        Self::clashes(self, other).or_else(|| Self::clashes(other, self))
    }

    fn clashes(a: &Model, b: &Model) -> Option<(u64, u64)> {
        for &(k0, k1, clash) in &CLASH_TABLE {
            let hit = match clash {
                Clash::Straight(probe) => a.slots[pos(k0)].meets(&b.slots[pos(k1)], probe),
                Clash::Contra => a.slots[pos(k0)]
                    .meets(&b.slots[neg(k1)], Probe::SharedBit)
                    .or_else(|| a.slots[neg(k0)].meets(&b.slots[pos(k1)], Probe::SharedBit)),
            };
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    /// Closes the innermost variable: promotes analysis/synthesis into
    /// root/branch, shifts the promoted kinds down one scope, and records
    /// in `Multiverse`/`Dark` whether the closed variable itself appeared
    /// in a universal kind (the shift leak, coerced to a cloud).
    pub fn lift(&mut self) {
        self.promote(Analysis, Root);
        self.promote(Synthesis, Branch);
        for kind in [Root, Branch] {
            self.slots[pos(kind)].shift();
            self.slots[neg(kind)].shift();
        }
        let leak = self.slots[pos(UnivHost)].shift();
        self.slots[pos(Dark)] |= &Cloud::from_flag(leak);
        let leak = self.slots[neg(UnivHost)].shift();
        self.slots[neg(Dark)] |= &Cloud::from_flag(leak);
        let leak = self.slots[pos(UnivMember)].shift();
        self.slots[pos(Multiverse)] |= &Cloud::from_flag(leak);
        let leak = self.slots[neg(UnivMember)].shift();
        self.slots[neg(Multiverse)] |= &Cloud::from_flag(leak);
    }

    /// Folds `from` (both polarities) into `into` and clears it.
    fn promote(&mut self, from: Kind, into: Kind) {
        let taken = std::mem::replace(&mut self.slots[pos(from)], Cloud::Empty);
        self.slots[pos(into)] |= &taken;
        let taken = std::mem::replace(&mut self.slots[neg(from)], Cloud::Empty);
        self.slots[neg(into)] |= &taken;
    }

    /// The cloud stored for a positive kind.
    pub fn kind(&self, kind: Kind) -> &Cloud {
        &self.slots[pos(kind)]
    }

    /// The cloud stored for a negated kind.
    pub fn kind_negated(&self, kind: Kind) -> &Cloud {
        &self.slots[neg(kind)]
    }
}

impl Ord for Model {
    /// Slot-by-slot lexicographic cloud comparison in slot order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.slots.iter().cmp(other.slots.iter())
    }
}

impl PartialOrd for Model {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms_of(model: &Model) -> Vec<(usize, &Cloud)> {
        model
            .slots
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .collect()
    }

    #[test]
    fn atom_slot_selection_follows_the_table() {
        // Universal scope: the membership side picks host vs member, the
        // variable parity is ignored, the distance is kept.
        let m = Model::atom(2, true, true, false, true);
        // negated ^= neg_scope flips the stored polarity back to positive
        assert_eq!(m.kind(UnivHost), &Cloud::singleton(2));
        let m = Model::atom(2, false, true, false, false);
        assert_eq!(m.kind_negated(UnivMember), &Cloud::singleton(2));

        // Universal variable under an existential scope: distance drops.
        let m = Model::atom(3, true, false, true, false);
        assert_eq!(m.kind(UnivMember), &Cloud::singleton(0));
        let m = Model::atom(3, false, false, true, true);
        assert_eq!(m.kind_negated(UnivHost), &Cloud::singleton(0));

        // Both existential: analysis on the member side, synthesis else.
        let m = Model::atom(1, true, false, false, false);
        assert_eq!(m.kind(Analysis), &Cloud::singleton(1));
        let m = Model::atom(1, false, false, false, false);
        assert_eq!(m.kind(Synthesis), &Cloud::singleton(1));
    }

    #[test]
    fn atom_populates_exactly_one_slot() {
        let m = Model::atom(4, true, false, false, true);
        assert_eq!(atoms_of(&m).len(), 1);
    }

    #[test]
    fn conjoin_is_commutative_and_unions_slots() {
        let a = Model::atom(1, true, false, false, false);
        let b = Model::atom(2, true, false, false, false);
        let ab = a.conjoin(&b);
        assert_eq!(ab, b.conjoin(&a));
        assert!(ab.kind(Analysis).contains(1));
        assert!(ab.kind(Analysis).contains(2));
    }

    #[test]
    fn opposite_polarities_of_one_atom_contradict() {
        let a = Model::atom(1, true, false, false, false);
        let not_a = Model::atom(1, true, false, false, true);
        assert!(a.is_incompatible(&not_a));
        assert!(not_a.is_incompatible(&a));
        let witness = a.clash_witness(&not_a);
        assert_eq!(witness, Some((1, 1)));
    }

    #[test]
    fn distinct_distances_do_not_contradict() {
        let a = Model::atom(1, true, false, false, false);
        let not_b = Model::atom(2, true, false, false, true);
        assert!(!a.is_incompatible(&not_b));
    }

    #[test]
    fn synthesis_blocks_analysis_on_the_same_distance() {
        let s = Model::atom(1, false, false, false, false);
        let a = Model::atom(1, true, false, false, false);
        assert!(s.is_incompatible(&a));
        assert!(a.is_incompatible(&s));
    }

    #[test]
    fn cross_span_fires_without_bit_overlap() {
        // UnivMember meets UnivHost by spans: any universal member next to
        // any universal host clashes regardless of distances. The negated
        // argument cancels against the scope parity, landing both atoms
        // in the positive slots.
        let u = Model::atom(5, false, true, false, true);
        let v = Model::atom(9, true, true, false, true);
        assert_eq!(u.kind(UnivMember), &Cloud::singleton(5));
        assert_eq!(v.kind(UnivHost), &Cloud::singleton(9));
        assert!(u.is_incompatible(&v));
    }

    #[test]
    fn lift_promotes_and_shifts_analysis() {
        let mut m = Model::atom(3, true, false, false, false);
        m.lift();
        assert!(m.kind(Analysis).is_empty());
        assert_eq!(m.kind(Root), &Cloud::singleton(2));
    }

    #[test]
    fn lift_drops_a_self_reference() {
        let mut m = Model::atom(0, false, false, false, false);
        m.lift();
        assert!(m.kind(Synthesis).is_empty());
        assert!(m.kind(Branch).is_empty());
    }

    #[test]
    fn lift_materializes_multiverse_from_a_member_leak() {
        let mut m = Model::atom(2, true, false, true, false);
        assert_eq!(m.kind(UnivMember), &Cloud::singleton(0));
        m.lift();
        assert!(m.kind(UnivMember).is_empty());
        assert!(m.kind(Multiverse).is_full());
        assert!(m.kind(Dark).is_empty());
    }

    #[test]
    fn lift_materializes_dark_from_a_host_leak() {
        let mut m = Model::atom(1, false, false, true, true);
        m.lift();
        assert!(m.kind_negated(UnivHost).is_empty());
        assert!(m.kind_negated(Dark).is_full());
    }

    #[test]
    fn model_order_is_total_on_distinct_atoms() {
        let a = Model::atom(1, true, false, false, false);
        let b = Model::atom(2, true, false, false, false);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        assert_eq!(a.cmp(&a), Ordering::Equal);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Any well-formed atom: parities must agree on self-references.
        fn atom_strategy() -> impl Strategy<Value = Model> {
            (0u64..5, any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
                |(var_id, is_member, neg_scope, neg_var, negated)| {
                    let neg_var = if var_id == 0 { neg_scope } else { neg_var };
                    Model::atom(var_id, is_member, neg_scope, neg_var, negated)
                },
            )
        }

        /// A small conjunction of atoms.
        fn model_strategy() -> impl Strategy<Value = Model> {
            proptest::collection::vec(atom_strategy(), 1..5)
                .prop_map(|atoms| atoms.iter().skip(1).fold(atoms[0].clone(), |m, a| m.conjoin(a)))
        }

        proptest! {
            #[test]
            fn prop_conjoin_commutes(a in model_strategy(), b in model_strategy()) {
                prop_assert_eq!(a.conjoin(&b), b.conjoin(&a));
            }

            #[test]
            fn prop_conjoin_is_idempotent(a in model_strategy()) {
                prop_assert_eq!(a.conjoin(&a), a);
            }

            #[test]
            fn prop_incompatibility_is_symmetric(a in model_strategy(), b in model_strategy()) {
                prop_assert_eq!(a.is_incompatible(&b), b.is_incompatible(&a));
            }

            #[test]
            fn prop_order_is_antisymmetric(a in model_strategy(), b in model_strategy()) {
                prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
                prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
            }
        }
    }
}
