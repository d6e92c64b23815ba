//! Sparse tri-state bitsets over unsigned indices.
//!
//! A [`Cloud`] is a set of `u64` indices in one of three states: empty,
//! full (the whole universe), or an allocated span of machine words.
//! Spans are kept in a canonical form so that set equality coincides with
//! representation equality: the word vector is nonempty, its first word
//! has bit 0 set (so `begin` is always the least member), and its last
//! word is nonzero.
//!
//! The operations the model algebra needs are total and allocation-light:
//! bitwise union, an intersection probe under two witness policies, and a
//! one-position downward shift that reports whether index 0 "leaked" off
//! the bottom.

use std::cmp::Ordering;
use std::ops::{BitOr, BitOrAssign};

/// Width of a storage word in bits.
const WORD_BITS: u64 = u64::BITS as u64;

/// Witness placeholder reported for a full operand, which has no least
/// member to point at.
pub const NO_INDEX: u64 = u64::MAX;

/// How [`Cloud::meets`] decides that two clouds touch, and which witness
/// pair it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Touch iff the clouds share an index; the witness names the lowest
    /// shared index on both sides.
    SharedBit,
    /// Touch whenever both clouds are nonempty; the witness names the two
    /// least members regardless of overlap.
    CrossSpan,
}

/// A sparse set of `u64` indices.
///
/// `Span.begin` is the bit index of bit 0 of `words[0]`; member `i` is
/// stored at bit `i - begin` of the little-endian word vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cloud {
    /// The empty set.
    Empty,
    /// An allocated, canonical span of words.
    Span {
        /// Least member of the set; bit 0 of `words[0]`.
        begin: u64,
        /// Little-endian bit vector; first word odd, last word nonzero.
        words: Vec<u64>,
    },
    /// The whole universe.
    Full,
}

/// Bits `[pos, pos + WORD_BITS)` of a word vector, read as one word.
/// Positions outside the vector contribute zeros; `pos` may be negative.
fn window(words: &[u64], pos: i64) -> u64 {
    let fetch = |q: i64| -> u64 {
        if q >= 0 && (q as usize) < words.len() {
            words[q as usize]
        } else {
            0
        }
    };
    let q = pos.div_euclid(WORD_BITS as i64);
    let r = pos.rem_euclid(WORD_BITS as i64) as u32;
    if r == 0 {
        fetch(q)
    } else {
        (fetch(q) >> r) | (fetch(q + 1) << (WORD_BITS as u32 - r))
    }
}

/// Drops trailing zero words and re-anchors `begin` on the lowest set bit.
/// Returns `None` when no bit is set at all.
fn rebase(begin: u64, mut words: Vec<u64>) -> Option<(u64, Vec<u64>)> {
    while words.last() == Some(&0) {
        words.pop();
    }
    let lead = words.iter().position(|&w| w != 0)?;
    let low = lead as u64 * WORD_BITS + u64::from(words[lead].trailing_zeros());
    if low == 0 {
        return Some((begin, words));
    }
    let len = words.len() - lead;
    let mut shifted = Vec::with_capacity(len);
    for k in 0..len {
        shifted.push(window(&words, (low + k as u64 * WORD_BITS) as i64));
    }
    while shifted.last() == Some(&0) {
        shifted.pop();
    }
    Some((begin + low, shifted))
}

impl Cloud {
    /// The empty set.
    pub const fn empty() -> Self {
        Cloud::Empty
    }

    /// The whole universe.
    pub const fn full() -> Self {
        Cloud::Full
    }

    /// The singleton `{i}`.
    pub fn singleton(i: u64) -> Self {
        Cloud::Span {
            begin: i,
            words: vec![1],
        }
    }

    /// The coercion `true ↦ Full`, `false ↦ Empty` used when a shift leak
    /// is folded back into a cloud slot.
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            Cloud::Full
        } else {
            Cloud::Empty
        }
    }

    /// Whether this cloud has no members.
    pub fn is_empty(&self) -> bool {
        matches!(self, Cloud::Empty)
    }

    /// Whether this cloud is the whole universe.
    pub fn is_full(&self) -> bool {
        matches!(self, Cloud::Full)
    }

    /// Whether `i` is a member.
    pub fn contains(&self, i: u64) -> bool {
        match self {
            Cloud::Empty => false,
            Cloud::Full => true,
            Cloud::Span { begin, words } => {
                if i < *begin {
                    return false;
                }
                let rel = i - begin;
                let word = (rel / WORD_BITS) as usize;
                word < words.len() && words[word] >> (rel % WORD_BITS) & 1 == 1
            }
        }
    }

    /// Probes whether `self` and `other` touch under `probe`, reporting a
    /// witness index pair on success (see [`Probe`] for the policies).
    /// A full operand reports [`NO_INDEX`] on its side.
    pub fn meets(&self, other: &Cloud, probe: Probe) -> Option<(u64, u64)> {
        match (self, other) {
            (Cloud::Empty, _) | (_, Cloud::Empty) => None,
            (Cloud::Full, Cloud::Full) => Some((NO_INDEX, NO_INDEX)),
            (Cloud::Full, Cloud::Span { begin, .. }) => Some((NO_INDEX, *begin)),
            (Cloud::Span { begin, .. }, Cloud::Full) => Some((*begin, NO_INDEX)),
            (
                Cloud::Span {
                    begin: b0,
                    words: w0,
                },
                Cloud::Span {
                    begin: b1,
                    words: w1,
                },
            ) => {
                if probe == Probe::CrossSpan {
                    return Some((*b0, *b1));
                }
                let lo = (*b0).max(*b1);
                let hi = (b0 + w0.len() as u64 * WORD_BITS).min(b1 + w1.len() as u64 * WORD_BITS);
                if lo >= hi {
                    return None;
                }
                let first = ((lo - b0) / WORD_BITS) as usize;
                let last = ((hi - b0).div_ceil(WORD_BITS)) as usize;
                for k in first..last {
                    let pos = b0 + k as u64 * WORD_BITS;
                    let both = w0[k] & window(w1, pos as i64 - *b1 as i64);
                    if both != 0 {
                        let at = pos + u64::from(both.trailing_zeros());
                        return Some((at, at));
                    }
                }
                None
            }
        }
    }

    /// Decrements every member by one. Returns `true` iff 0 was a member
    /// before the shift (the bit "leaked" off the bottom). Empty and full
    /// clouds are unchanged and never leak.
    pub fn shift(&mut self) -> bool {
        let Cloud::Span { begin, words } = self else {
            return false;
        };
        if *begin > 0 {
            *begin -= 1;
            return false;
        }
        // Canonical form puts the least member at bit 0 of words[0], so
        // begin == 0 means member 0 is present. Drop it and re-anchor on
        // the next member, pre-shifted by one.
        words[0] &= !1;
        *self = match rebase(0, std::mem::take(words)) {
            None => Cloud::Empty,
            Some((low, shifted)) => Cloud::Span {
                begin: low - 1,
                words: shifted,
            },
        };
        true
    }

    /// Per-state comparison: `Empty < Span < Full`; spans compare by
    /// `begin`, then word count, then words.
    fn order(&self, other: &Cloud) -> Ordering {
        match (self, other) {
            (Cloud::Empty, Cloud::Empty) | (Cloud::Full, Cloud::Full) => Ordering::Equal,
            (Cloud::Empty, _) | (_, Cloud::Full) => Ordering::Less,
            (_, Cloud::Empty) | (Cloud::Full, _) => Ordering::Greater,
            (
                Cloud::Span {
                    begin: b0,
                    words: w0,
                },
                Cloud::Span {
                    begin: b1,
                    words: w1,
                },
            ) => b0
                .cmp(b1)
                .then(w0.len().cmp(&w1.len()))
                .then_with(|| w0.cmp(w1)),
        }
    }
}

impl Ord for Cloud {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

impl PartialOrd for Cloud {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl BitOr for &Cloud {
    type Output = Cloud;

    fn bitor(self, other: &Cloud) -> Cloud {
        match (self, other) {
            (Cloud::Full, _) | (_, Cloud::Full) => Cloud::Full,
            (Cloud::Empty, c) | (c, Cloud::Empty) => c.clone(),
            (
                Cloud::Span {
                    begin: b0,
                    words: w0,
                },
                Cloud::Span {
                    begin: b1,
                    words: w1,
                },
            ) => {
                let begin = (*b0).min(*b1);
                let end = (b0 + w0.len() as u64 * WORD_BITS).max(b1 + w1.len() as u64 * WORD_BITS);
                let len = (end - begin).div_ceil(WORD_BITS) as usize;
                let mut words = Vec::with_capacity(len);
                for k in 0..len {
                    let pos = (begin + k as u64 * WORD_BITS) as i64;
                    words.push(window(w0, pos - *b0 as i64) | window(w1, pos - *b1 as i64));
                }
                while words.last() == Some(&0) {
                    words.pop();
                }
                // begin is the smaller operand's least member, so bit 0 of
                // words[0] is set and the span is canonical.
                Cloud::Span { begin, words }
            }
        }
    }
}

impl BitOrAssign<&Cloud> for Cloud {
    fn bitor_assign(&mut self, other: &Cloud) {
        *self = &*self | other;
    }
}
