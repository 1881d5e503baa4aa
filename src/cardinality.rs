//! Clausal encodings of cardinality constraints.

use crate::model::{Cmp, Lit, Model};
use itertools::Itertools;

/// How "exactly one" is turned into clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// One binary clause per pair, O(k^2) clauses and no auxiliary variables.
    Pairwise,
    /// Recursive split on groups of three with one auxiliary variable per
    /// group, O(k) clauses and O(k) auxiliary variables.
    Compact,
}

impl Default for Encoding {
    fn default() -> Self { Encoding::Pairwise }
}

fn fresh_aux(model :&mut Model, tag :&str) -> Lit {
    let name = format!("{}_{}", tag, model.num_vars());
    Lit::pos(model.new_var(name))
}

pub fn at_least_one(model :&mut Model, lits :&[Lit]) {
    model.add_clause(lits.iter().copied());
}

pub fn at_most_one_pairwise(model :&mut Model, lits :&[Lit]) {
    for (a, b) in lits.iter().copied().tuple_combinations() {
        model.add_clause(vec![!a, !b]);
    }
}

pub fn at_most_one_compact(model :&mut Model, lits :&[Lit]) {
    if lits.len() <= 4 {
        at_most_one_pairwise(model, lits);
        return;
    }

    // y is true only if none of the first three is, and the tail may only
    // contain a true literal when y is true.
    let y = fresh_aux(model, "amo");
    let mut head = lits[..3].to_vec();
    head.push(y);
    at_most_one_pairwise(model, &head);

    let mut tail = Vec::with_capacity(lits.len() - 2);
    tail.push(!y);
    tail.extend_from_slice(&lits[3..]);
    at_most_one_compact(model, &tail);
}

pub fn at_most_one(model :&mut Model, lits :&[Lit], encoding :Encoding) {
    match encoding {
        Encoding::Pairwise => at_most_one_pairwise(model, lits),
        Encoding::Compact => at_most_one_compact(model, lits),
    }
}

pub fn exactly_one(model :&mut Model, lits :&[Lit], encoding :Encoding) {
    at_least_one(model, lits);
    at_most_one(model, lits, encoding);
}

/// Sequential counter over `lits`. Output `j` is equivalent to "at least
/// `j+1` of the literals are true", for `j < min(cap, lits.len())`.
pub fn sequential_counter(model :&mut Model, lits :&[Lit], cap :usize) -> Vec<Lit> {
    let cap = cap.min(lits.len());
    let mut prev :Vec<Lit> = Vec::new();

    for (i, x) in lits.iter().copied().enumerate() {
        let width = (i + 1).min(cap);
        let mut cur = Vec::with_capacity(width);
        for j in 0..width {
            let s = fresh_aux(model, "cnt");
            let carry = prev.get(j).copied();
            let below = if j > 0 { Some(prev[j - 1]) } else { None };

            // s <- carry \/ (x /\ below)
            if let Some(c) = carry {
                model.add_clause(vec![!c, s]);
            }
            match below {
                Some(b) => model.add_clause(vec![!x, !b, s]),
                None => model.add_clause(vec![!x, s]),
            }

            // s -> carry \/ (x /\ below)
            model.add_clause(once_with(carry, vec![!s, x]));
            if let Some(b) = below {
                model.add_clause(once_with(carry, vec![!s, b]));
            }

            cur.push(s);
        }
        prev = cur;
    }

    prev
}

fn once_with(extra :Option<Lit>, mut lits :Vec<Lit>) -> Vec<Lit> {
    lits.extend(extra);
    lits
}

/// Clausal form of `count(lits) cmp rhs`. Returns the counter outputs so
/// callers can reuse them as bound literals.
pub fn count(model :&mut Model, lits :&[Lit], cmp :Cmp, rhs :u32) -> Vec<Lit> {
    let rhs = rhs as usize;
    let need_lower = cmp != Cmp::Le && rhs > 0;
    let need_upper = cmp != Cmp::Ge && rhs < lits.len();

    if need_lower && rhs > lits.len() {
        model.add_clause(std::iter::empty::<Lit>());
        return Vec::new();
    }
    if !need_lower && !need_upper {
        return Vec::new();
    }

    let outputs = sequential_counter(model, lits, rhs + 1);
    if need_lower {
        model.add_clause(vec![outputs[rhs - 1]]);
    }
    if need_upper {
        model.add_clause(vec![!outputs[rhs]]);
    }
    outputs
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Var;
    use proptest::prelude::*;

    /// Is there an assignment to every variable after the first
    /// `fixed.len()` that satisfies the model, given the fixed prefix?
    pub(crate) fn extendable(model :&Model, fixed :&[bool]) -> bool {
        let free = model.num_vars() - fixed.len();
        assert!(free <= 20);
        let mut values = fixed.to_vec();
        values.resize(model.num_vars(), false);
        for bits in 0u32..(1 << free) {
            for k in 0..free {
                values[fixed.len() + k] = bits & (1 << k) != 0;
            }
            if model.holds(&values) {
                return true;
            }
        }
        false
    }

    fn props(k :usize) -> (Model, Vec<Lit>) {
        let mut m = Model::new();
        let lits = (0..k).map(|i| Lit::pos(m.new_var(format!("x{}", i)))).collect();
        (m, lits)
    }

    fn accepts(encoding :Encoding, k :usize, pattern :&[bool]) -> bool {
        let (mut m, lits) = props(k);
        exactly_one(&mut m, &lits, encoding);
        extendable(&m, pattern)
    }

    #[test]
    fn exactly_one_accepts_only_single_true() {
        for k in vec![1, 3, 4, 5, 10] {
            for encoding in vec![Encoding::Pairwise, Encoding::Compact] {
                for i in 0..k {
                    let mut pattern = vec![false; k];
                    pattern[i] = true;
                    assert!(accepts(encoding, k, &pattern), "{:?} k={} rejects {:?}", encoding, k, pattern);
                }
                assert!(!accepts(encoding, k, &vec![false; k]), "{:?} k={} accepts none", encoding, k);
                if k >= 2 {
                    let mut two = vec![false; k];
                    two[0] = true;
                    two[k - 1] = true;
                    assert!(!accepts(encoding, k, &two), "{:?} k={} accepts two", encoding, k);
                    assert!(!accepts(encoding, k, &vec![true; k]), "{:?} k={} accepts all", encoding, k);
                }
            }
        }
    }

    #[test]
    fn compact_is_linear() {
        let (mut m, lits) = props(30);
        at_most_one_compact(&mut m, &lits);
        let aux = m.num_vars() - 30;
        assert!(aux > 0 && aux < 30);
        assert!(m.constraints().len() < 30 * 6);

        let (mut m, lits) = props(30);
        at_most_one_pairwise(&mut m, &lits);
        assert_eq!(m.num_vars(), 30);
        assert_eq!(m.constraints().len(), 30 * 29 / 2);
    }

    #[test]
    fn small_inputs_need_no_auxiliaries() {
        let (mut m, lits) = props(4);
        at_most_one_compact(&mut m, &lits);
        assert_eq!(m.num_vars(), 4);
        let (mut m, lits) = props(1);
        exactly_one(&mut m, &lits, Encoding::Compact);
        assert_eq!(m.constraints().len(), 1);
    }

    #[test]
    fn counter_outputs_track_the_sum() {
        let k = 4;
        for bits in 0u32..(1 << k) {
            let (mut m, lits) = props(k);
            let outputs = sequential_counter(&mut m, &lits, 3);
            assert_eq!(outputs.len(), 3);
            let pattern = (0..k).map(|i| bits & (1 << i) != 0).collect::<Vec<_>>();
            let ones = bits.count_ones() as usize;
            for (j, o) in outputs.iter().enumerate() {
                // Pin the output to the wrong value; the counter must reject it.
                let mut pinned = m.clone();
                pinned.add_clause(vec![if ones >= j + 1 { !*o } else { *o }]);
                assert!(!extendable(&pinned, &pattern), "bits {:b} output {}", bits, j);
            }
            assert!(extendable(&m, &pattern));
        }
    }

    #[test]
    fn count_constraints() {
        for cmp in vec![Cmp::Le, Cmp::Eq, Cmp::Ge] {
            for rhs in 0..=5u32 {
                for bits in 0u32..(1 << 4) {
                    let (mut m, lits) = props(4);
                    count(&mut m, &lits, cmp, rhs);
                    let pattern = (0..4).map(|i| bits & (1 << i) != 0).collect::<Vec<_>>();
                    assert_eq!(
                        extendable(&m, &pattern),
                        cmp.holds(bits.count_ones(), rhs),
                        "{:?} {} bits {:b}", cmp, rhs, bits
                    );
                }
            }
        }
    }

    proptest! {
        #[test]
        fn encodings_agree(pattern in proptest::collection::vec(any::<bool>(), 1..12)) {
            let k = pattern.len();
            let expected = pattern.iter().filter(|b| **b).count() == 1;
            prop_assert_eq!(accepts(Encoding::Pairwise, k, &pattern), expected);
            prop_assert_eq!(accepts(Encoding::Compact, k, &pattern), expected);
        }
    }

    #[test]
    fn aux_names_are_unique() {
        let (mut m, lits) = props(12);
        at_most_one_compact(&mut m, &lits);
        let names = m.vars().map(|v :Var| m.name(v).to_string()).collect::<Vec<_>>();
        assert_eq!(names.iter().unique().count(), names.len());
    }
}
