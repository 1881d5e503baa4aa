//! Lowering of a [`Model`] to plain clauses.

use crate::cardinality::{self, Encoding};
use crate::model::{Constraint, Lit, Model};
use log::*;

#[derive(Debug, Clone)]
pub struct Cnf {
    /// The decision variables followed by the encoders' auxiliaries. Holds
    /// only clauses.
    pub model :Model,
    /// Number of variables of the source model.
    pub decision_vars :usize,
    /// `objective_counter[j]` holds iff at least `j+1` objective literals do.
    pub objective_counter :Vec<Lit>,
}

impl Cnf {
    pub fn clauses(&self) -> impl Iterator<Item = &[Lit]> {
        self.model.constraints().iter().filter_map(|c| match c {
            Constraint::Clause(lits) => Some(lits.as_slice()),
            _ => None,
        })
    }

    pub fn num_clauses(&self) -> usize { self.model.constraints().len() }
}

pub fn lower(model :&Model, encoding :Encoding) -> Cnf {
    let mut out = model.variables_only();
    for c in model.constraints() {
        match c {
            Constraint::Clause(lits) => out.add_clause(lits.iter().copied()),
            Constraint::ExactlyOne(lits) => cardinality::exactly_one(&mut out, lits, encoding),
            Constraint::Count { lits, cmp, rhs } => {
                cardinality::count(&mut out, lits, *cmp, *rhs);
            }
        }
    }

    let mut objective_counter = Vec::new();
    if let Some(o) = model.objective() {
        objective_counter = cardinality::sequential_counter(&mut out, &o.lits, o.upper as usize + 1);
        let lower = o.lower as usize;
        if lower > o.lits.len() {
            out.add_clause(std::iter::empty::<Lit>());
        } else if lower > 0 {
            out.add_clause(vec![objective_counter[lower - 1]]);
        }
        if let Some(over) = objective_counter.get(o.upper as usize) {
            out.add_clause(vec![!*over]);
        }
    }

    debug!("Lowered {} constraints over {} vars to {} clauses over {} vars ({:?})",
           model.constraints().len(), model.num_vars(), out.constraints().len(), out.num_vars(), encoding);

    Cnf { model: out, decision_vars: model.num_vars(), objective_counter }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::cardinality::tests::extendable;
    use crate::model::{Cmp, Objective};
    use crate::params::TournamentParameters;

    fn assignments(k :usize) -> impl Iterator<Item = Vec<bool>> {
        (0u32..(1 << k)).map(move |bits| (0..k).map(|i| bits & (1 << i) != 0).collect())
    }

    #[test]
    fn two_teams_lower_exactly() {
        let params = TournamentParameters::new(2).unwrap();
        for encoding in vec![Encoding::Pairwise, Encoding::Compact] {
            for sb in vec![false, true] {
                let sts = build(params, ModelOptions { objective: ObjectiveKind::MinimizeBreaks, symmetry_breaking: sb });
                let cnf = lower(&sts.model, encoding);
                assert!(cnf.clauses().count() == cnf.num_clauses());
                for values in assignments(sts.model.num_vars()) {
                    assert_eq!(sts.model.holds(&values), extendable(&cnf.model, &values), "{:?}", values);
                }
            }
        }
    }

    #[test]
    fn mixed_constraints_lower_exactly() {
        let mut m = Model::new();
        let x = (0..5).map(|i| Lit::pos(m.new_var(format!("x{}", i)))).collect::<Vec<_>>();
        m.add_exactly_one(vec![x[0], x[1], x[2]]);
        m.add_count(vec![x[1], x[2], x[3], x[4]], Cmp::Ge, 2);
        m.add_clause(vec![!x[0], x[4]]);
        m.set_objective(Objective { lits: vec![x[2], x[3], x[4]], lower: 1, upper: 2 });

        for encoding in vec![Encoding::Pairwise, Encoding::Compact] {
            let cnf = lower(&m, encoding);
            assert_eq!(cnf.decision_vars, 5);
            assert_eq!(cnf.objective_counter.len(), 3);
            for values in assignments(5) {
                assert_eq!(m.holds(&values), extendable(&cnf.model, &values), "{:?}", values);
            }
        }
    }

    #[test]
    fn unreachable_lower_bound() {
        let mut m = Model::new();
        let a = m.new_var("a");
        m.set_objective(Objective { lits: vec![a.into()], lower: 2, upper: 3 });
        let cnf = lower(&m, Encoding::Pairwise);
        assert!(cnf.clauses().any(|c| c.is_empty()));
    }
}
