//! In-process SAT backend on CaDiCaL.

use super::{minimise, satisfy, Answer, SolverAdapter};
use crate::builder::StsModel;
use crate::cardinality::Encoding;
use crate::cnf::{self, Cnf};
use crate::extract::incumbent_from_values;
use crate::model::Lit;
use crate::outcome::*;
use log::*;
use satcoder::solvers::cadical::{Cadical as Solver, Timeout};
use satcoder::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

pub struct SatAdapter {
    pub encoding :Encoding,
}

fn bool_of<L :satcoder::Lit>(vars :&[Bool<L>], l :Lit) -> Bool<L> {
    let v = vars[l.var().index()];
    if l.is_positive() { v } else { !v }
}

/// Declare the variables and clauses of `cnf` in `solver`. Returns the
/// solver literal of every model variable.
pub fn emit<L :satcoder::Lit>(solver :&mut impl SatInstance<L>, cnf :&Cnf) -> Vec<Bool<L>> {
    let vars = cnf.model.vars().map(|_| SatInstance::new_var(solver)).collect::<Vec<_>>();
    for clause in cnf.clauses() {
        SatInstance::add_clause(solver, clause.iter().map(|l| bool_of(&vars, *l)).collect::<Vec<_>>());
    }
    vars
}

/// DIMACS text of the lowered model.
pub fn to_dimacs(sts :&StsModel, encoding :Encoding) -> Result<String, std::fmt::Error> {
    let cnf = cnf::lower(&sts.model, encoding);
    let mut problem = satcoder::dimacsoutput::DimacsOutput::new();
    emit(&mut problem, &cnf);
    let mut out = String::new();
    problem.write(&mut out).map_err(|_| std::fmt::Error)?;
    Ok(out)
}

enum Step {
    Sat(Vec<bool>),
    Unsat,
    Interrupted,
}

/// One solver call with the remaining budget installed as a callback.
/// Values are returned for the decision variables only.
fn step(solver :&mut Solver, vars :&[Bool<<Solver as SatSolverWithCore>::Lit>], decisions :usize, budget :Duration) -> Step {
    solver.cadical.set_callbacks(Some(Timeout::new(budget.as_secs_f32())));
    let result = catch_unwind(AssertUnwindSafe(|| match solver.solve_with_assumptions(std::iter::empty()) {
        SatResultWithCore::Sat(model) => Some(vars[..decisions].iter().map(|v| model.value(v)).collect::<Vec<bool>>()),
        SatResultWithCore::Unsat(_) => None,
    }));
    solver.cadical.set_callbacks(None);
    match result {
        Ok(Some(values)) => Step::Sat(values),
        Ok(None) => Step::Unsat,
        Err(_) => Step::Interrupted,
    }
}

impl SolverAdapter for SatAdapter {
    fn solve(&self, sts :&StsModel, config :&SolverConfig) -> Result<SolveReport, SolveError> {
        let start = Instant::now();
        let cnf = cnf::lower(&sts.model, self.encoding);
        let mut solver = Solver::new();
        let vars = emit(&mut solver, &cnf);
        info!("SAT problem has vars {} clauses {}", solver.cadical.num_variables(), solver.cadical.num_clauses());

        let mut call = |bound :Option<u32>, budget :Duration| -> Result<Answer, SolveError> {
            // at most bound-1 breaks from now on
            if let Some(o) = bound.and_then(|b| cnf.objective_counter.get(b as usize - 1)) {
                SatInstance::add_clause(&mut solver, vec![!bool_of(&vars, *o)]);
            }
            Ok(match step(&mut solver, &vars, cnf.decision_vars, budget) {
                Step::Sat(values) => Answer::Found(incumbent_from_values(sts, &values)?),
                Step::Unsat => Answer::Unsat,
                Step::Interrupted => Answer::Interrupted,
            })
        };

        let outcome = match sts.model.objective() {
            None => satisfy(config.time_limit, start, |budget| call(None, budget))?,
            Some(o) => minimise(o.lower, config.time_limit, start, call)?,
        };
        Ok(SolveReport { outcome, elapsed: start.elapsed() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::params::TournamentParameters;

    fn model(n :usize, objective :ObjectiveKind, symmetry_breaking :bool) -> StsModel {
        build(TournamentParameters::new(n).unwrap(), ModelOptions { objective, symmetry_breaking })
    }

    #[test]
    fn two_teams() {
        let sts = model(2, ObjectiveKind::Satisfy, false);
        let report = SatAdapter { encoding: Encoding::Pairwise }.solve(&sts, &SolverConfig::with_time_limit(30)).unwrap();
        match report.outcome {
            SolverOutcome::Optimal(i) => assert_eq!(i.schedule.verify(sts.params), Ok(())),
            x => panic!("{:?}", x),
        }
    }

    #[test]
    fn dimacs_export() {
        let sts = model(4, ObjectiveKind::Satisfy, true);
        let out = to_dimacs(&sts, Encoding::Compact).unwrap();
        assert!(!out.is_empty());
    }
}
