//! Turning a solve report into a benchmark record.

use crate::builder::ObjectiveKind;
use crate::outcome::{SolveReport, SolverOutcome};
use crate::params::TournamentParameters;
use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Final state of the certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    ProvedOptimal,
    ProvedInfeasible,
    FoundFeasible,
    TimedOut,
}

/// Persisted result of one (team count, configuration) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub time :f64,
    pub optimal :bool,
    pub obj :Option<u32>,
    pub sol :Schedule,
}

impl BenchmarkRecord {
    /// The record of a run that failed without a usable answer.
    pub fn failure(time_limit :Duration) -> Self {
        BenchmarkRecord { time: time_limit.as_secs_f64(), optimal: false, obj: None, sol: Schedule::empty() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Certifier {
    pub params :TournamentParameters,
    pub objective :ObjectiveKind,
    pub time_limit :Duration,
    /// Read "no schedule in under a second" as infeasible. Only for
    /// backends that can fail silently on an infeasible model.
    pub fast_empty_is_infeasible :bool,
}

const FAST_ANSWER :Duration = Duration::from_secs(1);

impl Certifier {
    pub fn new(params :TournamentParameters, objective :ObjectiveKind, time_limit :Duration) -> Self {
        Certifier { params, objective, time_limit, fast_empty_is_infeasible: false }
    }

    pub fn verdict(&self, report :&SolveReport) -> Verdict {
        if report.elapsed >= self.time_limit {
            return Verdict::TimedOut;
        }
        match &report.outcome {
            SolverOutcome::Infeasible => Verdict::ProvedInfeasible,
            SolverOutcome::Optimal(i) => match self.objective {
                ObjectiveKind::Satisfy if i.schedule.is_complete() => Verdict::ProvedOptimal,
                ObjectiveKind::MinimizeBreaks if i.objective == Some(self.params.break_lower_bound()) => {
                    Verdict::ProvedOptimal
                }
                _ => Verdict::FoundFeasible,
            },
            SolverOutcome::Feasible(i) => match self.objective {
                ObjectiveKind::Satisfy if i.schedule.is_complete() => Verdict::ProvedOptimal,
                _ => Verdict::FoundFeasible,
            },
            SolverOutcome::Timeout(None) if self.fast_empty_is_infeasible && report.elapsed < FAST_ANSWER => {
                Verdict::ProvedInfeasible
            }
            SolverOutcome::Timeout(_) => Verdict::TimedOut,
        }
    }

    pub fn certify(&self, report :&SolveReport) -> BenchmarkRecord {
        let verdict = self.verdict(report);
        let incumbent = report.outcome.incumbent().filter(|i| i.schedule.is_complete());

        let (sol, obj) = match (verdict, incumbent) {
            (Verdict::ProvedInfeasible, _) | (_, None) => (Schedule::empty(), None),
            (_, Some(i)) => (i.schedule.clone(), i.objective),
        };
        let time = match verdict {
            Verdict::TimedOut => self.time_limit.as_secs_f64(),
            _ => report.elapsed.min(self.time_limit).as_secs_f64(),
        };
        let optimal = match verdict {
            Verdict::ProvedOptimal | Verdict::ProvedInfeasible => true,
            Verdict::FoundFeasible | Verdict::TimedOut => false,
        };

        BenchmarkRecord { time, optimal, obj, sol }
    }
}
