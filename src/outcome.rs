use crate::schedule::Schedule;
use std::time::Duration;
use thiserror::Error;

/// Best schedule known for a solve attempt, with the break count the
/// backend reported or that was recomputed from the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incumbent {
    pub schedule :Schedule,
    pub objective :Option<u32>,
}

/// Canonical result of a solve attempt, independent of the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverOutcome {
    /// The backend finished its search: for a satisfaction model the
    /// schedule exists, for an optimisation model no better one does.
    Optimal(Incumbent),
    /// A schedule without a completed search.
    Feasible(Incumbent),
    /// Proven that no schedule exists.
    Infeasible,
    /// Budget exhausted, with the last incumbent if the backend reported one.
    Timeout(Option<Incumbent>),
}

impl SolverOutcome {
    pub fn incumbent(&self) -> Option<&Incumbent> {
        match self {
            SolverOutcome::Optimal(i) | SolverOutcome::Feasible(i) => Some(i),
            SolverOutcome::Timeout(i) => i.as_ref(),
            SolverOutcome::Infeasible => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            SolverOutcome::Optimal(_) => "optimal",
            SolverOutcome::Feasible(_) => "feasible",
            SolverOutcome::Infeasible => "infeasible",
            SolverOutcome::Timeout(_) => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveReport {
    pub outcome :SolverOutcome,
    pub elapsed :Duration,
}

/// Per-call solver settings. Every adapter receives this value explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    pub time_limit :Duration,
    pub threads :usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig { time_limit: Duration::from_secs(300), threads: 1 }
    }
}

impl SolverConfig {
    pub fn with_time_limit(secs :u64) -> Self {
        SolverConfig { time_limit: Duration::from_secs(secs), ..Default::default() }
    }
}

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("could not start {program}: {source}")]
    Spawn { program :String, source :std::io::Error },
    #[error("{program} exited with {status}: {stderr}")]
    Crashed { program :String, status :String, stderr :String },
    #[error("unrecognized solver output: {0}")]
    UnrecognizedOutput(String),
    #[error("solver panicked: {0}")]
    Panicked(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("schedule extraction failed: {0}")]
    Extract(#[from] crate::extract::ExtractError),
}
