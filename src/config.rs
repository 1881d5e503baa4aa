//! Named benchmark configurations.
//!
//! A configuration fixes the backend, the model variant and the backend's
//! knobs. Its name is the key under which results are stored, so names must
//! stay stable.

use crate::builder::{ModelOptions, ObjectiveKind};
use crate::cardinality::Encoding;
use itertools::iproduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpSolver {
    Gecode,
    Chuffed,
    OrTools,
}

impl CpSolver {
    /// Solver id passed to `minizinc --solver`.
    pub fn id(self) -> &'static str {
        match self {
            CpSolver::Gecode => "gecode",
            CpSolver::Chuffed => "chuffed",
            CpSolver::OrTools => "com.google.ortools.sat",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            CpSolver::Gecode => "gecode",
            CpSolver::Chuffed => "chuffed",
            CpSolver::OrTools => "ortools",
        }
    }
}

/// Variable and value selection for the CP search annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    /// No annotation, the solver's default search.
    Base,
    FirstFail,
    /// Random variable and value choice.
    Random,
    DomWDeg,
    DomWDegRandom,
}

impl SearchStrategy {
    fn tag(self) -> &'static str {
        match self {
            SearchStrategy::Base => "base",
            SearchStrategy::FirstFail => "ff",
            SearchStrategy::Random => "rand",
            SearchStrategy::DomWDeg => "dwd",
            SearchStrategy::DomWDegRandom => "dwd_rand",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpOptions {
    pub solver :CpSolver,
    pub search :SearchStrategy,
    pub luby_restarts :bool,
    /// Post all-different over each team's opponents on top of the
    /// round-robin constraints.
    pub implied :bool,
}

/// Solver the LP file is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipSolver {
    Cbc,
    Scip,
    Highs,
}

impl MipSolver {
    pub fn tag(self) -> &'static str {
        match self {
            MipSolver::Cbc => "CBC",
            MipSolver::Scip => "SCIP",
            MipSolver::Highs => "HiGHS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Sat { encoding :Encoding },
    Smt,
    Cp(CpOptions),
    Mip { solver :MipSolver },
}

impl Backend {
    /// Directory the results of this backend are stored under.
    pub fn family(&self) -> &'static str {
        match self {
            Backend::Sat { .. } => "SAT",
            Backend::Smt => "SMT",
            Backend::Cp(_) => "CP",
            Backend::Mip { .. } => "MIP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub name :String,
    pub backend :Backend,
    pub options :ModelOptions,
}

impl Configuration {
    pub fn family(&self) -> &'static str { self.backend.family() }
    pub fn objective(&self) -> ObjectiveKind { self.options.objective }
}

fn objective_tag(objective :ObjectiveKind) -> &'static str {
    match objective {
        ObjectiveKind::Satisfy => "satisf",
        ObjectiveKind::MinimizeBreaks => "opt",
    }
}

fn sat(objective :ObjectiveKind, encoding :Encoding, symmetry_breaking :bool) -> Configuration {
    let mut name = format!("sat_{}", objective_tag(objective));
    if encoding == Encoding::Compact {
        name.push_str("_compact");
    }
    if symmetry_breaking {
        name.push_str("_sb");
    }
    Configuration {
        name,
        backend: Backend::Sat { encoding },
        options: ModelOptions { objective, symmetry_breaking },
    }
}

fn smt(objective :ObjectiveKind, symmetry_breaking :bool) -> Configuration {
    let name = format!("smt_{}{}", objective_tag(objective), if symmetry_breaking { "_sb" } else { "" });
    Configuration { name, backend: Backend::Smt, options: ModelOptions { objective, symmetry_breaking } }
}

fn cp(objective :ObjectiveKind, cp :CpOptions, symmetry_breaking :bool) -> Configuration {
    let mut name = format!("{}_{}_{}", cp.solver.tag(), objective_tag(objective), cp.search.tag());
    if cp.implied {
        name.push_str("_impl");
    }
    if cp.luby_restarts {
        name.push_str("_luby");
    }
    if symmetry_breaking {
        name.push_str("_sb");
    }
    Configuration { name, backend: Backend::Cp(cp), options: ModelOptions { objective, symmetry_breaking } }
}

fn mip(objective :ObjectiveKind, solver :MipSolver, symmetry_breaking :bool) -> Configuration {
    let name = format!("mip_{}_{}{}", objective_tag(objective), solver.tag(), if symmetry_breaking { "_SB" } else { "" });
    Configuration {
        name,
        backend: Backend::Mip { solver },
        options: ModelOptions { objective, symmetry_breaking },
    }
}

/// Every known configuration, in batch order.
pub fn registry() -> Vec<Configuration> {
    use ObjectiveKind::*;
    use SearchStrategy::*;
    let mut all = Vec::new();

    for (objective, encoding, sb) in iproduct!(
        vec![Satisfy, MinimizeBreaks],
        vec![Encoding::Pairwise, Encoding::Compact],
        vec![false, true]
    ) {
        all.push(sat(objective, encoding, sb));
    }

    for (objective, sb) in iproduct!(vec![Satisfy, MinimizeBreaks], vec![false, true]) {
        all.push(smt(objective, sb));
    }

    let opts = |solver, search, luby_restarts, implied| CpOptions { solver, search, luby_restarts, implied };
    let satisfaction = vec![
        (CpSolver::Chuffed, vec![Base, FirstFail, Random]),
        (CpSolver::Gecode, vec![Base, FirstFail, DomWDeg, DomWDegRandom]),
        (CpSolver::OrTools, vec![Base, FirstFail, DomWDeg]),
    ];
    for (solver, searches) in satisfaction {
        for (sb, search) in iproduct!(vec![false, true], searches) {
            all.push(cp(Satisfy, opts(solver, search, false, false), sb));
        }
    }

    let optimisation = vec![
        (opts(CpSolver::Chuffed, FirstFail, false, false), true),
        (opts(CpSolver::Chuffed, FirstFail, true, false), true),
        (opts(CpSolver::Chuffed, Random, false, false), true),
        (opts(CpSolver::Chuffed, Random, true, false), true),
        (opts(CpSolver::Gecode, FirstFail, false, true), true),
        (opts(CpSolver::Gecode, FirstFail, false, true), false),
        (opts(CpSolver::Gecode, FirstFail, true, true), true),
        (opts(CpSolver::Gecode, DomWDeg, false, true), true),
        (opts(CpSolver::Gecode, DomWDeg, false, true), false),
        (opts(CpSolver::Gecode, DomWDeg, true, true), true),
        (opts(CpSolver::OrTools, FirstFail, false, false), true),
        (opts(CpSolver::OrTools, DomWDeg, false, false), true),
    ];
    for (o, sb) in optimisation {
        all.push(cp(MinimizeBreaks, o, sb));
    }

    for (solver, objective, sb) in iproduct!(
        vec![MipSolver::Cbc, MipSolver::Scip, MipSolver::Highs],
        vec![Satisfy, MinimizeBreaks],
        vec![false, true]
    ) {
        all.push(mip(objective, solver, sb));
    }

    all
}

pub fn find(name :&str) -> Option<Configuration> {
    registry().into_iter().find(|c| c.name == name)
}
