//! CP backend: MiniZinc run as a subprocess.
//!
//! The integer model is generated from the tournament parameters and the
//! configuration's options, and prints its solution as `Period k: a v b ...`
//! lines that the log extractor reads back.

use super::{run_with_deadline, SolverAdapter, DEADLINE_GRACE};
use crate::builder::{ObjectiveKind, StsModel};
use crate::config::{CpOptions, SearchStrategy};
use crate::extract::parse_minizinc_log;
use crate::outcome::*;
use crate::params::TournamentParameters;
use log::*;
use std::fmt::Write;
use std::path::PathBuf;

pub struct MiniZincAdapter {
    pub binary :PathBuf,
    pub options :CpOptions,
}

fn search_annotation(options :&CpOptions) -> String {
    let (var, val) = match options.search {
        SearchStrategy::Base => return String::new(),
        SearchStrategy::FirstFail => ("first_fail", "indomain_min"),
        SearchStrategy::Random => ("first_fail", "indomain_random"),
        SearchStrategy::DomWDeg => ("dom_w_deg", "indomain_min"),
        SearchStrategy::DomWDegRandom => ("dom_w_deg", "indomain_random"),
    };
    let mut s = format!(
        " :: seq_search([\n    int_search([opp[w,t] | w in WEEKS, t in TEAMS], {var}, {val}),\n    \
         int_search([per[w,t] | w in WEEKS, t in TEAMS], {var}, {val}),\n    \
         bool_search([home[w,t] | w in WEEKS, t in TEAMS], input_order, indomain_max)])",
        var = var, val = val);
    if options.luby_restarts {
        s.push_str(" :: restart_luby(250)");
    }
    s
}

/// MiniZinc source for the tournament. Teams, weeks and periods are
/// 1-indexed.
pub fn render_model(params :TournamentParameters, objective :ObjectiveKind, symmetry_breaking :bool, options :&CpOptions)
    -> String
{
    let mut m = String::new();
    // Writing to a String cannot fail.
    let _ = write_model(&mut m, params, objective, symmetry_breaking, options);
    m
}

fn write_model(m :&mut String, params :TournamentParameters, objective :ObjectiveKind, symmetry_breaking :bool,
               options :&CpOptions) -> std::fmt::Result {
    writeln!(m, "include \"alldifferent.mzn\";")?;
    writeln!(m, "int: n = {};", params.teams())?;
    writeln!(m, "int: W = n - 1;\nint: P = n div 2;")?;
    writeln!(m, "set of int: TEAMS = 1..n;\nset of int: WEEKS = 1..W;\nset of int: PERIODS = 1..P;")?;
    writeln!(m)?;
    writeln!(m, "array[WEEKS, TEAMS] of var TEAMS: opp;")?;
    writeln!(m, "array[WEEKS, TEAMS] of var bool: home;")?;
    writeln!(m, "array[WEEKS, TEAMS] of var PERIODS: per;")?;
    writeln!(m, "array[PERIODS, WEEKS] of var TEAMS: hteam;")?;
    writeln!(m, "array[PERIODS, WEEKS] of var TEAMS: ateam;")?;
    writeln!(m)?;

    writeln!(m, "constraint forall(w in WEEKS, t in TEAMS)(opp[w,t] != t /\\ opp[w, opp[w,t]] = t);")?;
    writeln!(m, "constraint forall(i, j in TEAMS where i < j)(sum(w in WEEKS)(bool2int(opp[w,i] = j)) = 1);")?;
    writeln!(m, "constraint forall(w in WEEKS, t in TEAMS)(per[w, opp[w,t]] = per[w,t]);")?;
    writeln!(m, "constraint forall(w in WEEKS, p in PERIODS)(sum(t in TEAMS)(bool2int(per[w,t] = p)) = 2);")?;
    writeln!(m, "constraint forall(w in WEEKS, t in TEAMS)(home[w, opp[w,t]] != home[w,t]);")?;
    writeln!(m, "constraint forall(t in TEAMS, p in PERIODS)(sum(w in WEEKS)(bool2int(per[w,t] = p)) <= 2);")?;
    writeln!(m, "constraint forall(w in WEEKS, t in TEAMS)(")?;
    writeln!(m, "    (home[w,t] -> hteam[per[w,t], w] = t) /\\ (not home[w,t] -> ateam[per[w,t], w] = t));")?;
    if options.implied {
        writeln!(m, "constraint forall(t in TEAMS)(alldifferent([opp[w,t] | w in WEEKS]));")?;
    }
    if symmetry_breaking {
        writeln!(m, "constraint opp[1,1] = 2 /\\ home[1,1] /\\ per[1,1] = 1 /\\ per[1,2] = 1;")?;
        writeln!(m, "constraint forall(w in 1..W-1)(opp[w,1] < opp[w+1,1]);")?;
    }
    writeln!(m)?;

    let search = search_annotation(options);
    match objective {
        ObjectiveKind::Satisfy => {
            writeln!(m, "solve{} satisfy;", search)?;
        }
        ObjectiveKind::MinimizeBreaks => {
            writeln!(m, "var int: obj = sum(w in 2..W, t in TEAMS)(bool2int(home[w,t] = home[w-1,t]));")?;
            writeln!(m, "constraint obj >= n - 2 /\\ obj <= (n - 2) * (n - 1);")?;
            writeln!(m, "solve{} minimize obj;", search)?;
        }
    }
    writeln!(m)?;

    writeln!(m, "output [\"Period \\(p):\" ++ concat([\" \\(hteam[p,w]) v \\(ateam[p,w])\" | w in WEEKS]) ++ \"\\n\" | p in PERIODS]")?;
    if objective == ObjectiveKind::MinimizeBreaks {
        writeln!(m, "    ++ [\"obj = \\(obj)\\n\"]")?;
    }
    writeln!(m, "    ;")?;
    Ok(())
}

impl SolverAdapter for MiniZincAdapter {
    fn solve(&self, sts :&StsModel, config :&SolverConfig) -> Result<SolveReport, SolveError> {
        let objective = sts.options.objective;
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("sts.mzn");
        std::fs::write(&path, render_model(sts.params, objective, sts.options.symmetry_breaking, &self.options))?;

        let mut args = vec![
            "--solver".to_string(), self.options.solver.id().to_string(),
            "--time-limit".to_string(), config.time_limit.as_millis().to_string(),
            "-p".to_string(), config.threads.to_string(),
        ];
        if objective.is_optimization() {
            args.push("-i".to_string());
        }
        args.push(path.display().to_string());
        debug!("Running {:?} {:?}", self.binary, args);

        let out = run_with_deadline(&self.binary, &args, config.time_limit + DEADLINE_GRACE)?;
        if !out.killed() {
            out.check(&self.binary)?;
        }
        let outcome = parse_minizinc_log(&out.stdout, sts.params, objective);
        info!("MiniZinc ({}) finished with {} in {:.2}s", self.options.solver.id(), outcome.status(),
              out.elapsed.as_secs_f64());
        Ok(SolveReport { outcome, elapsed: out.elapsed })
    }
}
