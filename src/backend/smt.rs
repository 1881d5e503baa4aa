//! SMT backend: an integer model in SMT-LIB2 (QF_LIA) solved by z3.
//!
//! Each call writes a fresh script and runs z3 on it. Optimisation passes
//! the incumbent's break count back as a strict bound on `obj`.

use super::{minimise, run_with_deadline, satisfy, Answer, SolverAdapter, DEADLINE_GRACE};
use crate::builder::{ObjectiveKind, StsModel};
use crate::extract::Assignment;
use crate::outcome::*;
use crate::params::TournamentParameters;
use log::*;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub struct SmtAdapter {
    pub binary :PathBuf,
}

fn opp_name(w :usize, t :usize) -> String { format!("opp_{}_{}", w, t) }
fn home_name(w :usize, t :usize) -> String { format!("home_{}_{}", w, t) }
fn per_name(w :usize, t :usize) -> String { format!("per_{}_{}", w, t) }

/// `(+ ...)` over 0/1 terms.
fn sum(terms :Vec<String>) -> String {
    match terms.len() {
        0 => "0".to_string(),
        1 => terms.into_iter().collect(),
        _ => format!("(+ {})", terms.join(" ")),
    }
}

fn indicator(cond :String) -> String { format!("(ite {} 1 0)", cond) }

/// SMT-LIB2 script for the tournament, 0-indexed. With `bound`, only
/// schedules with fewer than `bound` breaks are admitted.
pub fn render_script(params :TournamentParameters, objective :ObjectiveKind, symmetry_breaking :bool,
                     bound :Option<u32>) -> String {
    let mut s = String::new();
    // Writing to a String cannot fail.
    let _ = write_script(&mut s, params, objective, symmetry_breaking, bound);
    s
}

fn write_script(s :&mut String, params :TournamentParameters, objective :ObjectiveKind, symmetry_breaking :bool,
                bound :Option<u32>) -> std::fmt::Result {
    let (n, periods) = (params.teams(), params.periods());
    writeln!(s, "(set-logic QF_LIA)")?;
    writeln!(s, "(set-option :produce-models true)")?;
    for (w, t) in params.week_ids().flat_map(|w| params.team_ids().map(move |t| (w, t))) {
        writeln!(s, "(declare-fun {} () Int)", opp_name(w, t))?;
        writeln!(s, "(declare-fun {} () Bool)", home_name(w, t))?;
        writeln!(s, "(declare-fun {} () Int)", per_name(w, t))?;
    }

    for w in params.week_ids() {
        for t in params.team_ids() {
            writeln!(s, "(assert (and (<= 0 {o}) (< {o} {}) (distinct {o} {})))", n, t, o = opp_name(w, t))?;
            writeln!(s, "(assert (and (<= 0 {p}) (< {p} {})))", periods, p = per_name(w, t))?;
            for j in params.team_ids().filter(|j| *j != t) {
                writeln!(s, "(assert (=> (= {} {}) (and (= {} {}) (= {} {}) (distinct {} {}))))",
                         opp_name(w, t), j, opp_name(w, j), t, per_name(w, j), per_name(w, t), home_name(w, t), home_name(w, j))?;
            }
        }
        for p in params.period_ids() {
            let hosted = params.team_ids().map(|t| indicator(format!("(= {} {})", per_name(w, t), p))).collect();
            writeln!(s, "(assert (= {} 2))", sum(hosted))?;
        }
    }

    for i in params.team_ids() {
        for j in params.team_ids().filter(|j| *j > i) {
            let meetings = params.week_ids().map(|w| indicator(format!("(= {} {})", opp_name(w, i), j))).collect();
            writeln!(s, "(assert (= {} 1))", sum(meetings))?;
        }
        for p in params.period_ids() {
            let uses = params.week_ids().map(|w| indicator(format!("(= {} {})", per_name(w, i), p))).collect();
            writeln!(s, "(assert (<= {} 2))", sum(uses))?;
        }
    }

    if symmetry_breaking {
        writeln!(s, "(assert (= {} 1))", opp_name(0, 0))?;
        writeln!(s, "(assert {})", home_name(0, 0))?;
        writeln!(s, "(assert (= {} 0))", per_name(0, 0))?;
        for w in params.week_ids().skip(1) {
            writeln!(s, "(assert (< {} {}))", opp_name(w - 1, 0), opp_name(w, 0))?;
        }
    }

    let mut shown = params.week_ids()
        .flat_map(|w| params.team_ids().flat_map(move |t| vec![opp_name(w, t), home_name(w, t), per_name(w, t)]))
        .collect::<Vec<_>>();

    if objective.is_optimization() {
        let breaks = params.week_ids().skip(1)
            .flat_map(|w| params.team_ids().map(move |t| indicator(format!("(= {} {})", home_name(w, t), home_name(w - 1, t)))))
            .collect();
        writeln!(s, "(define-fun obj () Int {})", sum(breaks))?;
        writeln!(s, "(assert (>= obj {}))", params.break_lower_bound())?;
        writeln!(s, "(assert (<= obj {}))", params.break_upper_bound())?;
        if let Some(b) = bound {
            writeln!(s, "(assert (< obj {}))", b)?;
        }
        shown.push("obj".to_string());
    }

    writeln!(s, "(check-sat)")?;
    writeln!(s, "(get-value ({}))", shown.join(" "))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SmtAnswer {
    Sat(HashMap<String, String>),
    Unsat,
    /// `unknown`, or `timeout` from z3's own limit.
    Unknown,
}

/// Read the `check-sat` answer and, when satisfiable, the `get-value` pairs.
pub fn parse_output(text :&str) -> Result<SmtAnswer, SolveError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let answer = match lines.next() {
        Some("sat") => {
            let rest = lines.collect::<Vec<_>>().join(" ").replace('(', " ").replace(')', " ");
            let tokens = rest.split_whitespace().collect::<Vec<_>>();
            if tokens.len() % 2 != 0 || tokens.first() == Some(&"error") {
                return Err(SolveError::UnrecognizedOutput(format!("z3 values: {}", rest.trim())));
            }
            SmtAnswer::Sat(tokens.chunks(2).map(|p| (p[0].to_string(), p[1].to_string())).collect())
        }
        Some("unsat") => SmtAnswer::Unsat,
        Some("unknown") | Some("timeout") => SmtAnswer::Unknown,
        other => return Err(SolveError::UnrecognizedOutput(other.unwrap_or("no z3 output").to_string())),
    };
    Ok(answer)
}

fn value<T :std::str::FromStr>(values :&HashMap<String, String>, name :&str) -> Result<T, SolveError> {
    values.get(name)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| SolveError::UnrecognizedOutput(format!("no usable value for {}", name)))
}

/// Schedule and break count of a z3 model.
pub fn incumbent(params :TournamentParameters, objective :ObjectiveKind, values :&HashMap<String, String>)
    -> Result<Incumbent, SolveError>
{
    let grid = |f :&dyn Fn(usize, usize) -> String| -> Result<Vec<Vec<usize>>, SolveError> {
        params.week_ids().map(|w| params.team_ids().map(|t| value::<usize>(values, &f(w, t))).collect()).collect()
    };
    let opponent = grid(&opp_name)?;
    let period = grid(&per_name)?;
    let home = params.week_ids()
        .map(|w| params.team_ids().map(|t| value::<bool>(values, &home_name(w, t))).collect())
        .collect::<Result<Vec<Vec<bool>>, _>>()?;

    let schedule = Assignment { params, opponent, home, period }.to_schedule()?;
    let objective = match objective {
        ObjectiveKind::Satisfy => None,
        ObjectiveKind::MinimizeBreaks => schedule.breaks(params).map(|b| b.total()),
    };
    Ok(Incumbent { schedule, objective })
}

impl SolverAdapter for SmtAdapter {
    fn solve(&self, sts :&StsModel, config :&SolverConfig) -> Result<SolveReport, SolveError> {
        let start = Instant::now();
        let (params, objective) = (sts.params, sts.options.objective);
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("sts.smt2");

        let call = |bound :Option<u32>, budget :Duration| -> Result<Answer, SolveError> {
            std::fs::write(&path, render_script(params, objective, sts.options.symmetry_breaking, bound))?;
            let secs = budget.as_secs_f64().ceil().max(1.0) as u64;
            let mut args = vec!["-smt2".to_string(), format!("-T:{}", secs), format!("sat.threads={}", config.threads)];
            if config.threads <= 1 {
                args.push("parallel.enable=false".to_string());
            }
            args.push(path.display().to_string());
            debug!("Running {:?} {:?} with bound {:?}", self.binary, args, bound);

            let out = run_with_deadline(&self.binary, &args, budget + DEADLINE_GRACE)?;
            if out.killed() {
                return Ok(Answer::Interrupted);
            }
            match parse_output(&out.stdout) {
                Ok(SmtAnswer::Sat(values)) => Ok(Answer::Found(incumbent(params, objective, &values)?)),
                Ok(SmtAnswer::Unsat) => Ok(Answer::Unsat),
                Ok(SmtAnswer::Unknown) => Ok(Answer::Interrupted),
                Err(e) => {
                    out.check(&self.binary)?;
                    Err(e)
                }
            }
        };

        let outcome = match objective {
            ObjectiveKind::Satisfy => satisfy(config.time_limit, start, |budget| call(None, budget))?,
            ObjectiveKind::MinimizeBreaks => minimise(params.break_lower_bound(), config.time_limit, start, call)?,
        };
        info!("z3 finished with {} in {:.2}s", outcome.status(), start.elapsed().as_secs_f64());
        Ok(SolveReport { outcome, elapsed: start.elapsed() })
    }
}
