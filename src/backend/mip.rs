//! MIP backend: the model written as an LP file and handed to CBC, SCIP or
//! HiGHS.

use super::{run_with_deadline, SolverAdapter, DEADLINE_GRACE};
use crate::builder::StsModel;
use crate::config::MipSolver;
use crate::extract::incumbent_from_values;
use crate::model::{Cmp, Constraint, Lit, Model};
use crate::outcome::*;
use log::*;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct MipAdapter {
    pub solver :MipSolver,
    pub binary :PathBuf,
}

/// LP rows need at least one variable.
fn zero_term(model :&Model) -> String {
    model.vars().next().map(|v| format!(" 0 {}", model.name(v))).unwrap_or_default()
}

/// Signed terms of a literal sum; a negative literal contributes `1 - x`.
/// Returns the number of negative literals.
fn write_terms(lp :&mut String, model :&Model, lits :&[Lit]) -> Result<i64, std::fmt::Error> {
    for (i, l) in lits.iter().enumerate() {
        if i > 0 && i % 8 == 0 {
            write!(lp, "\n   ")?;
        }
        write!(lp, " {} {}", if l.is_positive() { "+" } else { "-" }, model.name(l.var()))?;
    }
    if lits.is_empty() {
        write!(lp, "{}", zero_term(model))?;
    }
    Ok(lits.iter().filter(|l| !l.is_positive()).count() as i64)
}

/// Linear row `sum(coef * var) cmp rhs` of a literal sum.
fn write_row(lp :&mut String, name :&str, model :&Model, lits :&[Lit], cmp :Cmp, rhs :u32) -> std::fmt::Result {
    write!(lp, " {}:", name)?;
    let negatives = write_terms(lp, model, lits)?;
    writeln!(lp, " {} {}", cmp.symbol(), rhs as i64 - negatives)
}

/// CPLEX LP text of the model with every variable binary.
pub fn write_lp(model :&Model) -> String {
    let mut lp = String::new();
    // Writing to a String cannot fail.
    let _ = write_lp_to(&mut lp, model);
    lp
}

fn write_lp_to(lp :&mut String, model :&Model) -> std::fmt::Result {
    writeln!(lp, "\\ sports tournament schedule")?;
    writeln!(lp, "Minimize")?;
    match model.objective() {
        Some(o) if !o.lits.is_empty() => {
            // The constant of negative literals does not move the optimum.
            write!(lp, " breaks:")?;
            write_terms(lp, model, &o.lits)?;
            writeln!(lp)?;
        }
        _ => writeln!(lp, " nothing:{}", zero_term(model))?,
    }

    writeln!(lp, "Subject To")?;
    for (i, c) in model.constraints().iter().enumerate() {
        let name = format!("c{}", i);
        match c {
            Constraint::Clause(lits) => write_row(lp, &name, model, lits, Cmp::Ge, 1)?,
            Constraint::ExactlyOne(lits) => write_row(lp, &name, model, lits, Cmp::Eq, 1)?,
            Constraint::Count { lits, cmp, rhs } => write_row(lp, &name, model, lits, *cmp, *rhs)?,
        }
    }
    if let Some(o) = model.objective() {
        write_row(lp, "breaks_lb", model, &o.lits, Cmp::Ge, o.lower)?;
        write_row(lp, "breaks_ub", model, &o.lits, Cmp::Le, o.upper)?;
    }

    writeln!(lp, "Binary")?;
    for v in model.vars() {
        writeln!(lp, " {}", model.name(v))?;
    }
    writeln!(lp, "End")
}

#[derive(Debug, Clone, PartialEq)]
pub enum MipStatus {
    Optimal,
    Infeasible,
    /// Stopped by the time limit; `integer` when an integer solution exists.
    Stopped { integer :bool },
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MipSolution {
    pub status :MipStatus,
    pub values :HashMap<String, f64>,
}

fn unrecognized(what :&str) -> SolveError {
    SolveError::UnrecognizedOutput(what.to_string())
}

/// Parse a CBC `solu` file: a status line followed by
/// `index name value reduced_cost` rows for the non-zero variables.
pub fn parse_cbc_solution(text :&str) -> Result<MipSolution, SolveError> {
    let mut lines = text.lines();
    let header = lines.next().map(|l| l.trim()).unwrap_or("");
    let status = if header.starts_with("Optimal") {
        MipStatus::Optimal
    } else if header.starts_with("Infeasible") || header.starts_with("Integer infeasible") {
        MipStatus::Infeasible
    } else if header.starts_with("Stopped") {
        MipStatus::Stopped { integer: !header.contains("no integer solution") }
    } else if header.is_empty() {
        return Err(unrecognized("empty CBC solution file"));
    } else {
        MipStatus::Other(header.to_string())
    };

    let mut values = HashMap::new();
    for line in lines {
        let tokens = line.split_whitespace().skip_while(|t| *t == "**").collect::<Vec<_>>();
        if tokens.len() < 3 {
            continue;
        }
        match tokens[2].parse::<f64>() {
            Ok(v) => { values.insert(tokens[1].to_string(), v); }
            Err(_) => return Err(unrecognized(line)),
        }
    }
    Ok(MipSolution { status, values })
}

/// Parse a SCIP `write solution` file: a `solution status:` line, then
/// `objective value:` and `name value (obj:c)` rows, or
/// `no solution available`.
pub fn parse_scip_solution(text :&str) -> Result<MipSolution, SolveError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next().unwrap_or("");
    let reason = header.strip_prefix("solution status:").ok_or_else(|| unrecognized(header))?.trim();

    let mut values = HashMap::new();
    let mut available = true;
    for line in lines {
        if line.starts_with("no solution available") {
            available = false;
            continue;
        }
        if line.starts_with("objective value:") {
            continue;
        }
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        match tokens.get(1).map(|v| v.parse::<f64>()) {
            Some(Ok(v)) => { values.insert(tokens[0].to_string(), v); }
            _ => return Err(unrecognized(line)),
        }
    }

    let status = if reason.starts_with("optimal") {
        MipStatus::Optimal
    } else if reason.starts_with("infeasible") {
        MipStatus::Infeasible
    } else if reason.contains("limit reached") {
        MipStatus::Stopped { integer: available }
    } else {
        MipStatus::Other(reason.to_string())
    };
    Ok(MipSolution { status, values })
}

/// Parse a HiGHS raw solution file: `Model status` and its value, then a
/// `# Primal solution values` section whose `# Columns k` block lists
/// every variable.
pub fn parse_highs_solution(text :&str) -> Result<MipSolution, SolveError> {
    let lines = text.lines().map(str::trim).collect::<Vec<_>>();
    let after = |marker :&str| lines.iter().position(|l| *l == marker).and_then(|i| lines.get(i + 1)).copied();

    let model_status = after("Model status").ok_or_else(|| unrecognized("HiGHS solution without a model status"))?;
    let feasible = after("# Primal solution values") == Some("Feasible");

    let mut values = HashMap::new();
    if feasible {
        let at = lines.iter().position(|l| l.starts_with("# Columns"))
            .ok_or_else(|| unrecognized("HiGHS solution without columns"))?;
        let count = lines[at]["# Columns".len()..].trim().parse::<usize>().map_err(|_| unrecognized(lines[at]))?;
        for line in lines.iter().skip(at + 1).take(count) {
            let tokens = line.split_whitespace().collect::<Vec<_>>();
            match tokens.get(1).map(|v| v.parse::<f64>()) {
                Some(Ok(v)) => { values.insert(tokens[0].to_string(), v); }
                _ => return Err(unrecognized(line)),
            }
        }
    }

    let status = match model_status {
        "Optimal" => MipStatus::Optimal,
        "Infeasible" => MipStatus::Infeasible,
        s if s.starts_with("Time limit") => MipStatus::Stopped { integer: feasible },
        s => MipStatus::Other(s.to_string()),
    };
    Ok(MipSolution { status, values })
}

/// Boolean value of every model variable; absent variables are zero.
fn rounded(model :&Model, values :&HashMap<String, f64>) -> Vec<bool> {
    let by_name = model.var_by_name();
    let mut out = vec![false; model.num_vars()];
    for (name, v) in values {
        match by_name.get(name.as_str()) {
            Some(var) => out[var.index()] = *v > 0.5,
            None => debug!("Solver reported unknown variable {}", name),
        }
    }
    out
}

pub fn solution_outcome(sts :&StsModel, solution :&MipSolution) -> Result<SolverOutcome, SolveError> {
    match &solution.status {
        MipStatus::Optimal => Ok(SolverOutcome::Optimal(incumbent_from_values(sts, &rounded(&sts.model, &solution.values))?)),
        MipStatus::Infeasible => Ok(SolverOutcome::Infeasible),
        MipStatus::Stopped { integer: true } => {
            match incumbent_from_values(sts, &rounded(&sts.model, &solution.values)) {
                Ok(i) => Ok(SolverOutcome::Timeout(Some(i))),
                Err(e) => {
                    warn!("Discarding incumbent: {}", e);
                    Ok(SolverOutcome::Timeout(None))
                }
            }
        }
        MipStatus::Stopped { integer: false } => Ok(SolverOutcome::Timeout(None)),
        MipStatus::Other(s) => Err(SolveError::UnrecognizedOutput(s.clone())),
    }
}

fn seconds(d :Duration) -> String {
    d.as_secs_f64().to_string()
}

impl MipAdapter {
    /// Command line for solving `dir/sts.lp` into `dir/sts.sol`. Option
    /// files the solver needs are written into `dir`.
    pub fn command(&self, dir :&Path, config :&SolverConfig) -> std::io::Result<Vec<String>> {
        let lp = dir.join("sts.lp").display().to_string();
        let sol = dir.join("sts.sol").display().to_string();
        let s = |x :&str| x.to_string();
        Ok(match self.solver {
            MipSolver::Cbc => vec![
                lp,
                s("sec"), seconds(config.time_limit),
                s("threads"), config.threads.to_string(),
                s("solve"),
                s("solu"), sol,
            ],
            MipSolver::Scip => vec![
                s("-q"),
                s("-c"),
                format!("read {} set limits time {} set lp threads {} optimize write solution {} quit",
                        lp, seconds(config.time_limit), config.threads, sol),
            ],
            MipSolver::Highs => {
                let options = dir.join("highs.opt");
                std::fs::write(&options, format!("threads = {}\nwrite_solution_style = 0\n", config.threads))?;
                vec![
                    s("--model_file"), lp,
                    s("--time_limit"), seconds(config.time_limit),
                    s("--options_file"), options.display().to_string(),
                    s("--solution_file"), sol,
                ]
            }
        })
    }

    pub fn parse(&self, text :&str) -> Result<MipSolution, SolveError> {
        match self.solver {
            MipSolver::Cbc => parse_cbc_solution(text),
            MipSolver::Scip => parse_scip_solution(text),
            MipSolver::Highs => parse_highs_solution(text),
        }
    }
}

impl SolverAdapter for MipAdapter {
    fn solve(&self, sts :&StsModel, config :&SolverConfig) -> Result<SolveReport, SolveError> {
        let dir = tempfile::TempDir::new()?;
        let sol_path = dir.path().join("sts.sol");
        std::fs::write(dir.path().join("sts.lp"), write_lp(&sts.model))?;

        let args = self.command(dir.path(), config)?;
        debug!("Running {:?} {:?}", self.binary, args);
        let out = run_with_deadline(&self.binary, &args, config.time_limit + DEADLINE_GRACE)?;
        if !out.killed() {
            out.check(&self.binary)?;
        }

        let outcome = if sol_path.exists() {
            solution_outcome(sts, &self.parse(&std::fs::read_to_string(&sol_path)?)?)?
        } else {
            debug!("{} wrote no solution file", self.solver.tag());
            SolverOutcome::Timeout(None)
        };
        info!("{} finished with {} in {:.2}s", self.solver.tag(), outcome.status(), out.elapsed.as_secs_f64());
        Ok(SolveReport { outcome, elapsed: out.elapsed })
    }

    /// CBC leaves no solution file on some infeasible models.
    fn fails_silently(&self) -> bool { self.solver == MipSolver::Cbc }
}
