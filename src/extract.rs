//! Conversion of raw solver answers into [`Schedule`]s.
//!
//! Two raw shapes arrive here: a boolean assignment of the model's decision
//! variables (SAT and MIP backends), and a MiniZinc text log (CP backend).
//! Both end up as a [`SolverOutcome`].

use crate::builder::{ObjectiveKind, StsModel};
use crate::outcome::{Incumbent, SolverOutcome};
use crate::params::*;
use crate::schedule::{distinct_pairs, Match, Schedule};
use log::*;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("assignment has {got} values, the model has {expected} variables")]
    Length { expected :usize, got :usize },
    #[error("team {team} has {count} opponents in week {week}")]
    Opponents { week :WeekId, team :TeamId, count :usize },
    #[error("team {team} has {count} periods in week {week}")]
    Periods { week :WeekId, team :TeamId, count :usize },
    #[error("team {team} plays {opponent} in week {week}, but not the other way around")]
    Asymmetric { week :WeekId, team :TeamId, opponent :TeamId },
    #[error("period {period} of week {week} is claimed twice")]
    PeriodClash { period :PeriodId, week :WeekId },
    #[error("index out of range in week {week} for team {team}")]
    OutOfRange { week :WeekId, team :TeamId },
}

/// Decision values of a solved model, as `[week][team]` grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub params :TournamentParameters,
    pub opponent :Vec<Vec<TeamId>>,
    pub home :Vec<Vec<bool>>,
    pub period :Vec<Vec<PeriodId>>,
}

fn one_hot(values :&[bool], candidates :impl Iterator<Item = (usize, usize)>) -> Result<usize, usize> {
    let hot = candidates.filter(|(_, idx)| values[*idx]).map(|(x, _)| x).collect::<Vec<_>>();
    match hot.as_slice() {
        [x] => Ok(*x),
        _ => Err(hot.len()),
    }
}

impl Assignment {
    /// Read the opponent, home and period grids out of a value vector
    /// indexed by the model's variables.
    pub fn decode(sts :&StsModel, values :&[bool]) -> Result<Self, ExtractError> {
        if values.len() != sts.model.num_vars() {
            return Err(ExtractError::Length { expected: sts.model.num_vars(), got: values.len() });
        }
        let (params, d) = (sts.params, &sts.decisions);
        let mut opponent = Vec::with_capacity(params.weeks());
        let mut home = Vec::with_capacity(params.weeks());
        let mut period = Vec::with_capacity(params.weeks());

        for w in params.week_ids() {
            let mut opp_row = Vec::with_capacity(params.teams());
            let mut per_row = Vec::with_capacity(params.teams());
            for t in params.team_ids() {
                let opps = params.team_ids().filter(|j| *j != t).map(|j| (j, d.opp(w, t, j).index()));
                opp_row.push(one_hot(values, opps)
                    .map_err(|count| ExtractError::Opponents { week: w, team: t, count })?);
                let pers = params.period_ids().map(|p| (p, d.per(w, t, p).index()));
                per_row.push(one_hot(values, pers)
                    .map_err(|count| ExtractError::Periods { week: w, team: t, count })?);
            }
            opponent.push(opp_row);
            period.push(per_row);
            home.push(params.team_ids().map(|t| values[d.home(w, t).index()]).collect());
        }

        Ok(Assignment { params, opponent, home, period })
    }

    /// Build the schedule, one cell per unordered pair and week. The period
    /// and orientation of a match both come from the lower-numbered team.
    pub fn to_schedule(&self) -> Result<Schedule, ExtractError> {
        let params = self.params;
        let mut schedule = Schedule::new(params);
        for w in params.week_ids() {
            let mut placed = HashSet::new();
            for t in params.team_ids() {
                let j = self.opponent[w][t];
                if j >= params.teams() || j == t {
                    return Err(ExtractError::OutOfRange { week: w, team: t });
                }
                if self.opponent[w][j] != t {
                    return Err(ExtractError::Asymmetric { week: w, team: t, opponent: j });
                }
                if !placed.insert(Match::new(t, j).pair()) {
                    continue;
                }

                let p = self.period[w][t];
                if p >= params.periods() {
                    return Err(ExtractError::OutOfRange { week: w, team: t });
                }
                if schedule.get(p, w).is_some() {
                    return Err(ExtractError::PeriodClash { period: p, week: w });
                }
                let m = if self.home[w][t] { Match::new(t, j) } else { Match::new(j, t) };
                schedule.set(p, w, Some(m));
            }
        }
        Ok(schedule)
    }
}

/// Schedule and objective value from a model assignment.
pub fn incumbent_from_values(sts :&StsModel, values :&[bool]) -> Result<Incumbent, ExtractError> {
    let schedule = Assignment::decode(sts, values)?.to_schedule()?;
    let objective = sts.model.objective().map(|o| o.value(values));
    Ok(Incumbent { schedule, objective })
}

const SOLUTION_SEPARATOR :&str = "----------";
const SEARCH_COMPLETE :&str = "==========";

/// Matches `a v b` written left to right, 1-indexed.
fn parse_period_line(line :&str) -> Option<Vec<(usize, usize)>> {
    let body = line.trim().strip_prefix("Period")?;
    let body = &body[body.find(':')? + 1..];
    let tokens = body.split(|c :char| c.is_whitespace() || c == ',').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    if tokens.len() % 3 != 0 {
        return None;
    }
    tokens.chunks(3).map(|c| {
        if c[1] != "v" {
            return None;
        }
        Some((c[0].parse().ok()?, c[2].parse().ok()?))
    }).collect()
}

fn parse_objective_line(line :&str) -> Option<u32> {
    let rest = line.trim().strip_prefix("obj")?.trim_start();
    rest.strip_prefix('=')?.trim().trim_end_matches(';').parse().ok()
}

/// One solution block of a log. Period lines are taken in order of
/// appearance; the number printed after `Period` is not trusted.
fn parse_block(lines :&[&str], params :TournamentParameters) -> Option<(Schedule, Option<u32>)> {
    let rows = lines.iter().filter_map(|l| parse_period_line(l)).collect::<Vec<_>>();
    if rows.len() != params.periods() || rows.iter().any(|r| r.len() != params.weeks()) {
        return None;
    }

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let mut out = Vec::with_capacity(row.len());
        for (h, a) in row {
            if h == 0 || a == 0 || h > params.teams() || a > params.teams() || h == a {
                return None;
            }
            out.push(Some(Match::new(h - 1, a - 1)));
        }
        cells.push(out);
    }
    let schedule = Schedule::from_rows(&cells);
    if !params.week_ids().all(|w| distinct_pairs(schedule.week(w).map(|(_, m)| m))) {
        return None;
    }

    let objective = lines.iter().filter_map(|l| parse_objective_line(l)).last();
    Some((schedule, objective))
}

/// Interpret a MiniZinc log.
///
/// The last complete solution block is the incumbent. A `==========` line
/// means the search finished; for an optimisation model without it the
/// solver stopped on its time limit. A log with nothing recognisable gives
/// no schedule.
pub fn parse_minizinc_log(log :&str, params :TournamentParameters, objective :ObjectiveKind) -> SolverOutcome {
    let lines = log.lines().collect::<Vec<_>>();
    if lines.iter().any(|l| l.contains("UNSATISFIABLE")) {
        return SolverOutcome::Infeasible;
    }

    let mut incumbent = None;
    let mut start = 0;
    for (i, line) in lines.iter().enumerate() {
        if line.trim() == SOLUTION_SEPARATOR {
            match parse_block(&lines[start..i], params) {
                Some((schedule, obj)) => {
                    let obj = match objective {
                        ObjectiveKind::Satisfy => None,
                        ObjectiveKind::MinimizeBreaks => obj.or_else(|| schedule.breaks(params).map(|b| b.total())),
                    };
                    incumbent = Some(Incumbent { schedule, objective: obj });
                }
                None => warn!("Skipping unreadable solution block ending at line {}", i + 1),
            }
            start = i + 1;
        }
    }
    let complete = lines.iter().any(|l| l.trim() == SEARCH_COMPLETE);

    match (incumbent, complete, objective) {
        (Some(i), true, _) => SolverOutcome::Optimal(i),
        (Some(i), false, ObjectiveKind::Satisfy) => SolverOutcome::Feasible(i),
        (Some(i), false, ObjectiveKind::MinimizeBreaks) => SolverOutcome::Timeout(Some(i)),
        (None, _, _) => {
            if !lines.iter().any(|l| l.contains("UNKNOWN")) && !log.trim().is_empty() {
                warn!("No solution recognised in solver log");
            }
            SolverOutcome::Timeout(None)
        }
    }
}
