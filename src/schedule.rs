//! Canonical schedule representation shared by every backend.

use crate::params::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One match, 0-indexed teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    pub home :TeamId,
    pub away :TeamId,
}

impl Match {
    pub fn new(home :TeamId, away :TeamId) -> Self { Match { home, away } }

    pub fn involves(&self, t :TeamId) -> bool { self.home == t || self.away == t }

    /// Orientation-free key, lowest team first.
    pub fn pair(&self) -> (TeamId, TeamId) {
        if self.home < self.away { (self.home, self.away) } else { (self.away, self.home) }
    }
}

/// Serialized form of a schedule: `P` rows of `W` cells, each cell either
/// `null` or `[home, away]` with 1-indexed teams.
pub type PersistedSchedule = Vec<Vec<Option<[usize; 2]>>>;

/// A `periods x weeks` grid of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    periods :usize,
    weeks :usize,
    cells :Vec<Option<Match>>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleViolation {
    #[error("schedule is {got_periods}x{got_weeks}, expected {periods}x{weeks}")]
    Shape { periods :usize, weeks :usize, got_periods :usize, got_weeks :usize },
    #[error("period {period} of week {week} is empty")]
    EmptyCell { period :PeriodId, week :WeekId },
    #[error("invalid match {home} v {away} in week {week}")]
    InvalidMatch { week :WeekId, home :TeamId, away :TeamId },
    #[error("team {team} plays {games} games in week {week}")]
    GamesPerWeek { week :WeekId, team :TeamId, games :usize },
    #[error("teams {0} and {1} meet {2} times")]
    Meetings(TeamId, TeamId, usize),
    #[error("team {team} plays {count} times in period {period}")]
    PeriodUsage { team :TeamId, period :PeriodId, count :usize },
}

impl Schedule {
    pub fn new(params :TournamentParameters) -> Self {
        Schedule {
            periods: params.periods(),
            weeks: params.weeks(),
            cells: vec![None; params.periods() * params.weeks()],
        }
    }

    /// The schedule recorded when there is no solution.
    pub fn empty() -> Self {
        Schedule { periods: 0, weeks: 0, cells: Vec::new() }
    }

    pub fn from_rows(rows :&[Vec<Option<Match>>]) -> Self {
        let periods = rows.len();
        let weeks = rows.first().map(|r| r.len()).unwrap_or(0);
        assert!(rows.iter().all(|r| r.len() == weeks));
        Schedule { periods, weeks, cells: rows.iter().flatten().copied().collect() }
    }

    pub fn periods(&self) -> usize { self.periods }
    pub fn weeks(&self) -> usize { self.weeks }
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    pub fn get(&self, p :PeriodId, w :WeekId) -> Option<Match> {
        self.cells[p * self.weeks + w]
    }

    pub fn set(&mut self, p :PeriodId, w :WeekId, m :Option<Match>) {
        self.cells[p * self.weeks + w] = m;
    }

    /// Every cell of a non-empty grid holds a match.
    pub fn is_complete(&self) -> bool {
        !self.is_empty() && self.cells.iter().all(|c| c.is_some())
    }

    pub fn week(&self, w :WeekId) -> impl Iterator<Item = (PeriodId, Match)> + '_ {
        (0..self.periods).filter_map(move |p| self.get(p, w).map(|m| (p, m)))
    }

    pub fn matches(&self) -> impl Iterator<Item = (PeriodId, WeekId, Match)> + '_ {
        (0..self.periods).flat_map(move |p| (0..self.weeks).filter_map(move |w| self.get(p, w).map(|m| (p, w, m))))
    }

    /// Home status of `team` in week `w`, if the team plays that week.
    pub fn is_home(&self, w :WeekId, team :TeamId) -> Option<bool> {
        self.week(w).find(|(_, m)| m.involves(team)).map(|(_, m)| m.home == team)
    }

    /// Per-team break counts, or `None` when the grid does not have the
    /// tournament's shape or some team misses a week.
    pub fn breaks(&self, params :TournamentParameters) -> Option<BreakRecord> {
        if self.weeks != params.weeks() || self.periods != params.periods() {
            return None;
        }
        let mut per_team = vec![0; params.teams()];
        for t in params.team_ids() {
            let status = (0..self.weeks).map(|w| self.is_home(w, t)).collect::<Option<Vec<bool>>>()?;
            per_team[t] = status.windows(2).filter(|s| s[0] == s[1]).count() as u32;
        }
        Some(BreakRecord { per_team })
    }

    pub fn verify(&self, params :TournamentParameters) -> Result<(), ScheduleViolation> {
        if self.periods != params.periods() || self.weeks != params.weeks() {
            return Err(ScheduleViolation::Shape {
                periods: params.periods(),
                weeks: params.weeks(),
                got_periods: self.periods,
                got_weeks: self.weeks,
            });
        }

        for p in params.period_ids() {
            for w in params.week_ids() {
                match self.get(p, w) {
                    None => return Err(ScheduleViolation::EmptyCell { period: p, week: w }),
                    Some(m) if m.home == m.away || m.home >= params.teams() || m.away >= params.teams() => {
                        return Err(ScheduleViolation::InvalidMatch { week: w, home: m.home, away: m.away });
                    }
                    Some(_) => {}
                }
            }
        }

        for w in params.week_ids() {
            for t in params.team_ids() {
                let games = self.week(w).filter(|(_, m)| m.involves(t)).count();
                if games != 1 {
                    return Err(ScheduleViolation::GamesPerWeek { week: w, team: t, games });
                }
            }
        }

        for i in params.team_ids() {
            for j in params.team_ids().filter(|j| *j > i) {
                let meetings = self.matches().filter(|(_, _, m)| m.pair() == (i, j)).count();
                if meetings != 1 {
                    return Err(ScheduleViolation::Meetings(i, j, meetings));
                }
            }
        }

        for t in params.team_ids() {
            for p in params.period_ids() {
                let count = (0..self.weeks).filter(|w| self.get(p, *w).map(|m| m.involves(t)).unwrap_or(false)).count();
                if count > 2 {
                    return Err(ScheduleViolation::PeriodUsage { team: t, period: p, count });
                }
            }
        }

        Ok(())
    }

    pub fn to_persisted(&self) -> PersistedSchedule {
        (0..self.periods)
            .map(|p| (0..self.weeks).map(|w| self.get(p, w).map(|m| [m.home + 1, m.away + 1])).collect())
            .collect()
    }

    /// Inverse of [`Schedule::to_persisted`]. Ragged rows or a team number of
    /// zero are rejected.
    pub fn from_persisted(rows :&PersistedSchedule) -> Option<Self> {
        let weeks = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != weeks) {
            return None;
        }
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = Vec::with_capacity(weeks);
            for cell in row {
                cells.push(match cell {
                    Some([h, a]) if *h > 0 && *a > 0 => Some(Match::new(h - 1, a - 1)),
                    Some(_) => return None,
                    None => None,
                });
            }
            out.push(cells);
        }
        Some(Schedule::from_rows(&out))
    }
}

impl Serialize for Schedule {
    fn serialize<S :serde::Serializer>(&self, serializer :S) -> Result<S::Ok, S::Error> {
        self.to_persisted().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D :serde::Deserializer<'de>>(deserializer :D) -> Result<Self, D::Error> {
        let rows = PersistedSchedule::deserialize(deserializer)?;
        Schedule::from_persisted(&rows).ok_or_else(|| serde::de::Error::custom("malformed schedule grid"))
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f :&mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:>4}", "")?;
        for w in 0..self.weeks {
            write!(f, " {:^7}", format!("w{}", w + 1))?;
        }
        writeln!(f)?;
        for p in 0..self.periods {
            write!(f, "{:>4}", format!("p{}", p + 1))?;
            for w in 0..self.weeks {
                match self.get(p, w) {
                    Some(m) => write!(f, " {:>3},{:<3}", m.home + 1, m.away + 1)?,
                    None => write!(f, " {:^7}", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Per-team count of weeks repeating the previous week's home/away status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakRecord {
    pub per_team :Vec<u32>,
}

impl BreakRecord {
    pub fn total(&self) -> u32 { self.per_team.iter().sum() }
}

/// Check the pair-uniqueness of a week's matches, used by the extractors.
pub(crate) fn distinct_pairs(matches :impl IntoIterator<Item = Match>) -> bool {
    let mut seen = HashSet::new();
    matches.into_iter().all(|m| seen.insert(m.pair()))
}
