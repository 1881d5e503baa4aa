use thiserror::Error;

pub type TeamId = usize;
pub type WeekId = usize;
pub type PeriodId = usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidParameterError {
    #[error("number of teams must be even, got {0}")]
    OddTeamCount(usize),
    #[error("number of teams must be at least 2, got {0}")]
    TooFewTeams(usize),
}

/// Tournament shape derived from the team count.
///
/// A single round robin over `n` teams needs `n-1` weeks, and with every team
/// playing once a week there are `n/2` matches, i.e. periods, per week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TournamentParameters {
    n :usize,
}

impl TournamentParameters {
    pub fn new(n :usize) -> Result<Self, InvalidParameterError> {
        if n < 2 {
            return Err(InvalidParameterError::TooFewTeams(n));
        }
        if n % 2 != 0 {
            return Err(InvalidParameterError::OddTeamCount(n));
        }
        Ok(TournamentParameters { n })
    }

    pub fn teams(&self) -> usize { self.n }
    pub fn weeks(&self) -> usize { self.n - 1 }
    pub fn periods(&self) -> usize { self.n / 2 }

    /// Total number of matches, C(n,2).
    pub fn matches(&self) -> usize { self.n * (self.n - 1) / 2 }

    /// Proven minimum of the total number of breaks.
    pub fn break_lower_bound(&self) -> u32 { (self.n - 2) as u32 }

    /// Trivial upper bound on the total number of breaks.
    pub fn break_upper_bound(&self) -> u32 { ((self.n - 2) * (self.n - 1)) as u32 }

    pub fn team_ids(&self) -> std::ops::Range<TeamId> { 0..self.n }
    pub fn week_ids(&self) -> std::ops::Range<WeekId> { 0..self.weeks() }
    pub fn period_ids(&self) -> std::ops::Range<PeriodId> { 0..self.periods() }
}

impl std::fmt::Display for TournamentParameters {
    fn fmt(&self, f :&mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "n={} W={} P={}", self.teams(), self.weeks(), self.periods())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_weeks_and_periods() {
        let p = TournamentParameters::new(6).unwrap();
        assert_eq!(p.weeks(), 5);
        assert_eq!(p.periods(), 3);
        assert_eq!(p.matches(), 15);
        assert_eq!(p.break_lower_bound(), 4);
        assert_eq!(p.break_upper_bound(), 20);
    }

    #[test]
    fn smallest_tournament() {
        let p = TournamentParameters::new(2).unwrap();
        assert_eq!(p.weeks(), 1);
        assert_eq!(p.periods(), 1);
        assert_eq!(p.break_lower_bound(), 0);
        assert_eq!(p.break_upper_bound(), 0);
    }

    #[test]
    fn rejects_odd_and_tiny() {
        assert_eq!(TournamentParameters::new(5), Err(InvalidParameterError::OddTeamCount(5)));
        assert_eq!(TournamentParameters::new(0), Err(InvalidParameterError::TooFewTeams(0)));
        assert_eq!(TournamentParameters::new(1), Err(InvalidParameterError::TooFewTeams(1)));
    }
}
