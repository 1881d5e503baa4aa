use sportstournament::backend::Tools;
use sportstournament::certify::BenchmarkRecord;
use sportstournament::config::{find, registry, Backend};
use sportstournament::outcome::SolverConfig;
use sportstournament::params::TournamentParameters;
use sportstournament::runner::run_configuration;
use std::time::Duration;

fn run(n :usize, name :&str) -> BenchmarkRecord {
    let params = TournamentParameters::new(n).unwrap();
    run_configuration(params, &find(name).unwrap(), &SolverConfig::with_time_limit(120), &Tools::default())
}

fn sat_configurations() -> Vec<String> {
    registry().into_iter().filter(|c| matches!(c.backend, Backend::Sat { .. })).map(|c| c.name).collect()
}

#[test]
fn two_teams_every_sat_configuration() {
    for name in sat_configurations() {
        let record = run(2, &name);
        assert!(record.optimal, "{}", name);
        assert_eq!(record.sol.periods(), 1);
        assert_eq!(record.sol.weeks(), 1);
    }
}

#[test]
fn four_teams_are_infeasible_with_and_without_symmetry_breaking() {
    for name in sat_configurations() {
        let record = run(4, &name);
        assert!(record.optimal, "{}", name);
        assert!(record.sol.is_empty(), "{}", name);
        assert_eq!(record.obj, None);
    }
}

#[test]
fn six_teams_satisfiable_in_every_variant() {
    let params = TournamentParameters::new(6).unwrap();
    for name in vec!["sat_satisf", "sat_satisf_sb", "sat_satisf_compact", "sat_satisf_compact_sb"] {
        let record = run(6, name);
        assert!(record.optimal, "{}", name);
        assert_eq!(record.sol.verify(params), Ok(()), "{}", name);
        assert_eq!(record.sol.matches().count(), 15);
        assert!(record.sol.breaks(params).unwrap().total() >= 4);
        assert_eq!(record.obj, None);
    }
}

#[test]
fn symmetry_breaking_keeps_eight_teams_satisfiable() {
    let params = TournamentParameters::new(8).unwrap();
    for name in vec!["sat_satisf_sb", "sat_satisf_compact_sb"] {
        let record = run(8, name);
        assert!(record.optimal, "{}", name);
        assert_eq!(record.sol.verify(params), Ok(()), "{}", name);
        let first = record.sol.get(0, 0).unwrap();
        assert_eq!((first.home, first.away), (0, 1));
    }
}

#[test]
fn six_teams_reach_the_break_lower_bound() {
    let params = TournamentParameters::new(6).unwrap();
    for name in vec!["sat_opt_sb", "sat_opt_compact_sb"] {
        let record = run(6, name);
        assert!(record.optimal, "{}", name);
        assert_eq!(record.obj, Some(4));
        assert_eq!(record.sol.verify(params), Ok(()));
        assert_eq!(record.sol.breaks(params).unwrap().total(), 4);
    }
}

#[test]
fn zero_budget_times_out() {
    let params = TournamentParameters::new(6).unwrap();
    let config = SolverConfig { time_limit: Duration::from_secs(0), threads: 1 };
    let record = run_configuration(params, &find("sat_opt").unwrap(), &config, &Tools::default());
    assert_eq!(record, BenchmarkRecord::failure(Duration::from_secs(0)));
}
