//! Running configurations and batches.
//!
//! This is where failures stop: every run yields a [`BenchmarkRecord`],
//! whatever the backend did.

use crate::backend::{adapter_for, Tools};
use crate::builder::build;
use crate::certify::{BenchmarkRecord, Certifier};
use crate::config::Configuration;
use crate::outcome::{SolveError, SolveReport, SolverConfig};
use crate::params::TournamentParameters;
use crate::store::ResultStore;
use log::*;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn panic_message(payload :Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub fn solve(params :TournamentParameters, configuration :&Configuration, config :&SolverConfig, tools :&Tools)
    -> Result<SolveReport, SolveError>
{
    let sts = build(params, configuration.options);
    let adapter = adapter_for(configuration, tools);
    catch_unwind(AssertUnwindSafe(|| adapter.solve(&sts, config)))
        .unwrap_or_else(|payload| Err(SolveError::Panicked(panic_message(payload))))
}

/// Solve one instance with one configuration and certify the answer.
pub fn run_configuration(params :TournamentParameters, configuration :&Configuration, config :&SolverConfig,
                         tools :&Tools) -> BenchmarkRecord {
    info!("Running {} on {}", configuration.name, params);
    let mut certifier = Certifier::new(params, configuration.objective(), config.time_limit);
    certifier.fast_empty_is_infeasible = adapter_for(configuration, tools).fails_silently();

    let report = match solve(params, configuration, config, tools) {
        Ok(report) => report,
        Err(e) => {
            error!("{} failed on n={}: {}", configuration.name, params.teams(), e);
            return BenchmarkRecord::failure(config.time_limit);
        }
    };

    let record = certifier.certify(&report);
    if record.sol.is_complete() {
        if let Err(violation) = record.sol.verify(params) {
            error!("{} returned an invalid schedule for n={}: {}", configuration.name, params.teams(), violation);
            return BenchmarkRecord::failure(config.time_limit);
        }
    }
    info!("{} on n={}: {} time={:.2} optimal={} obj={:?}", configuration.name, params.teams(),
          report.outcome.status(), record.time, record.optimal, record.obj);
    record
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub runs :usize,
    pub optimal :usize,
    pub solved :usize,
    pub store_errors :usize,
}

/// Every configuration on every instance, strictly in order, storing each
/// record as soon as it exists.
pub fn run_batch(instances :&[TournamentParameters], configurations :&[Configuration], config :&SolverConfig,
                 tools :&Tools, store :&ResultStore) -> BatchSummary {
    let mut total = BatchSummary::default();
    for params in instances {
        let mut summary = BatchSummary::default();
        for configuration in configurations {
            let record = run_configuration(*params, configuration, config, tools);
            summary.runs += 1;
            summary.optimal += record.optimal as usize;
            summary.solved += (!record.sol.is_empty()) as usize;
            if let Err(e) = store.merge(configuration.family(), params.teams(), &configuration.name, &record) {
                error!("Could not store {} for n={}: {}", configuration.name, params.teams(), e);
                summary.store_errors += 1;
            }
        }
        info!("n={}: {} runs, {} optimal, {} with a schedule", params.teams(), summary.runs, summary.optimal,
              summary.solved);
        total.runs += summary.runs;
        total.optimal += summary.optimal;
        total.solved += summary.solved;
        total.store_errors += summary.store_errors;
    }
    total
}
