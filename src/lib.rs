//! Sports tournament scheduling benchmarks.
//!
//! A single round robin over `n` teams in `n-1` weeks of `n/2` periods is
//! built once as a boolean model ([`builder`]), handed to a SAT, SMT, CP or MIP
//! backend ([`backend`]), and the answer is turned into a canonical
//! schedule and a certified benchmark record ([`extract`], [`certify`]).

pub mod backend;
pub mod builder;
pub mod cardinality;
pub mod certify;
pub mod cnf;
pub mod config;
pub mod extract;
pub mod model;
pub mod outcome;
pub mod params;
pub mod runner;
pub mod schedule;
pub mod store;
pub mod symmetry;
