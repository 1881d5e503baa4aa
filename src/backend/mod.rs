//! Solver backends.
//!
//! Each backend takes a built model and an explicit [`SolverConfig`] and
//! answers with a [`SolveReport`]. Infeasibility and timeouts are outcomes,
//! not errors.

pub mod minizinc;
pub mod mip;
pub mod sat;
pub mod smt;

use crate::builder::StsModel;
use crate::config::{Backend, Configuration, MipSolver};
use crate::outcome::{Incumbent, SolveError, SolveReport, SolverConfig, SolverOutcome};
use log::*;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

pub trait SolverAdapter {
    fn solve(&self, sts :&StsModel, config :&SolverConfig) -> Result<SolveReport, SolveError>;

    /// Whether an empty answer in under a second must be read as infeasible.
    fn fails_silently(&self) -> bool { false }
}

/// Locations of the external solver executables.
#[derive(Debug, Clone)]
pub struct Tools {
    pub minizinc :PathBuf,
    pub z3 :PathBuf,
    pub cbc :PathBuf,
    pub scip :PathBuf,
    pub highs :PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            minizinc: PathBuf::from("minizinc"),
            z3: PathBuf::from("z3"),
            cbc: PathBuf::from("cbc"),
            scip: PathBuf::from("scip"),
            highs: PathBuf::from("highs"),
        }
    }
}

impl Tools {
    pub fn mip(&self, solver :MipSolver) -> &Path {
        match solver {
            MipSolver::Cbc => &self.cbc,
            MipSolver::Scip => &self.scip,
            MipSolver::Highs => &self.highs,
        }
    }
}

pub fn adapter_for(configuration :&Configuration, tools :&Tools) -> Box<dyn SolverAdapter> {
    match configuration.backend {
        Backend::Sat { encoding } => Box::new(sat::SatAdapter { encoding }),
        Backend::Smt => Box::new(smt::SmtAdapter { binary: tools.z3.clone() }),
        Backend::Cp(options) => Box::new(minizinc::MiniZincAdapter { binary: tools.minizinc.clone(), options }),
        Backend::Mip { solver } => Box::new(mip::MipAdapter { solver, binary: tools.mip(solver).to_path_buf() }),
    }
}

/// Answer of one solver call under a time budget.
pub enum Answer {
    Found(Incumbent),
    Unsat,
    /// The budget ran out, or the solver gave up.
    Interrupted,
}

fn remaining(time_limit :Duration, start :Instant) -> Option<Duration> {
    time_limit.checked_sub(start.elapsed()).filter(|d| *d > Duration::from_millis(0))
}

/// A single call for any schedule. An UNSAT answer arriving after the
/// budget has run out is a timeout.
pub fn satisfy(time_limit :Duration, start :Instant, call :impl FnOnce(Duration) -> Result<Answer, SolveError>)
    -> Result<SolverOutcome, SolveError>
{
    let budget = match remaining(time_limit, start) {
        Some(budget) => budget,
        None => return Ok(SolverOutcome::Timeout(None)),
    };
    Ok(match call(budget)? {
        Answer::Found(found) => SolverOutcome::Optimal(found),
        Answer::Unsat if remaining(time_limit, start).is_some() => SolverOutcome::Infeasible,
        Answer::Unsat | Answer::Interrupted => SolverOutcome::Timeout(None),
    })
}

/// Ask for schedules with strictly fewer breaks than the incumbent until the
/// lower bound is met, the solver proves there is none, or the budget runs
/// out. `call` gets the exclusive bound (`None` on the first call) and the
/// remaining budget.
pub fn minimise(lower :u32, time_limit :Duration, start :Instant,
                mut call :impl FnMut(Option<u32>, Duration) -> Result<Answer, SolveError>)
    -> Result<SolverOutcome, SolveError>
{
    let mut best :Option<Incumbent> = None;
    loop {
        let budget = match remaining(time_limit, start) {
            Some(budget) => budget,
            None => return Ok(SolverOutcome::Timeout(best)),
        };
        let bound = best.as_ref().and_then(|i| i.objective);
        match call(bound, budget)? {
            Answer::Found(found) => {
                let value = found.objective
                    .ok_or_else(|| SolveError::UnrecognizedOutput("schedule without a break count".to_string()))?;
                if bound.map_or(false, |b| value >= b) {
                    return Err(SolveError::UnrecognizedOutput(format!("{} breaks do not improve on {:?}", value, bound)));
                }
                info!("Found schedule with {} breaks after {:.2}s", value, start.elapsed().as_secs_f64());
                if value <= lower {
                    return Ok(SolverOutcome::Optimal(found));
                }
                best = Some(found);
            }
            Answer::Unsat if remaining(time_limit, start).is_some() => {
                return Ok(match best {
                    Some(i) => SolverOutcome::Optimal(i),
                    None => SolverOutcome::Infeasible,
                });
            }
            Answer::Unsat | Answer::Interrupted => {
                debug!("Search stopped by the time limit");
                return Ok(SolverOutcome::Timeout(best));
            }
        }
    }
}

/// Extra wall-clock time a subprocess gets beyond its own time limit.
pub const DEADLINE_GRACE :Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout :String,
    pub stderr :String,
    /// `None` when the process was killed at the deadline.
    pub status :Option<ExitStatus>,
    pub elapsed :Duration,
}

impl ProcessOutput {
    pub fn killed(&self) -> bool { self.status.is_none() }

    /// Error for a process that exited unsuccessfully.
    pub fn check(&self, program :&Path) -> Result<(), SolveError> {
        match self.status {
            Some(status) if !status.success() => Err(SolveError::Crashed {
                program: program.display().to_string(),
                status: status.to_string(),
                stderr: self.stderr.trim().to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn drain(mut source :impl Read + Send + 'static) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Run `program` and collect its output, killing it once `deadline` has
/// passed. Output produced before the kill is kept.
pub fn run_with_deadline<S :AsRef<OsStr>>(program :&Path, args :impl IntoIterator<Item = S>, deadline :Duration)
    -> Result<ProcessOutput, SolveError>
{
    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SolveError::Spawn { program: program.display().to_string(), source })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if start.elapsed() >= deadline {
            warn!("Killing {:?} after {:.1}s", program, start.elapsed().as_secs_f64());
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    let collect = |h :Option<std::thread::JoinHandle<String>>| h.map(|h| h.join().unwrap_or_default()).unwrap_or_default();
    let output = ProcessOutput { stdout: collect(stdout), stderr: collect(stderr), status, elapsed: start.elapsed() };
    debug!("{:?} finished in {:?} with {:?}", program, output.elapsed, output.status);
    Ok(output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schedule::tests::{from_grid, schedule6};

    /// Write an executable shell script into `dir`. Scripts must exit at
    /// once when their first argument is `--ready`.
    #[cfg(unix)]
    pub(crate) fn script(dir :&Path, name :&str, body :&str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n[ \"$1\" = --ready ] && exit 0\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        // A concurrent fork may still hold the file open for writing.
        for _ in 0..100 {
            match Command::new(&path).arg("--ready").status() {
                Ok(_) => break,
                Err(_) => std::thread::sleep(Duration::from_millis(10)),
            }
        }
        path
    }

    fn incumbent(objective :u32) -> Incumbent {
        Incumbent { schedule: from_grid(&schedule6()), objective: Some(objective) }
    }

    #[test]
    fn minimise_tightens_until_unsat() {
        let mut bounds = Vec::new();
        let outcome = minimise(4, Duration::from_secs(60), Instant::now(), |bound, _| {
            bounds.push(bound);
            Ok(match bound {
                None => Answer::Found(incumbent(8)),
                Some(8) => Answer::Found(incumbent(6)),
                _ => Answer::Unsat,
            })
        }).unwrap();
        assert_eq!(bounds, vec![None, Some(8), Some(6)]);
        match outcome {
            SolverOutcome::Optimal(i) => assert_eq!(i.objective, Some(6)),
            x => panic!("{:?}", x),
        }
    }

    #[test]
    fn minimise_stops_at_the_lower_bound() {
        let mut calls = 0;
        let outcome = minimise(4, Duration::from_secs(60), Instant::now(), |_, _| {
            calls += 1;
            Ok(Answer::Found(incumbent(4)))
        }).unwrap();
        assert_eq!(calls, 1);
        assert!(matches!(outcome, SolverOutcome::Optimal(_)));
    }

    #[test]
    fn minimise_keeps_the_incumbent_on_timeout() {
        let outcome = minimise(4, Duration::from_secs(60), Instant::now(), |bound, _| {
            Ok(if bound.is_none() { Answer::Found(incumbent(7)) } else { Answer::Interrupted })
        }).unwrap();
        match outcome {
            SolverOutcome::Timeout(Some(i)) => assert_eq!(i.objective, Some(7)),
            x => panic!("{:?}", x),
        }

        // UNSAT after the budget proves nothing.
        let limit = Duration::from_millis(200);
        let outcome = minimise(4, limit, Instant::now(), |bound, _| {
            if bound.is_none() {
                return Ok(Answer::Found(incumbent(7)));
            }
            std::thread::sleep(Duration::from_millis(300));
            Ok(Answer::Unsat)
        }).unwrap();
        assert!(matches!(outcome, SolverOutcome::Timeout(Some(_))));

        let outcome = minimise(4, Duration::from_secs(0), Instant::now(), |_, _| Ok(Answer::Unsat)).unwrap();
        assert!(matches!(outcome, SolverOutcome::Timeout(None)));
    }

    #[test]
    fn minimise_rejects_answers_that_ignore_the_bound() {
        let r = minimise(4, Duration::from_secs(60), Instant::now(), |_, _| Ok(Answer::Found(incumbent(6))));
        assert!(matches!(r, Err(SolveError::UnrecognizedOutput(_))));
    }

    #[test]
    fn satisfy_outcomes() {
        let limit = Duration::from_secs(60);
        assert!(matches!(satisfy(limit, Instant::now(), |_| Ok(Answer::Found(incumbent(4)))).unwrap(),
                         SolverOutcome::Optimal(_)));
        assert!(matches!(satisfy(limit, Instant::now(), |_| Ok(Answer::Unsat)).unwrap(), SolverOutcome::Infeasible));
        assert!(matches!(satisfy(limit, Instant::now(), |_| Ok(Answer::Interrupted)).unwrap(),
                         SolverOutcome::Timeout(None)));
    }

    #[cfg(unix)]
    #[test]
    fn collects_output() {
        let out = run_with_deadline(Path::new("sh"), &["-c", "echo hello; echo oops >&2"], Duration::from_secs(10)).unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
        assert!(!out.killed());
        assert!(out.check(Path::new("sh")).is_ok());

        let out = run_with_deadline(Path::new("sh"), &["-c", "exit 3"], Duration::from_secs(10)).unwrap();
        assert!(matches!(out.check(Path::new("sh")), Err(SolveError::Crashed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn kills_at_the_deadline() {
        let out = run_with_deadline(Path::new("sh"), &["-c", "echo partial; exec sleep 30"], Duration::from_millis(300)).unwrap();
        assert!(out.killed());
        assert_eq!(out.stdout, "partial\n");
        assert!(out.elapsed < Duration::from_secs(10));
        assert!(out.check(Path::new("sh")).is_ok());
    }

    #[test]
    fn missing_program() {
        let r = run_with_deadline(Path::new("./no-such-solver-binary"), Vec::<String>::new(), Duration::from_secs(1));
        assert!(matches!(r, Err(SolveError::Spawn { .. })));
    }
}
