use log::*;
use sportstournament::backend::{sat, Tools};
use sportstournament::builder::build;
use sportstournament::config::{self, Backend, Configuration};
use sportstournament::outcome::SolverConfig;
use sportstournament::params::TournamentParameters;
use sportstournament::runner::{run_batch, run_configuration};
use sportstournament::store::ResultStore;
use std::path::PathBuf;
use std::time::Instant;
use structopt::clap::{Error as ClapError, ErrorKind};
use structopt::*;

#[derive(StructOpt, Debug)]
#[structopt(name = "sportstournament", about = "Sports tournament scheduling benchmarks")]
struct Opt {
    /// Number of teams (even)
    #[structopt(short, long)]
    n :Option<usize>,

    /// Configuration to run, see --models
    #[structopt(short, long)]
    model :Option<String>,

    /// Run every configuration
    #[structopt(short, long)]
    all :bool,

    /// List the configurations
    #[structopt(long)]
    models :bool,

    /// Time limit per run in seconds
    #[structopt(short, long, default_value = "300")]
    time_limit :u64,

    /// Team counts for --all when -n is not given
    #[structopt(long, use_delimiter = true, default_value = "2,4,6,8,10,12,14")]
    instances :Vec<usize>,

    #[structopt(long, default_value = "res", parse(from_os_str))]
    output_dir :PathBuf,

    #[structopt(long, default_value = "minizinc", parse(from_os_str))]
    minizinc :PathBuf,

    #[structopt(long, default_value = "z3", parse(from_os_str))]
    z3 :PathBuf,

    #[structopt(long, default_value = "cbc", parse(from_os_str))]
    cbc :PathBuf,

    #[structopt(long, default_value = "scip", parse(from_os_str))]
    scip :PathBuf,

    #[structopt(long, default_value = "highs", parse(from_os_str))]
    highs :PathBuf,

    /// Write the SAT model of -n as DIMACS instead of solving
    #[structopt(long, parse(from_os_str))]
    to_cnf :Option<PathBuf>,

    #[structopt(short, long, parse(from_occurrences))]
    verbose :u8,

    #[structopt(long)]
    quiet :bool,
}

fn usage_error(message :String) -> ! {
    ClapError::with_description(&message, ErrorKind::ValueValidation).exit()
}

fn parameters(n :usize) -> TournamentParameters {
    TournamentParameters::new(n).unwrap_or_else(|e| usage_error(format!("invalid team count: {}", e)))
}

fn configuration(name :&str) -> Configuration {
    config::find(name).unwrap_or_else(|| usage_error(format!("unknown configuration {:?}, see --models", name)))
}

fn list_models() {
    let mut family = "";
    for c in config::registry() {
        if c.family() != family {
            family = c.family();
            println!("{}:", family);
        }
        println!("  {}", c.name);
    }
}

fn main() {
    let options = Opt::from_args();

    stderrlog::StdErrLog::new()
        .verbosity(usize::from(options.verbose))
        .quiet(options.quiet)
        .module(module_path!())
        .show_module_names(true)
        .color(stderrlog::ColorChoice::Auto)
        .init()
        .unwrap();

    if options.models {
        list_models();
        return;
    }

    let start = Instant::now();
    let _finished = dispose::defer(move || {
        info!("Finished in {:.1}s", start.elapsed().as_secs_f64());
    });
    debug!("Arguments {:#?}", options);

    let solver_config = SolverConfig::with_time_limit(options.time_limit);
    let tools = Tools {
        minizinc: options.minizinc.clone(),
        z3: options.z3.clone(),
        cbc: options.cbc.clone(),
        scip: options.scip.clone(),
        highs: options.highs.clone(),
    };
    let store = ResultStore::new(&options.output_dir);

    if let Some(path) = options.to_cnf.as_ref() {
        let n = options.n.unwrap_or_else(|| usage_error("--to-cnf needs -n".to_string()));
        let c = configuration(options.model.as_deref().unwrap_or("sat_satisf"));
        let encoding = match c.backend {
            Backend::Sat { encoding } => encoding,
            _ => usage_error(format!("{} is not a SAT configuration", c.name)),
        };
        let sts = build(parameters(n), c.options);
        match sat::to_dimacs(&sts, encoding).map_err(|e| e.to_string())
            .and_then(|cnf| std::fs::write(path, cnf).map_err(|e| e.to_string())) {
            Ok(()) => info!("Wrote cnf file {:?}", path),
            Err(e) => {
                error!("Could not write {:?}: {}", path, e);
                std::process::exit(1);
            }
        }
        return;
    }

    if options.all {
        let instances = match options.n {
            Some(n) => vec![parameters(n)],
            None => options.instances.iter().map(|n| parameters(*n)).collect(),
        };
        let configurations = match options.model.as_ref() {
            Some(name) => vec![configuration(name)],
            None => config::registry(),
        };
        let summary = run_batch(&instances, &configurations, &solver_config, &tools, &store);
        println!("{} runs, {} optimal, {} with a schedule", summary.runs, summary.optimal, summary.solved);
        if summary.store_errors > 0 {
            std::process::exit(1);
        }
        return;
    }

    let (n, name) = match (options.n, options.model.as_ref()) {
        (Some(n), Some(name)) => (n, name),
        _ => usage_error("give -n and --model, or --all, or --models".to_string()),
    };
    let params = parameters(n);
    let c = configuration(name);
    let record = run_configuration(params, &c, &solver_config, &tools);

    if !options.quiet {
        println!("{} n={}: time={} optimal={} obj={:?}", c.name, n, record.time, record.optimal, record.obj);
        if !record.sol.is_empty() {
            println!("{}", record.sol);
        }
    }
    match store.merge(c.family(), n, &c.name, &record) {
        Ok(path) => info!("Stored result in {:?}", path),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
