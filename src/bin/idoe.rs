//! `idoe`: thin CLI over the core library (spec §6.4).
//!
//! The core never logs to standard output; this binary installs
//! `env_logger` itself when `--verbose` is passed, matching
//! `guwidoe-GroupMixer`'s `solver-cli` convention of keeping the engine
//! silent unless explicitly asked for diagnostics. `--verbose` also forwards
//! as the `msg` flag of spec §6.1 into `Solve`, so the underlying engine's
//! own search-progress log lines (not just this binary's `log` call sites)
//! reach stderr.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use idoe_planner::{Schedule, ScheduleDocument, SolveStatus};

#[derive(Parser)]
#[command(name = "idoe")]
#[command(about = "Constraint compiler and MILP solver driver for iDoE schedules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an iDoE scheduling problem and print (or write) its Schedule.
    Solve {
        /// Input JSON file path (omit to read from stdin).
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Write the Schedule to this path instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Solver time budget in seconds.
        #[arg(long, default_value_t = 60.0)]
        time_limit: f64,

        /// Install a stderr logger at debug level.
        #[arg(long)]
        verbose: bool,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Validate an input file's shape without invoking the solver engine.
    Validate {
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Print the JSON schema for the solver input or the Schedule output.
    Schema {
        /// `input` or `output`.
        #[arg(value_name = "WHICH", default_value = "output")]
        which: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Solve {
            input,
            output,
            time_limit,
            verbose,
            pretty,
        } => cmd_solve(input, output, time_limit, verbose, pretty),
        Commands::Validate { input } => cmd_validate(input),
        Commands::Schema { which } => cmd_schema(&which),
    }
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(&path).with_context(|| format!("failed to read {:?}", path))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read input from stdin")?;
            Ok(buffer)
        }
    }
}

fn cmd_solve(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    time_limit: f64,
    verbose: bool,
    pretty: bool,
) -> Result<()> {
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    }

    let json = read_input(input)?;
    let request: idoe_planner_cli::SolveRequest =
        serde_json::from_str(&json).context("failed to parse input JSON")?;

    let schedule: Schedule = idoe_planner::Solve(
        request.combinations,
        request.num_stages,
        request.max_runs,
        request.parameter_bounds,
        request.constraints,
        time_limit,
        verbose,
    )
    .context("solve failed")?;
    let document = ScheduleDocument::from(&schedule);

    let output_json = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };

    match output {
        Some(path) => {
            fs::write(&path, &output_json).with_context(|| format!("failed to write {:?}", path))?;
            eprintln!("schedule written to {:?}", path);
        }
        None => println!("{}", output_json),
    }

    std::process::exit(match schedule.status {
        SolveStatus::Optimal | SolveStatus::Feasible => 0,
        _ => 1,
    });
}

fn cmd_validate(input: Option<PathBuf>) -> Result<()> {
    let json = read_input(input)?;
    let request: idoe_planner_cli::SolveRequest =
        serde_json::from_str(&json).context("JSON parse error")?;
    match idoe_planner::ProblemModel::new(
        request.combinations,
        request.num_stages,
        request.max_runs,
        request.parameter_bounds,
        request.constraints,
    ) {
        Ok(_) => {
            println!("{{\"valid\": true}}");
            Ok(())
        }
        Err(e) => {
            println!(
                "{{\"valid\": false, \"error\": \"{}\"}}",
                e.to_string().replace('"', "\\\"")
            );
            Ok(())
        }
    }
}

fn cmd_schema(which: &str) -> Result<()> {
    let schema = match which {
        "input" => schemars::schema_for!(idoe_planner_cli::SolveRequest),
        "output" => schemars::schema_for!(ScheduleDocument),
        other => anyhow::bail!("unknown schema kind: {} (expected input or output)", other),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Input-shape glue that lives in the binary rather than the core library:
/// the core's `Solve` signature takes its arguments positionally (spec
/// §6.1), but a CLI needs a single deserializable request object.
mod idoe_planner_cli {
    use idoe_planner::{Combination, ConstraintConfig, ParameterBounds};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
    pub struct SolveRequest {
        pub combinations: Vec<Combination>,
        pub num_stages: u32,
        #[serde(default)]
        pub max_runs: Option<u32>,
        pub parameter_bounds: ParameterBounds,
        #[serde(default)]
        pub constraints: ConstraintConfig,
    }
}
