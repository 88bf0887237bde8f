//! Blockflow CLI - Command-line interface for Blockflow programs
//!
//! # Commands
//! - `blockflow run <program.json>` - Run a program and print the final environment
//! - `blockflow check <program.json>` - Build the graph and report problems
//! - `blockflow eval <expr>` - Evaluate one expression in the sandbox
//! - `blockflow schematic <program.json>` - Export the schematic JSON
//!
//! # Exit codes
//! `0` success, `1` a block (or expression) failed, `2` a step or
//! continuation limit was hit, `3` the program or config could not be loaded
//! or built.

mod check;
mod eval;
mod run;

use anyhow::{Context, Result};
use blockflow_core::Program;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BLOCKFLOW_LOG";
const DEFAULT_FILTER: &str = "warn,blockflow_runtime=info";

/// Blockflow CLI
#[derive(Parser)]
#[command(name = "blockflow")]
#[command(
    author,
    version,
    about = "Run and inspect Blockflow flow-graph programs"
)]
struct Cli {
    /// Log at debug level regardless of BLOCKFLOW_LOG / RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program to completion
    Run(run::RunArgs),

    /// Build a program's graph without running it
    Check {
        /// Program description (JSON)
        program: PathBuf,

        /// Reject blocks that fan out to several blocks
        #[arg(long)]
        no_fan_out: bool,
    },

    /// Evaluate an expression in the sandbox
    Eval {
        /// Expression to evaluate
        expression: String,

        /// Variable binding, `name=value` (value: true, false or a decimal)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },

    /// Export the schematic JSON of a program
    Schematic {
        /// Program description (JSON)
        program: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// How a command ended, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
    LimitExceeded,
}

impl Status {
    fn code(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Failed => 1,
            Status::LimitExceeded => 2,
        }
    }
}

const LOAD_FAILURE: u8 = 3;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run::run_command(&args),
        Commands::Check {
            program,
            no_fan_out,
        } => check::run_check_command(&program, no_fan_out),
        Commands::Eval { expression, vars } => eval::run_eval_command(&expression, &vars),
        Commands::Schematic { program, output } => {
            run_schematic_command(&program, output.as_deref())
        }
    };

    match result {
        Ok(status) => ExitCode::from(status.code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(LOAD_FAILURE)
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, std::env::var(LOG_ENV).ok()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn log_filter(verbose: bool, directives: Option<String>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn load_program(path: &Path) -> Result<Program> {
    Program::from_path(path)
        .with_context(|| format!("Failed to load program: {}", path.display()))
}

/// Write the schematic of a program as pretty JSON
fn run_schematic_command(program_path: &Path, output: Option<&Path>) -> Result<Status> {
    let program = load_program(program_path)?;
    let graph = program
        .build()
        .with_context(|| format!("Failed to build program `{}`", program.name))?;

    let mut schematic = graph.schematic(program.name.clone());
    schematic.description = program.description.clone();
    let json = serde_json::to_string_pretty(&schematic).context("Failed to serialize schematic")?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            println!("Schematic saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "blockflow", "run", "p.json", "--budget", "10", "--json", "--trace",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.budget, Some(10));
        assert!(args.json && args.trace);
    }

    #[test]
    fn test_parse_eval_vars() {
        let cli = Cli::parse_from(["blockflow", "eval", "a+1", "--var", "a=2", "--var", "b=true"]);
        let Commands::Eval { expression, vars } = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(expression, "a+1");
        assert_eq!(vars, vec!["a=2", "b=true"]);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Status::Success.code(), 0);
        assert_eq!(Status::Failed.code(), 1);
        assert_eq!(Status::LimitExceeded.code(), 2);
    }

    #[test]
    fn test_schematic_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("p.json");
        std::fs::write(
            &program,
            r#"{"name": "p", "blocks": [{"id": "start", "kind": "start"}]}"#,
        )
        .unwrap();
        let out = dir.path().join("s.json");

        assert_eq!(run_schematic_command(&program, Some(&out)).unwrap(), Status::Success);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(written["name"], "p");
    }

    #[test]
    fn test_missing_program_is_load_error() {
        let err = load_program(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to load program"));
    }
}
