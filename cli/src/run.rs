//! Program execution

use crate::{Status, load_program};
use anyhow::{Context, Result};
use blockflow_core::Environment;
use blockflow_runtime::{
    ContinuationStatus, Engine, ExecutorConfig, RunReport, Trace, TraceEvent,
};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Program description (JSON)
    pub program: PathBuf,

    /// Executor config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of signal calls
    #[arg(long)]
    pub budget: Option<u64>,

    /// Maximum number of continuations, root included
    #[arg(long)]
    pub max_continuations: Option<usize>,

    /// Reject blocks that fan out to several blocks
    #[arg(long)]
    pub no_fan_out: bool,

    /// Record and print the execution trace
    #[arg(long)]
    pub trace: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Resolve config: file, then environment, then flags.
pub fn resolve_config(args: &RunArgs) -> Result<ExecutorConfig> {
    let base = match &args.config {
        Some(path) => ExecutorConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ExecutorConfig::default(),
    };
    let mut config = base
        .with_env_overrides()
        .context("Invalid BLOCKFLOW_* environment variable")?;

    if let Some(budget) = args.budget {
        config = config.with_step_budget(budget);
    }
    if let Some(limit) = args.max_continuations {
        config = config.with_max_continuations(limit);
    }
    if args.no_fan_out {
        config = config.with_allow_fan_out(false);
    }
    Ok(config.with_record_trace(args.trace))
}

pub fn run_command(args: &RunArgs) -> Result<Status> {
    let config = resolve_config(args)?;
    tracing::debug!(?config, "resolved executor config");
    let program = load_program(&args.program)?;
    let engine = Engine::from_program(&program, config.build_options())
        .with_context(|| format!("Failed to build program `{}`", program.name))?;

    let report = match engine.executor(config).run() {
        Ok(report) => report,
        Err(err) if err.is_limit() => {
            eprintln!("error: {err}");
            return Ok(Status::LimitExceeded);
        }
        Err(err) => return Err(err).context("Run aborted"),
    };
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{json}");
    } else {
        print_report(engine.name(), &report);
    }

    Ok(if report.is_success() {
        Status::Success
    } else {
        Status::Failed
    })
}

fn print_report(name: &str, report: &RunReport) {
    println!(
        "program `{}` finished: {} step(s), {} continuation(s)",
        name,
        report.steps,
        report.outcomes.len()
    );

    for outcome in &report.outcomes {
        match &outcome.status {
            ContinuationStatus::Completed { environment } => {
                println!("continuation {}: completed at `{}`", outcome.id, outcome.last_block);
                print_environment(environment);
            }
            ContinuationStatus::Forked { children } => {
                let ids: Vec<String> = children.iter().map(ToString::to_string).collect();
                println!(
                    "continuation {}: forked at `{}` into {}",
                    outcome.id,
                    outcome.last_block,
                    ids.join(", ")
                );
            }
            ContinuationStatus::Failed(failure) => {
                println!("continuation {}: FAILED", outcome.id);
                println!("  {}", failure);
                if let Some(previous) = &failure.previous {
                    println!("  reached from `{previous}`");
                }
                print_environment(&failure.environment);
            }
        }
    }

    if let Some(trace) = &report.trace {
        print_trace(trace);
    }
    println!("elapsed: {:?}", report.elapsed);
}

fn print_environment(environment: &Environment) {
    if environment.is_empty() {
        println!("  (empty environment)");
    }
    for (name, value) in environment.iter() {
        println!("  {name} = {value}");
    }
}

fn print_trace(trace: &Trace) {
    println!("trace {}:", trace.run_id);
    for event in &trace.events {
        match event {
            TraceEvent::BlockEntered {
                step,
                continuation,
                block,
                ..
            } => println!("  [{step:>4}] {continuation} -> {block}"),
            TraceEvent::BlockExited {
                continuation,
                block,
                outcome,
                duration_us,
                ..
            } => println!("         {continuation} <- {block}: {outcome} ({duration_us}us)"),
            TraceEvent::Forked {
                continuation,
                children,
                ..
            } => {
                let ids: Vec<String> = children.iter().map(ToString::to_string).collect();
                println!("         {continuation} forks {}", ids.join(", "));
            }
            TraceEvent::ContinuationFinished {
                continuation,
                status,
            } => println!("         {continuation} {status}"),
        }
    }
}
