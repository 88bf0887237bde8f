//! Program validation

use crate::{Status, load_program};
use anyhow::{Context, Result};
use blockflow_core::{BuildOptions, Graph};
use std::path::Path;

/// Build the graph and print a summary. Build errors are load failures.
pub fn run_check_command(program_path: &Path, no_fan_out: bool) -> Result<Status> {
    let program = load_program(program_path)?;
    println!("Checking program `{}` at: {}", program.name, program_path.display());

    let options = BuildOptions {
        allow_fan_out: !no_fan_out,
    };
    let graph = program
        .build_with(options)
        .with_context(|| format!("Failed to build program `{}`", program.name))?;

    println!("{}", summarize(&graph));
    println!("Check complete!");
    Ok(Status::Success)
}

fn summarize(graph: &Graph) -> String {
    let kinds: Vec<String> = graph
        .kind_counts()
        .into_iter()
        .map(|(kind, count)| format!("{kind}: {count}"))
        .collect();
    format!(
        "  {} block(s) ({}), start `{}`, fan-out: {}",
        graph.len(),
        kinds.join(", "),
        graph.start().id(),
        if graph.has_fan_out() { "yes" } else { "no" }
    )
}
