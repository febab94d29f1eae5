//! ---
//! cea_section: "05-networking-external-interfaces"
//! cea_subsection: "binary"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Candidate evaluation subcommand."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use cea_common::AppConfig;
use cea_core::{evaluate, evaluate_or_penalise, load_request, EvaluationBudget};
use clap::Args;

use crate::print_json;

#[derive(Debug, Args)]
pub struct EvaluateCommand {
    /// Evaluation request (JSON or YAML).
    #[arg(long, value_name = "FILE")]
    request: PathBuf,

    /// Fail instead of reporting a penalised fitness for invalid candidates.
    #[arg(long)]
    strict: bool,

    /// Print the full report instead of the fitness vector.
    #[arg(long)]
    report: bool,
}

pub fn run(command: EvaluateCommand, config: &AppConfig) -> Result<()> {
    let request = load_request(&command.request)
        .with_context(|| format!("failed to load request {}", command.request.display()))?;
    let budget = EvaluationBudget::from_config(&config.evaluation);
    let report = if command.strict {
        evaluate(&request, config, &budget)?
    } else {
        evaluate_or_penalise(&request, config, &budget)?
    };
    if command.report {
        print_json(&report)
    } else {
        print_json(&report.fitness)
    }
}
