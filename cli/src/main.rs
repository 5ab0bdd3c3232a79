//! portfolio-exp CLI - drive experiment sessions without the web harness
//!
//! `run` replays one scripted participant, `config` prints the default
//! configuration and `simulate` runs synthetic participants for pilots.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use portfolio_experiment_core_rs::{
    BeliefsForm, DemographicsForm, ExperimentConfig, ExportRow, Money, RngManager, Round, Step,
    StepSequencer,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "portfolio-exp")]
#[command(about = "Run two-round portfolio-choice experiment sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted participant and print the export row
    Run {
        /// Path to the session script (JSON)
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Also print the event log
        #[arg(long)]
        events: bool,

        /// Write a checkpoint of the finished session to this path
        #[arg(long, value_name = "PATH")]
        snapshot: Option<PathBuf>,
    },
    /// Print the default configuration
    Config,
    /// Run synthetic participants with random allocations
    Simulate {
        /// Number of participants
        #[arg(short, long, default_value = "100")]
        participants: usize,

        /// Session seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

/// One participant's scripted answers
#[derive(Debug, Deserialize)]
struct SessionScript {
    #[serde(default)]
    config: ExperimentConfig,
    /// A fresh UUID is used when absent
    participant_id: Option<String>,
    allocation_1: i64,
    beliefs: BeliefsForm,
    allocation_2: i64,
    demographics: DemographicsForm,
}

#[derive(Debug, Default, Serialize)]
struct SimulationSummary {
    participants: usize,
    favorable_rate_round_1: f64,
    favorable_rate_round_2: f64,
    mean_delta_risk_after_gain: Option<f64>,
    mean_delta_risk_after_loss: Option<f64>,
    mean_total_return_cents: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            events,
            snapshot,
        } => {
            info!("Replaying script: {}", script.display());
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let script: SessionScript =
                serde_json::from_str(&text).context("parsing session script")?;

            let session = replay(script)?;
            println!("{}", serde_json::to_string_pretty(&session.export_row())?);
            if events {
                println!("{}", serde_json::to_string_pretty(session.events())?);
            }
            if let Some(path) = snapshot {
                let json = session.snapshot()?.to_json()?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!("Snapshot written to {}", path.display());
            }
        }
        Commands::Config => {
            println!(
                "{}",
                serde_json::to_string_pretty(&ExperimentConfig::default())?
            );
        }
        Commands::Simulate { participants, seed } => {
            if participants == 0 {
                bail!("--participants must be at least 1");
            }
            let summary = simulate(participants, seed)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Walk a session through every step with the scripted answers
fn replay(script: SessionScript) -> anyhow::Result<StepSequencer> {
    let participant_id = script
        .participant_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut session = StepSequencer::new(script.config, participant_id)?;

    while session.current_step() != Step::Summary {
        match session.current_step() {
            Step::Decision1 => {
                session.record_allocation(script.allocation_1)?;
            }
            Step::Beliefs => session.record_beliefs(script.beliefs.clone())?,
            Step::Decision2 => {
                session.record_allocation(script.allocation_2)?;
            }
            Step::Demographics => session.record_demographics(script.demographics.clone())?,
            _ => {}
        }
        session.advance()?;
    }

    Ok(session)
}

fn synthetic_demographics() -> DemographicsForm {
    DemographicsForm {
        age: 30,
        gender: "prefer not to say".to_string(),
        education: "other".to_string(),
        field_of_study: None,
        risk_attitude: 5,
        investment_experience: "none".to_string(),
        decision_reasoning: None,
    }
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
    }
}

/// Run synthetic participants and aggregate the analysis variables
fn simulate(participants: usize, seed: u64) -> anyhow::Result<SimulationSummary> {
    let config = ExperimentConfig {
        rng_seed: seed,
        ..Default::default()
    };
    // Allocations come from their own stream so they never touch regime draws
    let mut choices = RngManager::new(seed ^ 0x9E37_79B9_7F4A_7C15);

    let mut rows: Vec<ExportRow> = Vec::with_capacity(participants);
    for index in 0..participants {
        let current_portfolio = Money::from_units(100);
        let script = SessionScript {
            config: config.clone(),
            participant_id: Some(format!("SIM-{:05}", index)),
            allocation_1: choices.range(0, 101),
            beliefs: BeliefsForm {
                wta_sell: current_portfolio,
                belief_stock_prob: choices.range(0, 101),
                luck_vs_skill: choices.range(1, 8),
            },
            allocation_2: choices.range(0, 101),
            demographics: synthetic_demographics(),
        };

        match replay(script) {
            Ok(session) => rows.push(session.export_row()),
            Err(e) => warn!(participant = index, "synthetic session failed: {}", e),
        }
    }

    let count = rows.len();
    if count == 0 {
        bail!("no synthetic session completed");
    }

    let favorable = |round: Round| {
        rows.iter()
            .filter(|row| match round {
                Round::One => row.regime_1 == Some(true),
                Round::Two => row.regime_2 == Some(true),
            })
            .count() as f64
            / count as f64
    };
    let deltas = |gain: bool| {
        rows.iter()
            .filter(|row| row.paper_gain == Some(gain))
            .filter_map(|row| row.delta_risk.map(i64::from))
            .collect::<Vec<_>>()
    };
    let totals: Vec<i64> = rows.iter().filter_map(|row| row.total_return).collect();

    let summary = SimulationSummary {
        participants: count,
        favorable_rate_round_1: favorable(Round::One),
        favorable_rate_round_2: favorable(Round::Two),
        mean_delta_risk_after_gain: mean(&deltas(true)),
        mean_delta_risk_after_loss: mean(&deltas(false)),
        mean_total_return_cents: mean(&totals).unwrap_or_default(),
    };

    info!(
        participants = count,
        favorable_1 = summary.favorable_rate_round_1,
        favorable_2 = summary.favorable_rate_round_2,
        "simulation finished"
    );
    Ok(summary)
}
