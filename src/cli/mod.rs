// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains the cross-encoder on tokenised pairs
//   2. `score` — loads a checkpoint and writes per-pair scores

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ScoreArgs, TrainArgs};

use crate::application::{score_use_case::ScoreUseCase, train_use_case::TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "qa-cross-encoder",
    version,
    about = "Train a cross-encoder to score question/answer pairs, then score new pairs."
)]
pub struct Cli {
    /// The subcommand to run (train or score)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; the CLI layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Score(args) => run_score(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on: {}", args.train_file);

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete. Best epoch {} (spearman {:.4}), final train loss {:.4}.",
        summary.best_epoch, summary.best_spearman, summary.last_train_loss
    );
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    let use_case = ScoreUseCase::from_checkpoint(&args.checkpoint_dir)?;
    let n = use_case.execute(&args.input, args.output)?;
    tracing::info!("Scored {} pairs", n);
    Ok(())
}
