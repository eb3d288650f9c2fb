// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains the Transformer and writes checkpoints
//   2. `eval`  — scores the latest checkpoint on held-out pairs
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "qa-transformer",
    version,
    about = "Train an encoder-decoder Transformer to judge question/option pairs, then evaluate it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. The CLI layer only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Eval(args)  => run_eval(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training, checkpoints in: {}", args.checkpoint_dir);

    let report = TrainUseCase::new(args.into()).execute()?;

    for e in &report.epochs {
        println!(
            "Epoch {:>3} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
            e.epoch, e.train_loss, e.val_loss, e.val_accuracy * 100.0,
        );
    }
    println!(
        "Training complete after {} steps. Validation accuracy: {:.1}% ({} samples)",
        report.global_step,
        report.final_eval.accuracy * 100.0,
        report.final_eval.sample_count(),
    );
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::eval_use_case::EvalUseCase;

    let use_case = EvalUseCase::new(&args.checkpoint_dir)?;
    let report   = use_case.run(args.num_samples, args.seed, args.num_examples)?;

    println!(
        "\nAccuracy: {:.1}% over {} samples (loss {:.4})",
        report.accuracy * 100.0,
        report.sample_count(),
        report.loss,
    );
    Ok(())
}
