// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `eval`, and all
// their configurable flags.
//
// clap's derive macros generate help text (--help), errors for
// missing args and string → number conversion.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the encoder-decoder Transformer on synthetic question/option pairs
    Train(TrainArgs),

    /// Evaluate the latest checkpoint on a freshly generated held-out set
    Eval(EvalArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory for checkpoints and the saved training config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of labelled pairs to generate
    #[arg(long, default_value_t = 2000)]
    pub num_samples: usize,

    /// Share of the pairs used for training; the rest validates
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    /// Vocabulary size, including the 4 special tokens
    #[arg(long, default_value_t = 40)]
    pub vocab_size: usize,

    /// Longest generated question, in tokens
    #[arg(long, default_value_t = 12)]
    pub max_question_len: usize,

    /// Longest generated option, in tokens
    #[arg(long, default_value_t = 3)]
    pub max_option_len: usize,

    /// Encoder and decoder sequence length (question + [SOS] + [EOS] must fit)
    #[arg(long, default_value_t = 16)]
    pub seq_len: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Constant Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Seed for weights, data generation, split and shuffling
    #[arg(long, default_value_t = 69)]
    pub seed: u64,

    /// Continue from the latest checkpoint in --checkpoint-dir
    #[arg(long)]
    pub resume: bool,

    /// Validation predictions logged after each epoch
    #[arg(long, default_value_t = 2)]
    pub num_examples: usize,

    /// Hidden dimension (d_model), must be divisible by --num-heads
    #[arg(long, default_value_t = 64)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Blocks in each of the encoder and decoder stacks
    #[arg(long, default_value_t = 3)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 256)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            checkpoint_dir:   a.checkpoint_dir,
            num_samples:      a.num_samples,
            train_fraction:   a.train_fraction,
            vocab_size:       a.vocab_size,
            max_question_len: a.max_question_len,
            max_option_len:   a.max_option_len,
            seq_len:          a.seq_len,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            seed:             a.seed,
            resume:           a.resume,
            num_examples:     a.num_examples,
            d_model:          a.d_model,
            num_heads:        a.num_heads,
            num_layers:       a.num_layers,
            d_ff:             a.d_ff,
            dropout:          a.dropout,
        }
    }
}

/// All arguments for the `eval` command
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of held-out pairs to generate
    #[arg(long, default_value_t = 500)]
    pub num_samples: usize,

    /// Seed for the held-out set (default: training seed + 1)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Predictions to log individually
    #[arg(long, default_value_t = 5)]
    pub num_examples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let parsed = Harness::parse_from(["qa-transformer", "train"]);
        let Commands::Train(args) = parsed.command else { panic!("expected train") };

        let from_cli: TrainConfig = args.into();
        let default  = TrainConfig::default();
        assert_eq!(
            serde_json::to_value(&from_cli).unwrap(),
            serde_json::to_value(&default).unwrap()
        );
    }

    #[test]
    fn test_eval_flags() {
        let parsed = Harness::parse_from(["qa-transformer", "eval", "--seed", "7", "--num-samples", "20"]);
        let Commands::Eval(args) = parsed.command else { panic!("expected eval") };
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.num_samples, 20);
        assert_eq!(args.checkpoint_dir, "checkpoints");
    }
}
