// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Generate labelled pairs      (Layer 4 - data)
//   Step 2: Lay out encoder/decoder ids  (Layer 4 - data)
//   Step 3: Split train/validation       (Layer 4 - data)
//   Step 4: Build datasets               (Layer 4 - data)
//   Step 5: Save config                  (Layer 6 - infra)
//   Step 6: Run training loop            (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{QaDataset, QaSample},
    encoder::SequenceEncoder,
    splitter::split_train_val,
    synthetic::SyntheticPairs,
};
use crate::domain::traits::PairSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::TransformerConfig;
use crate::ml::trainer::{run_training, TrainReport};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved next to the checkpoints and
// reloaded to rebuild the same model for evaluation or resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub checkpoint_dir:   String,

    // data
    pub num_samples:      usize,
    pub train_fraction:   f64,
    pub vocab_size:       usize,
    pub max_question_len: usize,
    pub max_option_len:   usize,
    /// Encoder and decoder sequence length
    pub seq_len:          usize,

    // optimisation
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub seed:             u64,
    pub resume:           bool,
    /// Validation samples logged one by one after each epoch
    pub num_examples:     usize,

    // architecture
    pub d_model:          usize,
    pub num_heads:        usize,
    pub num_layers:       usize,
    pub d_ff:             usize,
    pub dropout:          f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:   "checkpoints".to_string(),
            num_samples:      2000,
            train_fraction:   0.9,
            vocab_size:       40,
            max_question_len: 12,
            max_option_len:   3,
            seq_len:          16,
            batch_size:       16,
            epochs:           10,
            lr:               1e-4,
            seed:             69,
            resume:           false,
            num_examples:     2,
            d_model:          64,
            num_heads:        8,
            num_layers:       3,
            d_ff:             256,
            dropout:          0.1,
        }
    }
}

impl TrainConfig {
    /// Reject run settings that would train on nothing or never step.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_samples > 0, "num_samples must be positive");
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(
            self.train_fraction > 0.0 && self.train_fraction <= 1.0,
            "train_fraction must be in (0, 1], got {}",
            self.train_fraction
        );
        Ok(())
    }

    /// The Transformer this run trains: one shared vocabulary and
    /// sequence length for both sides, a single output logit.
    pub fn model_config(&self) -> TransformerConfig {
        TransformerConfig::new(
            self.vocab_size,
            self.vocab_size,
            self.seq_len,
            self.seq_len,
            self.d_model,
        )
        .with_num_heads(self.num_heads)
        .with_num_layers(self.num_layers)
        .with_d_ff(self.d_ff)
        .with_dropout(self.dropout)
        .with_num_classes(Some(1))
    }

    /// Synthetic pairs drawn with `seed`, laid out for this config.
    pub fn build_samples(&self, count: usize, seed: u64) -> Result<Vec<QaSample>> {
        let source = SyntheticPairs::new(
            count,
            self.vocab_size,
            self.max_question_len,
            self.max_option_len,
            seed,
        );
        let pairs = source.load_all()?;
        SequenceEncoder::new(self.seq_len, self.seq_len).encode_all(&pairs)
    }

    /// Generate, encode and split the training data. Deterministic
    /// in `seed`, so a resumed run sees the same validation set.
    pub fn prepare_datasets(&self) -> Result<(QaDataset, QaDataset)> {
        let samples = self.build_samples(self.num_samples, self.seed)?;
        let (train_samples, val_samples) =
            split_train_val(samples, self.train_fraction, self.seed);

        Ok((QaDataset::new(train_samples), QaDataset::new(val_samples)))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // Fail on bad settings before generating data or touching the checkpoint dir
        cfg.validate()?;
        cfg.model_config().validate()?;

        // ── Steps 1-4: data ──────────────────────────────────────────────────
        tracing::info!(
            "Generating {} synthetic pairs (vocab {}, seed {})",
            cfg.num_samples, cfg.vocab_size, cfg.seed
        );
        let (train_dataset, val_dataset) = cfg.prepare_datasets()?;
        tracing::info!(
            "Split: {} train, {} validation ({:.0}% positive in train)",
            train_dataset.sample_count(),
            val_dataset.sample_count(),
            train_dataset.positive_rate() * 100.0,
        );

        // ── Step 5: Save config for eval / resume ────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Run training loop (Layer 5) ──────────────────────────────
        run_training(cfg, train_dataset, val_dataset, &ckpt_manager)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_matches_train_config() {
        let cfg   = TrainConfig::default();
        let model = cfg.model_config();
        assert_eq!(model.src_vocab_size, cfg.vocab_size);
        assert_eq!(model.tgt_seq_len, cfg.seq_len);
        assert_eq!(model.num_layers, cfg.num_layers);
        assert_eq!(model.output_dim(), 1);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_prepare_datasets_is_deterministic() {
        let cfg = TrainConfig { num_samples: 100, ..TrainConfig::default() };

        let (train_a, val_a) = cfg.prepare_datasets().unwrap();
        let (train_b, val_b) = cfg.prepare_datasets().unwrap();

        assert_eq!(train_a.sample_count(), 90);
        assert_eq!(val_a.sample_count(), 10);
        assert_eq!(train_a.sample_count(), train_b.sample_count());
        assert_eq!(val_a.positive_rate(), val_b.positive_rate());
    }

    #[test]
    fn test_questions_longer_than_seq_len_fail() {
        let cfg = TrainConfig { seq_len: 8, max_question_len: 12, ..TrainConfig::default() };
        assert!(cfg.prepare_datasets().is_err());
    }

    #[test]
    fn test_rejects_runs_that_cannot_step() {
        let base = TrainConfig::default();
        assert!(base.validate().is_ok());

        let bad = [
            TrainConfig { batch_size: 0, ..base.clone() },
            TrainConfig { epochs: 0, ..base.clone() },
            TrainConfig { num_samples: 0, ..base.clone() },
            TrainConfig { train_fraction: 0.0, ..base.clone() },
            TrainConfig { train_fraction: 1.5, ..base.clone() },
            TrainConfig { train_fraction: f64::NAN, ..base.clone() },
        ];
        for cfg in &bad {
            assert!(cfg.validate().is_err(), "accepted {cfg:?}");
        }
        assert!(TrainConfig { train_fraction: 1.0, ..base }.validate().is_ok());
    }

    #[test]
    fn test_execute_fails_before_writing_checkpoints() {
        let dir = crate::ml::test_utils::scratch_dir("bad_train_config").join("ckpt");
        let cfg = TrainConfig {
            checkpoint_dir: dir.to_string_lossy().into_owned(),
            batch_size: 0,
            ..TrainConfig::default()
        };

        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_config_survives_json() {
        let cfg  = TrainConfig { resume: true, lr: 3e-4, ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert!(back.resume);
        assert_eq!(back.lr, 3e-4);
        assert_eq!(back.seq_len, cfg.seq_len);
    }
}
