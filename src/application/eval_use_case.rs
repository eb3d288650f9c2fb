// ============================================================
// Layer 2 — Eval Use Case
// ============================================================
// Scores a trained checkpoint on pairs it has never seen:
//
//   Step 1: Rebuild the model from the checkpoint  (Layer 5/6)
//   Step 2: Generate a held-out set with its own seed (Layer 4)
//   Step 3: Evaluate and report accuracy           (Layer 5)
//
// The held-out set uses the training config's vocabulary and
// lengths, so it is laid out exactly like the training data.

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::data::dataset::QaDataset;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::EvalReport;
use crate::ml::inferencer::Inferencer;

type InferBackend = burn::backend::Wgpu;

pub struct EvalUseCase<B: Backend = InferBackend> {
    inferencer: Inferencer<B>,
}

impl EvalUseCase<InferBackend> {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        Self::with_device(checkpoint_dir, burn::backend::wgpu::WgpuDevice::default())
    }
}

impl<B: Backend> EvalUseCase<B> {
    pub fn with_device(checkpoint_dir: &str, device: B::Device) -> Result<Self> {
        let ckpt       = CheckpointManager::new(checkpoint_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt, device)?;
        Ok(Self { inferencer })
    }

    /// Evaluate on `num_samples` fresh pairs drawn with `seed`.
    /// `None` uses the training seed + 1 so the set never matches
    /// the training data.
    pub fn run(&self, num_samples: usize, seed: Option<u64>, num_examples: usize) -> Result<EvalReport> {
        ensure!(num_samples > 0, "num_samples must be positive");

        let cfg  = self.inferencer.config();
        let seed = seed.unwrap_or_else(|| cfg.seed.wrapping_add(1));
        if seed == cfg.seed {
            tracing::warn!("Evaluating with the training seed; results overlap the training data");
        }

        let samples = cfg.build_samples(num_samples, seed)?;
        let dataset = QaDataset::new(samples);
        tracing::info!(
            "Evaluating epoch {} on {} held-out samples (seed {})",
            self.inferencer.epoch(),
            dataset.sample_count(),
            seed,
        );

        let report = self.inferencer.evaluate(dataset, num_examples)?;
        tracing::info!(
            "loss={:.4} accuracy={:.1}%",
            report.loss,
            report.accuracy * 100.0
        );
        Ok(report)
    }
}
