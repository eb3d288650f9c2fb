// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores training state with Burn's named MessagePack
// recorder, gzipped, at full precision. Half precision flushes
// Adam's second moments to zero.
//
// What gets saved per checkpoint:
//   1. Model weights      (model_epoch_{n}.mpk.gz)
//   2. Optimiser state    (optim_epoch_{n}.mpk.gz), Adam moments
//   3. training_state.json, the epoch and global step last saved
//
// Plus once per run:
//   4. train_config.json, the hyperparameters the model was
//      built with. Loading weights needs the exact architecture
//      (d_model, num_layers, vocab sizes) to rebuild the model first.
//
// training_state.json is written last, so it only ever points at
// an epoch whose record files are complete.
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     optim_epoch_1.mpk.gz
//     ...
//     training_state.json   ← {"epoch": 3, "global_step": 375}
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Transformer;

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Progress counters persisted next to each checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Last completed epoch (1-based)
    pub epoch:       usize,
    /// Optimiser steps taken so far, across all epochs
    pub global_step: usize,
}

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        // Failures surface on the first write, with the path in the message
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Save model and optimiser records for `state.epoch`, then
    /// advance training_state.json to point at them.
    pub fn save_checkpoint<B, O>(
        &self,
        model: &Transformer<B>,
        optim: &O,
        state: TrainingState,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Transformer<B>, B>,
    {
        let recorder   = CheckpointRecorder::new();
        let model_path = self.model_path(state.epoch);
        let optim_path = self.optim_path(state.epoch);

        Recorder::<B>::record(&recorder, model.clone().into_record(), model_path.clone())
            .with_context(|| format!("Failed to save model to '{}'", model_path.display()))?;

        Recorder::<B>::record(&recorder, optim.to_record(), optim_path.clone())
            .with_context(|| format!("Failed to save optimiser to '{}'", optim_path.display()))?;

        let state_path = self.state_path();
        fs::write(&state_path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Failed to write '{}'", state_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {} (step {})", state.epoch, state.global_step);
        Ok(())
    }

    /// Load model weights saved for `epoch` into `model`.
    ///
    /// The model must have the architecture the checkpoint was
    /// written with, or loading fails.
    pub fn load_model<B: Backend>(
        &self,
        model:  Transformer<B>,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<Transformer<B>> {
        let path = self.model_path(epoch);
        tracing::info!("Loading model weights from epoch {}", epoch);

        let record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Load the optimiser state saved for `epoch` into `optim`.
    pub fn load_optimizer<B, O>(&self, optim: O, epoch: usize, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<Transformer<B>, B>,
    {
        let path = self.optim_path(epoch);

        let record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimiser state '{}'", path.display()))?;

        Ok(optim.load_record(record))
    }

    /// The last completed checkpoint, or None if training
    /// has never saved one in this directory.
    pub fn latest_state(&self) -> Result<Option<TrainingState>> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let state = serde_json::from_str(&json)
            .with_context(|| format!("Malformed '{}'", path.display()))?;
        Ok(Some(state))
    }

    /// Like [`latest_state`](Self::latest_state), but a missing
    /// checkpoint is an error.
    pub fn require_latest_state(&self) -> Result<TrainingState> {
        self.latest_state()?.with_context(|| {
            format!(
                "No checkpoint found in '{}'. Have you run 'train' first?",
                self.dir.display()
            )
        })
    }

    /// Save the training configuration to JSON.
    ///
    /// Called before training starts so the model can be rebuilt
    /// later for evaluation or resume.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.config_path();

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'eval'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    // The recorder appends its own .mpk.gz extension
    fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    fn optim_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optim_epoch_{epoch}"))
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join("training_state.json")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("train_config.json")
    }
}
