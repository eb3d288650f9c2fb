// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained model from its checkpoint directory and
// scores labelled data with it.
//
//   train_config.json   → architecture (dropout forced to 0)
//   training_state.json → which epoch is the latest
//   model_epoch_{n}     → weights

use anyhow::Result;
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::QaBatcher, dataset::QaDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::{evaluate, EvalReport};
use crate::ml::model::Transformer;

pub struct Inferencer<B: Backend> {
    model:  Transformer<B>,
    config: TrainConfig,
    epoch:  usize,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let config = ckpt_manager.load_config()?;
        let state  = ckpt_manager.require_latest_state()?;

        let model: Transformer<B> = config
            .model_config()
            .with_dropout(0.0)
            .init(&device)?;
        let model = ckpt_manager.load_model(model, state.epoch, &device)?;

        tracing::info!("Model loaded from checkpoint (epoch {})", state.epoch);
        Ok(Self { model, config, epoch: state.epoch, device })
    }

    /// The configuration the checkpoint was trained with
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn evaluate(&self, dataset: QaDataset, num_examples: usize) -> Result<EvalReport> {
        let loader = DataLoaderBuilder::new(QaBatcher::<B>::new(self.device.clone()))
            .batch_size(self.config.batch_size)
            .num_workers(1)
            .build(dataset);

        evaluate(&self.model, loader.iter(), num_examples)
    }
}
