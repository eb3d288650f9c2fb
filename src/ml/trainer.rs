// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend (Autodiff<Wgpu> from
//     the CLI, Autodiff<NdArray> in tests) for gradients
//   - model.valid() returns the model on B::InnerBackend with
//     dropout disabled; the validation batcher uses that backend
//   - optim.step() consumes the model and hands back the updated
//     one, so nothing can read weights mid-update
//
// Per epoch:
//   train batches → BCE loss → backward → Adam step
//   validate (logs a few example predictions)
//   checkpoint model + optimiser + step counters
//
// After the last epoch the whole validation set is scored once
// more and reported as the final accuracy.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::QaBatcher, dataset::QaDataset};
use crate::infra::checkpoint::{CheckpointManager, TrainingState};
use crate::ml::evaluator::{evaluate, EvalReport};
use crate::ml::model::Transformer;

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Adam's denominator epsilon
const ADAM_EPSILON: f32 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub epoch:        usize,
    pub train_loss:   f64,
    pub val_loss:     f64,
    pub val_accuracy: f64,
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Only the epochs run by this call; a resumed run skips the earlier ones
    pub epochs:      Vec<EpochSummary>,
    pub global_step: usize,
    pub final_eval:  EvalReport,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: QaDataset,
    val_dataset:   QaDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainReport> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: QaDataset,
    val_dataset:   QaDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<TrainReport> {
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: Transformer<B> = cfg.model_config().init(&device)?;
    tracing::info!(
        "Model ready: {} encoder + {} decoder layers, d_model={}, heads={}",
        cfg.num_layers, cfg.num_layers, cfg.d_model, cfg.num_heads
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();

    // ── Resume ────────────────────────────────────────────────────────────────
    let mut start_epoch = 1;
    let mut global_step = 0;

    if cfg.resume {
        match ckpt_manager.latest_state()? {
            Some(state) => {
                model       = ckpt_manager.load_model(model, state.epoch, &device)?;
                optim       = ckpt_manager.load_optimizer(optim, state.epoch, &device)?;
                start_epoch = state.epoch + 1;
                global_step = state.global_step;
                tracing::info!(
                    "Resuming after epoch {} (global step {})",
                    state.epoch, state.global_step
                );
            }
            None => tracing::warn!(
                "--resume given but no checkpoint in '{}'; starting from scratch",
                ckpt_manager.dir().display()
            ),
        }
    }

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(QaBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_loader = DataLoaderBuilder::new(QaBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut epochs = Vec::new();

    for epoch in start_epoch..=cfg.epochs {
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
            global_step += 1;

            tracing::debug!("epoch {} step {}: loss={:.4}", epoch, global_step, loss_val);
        }

        let train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let val = evaluate(&model.valid(), val_loader.iter(), cfg.num_examples)?;

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
            epoch, cfg.epochs, train_loss, val.loss, val.accuracy * 100.0,
        );

        ckpt_manager.save_checkpoint(&model, &optim, TrainingState { epoch, global_step })?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        epochs.push(EpochSummary {
            epoch,
            train_loss,
            val_loss:     val.loss,
            val_accuracy: val.accuracy,
        });
    }

    // ── Final evaluation ──────────────────────────────────────────────────────
    let final_eval = evaluate(&model.valid(), val_loader.iter(), 0)?;
    tracing::info!(
        "Training complete: {} steps, validation accuracy {:.1}% over {} samples",
        global_step,
        final_eval.accuracy * 100.0,
        final_eval.sample_count(),
    );

    Ok(TrainReport { epochs, global_step, final_eval })
}
