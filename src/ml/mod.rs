// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The encoder-decoder Transformer and everything that runs it.
//
// What's in this layer:
//
//   attention.rs  — Multi-head scaled dot-product attention
//                   split_heads / merge_heads reshaping and
//                   boolean mask handling
//
//   mask.rs       — Padding, causal and combined decoder masks
//
//   model.rs      — The Transformer itself:
//                   • Token embeddings (scaled by √d_model)
//                   • Sinusoidal positional encoding
//                   • Pre-norm residual connections
//                   • Encoder / decoder stacks
//                   • Output projection + classification head
//
//   error.rs      — Typed errors for config and shape problems
//
//   trainer.rs    — Training loop with validation, checkpointing
//                   and resume
//
//   evaluator.rs  — Loss / accuracy over labelled batches
//
//   inferencer.rs — Rebuilds a trained model from a checkpoint
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Typed model-layer errors
pub mod error;

/// Attention mask construction
pub mod mask;

/// Multi-head attention
pub mod attention;

/// Encoder-decoder Transformer architecture
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Accuracy and loss over labelled batches
pub mod evaluator;

/// Loads a checkpoint for evaluation
pub mod inferencer;

#[cfg(test)]
pub(crate) mod test_utils;
