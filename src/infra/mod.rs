// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence that doesn't belong in any
// business layer:
//
//   checkpoint.rs — Saving and loading training state
//                   Uses Burn's gzipped named MessagePack recorder
//                   at full precision for model and optimiser
//                   records, and serde_json for the
//                   step counters and the TrainConfig, so a run
//                   can be resumed or evaluated later.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model/optimiser checkpoint saving and loading
pub mod checkpoint;
