// ============================================================
// Layer 5 — Model Errors
// ============================================================
// Shape problems are reported as values instead of being left
// to the backend, which would either panic deep inside a kernel
// or (worse) broadcast its way to a silently wrong result.
//
// Everything above the model layer uses anyhow; this enum
// converts into anyhow::Error through std::error::Error.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    #[error("model dim {d_model} is not divisible by head count {num_heads}")]
    HeadsMismatch { d_model: usize, num_heads: usize },

    #[error("attention mask {mask:?} is not broadcastable to scores {scores:?}")]
    MaskShape { mask: [usize; 4], scores: [usize; 4] },

    #[error("{what}: expected shape {expected:?}, got {got:?}")]
    ShapeMismatch {
        what:     &'static str,
        expected: Vec<usize>,
        got:      Vec<usize>,
    },

    #[error("sequence of length {len} exceeds the configured maximum of {max}")]
    SequenceTooLong { len: usize, max: usize },
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
