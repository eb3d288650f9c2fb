// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training pipeline never cares where its pairs come from.
// Anything that can hand over pre-tokenised QaPairs plugs in
// here:
//   - SyntheticPairs → deterministic generated task (data layer)
//   - (future) a CSV or JSONL reader fed by a real tokenizer
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::qa_pair::QaPair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can supply tokenised question/option pairs.
pub trait PairSource {
    /// Load every available pair from this source.
    fn load_all(&self) -> Result<Vec<QaPair>>;
}
