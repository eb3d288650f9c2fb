// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Holds out part of the generated pairs for validation.
//
// SyntheticPairs draws every pair independently, so the order
// carries no structure; the shuffle still runs so a non-synthetic
// PairSource (grouped by question, say) can't leak one group
// entirely into the validation side.
//
// The shuffle is seeded: `--resume` rebuilds the datasets from
// scratch and must land on the same validation set.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle with `seed`, then cut at `round(len * train_fraction)`.
/// The cut is clamped to `len`; callers validate the fraction.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    samples.shuffle(&mut StdRng::seed_from_u64(seed));

    let cut = ((samples.len() as f64 * train_fraction).round() as usize).min(samples.len());
    let val = samples.split_off(cut);

    tracing::debug!("split {} train / {} validation (seed {seed})", samples.len(), val.len());
    (samples, val)
}
