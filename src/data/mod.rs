// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer turns labelled question/option pairs into
// tensor batches the Transformer can consume.
//
// The pipeline flows in this order:
//
//   PairSource         → produces tokenised QaPairs
//       │                (SyntheticPairs by default)
//       ▼
//   SequenceEncoder    → [SOS]/[EOS]/[PAD] layout + 1/0 masks
//       │
//       ▼
//   split_train_val    → seeded shuffle, train/validation split
//       │
//       ▼
//   QaDataset          → implements Burn's Dataset trait
//       │
//       ▼
//   QaBatcher          → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Seeded synthetic question/option pairs
pub mod synthetic;

/// Fixed-length encoder/decoder layout with special tokens
pub mod encoder;

/// Implements Burn's Dataset trait for Q&A samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
