// ============================================================
// Layer 4 — Q&A Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<QaSample>
// into device tensors.
//
//   Input:  N samples, encoder length S, decoder length T
//   Output: encoder tensors [N, S], decoder tensors [N, T],
//           labels [N]
//
// Every sequence is already padded by the SequenceEncoder, so
// batching is a flatten + reshape:
//   [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::QaSample;

/// A batch of samples ready for `Transformer::classify`.
/// Masks are the raw 1/0 Int masks; the model layer turns them
/// into boolean attention masks.
#[derive(Debug, Clone)]
pub struct QaBatch<B: Backend> {
    /// [batch, src_len]
    pub encoder_input: Tensor<B, 2, Int>,
    /// [batch, src_len], 1 = real token
    pub encoder_mask:  Tensor<B, 2, Int>,
    /// [batch, tgt_len]
    pub decoder_input: Tensor<B, 2, Int>,
    /// [batch, tgt_len], 1 = real token
    pub decoder_mask:  Tensor<B, 2, Int>,
    /// [batch], 0 or 1
    pub labels:        Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct QaBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> QaBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Flatten one field of every sample into a [batch, len] Int tensor
    fn stack(&self, items: &[QaSample], field: impl Fn(&QaSample) -> &[u32]) -> Tensor<B, 2, Int> {
        let len  = field(&items[0]).len();
        let flat: Vec<i32> = items
            .iter()
            .flat_map(|s| field(s).iter().map(|&x| x as i32))
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([items.len(), len])
    }
}

impl<B: Backend> Batcher<QaSample, QaBatch<B>> for QaBatcher<B> {
    fn batch(&self, items: Vec<QaSample>) -> QaBatch<B> {
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        QaBatch {
            encoder_input: self.stack(&items, |s| s.encoder_input.as_slice()),
            encoder_mask:  self.stack(&items, |s| s.encoder_mask.as_slice()),
            decoder_input: self.stack(&items, |s| s.decoder_input.as_slice()),
            decoder_mask:  self.stack(&items, |s| s.decoder_mask.as_slice()),
            labels:        Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}
