// ============================================================
// Layer 4 — Sequence Encoder
// ============================================================
// Lays a tokenised QaPair out as fixed-length model inputs.
//
// Encoder side (question):
//   [SOS] q1 q2 ... qn [EOS] [PAD] [PAD] ...   → src_seq_len
//
// Decoder side (option):
//   [SOS] o1 o2 ... om [PAD] [PAD] ...          → tgt_seq_len
//
// Both get a 1/0 attention mask (1 = real token). Padding is
// always trailing: the model reads its classification logit at
// the last real decoder position and relies on that.
//
// Sequences that don't fit are rejected rather than truncated;
// cutting an option short could silently flip its label.

use anyhow::{bail, Result};

use crate::data::dataset::QaSample;
use crate::domain::qa_pair::QaPair;

/// Special token ids, in the order a word-level vocabulary
/// reserves them ([UNK] = 0). Real words start at FIRST_WORD_ID.
pub const PAD_ID: u32 = 1;
pub const SOS_ID: u32 = 2;
pub const EOS_ID: u32 = 3;
pub const FIRST_WORD_ID: u32 = 4;

pub struct SequenceEncoder {
    src_seq_len: usize,
    tgt_seq_len: usize,
}

impl SequenceEncoder {
    pub fn new(src_seq_len: usize, tgt_seq_len: usize) -> Self {
        Self { src_seq_len, tgt_seq_len }
    }

    pub fn encode(&self, pair: &QaPair) -> Result<QaSample> {
        // [SOS] + question + [EOS]
        if pair.question_ids.len() + 2 > self.src_seq_len {
            bail!(
                "question of {} tokens does not fit src_seq_len {}",
                pair.question_ids.len(),
                self.src_seq_len
            );
        }
        // [SOS] + option
        if pair.option_ids.len() + 1 > self.tgt_seq_len {
            bail!(
                "option of {} tokens does not fit tgt_seq_len {}",
                pair.option_ids.len(),
                self.tgt_seq_len
            );
        }

        let mut encoder_input = vec![SOS_ID];
        encoder_input.extend_from_slice(&pair.question_ids);
        encoder_input.push(EOS_ID);
        let (encoder_input, encoder_mask) = pad(encoder_input, self.src_seq_len);

        let mut decoder_input = vec![SOS_ID];
        decoder_input.extend_from_slice(&pair.option_ids);
        let (decoder_input, decoder_mask) = pad(decoder_input, self.tgt_seq_len);

        Ok(QaSample {
            encoder_input,
            encoder_mask,
            decoder_input,
            decoder_mask,
            label: pair.target(),
        })
    }

    pub fn encode_all(&self, pairs: &[QaPair]) -> Result<Vec<QaSample>> {
        pairs.iter().map(|p| self.encode(p)).collect()
    }
}

/// Right-pad with [PAD] and build the matching 1/0 mask.
fn pad(mut ids: Vec<u32>, len: usize) -> (Vec<u32>, Vec<u32>) {
    let mut mask = vec![1u32; ids.len()];
    ids.resize(len, PAD_ID);
    mask.resize(len, 0);
    (ids, mask)
}
