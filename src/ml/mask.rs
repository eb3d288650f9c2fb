// ============================================================
// Layer 5 — Attention Masks
// ============================================================
// All masks in the model layer are boolean "suppress" masks:
// true marks a score that must be hidden before softmax.
//
// The data pipeline hands us 1/0 Int masks (1 = real token,
// 0 = [PAD]). These helpers turn them into the 4D shapes the
// attention scores broadcast against:
//
//   encoder / cross-attention:  [batch, 1, 1,       src_len]
//   decoder self-attention:     [batch, 1, tgt_len, tgt_len]
//
// The decoder mask hides both padding keys and future keys.
// A query row may see key j only when j <= i and j is real.

use burn::{prelude::*, tensor::TensorData};

/// Key-padding mask: `[batch, seq_len]` 1/0 → `[batch, 1, 1, seq_len]`.
pub fn padding_mask<B: Backend>(attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 4, Bool> {
    let [batch, seq_len] = attention_mask.dims();
    attention_mask.equal_elem(0).reshape([batch, 1, 1, seq_len])
}

/// Strictly upper triangular `[len, len]` mask: `mask[i][j] == (j > i)`.
pub fn causal_mask<B: Backend>(len: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
    let data: Vec<bool> = (0..len)
        .flat_map(|row| (0..len).map(move |col| col > row))
        .collect();
    Tensor::from_data(TensorData::new(data, [len, len]), device)
}

/// Causal mask combined with target padding: `[batch, 1, seq_len, seq_len]`.
pub fn decoder_mask<B: Backend>(attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 4, Bool> {
    let [batch, seq_len] = attention_mask.dims();
    let device = attention_mask.device();

    let padding = padding_mask(attention_mask).expand([batch, 1, seq_len, seq_len]);
    let causal  = causal_mask::<B>(seq_len, &device)
        .reshape([1, 1, seq_len, seq_len])
        .expand([batch, 1, seq_len, seq_len]);

    // logical OR
    (padding.int() + causal.int()).greater_elem(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{bools, ints, TestBackend};

    #[test]
    fn test_causal_mask_is_strictly_upper_triangular() {
        let device = Default::default();
        let mask   = bools(causal_mask::<TestBackend>(4, &device));

        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(mask[i * 4 + j], j > i, "row {i} col {j}");
            }
        }
    }

    #[test]
    fn test_causal_mask_of_one_hides_nothing() {
        let device = Default::default();
        let mask   = bools(causal_mask::<TestBackend>(1, &device));
        assert_eq!(mask, vec![false]);
    }

    #[test]
    fn test_padding_mask_marks_zeros() {
        let attn = ints::<2>(vec![1, 1, 0, 1, 0, 0], [2, 3]);
        let mask = padding_mask(attn);

        assert_eq!(mask.dims(), [2, 1, 1, 3]);
        assert_eq!(bools(mask), vec![false, false, true, false, true, true]);
    }

    #[test]
    fn test_decoder_mask_combines_causal_and_padding() {
        // one sample: two real tokens then one pad
        let attn = ints::<2>(vec![1, 1, 0], [1, 3]);
        let mask = decoder_mask(attn);

        assert_eq!(mask.dims(), [1, 1, 3, 3]);
        #[rustfmt::skip]
        let expected = vec![
            false, true,  true,
            false, false, true,
            false, false, true,
        ];
        assert_eq!(bools(mask), expected);
    }
}
