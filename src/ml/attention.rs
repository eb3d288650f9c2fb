// ============================================================
// Layer 5 — Multi-Head Attention
// ============================================================
// Scaled dot-product attention run over H learned subspaces:
//
//   Q, K, V  = x_q·W_q, x_k·W_k, x_v·W_v         [b, s, d_model]
//   split    → [b, s, H, d_k] → swap(1,2) → [b, H, s, d_k]
//   scores   = Q·Kᵀ / √d_k                         [b, H, q_len, k_len]
//   weights  = softmax(mask_fill(scores, -1e9))
//   context  = weights·V → merge → W_o              [b, q_len, d_model]
//
// The split MUST reshape first and swap second. Reshaping
// straight to [b, H, s, d_k] regroups the flat memory so each
// "head" holds slices of several different tokens; nothing
// fails, the model just learns garbage. split_heads is tested
// against an index-level reference for exactly this reason.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need §3.2

use burn::{
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::error::{ModelError, ModelResult};

/// Value written into masked scores before softmax.
/// Large but finite: exp() underflows to exactly 0 for any
/// row that still has one visible key.
const MASK_FILL: f32 = -1.0e9;

/// Attention result. `weights` is exposed so callers (and tests)
/// can inspect the normalised distribution per head.
pub struct AttentionOutput<B: Backend> {
    /// [batch, q_len, d_model]
    pub context: Tensor<B, 3>,
    /// [batch, heads, q_len, k_len], rows sum to 1
    pub weights: Tensor<B, 4>,
}

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    pub query:     Linear<B>,
    pub key:       Linear<B>,
    pub value:     Linear<B>,
    pub output:    Linear<B>,
    pub dropout:   Dropout,
    pub num_heads: usize,
    pub d_k:       usize,
}

impl<B: Backend> MultiHeadAttention<B> {
    /// Build the four projections. Fails if `d_model` cannot be
    /// split evenly across `num_heads`.
    pub fn new(
        d_model:   usize,
        num_heads: usize,
        dropout:   f64,
        device:    &B::Device,
    ) -> ModelResult<Self> {
        if num_heads == 0 || d_model % num_heads != 0 {
            return Err(ModelError::HeadsMismatch { d_model, num_heads });
        }

        let projection = || {
            LinearConfig::new(d_model, d_model)
                .with_initializer(Initializer::XavierUniform { gain: 1.0 })
                .init(device)
        };

        Ok(Self {
            query:     projection(),
            key:       projection(),
            value:     projection(),
            output:    projection(),
            dropout:   DropoutConfig::new(dropout).init(),
            num_heads,
            d_k:       d_model / num_heads,
        })
    }

    pub fn d_model(&self) -> usize {
        self.num_heads * self.d_k
    }

    /// query: [b, q_len, d_model], key/value: [b, k_len, d_model].
    ///
    /// `mask` is a suppress mask broadcastable to
    /// [b, heads, q_len, k_len]; its key axis must equal k_len.
    /// A row whose keys are all masked has no meaningful
    /// distribution (it comes out uniform) and is a caller error.
    pub fn forward(
        &self,
        query: Tensor<B, 3>,
        key:   Tensor<B, 3>,
        value: Tensor<B, 3>,
        mask:  Option<Tensor<B, 4, Bool>>,
    ) -> ModelResult<AttentionOutput<B>> {
        self.check_inputs(query.dims(), key.dims(), value.dims())?;

        let q = split_heads(self.query.forward(query), self.num_heads);
        let k = split_heads(self.key.forward(key), self.num_heads);
        let v = split_heads(self.value.forward(value), self.num_heads);

        let scores = q.matmul(k.swap_dims(2, 3)) / (self.d_k as f64).sqrt();

        let scores = match mask {
            Some(mask) => {
                let shape = scores.dims();
                check_mask(mask.dims(), shape)?;
                scores.mask_fill(mask.expand(shape), MASK_FILL)
            }
            None => scores,
        };

        let weights = softmax(scores, 3);
        let context = self.dropout.forward(weights.clone()).matmul(v);
        let context = self.output.forward(merge_heads(context));

        Ok(AttentionOutput { context, weights })
    }

    fn check_inputs(
        &self,
        query: [usize; 3],
        key:   [usize; 3],
        value: [usize; 3],
    ) -> ModelResult<()> {
        let d_model = self.d_model();
        let [batch, q_len, _] = query;
        let [_, k_len, _]     = key;

        let expect = |what: &'static str, expected: [usize; 3], got: [usize; 3]| {
            if expected == got {
                Ok(())
            } else {
                Err(ModelError::ShapeMismatch {
                    what,
                    expected: expected.to_vec(),
                    got:      got.to_vec(),
                })
            }
        };

        expect("attention query", [batch, q_len, d_model], query)?;
        expect("attention key",   [batch, k_len, d_model], key)?;
        expect("attention value", [batch, k_len, d_model], value)
    }
}

/// `[b, s, d_model]` → `[b, H, s, d_k]`: reshape, then swap axes 1 and 2.
pub fn split_heads<B: Backend>(x: Tensor<B, 3>, num_heads: usize) -> Tensor<B, 4> {
    let [batch, seq_len, d_model] = x.dims();
    x.reshape([batch, seq_len, num_heads, d_model / num_heads])
        .swap_dims(1, 2)
}

/// Inverse of [`split_heads`]. The reshape after the swap
/// materialises a contiguous row-major copy.
pub fn merge_heads<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, num_heads, seq_len, d_k] = x.dims();
    x.swap_dims(1, 2).reshape([batch, seq_len, num_heads * d_k])
}

/// Every mask axis must be 1 or match the score axis; the key
/// axis is never broadcast.
fn check_mask(mask: [usize; 4], scores: [usize; 4]) -> ModelResult<()> {
    let broadcastable = mask
        .iter()
        .zip(scores.iter())
        .all(|(&m, &s)| m == 1 || m == s);

    if broadcastable && mask[3] == scores[3] {
        Ok(())
    } else {
        Err(ModelError::MaskShape { mask, scores })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mask::causal_mask;
    use crate::ml::test_utils::{assert_close, floats, ramp, values, TestBackend};

    /// Index-level "view as heads": out[b][h][s][k] = in[b][s][h*d_k + k].
    fn view_as_heads(input: &[f32], batch: usize, seq: usize, d_model: usize, heads: usize) -> Vec<f32> {
        let d_k     = d_model / heads;
        let mut out = vec![0.0; input.len()];
        for b in 0..batch {
            for h in 0..heads {
                for s in 0..seq {
                    for k in 0..d_k {
                        out[((b * heads + h) * seq + s) * d_k + k] =
                            input[(b * seq + s) * d_model + h * d_k + k];
                    }
                }
            }
        }
        out
    }

    fn attention(d_model: usize, heads: usize) -> MultiHeadAttention<TestBackend> {
        MultiHeadAttention::new(d_model, heads, 0.0, &Default::default()).unwrap()
    }

    #[test]
    fn test_split_heads_exact_mapping() {
        // (batch=2, seq=2, d_model=12), H=3 → (2, 3, 2, 4)
        let input: Vec<f32> = (1..=48).map(|v| v as f32).collect();
        let heads = split_heads(floats(input, [2, 2, 12]), 3);

        assert_eq!(heads.dims(), [2, 3, 2, 4]);

        #[rustfmt::skip]
        let expected: Vec<f32> = [
            1, 2, 3, 4,      13, 14, 15, 16,
            5, 6, 7, 8,      17, 18, 19, 20,
            9, 10, 11, 12,   21, 22, 23, 24,
            25, 26, 27, 28,  37, 38, 39, 40,
            29, 30, 31, 32,  41, 42, 43, 44,
            33, 34, 35, 36,  45, 46, 47, 48,
        ].iter().map(|&v| v as f32).collect();

        assert_eq!(values(heads), expected);
    }

    #[test]
    fn test_split_heads_matches_reference_for_many_shapes() {
        for &(batch, seq, d_model, heads) in &[
            (1, 1, 4, 1),
            (1, 5, 12, 4),
            (2, 2, 12, 3),
            (3, 4, 16, 8),
            (2, 7, 6, 2),
        ] {
            let input    = ramp([batch, seq, d_model]);
            let flat     = values(input.clone());
            let expected = view_as_heads(&flat, batch, seq, d_model, heads);

            // bit-identical, no tolerance
            assert_eq!(values(split_heads(input, heads)), expected);
        }
    }

    #[test]
    fn test_reshape_without_swap_groups_differently() {
        // Reshaping straight to [b, H, s, d_k] is the classic bug.
        let input  = ramp([1, 5, 12]);
        let wrong  = values(input.clone().reshape([1, 4, 5, 3]));
        let right  = values(split_heads(input, 4));
        assert_ne!(wrong, right);
    }

    #[test]
    fn test_merge_heads_inverts_split_heads() {
        let input = ramp([2, 3, 8]);
        let round = merge_heads(split_heads(input.clone(), 4));
        assert_eq!(values(round), values(input));
    }

    #[test]
    fn test_output_shape_equals_query_shape() {
        let mha = attention(12, 3);
        let x   = ramp([2, 4, 12]);
        let out = mha.forward(x.clone(), x.clone(), x, None).unwrap();

        assert_eq!(out.context.dims(), [2, 4, 12]);
        assert_eq!(out.weights.dims(), [2, 3, 4, 4]);
    }

    #[test]
    fn test_cross_attention_shapes() {
        let mha    = attention(8, 2);
        let query  = ramp([2, 3, 8]);
        let memory = ramp([2, 5, 8]);
        let out    = mha.forward(query, memory.clone(), memory, None).unwrap();

        assert_eq!(out.context.dims(), [2, 3, 8]);
        assert_eq!(out.weights.dims(), [2, 2, 3, 5]);
    }

    #[test]
    fn test_weights_are_row_stochastic() {
        let mha  = attention(12, 4);
        let x    = ramp([2, 5, 12]);
        let out  = mha.forward(x.clone(), x.clone(), x, None).unwrap();
        let sums = values(out.weights.sum_dim(3));

        assert_close(&sums, &vec![1.0; sums.len()], 1e-5);
    }

    #[test]
    fn test_masked_keys_get_zero_weight() {
        let mha = attention(8, 2);
        let x   = ramp([1, 4, 8]);
        // hide keys 2 and 3
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([0, 0, 1, 1], &Default::default())
            .equal_elem(1)
            .reshape([1, 1, 1, 4]);

        let out     = mha.forward(x.clone(), x.clone(), x, Some(mask)).unwrap();
        let weights = values(out.weights.clone());

        for (i, w) in weights.iter().enumerate() {
            if i % 4 >= 2 {
                assert!(*w < 1e-6, "masked weight {w} at {i}");
            }
        }
        let sums = values(out.weights.sum_dim(3));
        assert_close(&sums, &vec![1.0; sums.len()], 1e-5);
    }

    #[test]
    fn test_causal_mask_blocks_future_positions() {
        let mha  = attention(8, 2);
        let x    = ramp([2, 4, 8]);
        let mask = causal_mask::<TestBackend>(4, &Default::default()).reshape([1, 1, 4, 4]);

        let out     = mha.forward(x.clone(), x.clone(), x, Some(mask)).unwrap();
        let weights = values(out.weights);

        for (idx, w) in weights.iter().enumerate() {
            let j = idx % 4;
            let i = (idx / 4) % 4;
            if j > i {
                assert!(*w < 1e-6, "query {i} attends to future key {j}: {w}");
            }
        }
    }

    #[test]
    fn test_single_position_reduces_to_projection_chain() {
        let mha = attention(12, 3);
        let x   = ramp([2, 1, 12]);

        let out      = mha.forward(x.clone(), x.clone(), x.clone(), None).unwrap();
        let expected = mha.output.forward(mha.value.forward(x));

        assert_close(&values(out.context), &values(expected), 1e-5);
        assert_close(&values(out.weights), &[1.0; 6], 1e-6);
    }

    #[test]
    fn test_indivisible_head_count_is_rejected() {
        let err = MultiHeadAttention::<TestBackend>::new(10, 3, 0.0, &Default::default())
            .unwrap_err();
        assert_eq!(err, ModelError::HeadsMismatch { d_model: 10, num_heads: 3 });

        assert!(MultiHeadAttention::<TestBackend>::new(8, 0, 0.0, &Default::default()).is_err());
    }

    #[test]
    fn test_mask_with_wrong_key_axis_is_rejected() {
        let mha  = attention(8, 2);
        let x    = ramp([1, 3, 8]);
        let mask = causal_mask::<TestBackend>(4, &Default::default()).reshape([1, 1, 4, 4]);

        match mha.forward(x.clone(), x.clone(), x, Some(mask)) {
            Err(ModelError::MaskShape { mask, scores }) => {
                assert_eq!(mask,   [1, 1, 4, 4]);
                assert_eq!(scores, [1, 2, 3, 3]);
            }
            other => panic!("expected MaskShape, got {:?}", other.map(|o| o.context.dims())),
        }
    }

    #[test]
    fn test_mask_with_wrong_batch_is_rejected() {
        let mha  = attention(8, 2);
        let x    = ramp([2, 3, 8]);
        let mask = causal_mask::<TestBackend>(3, &Default::default())
            .reshape([1, 1, 3, 3])
            .expand([3, 1, 3, 3]);

        assert!(matches!(
            mha.forward(x.clone(), x.clone(), x, Some(mask)),
            Err(ModelError::MaskShape { .. })
        ));
    }

    #[test]
    fn test_key_value_length_mismatch_is_rejected() {
        let mha = attention(8, 2);
        let q   = ramp([1, 3, 8]);
        let k   = ramp([1, 4, 8]);
        let v   = ramp([1, 5, 8]);

        assert!(matches!(
            mha.forward(q, k, v, None),
            Err(ModelError::ShapeMismatch { what: "attention value", .. })
        ));
    }
}
