// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a trained model over labelled batches and scores it.
//
// A sample is predicted positive when sigmoid(logit) >= 0.5,
// which is the same as logit >= 0; the comparison is done on
// the raw logit so no sigmoid is computed.
//
// The first `num_examples` samples are logged one by one so a
// human can eyeball what the model is doing mid-training.

use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::data::batcher::QaBatch;
use crate::ml::model::Transformer;

#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub predictions: Vec<bool>,
    pub labels:      Vec<bool>,
    /// Mean BCE loss per sample, NaN if there were no samples
    pub loss:        f64,
    /// Fraction of predictions equal to the label, 0.0 if empty
    pub accuracy:    f64,
}

impl EvalReport {
    pub fn sample_count(&self) -> usize {
        self.labels.len()
    }
}

/// Decision rule for one classification logit
pub fn predict(logit: f32) -> bool {
    logit >= 0.0
}

pub fn evaluate<B, I>(model: &Transformer<B>, batches: I, num_examples: usize) -> Result<EvalReport>
where
    B: Backend,
    I: IntoIterator<Item = QaBatch<B>>,
{
    let mut predictions = Vec::new();
    let mut labels      = Vec::new();
    let mut loss_sum    = 0.0f64;

    for batch in batches {
        let batch_size    = batch.labels.dims()[0];
        let example_input = (labels.len() < num_examples).then(|| batch.encoder_input.clone());

        let (loss, logits) = model.forward_loss(batch.clone())?;
        loss_sum += loss.into_scalar().elem::<f64>() * batch_size as f64;

        let logits = to_f32(logits)?;
        let truth  = to_i64(batch.labels)?;

        if let Some(input) = example_input {
            let [_, src_len] = input.dims();
            let ids          = to_i64(input)?;
            for (i, (&logit, &label)) in logits.iter().zip(&truth).enumerate() {
                if labels.len() + i >= num_examples {
                    break;
                }
                tracing::info!(
                    "example {}: source={:?} logit={:.4} predicted={} expected={}",
                    labels.len() + i,
                    &ids[i * src_len..(i + 1) * src_len],
                    logit,
                    predict(logit) as u8,
                    label,
                );
            }
        }

        predictions.extend(logits.iter().map(|&l| predict(l)));
        labels.extend(truth.iter().map(|&l| l != 0));
    }

    let n        = labels.len();
    let correct  = predictions.iter().zip(&labels).filter(|(p, l)| p == l).count();
    let accuracy = if n > 0 { correct as f64 / n as f64 } else { 0.0 };
    let loss     = if n > 0 { loss_sum / n as f64 } else { f64::NAN };

    Ok(EvalReport { predictions, labels, loss, accuracy })
}

fn to_f32<B: Backend>(t: Tensor<B, 1>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read logits: {e:?}"))
}

fn to_i64<B: Backend, const D: usize>(t: Tensor<B, D, Int>) -> Result<Vec<i64>> {
    t.into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("cannot read ids: {e:?}"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataloader::batcher::Batcher;
    use crate::data::{batcher::QaBatcher, dataset::QaSample};
    use crate::ml::model::TransformerConfig;
    use crate::ml::test_utils::TestBackend;

    fn model() -> Transformer<TestBackend> {
        TransformerConfig::new(10, 10, 4, 3, 8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
            .with_dropout(0.0)
            .with_num_classes(Some(1))
            .init(&Default::default())
            .unwrap()
    }

    fn sample(word: u32, label: u32) -> QaSample {
        QaSample {
            encoder_input: vec![2, word, 3, 1],
            encoder_mask:  vec![1, 1, 1, 0],
            decoder_input: vec![2, word, 1],
            decoder_mask:  vec![1, 1, 0],
            label,
        }
    }

    #[test]
    fn test_predict_threshold() {
        assert!(predict(0.0));
        assert!(predict(2.5));
        assert!(!predict(-0.001));
    }

    #[test]
    fn test_report_counts_every_sample() {
        let batcher = QaBatcher::<TestBackend>::new(Default::default());
        let batches = vec![
            batcher.batch(vec![sample(4, 1), sample(5, 0)]),
            batcher.batch(vec![sample(6, 1)]),
        ];

        let report = evaluate(&model(), batches, 2).unwrap();
        assert_eq!(report.sample_count(), 3);
        assert_eq!(report.labels, vec![true, false, true]);
        assert_eq!(report.predictions.len(), 3);
        assert!(report.loss.is_finite() && report.loss > 0.0);

        let correct = report.predictions.iter().zip(&report.labels).filter(|(p, l)| p == l).count();
        assert!((report.accuracy - correct as f64 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        let report = evaluate(&model(), Vec::<QaBatch<TestBackend>>::new(), 2).unwrap();
        assert_eq!(report.sample_count(), 0);
        assert_eq!(report.accuracy, 0.0);
        assert!(report.loss.is_nan());
    }
}
