use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One padded training sample, ready for batching.
/// Encoder: [SOS] question [EOS] [PAD]...   Decoder: [SOS] option [PAD]...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaSample {
    pub encoder_input: Vec<u32>,
    pub encoder_mask:  Vec<u32>,
    pub decoder_input: Vec<u32>,
    pub decoder_mask:  Vec<u32>,
    pub label:         u32,
}

pub struct QaDataset {
    samples: Vec<QaSample>,
}

impl QaDataset {
    pub fn new(samples: Vec<QaSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Fraction of positive labels, 0.0 for an empty dataset
    pub fn positive_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let positives = self.samples.iter().filter(|s| s.label == 1).count();
        positives as f64 / self.samples.len() as f64
    }
}

impl Dataset<QaSample> for QaDataset {
    fn get(&self, index: usize) -> Option<QaSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: u32) -> QaSample {
        QaSample {
            encoder_input: vec![2, 5, 3, 1],
            encoder_mask:  vec![1, 1, 1, 0],
            decoder_input: vec![2, 5, 1],
            decoder_mask:  vec![1, 1, 0],
            label,
        }
    }

    #[test]
    fn test_dataset_access() {
        let ds = QaDataset::new(vec![sample(1), sample(0), sample(1), sample(1)]);
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.get(1).map(|s| s.label), Some(0));
        assert!(ds.get(4).is_none());
        assert!((ds.positive_rate() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_empty_positive_rate() {
        assert_eq!(QaDataset::new(Vec::new()).positive_rate(), 0.0);
    }
}
