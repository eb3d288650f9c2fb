// ============================================================
// Layer 4 — Synthetic Pair Source
// ============================================================
// Generates a labelled question/option task with a known rule,
// so the whole pipeline can be trained end to end without a
// tokenizer or a corpus on disk.
//
// Rule: an option is correct (label 1) when every one of its
// tokens also occurs in the question.
//
//   question [12, 7, 30, 9]   option [7, 9]    → 1
//   question [12, 7, 30, 9]   option [7, 21]   → 0
//
// Solving it needs cross-attention: each decoder token has to
// look the question up in the encoder output.
//
// Generation is driven by a seeded StdRng; the same config
// always produces the same pairs. Positives and negatives are
// drawn with equal probability.

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::data::encoder::FIRST_WORD_ID;
use crate::domain::qa_pair::QaPair;
use crate::domain::traits::PairSource;

pub struct SyntheticPairs {
    count:            usize,
    vocab_size:       usize,
    max_question_len: usize,
    max_option_len:   usize,
    seed:             u64,
}

impl SyntheticPairs {
    pub fn new(
        count:            usize,
        vocab_size:       usize,
        max_question_len: usize,
        max_option_len:   usize,
        seed:             u64,
    ) -> Self {
        Self { count, vocab_size, max_question_len, max_option_len, seed }
    }

    fn word_range(&self) -> std::ops::Range<u32> {
        FIRST_WORD_ID..self.vocab_size as u32
    }

    fn generate(&self, rng: &mut StdRng) -> QaPair {
        let words = self.word_range();

        // Questions are at least as long as the longest option
        let q_len    = rng.gen_range(self.max_option_len..=self.max_question_len);
        let question: Vec<u32> = (0..q_len).map(|_| rng.gen_range(words.clone())).collect();

        let o_len = rng.gen_range(1..=self.max_option_len);

        if rng.gen_bool(0.5) {
            let option = (0..o_len)
                .map(|_| *question.choose(rng).unwrap_or(&words.start))
                .collect();
            QaPair::new(question, option, true)
        } else {
            let mut option: Vec<u32> = (0..o_len).map(|_| rng.gen_range(words.clone())).collect();
            // Force at least one token the question lacks
            let slot = rng.gen_range(0..o_len);
            option[slot] = loop {
                let w = rng.gen_range(words.clone());
                if !question.contains(&w) {
                    break w;
                }
            };
            QaPair::new(question, option, false)
        }
    }
}

impl PairSource for SyntheticPairs {
    fn load_all(&self) -> Result<Vec<QaPair>> {
        let word_count = self.word_range().len();
        ensure!(self.max_option_len >= 1, "max_option_len must be at least 1");
        ensure!(
            self.max_question_len >= self.max_option_len,
            "max_question_len ({}) must be >= max_option_len ({})",
            self.max_question_len,
            self.max_option_len
        );
        // A negative needs a word outside the question
        ensure!(
            word_count > self.max_question_len,
            "vocab_size {} leaves {} words, need more than max_question_len {}",
            self.vocab_size,
            word_count,
            self.max_question_len
        );

        let mut rng   = StdRng::seed_from_u64(self.seed);
        let pairs: Vec<QaPair> = (0..self.count).map(|_| self.generate(&mut rng)).collect();

        tracing::debug!(
            "Generated {} synthetic pairs ({} positive)",
            pairs.len(),
            pairs.iter().filter(|p| p.label).count()
        );
        Ok(pairs)
    }
}

/// The labelling rule: every option token occurs in the question.
pub fn option_within_question(question: &[u32], option: &[u32]) -> bool {
    option.iter().all(|w| question.contains(w))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_follow_the_rule() {
        let pairs = SyntheticPairs::new(300, 30, 8, 3, 7).load_all().unwrap();
        assert_eq!(pairs.len(), 300);

        for p in &pairs {
            assert_eq!(p.label, option_within_question(&p.question_ids, &p.option_ids));
        }
    }

    #[test]
    fn test_lengths_and_vocab_bounds() {
        let pairs = SyntheticPairs::new(200, 20, 6, 2, 11).load_all().unwrap();

        for p in &pairs {
            assert!((2..=6).contains(&p.question_ids.len()));
            assert!((1..=2).contains(&p.option_ids.len()));
            assert!(p
                .question_ids
                .iter()
                .chain(&p.option_ids)
                .all(|&w| (FIRST_WORD_ID..20).contains(&w)));
        }
    }

    #[test]
    fn test_both_classes_present() {
        let pairs     = SyntheticPairs::new(200, 30, 8, 3, 1).load_all().unwrap();
        let positives = pairs.iter().filter(|p| p.label).count();
        assert!(positives > 50 && positives < 150, "positives = {positives}");
    }

    #[test]
    fn test_same_seed_same_pairs() {
        let a = SyntheticPairs::new(20, 30, 8, 3, 42).load_all().unwrap();
        let b = SyntheticPairs::new(20, 30, 8, 3, 42).load_all().unwrap();
        let c = SyntheticPairs::new(20, 30, 8, 3, 43).load_all().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_vocab_too_small_is_rejected() {
        // 8 - 4 special ids = 4 words, questions up to 5
        assert!(SyntheticPairs::new(10, 8, 5, 2, 0).load_all().is_err());
    }

    #[test]
    fn test_rule_helper() {
        assert!(option_within_question(&[5, 6, 7], &[7, 5]));
        assert!(!option_within_question(&[5, 6, 7], &[7, 8]));
    }
}
