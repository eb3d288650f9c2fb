// ============================================================
// Layer 3 — QaPair Domain Type
// ============================================================
// One labelled question/option example, already tokenised.
//
// The task is binary: given a question and a candidate
// option, decide whether the option is a correct answer.
//
//   question_ids: [17, 9, 23, 5]
//   option_ids:   [9, 5]
//   label:        true
//
// Turning raw text into ids belongs to whoever supplies the
// pairs (see traits::PairSource). By the time a QaPair exists
// there are no strings left, only vocabulary ids.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// Token ids of the question, without special tokens
    pub question_ids: Vec<u32>,

    /// Token ids of the candidate option, without special tokens
    pub option_ids: Vec<u32>,

    /// Ground truth: is this option a correct answer?
    pub label: bool,
}

impl QaPair {
    pub fn new(question_ids: Vec<u32>, option_ids: Vec<u32>, label: bool) -> Self {
        Self { question_ids, option_ids, label }
    }

    /// Label as the 0/1 target the loss expects
    pub fn target(&self) -> u32 {
        u32::from(self.label)
    }
}
