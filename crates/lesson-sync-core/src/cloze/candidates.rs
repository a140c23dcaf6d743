//! Candidate snippet extraction.
//!
//! Works on one passage's text at a time: single sentences first, then
//! adjacent sentence pairs, each group in source order. The assembler
//! concatenates the per-passage blocks in passage order.

use super::text::{char_len, collapse_whitespace, split_sentences};

/// Length thresholds for candidate snippets, in characters.
#[derive(Debug, Clone)]
pub struct CandidateRules {
    pub min_sentence_chars: usize,
    pub min_pair_chars: usize,
}

impl Default for CandidateRules {
    fn default() -> Self {
        Self {
            min_sentence_chars: 20,
            min_pair_chars: 40,
        }
    }
}

/// Extract candidate snippets from one passage's merged text.
pub fn extract_candidates(merged: &str, rules: &CandidateRules) -> Vec<String> {
    let sentences = split_sentences(merged);

    let singles = sentences
        .iter()
        .filter(|s| char_len(s) >= rules.min_sentence_chars)
        .cloned();

    let pairs = sentences
        .windows(2)
        .map(|pair| collapse_whitespace(&format!("{} {}", pair[0], pair[1])))
        .filter(|s| char_len(s) >= rules.min_pair_chars);

    singles
        .chain(pairs)
        .map(|s| collapse_whitespace(&s))
        .filter(|s| !s.is_empty())
        .collect()
}
