//! Greedy diversity selection over candidate snippets.
//!
//! # Algorithm
//!
//! 1. Walk candidates in order; accept one when its Jaccard similarity to
//!    every accepted snippet is at most `max_similarity`.
//! 2. Stop at `count` accepted.
//! 3. If short, walk again and append snippets not yet picked, in order,
//!    ignoring similarity.
//!
//! The result never contains text absent from the input.

use std::collections::HashSet;

use super::text::{split_sentences, tokenize};

pub const DEFAULT_MAX_SIMILARITY: f64 = 0.45;

/// Jaccard index of the normalized token sets of `a` and `b`.
///
/// Zero when either side has no tokens.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<String> = tokenize(a).into_iter().collect();
    let right: HashSet<String> = tokenize(b).into_iter().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

/// Pick up to `count` mutually dissimilar snippets.
pub fn select_diverse(candidates: &[String], count: usize, max_similarity: f64) -> Vec<String> {
    let mut picked: Vec<&str> = Vec::with_capacity(count);

    for candidate in candidates.iter().map(String::as_str) {
        if picked.len() >= count {
            break;
        }
        if candidate.is_empty() {
            continue;
        }
        if picked
            .iter()
            .all(|p| jaccard(p, candidate) <= max_similarity)
        {
            picked.push(candidate);
        }
    }

    for candidate in candidates.iter().map(String::as_str) {
        if picked.len() >= count {
            break;
        }
        if !candidate.is_empty() && !picked.contains(&candidate) {
            picked.push(candidate);
        }
    }

    picked.into_iter().map(str::to_string).collect()
}

/// The first two sentences of `text` as one snippet, or only the first
/// when the pair would exceed `max_chars`.
pub fn leading_pair(text: &str, max_chars: usize) -> String {
    let sentences = split_sentences(text);
    match sentences.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [first, second, ..] => {
            let pair = format!("{} {}", first, second);
            if pair.chars().count() <= max_chars {
                pair
            } else {
                first.clone()
            }
        }
    }
}
