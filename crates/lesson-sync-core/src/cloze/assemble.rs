//! Exercise assembly: transcript texts in, one [`DictationExercise`] out.
//!
//! This is the pure half of synthesis. Gathering transcripts and persisting
//! the result live in the application crate.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::blanks::build_cloze;
use super::candidates::{extract_candidates, CandidateRules};
use super::diversity::{leading_pair, select_diverse, DEFAULT_MAX_SIMILARITY};
use super::text::{char_len, collapse_whitespace};
use crate::models::{ClozeItem, DictationExercise, ExerciseKind, ExerciseParts, LessonKey};

/// Tunables for exercise assembly. Lengths are in characters.
#[derive(Debug, Clone)]
pub struct ClozeParams {
    pub max_similarity: f64,
    /// Passages with less merged text are ignored.
    pub min_passage_chars: usize,
    pub min_sentence_chars: usize,
    pub min_pair_chars: usize,
    /// A C snippet shorter than this is replaced by a leading pair.
    pub long_snippet_chars: usize,
    /// C snippets at least this long get four blanks instead of three.
    pub four_blank_chars: usize,
    /// Upper bound for the substituted C pair.
    pub max_pair_chars: usize,
}

impl Default for ClozeParams {
    fn default() -> Self {
        Self {
            max_similarity: DEFAULT_MAX_SIMILARITY,
            min_passage_chars: 20,
            min_sentence_chars: 20,
            min_pair_chars: 40,
            long_snippet_chars: 80,
            four_blank_chars: 120,
            max_pair_chars: 260,
        }
    }
}

impl ClozeParams {
    pub fn candidate_rules(&self) -> CandidateRules {
        CandidateRules {
            min_sentence_chars: self.min_sentence_chars,
            min_pair_chars: self.min_pair_chars,
        }
    }

    /// Blanks for the C group given its snippet.
    pub fn c_blank_count(&self, snippet: &str) -> usize {
        if char_len(snippet) >= self.four_blank_chars {
            4
        } else {
            3
        }
    }
}

/// Transcript text of one subtitle file.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageText {
    /// `None` when the file sits outside a `passage{N}` directory.
    pub passage: Option<u32>,
    pub text: String,
}

/// Merge texts per passage, ascending by passage id with unnumbered text
/// last, dropping passages shorter than `min_chars`.
pub fn merge_passages(texts: &[PassageText], min_chars: usize) -> Vec<(Option<u32>, String)> {
    let mut grouped: BTreeMap<(bool, u32), (Option<u32>, Vec<&str>)> = BTreeMap::new();
    for t in texts {
        let text = t.text.trim();
        if text.is_empty() {
            continue;
        }
        let sort_key = (t.passage.is_none(), t.passage.unwrap_or(0));
        grouped
            .entry(sort_key)
            .or_insert_with(|| (t.passage, Vec::new()))
            .1
            .push(text);
    }

    grouped
        .into_values()
        .map(|(passage, parts)| (passage, collapse_whitespace(&parts.join(" "))))
        .filter(|(_, merged)| char_len(merged) >= min_chars)
        .collect()
}

/// Build the exercise for `key`, or `None` when no passage has enough text.
pub fn assemble_exercise(
    key: &LessonKey,
    namespace: &str,
    texts: &[PassageText],
    params: &ClozeParams,
    created_at: DateTime<Utc>,
) -> Option<DictationExercise> {
    let merged = merge_passages(texts, params.min_passage_chars);
    if merged.is_empty() {
        return None;
    }

    // one block per passage, in passage order
    let rules = params.candidate_rules();
    let candidates: Vec<String> = merged
        .iter()
        .flat_map(|(_, text)| extract_candidates(text, &rules))
        .collect();
    let mut picks = select_diverse(&candidates, 3, params.max_similarity).into_iter();

    let snippet_a = picks.next().unwrap_or_default();
    let snippet_b = picks.next().unwrap_or_default();
    let mut snippet_c = picks.next().unwrap_or_default();

    if char_len(&snippet_c) < params.long_snippet_chars {
        // first passage wins a length tie
        if let Some((_, longest)) = merged.iter().min_by_key(|(_, t)| Reverse(char_len(t))) {
            snippet_c = leading_pair(longest, params.max_pair_chars);
        }
    }

    let parts = ExerciseParts {
        a: cloze_group("A", &snippet_a, 2),
        b: cloze_group("B", &snippet_b, 3),
        c: cloze_group("C", &snippet_c, params.c_blank_count(&snippet_c)),
    };

    let text = collapse_whitespace(
        &[&snippet_a, &snippet_b, &snippet_c]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    );

    Some(DictationExercise {
        kind: ExerciseKind::Dictation,
        lesson_id: key.lesson_id(),
        source_prefix: key.prefix(namespace),
        text,
        parts,
        created_at,
    })
}

/// Always one item; an empty snippet gives an empty sentence with no answers.
fn cloze_group(label: &str, snippet: &str, blanks: usize) -> Vec<ClozeItem> {
    let cloze = build_cloze(snippet, blanks);
    vec![ClozeItem {
        id: format!("{}1", label),
        sentence: cloze.sentence,
        answers: cloze.answers,
    }]
}
