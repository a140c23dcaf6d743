//! Blank builder: turns a snippet into a cloze sentence plus answers.
//!
//! Answers must line up with blanks left to right. Picking all answer
//! words first and blanking them afterwards does not guarantee that, so
//! each round rescans the working text and blanks the leftmost remaining
//! pool word.

use super::text::{
    char_len, collapse_whitespace, find_whole_word, is_stopword, unique_words, BLANK,
};

/// Minimum characters for an answer word.
pub const MIN_ANSWER_CHARS: usize = 4;

/// A blanked sentence and its answers in blank order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cloze {
    pub sentence: String,
    pub answers: Vec<String>,
}

/// Eligible answer words of `snippet`, unique, in first-occurrence order.
pub fn answer_pool(snippet: &str) -> Vec<String> {
    unique_words(snippet)
        .into_iter()
        .filter(|w| char_len(w) >= MIN_ANSWER_CHARS)
        .filter(|w| !is_stopword(w))
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

/// Blank up to `blank_count` words of `snippet`.
pub fn build_cloze(snippet: &str, blank_count: usize) -> Cloze {
    let mut working = collapse_whitespace(snippet);
    if working.is_empty() {
        return Cloze::default();
    }

    let pool = answer_pool(&working);
    let mut picked: Vec<String> = Vec::with_capacity(blank_count);

    while picked.len() < blank_count {
        let leftmost = pool
            .iter()
            .filter(|w| !picked.contains(w))
            .filter_map(|w| find_whole_word(&working, w).map(|range| (range, w)))
            .min_by_key(|(range, _)| range.start);

        let Some((range, word)) = leftmost else {
            break;
        };
        working.replace_range(range, BLANK);
        picked.push(word.clone());
    }

    let blanks = count_blanks(&working);
    picked.truncate(blanks);

    Cloze {
        sentence: working,
        answers: picked,
    }
}

/// Number of blank markers (runs of three or more underscores).
pub fn count_blanks(sentence: &str) -> usize {
    let mut count = 0;
    let mut run = 0;
    for c in sentence.chars().chain(std::iter::once(' ')) {
        if c == '_' {
            run += 1;
        } else {
            if run >= 3 {
                count += 1;
            }
            run = 0;
        }
    }
    count
}
