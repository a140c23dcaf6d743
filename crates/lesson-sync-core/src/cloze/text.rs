//! Text primitives shared by the cloze stages.

use std::collections::HashSet;
use std::ops::Range;

/// Marker written in place of a blanked word.
pub const BLANK: &str = "________";

/// Words never chosen as answers.
pub const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "so", "to", "of", "in", "on", "at", "for", "from",
    "with", "as", "is", "are", "was", "were", "be", "been", "being", "am", "i", "you", "he",
    "she", "it", "we", "they", "me", "him", "her", "them", "my", "your", "his", "their", "our",
    "this", "that", "these", "those", "not", "no", "yes", "do", "does", "did", "done", "have",
    "has", "had", "will", "would", "can", "could", "may", "might", "should", "must",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip leading/trailing non-word characters (apostrophes survive) and lowercase.
pub fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !is_word_char(c) && c != '\'')
        .to_lowercase()
}

/// Normalized, non-empty word tokens in order.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Tokens in first-occurrence order without repeats.
pub fn unique_words(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split on `.`, `!` or `?` followed by whitespace. Punctuation stays with
/// the sentence it ends.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = collapse_whitespace(text);
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(j, next)) = chars.peek() {
            if next.is_whitespace() {
                let sentence = text[start..i + c.len_utf8()].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = j + next.len_utf8();
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Byte range of the first case-insensitive, whole-word occurrence of `word`.
///
/// A whole-word match has a word boundary on both sides: the characters on
/// either side of each edge differ in [`is_word_char`].
pub fn find_whole_word(haystack: &str, word: &str) -> Option<Range<usize>> {
    if word.is_empty() {
        return None;
    }
    let needle: Vec<char> = word.chars().collect();
    haystack.char_indices().find_map(|(start, _)| {
        let end = match_at(haystack, start, &needle)?;
        (is_boundary(haystack, start) && is_boundary(haystack, end)).then_some(start..end)
    })
}

fn match_at(haystack: &str, start: usize, needle: &[char]) -> Option<usize> {
    let mut rest = haystack[start..].char_indices();
    for &expected in needle {
        let (_, actual) = rest.next()?;
        if !chars_eq_ignore_case(actual, expected) {
            return None;
        }
    }
    Some(rest.next().map_or(haystack.len(), |(offset, _)| start + offset))
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn is_boundary(text: &str, idx: usize) -> bool {
    let before = text[..idx].chars().next_back().is_some_and(is_word_char);
    let after = text[idx..].chars().next().is_some_and(is_word_char);
    before != after
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("\"Hello,"), "hello");
        assert_eq!(normalize_word("don't!"), "don't");
        assert_eq!(normalize_word("--"), "");
        assert_eq!(normalize_word("(2024)"), "2024");
    }

    #[test]
    fn test_unique_words_keep_first_occurrence() {
        assert_eq!(
            unique_words("The cat, the CAT and a dog."),
            vec!["the", "cat", "and", "a", "dog"]
        );
    }

    #[test]
    fn test_split_sentences_keeps_punctuation() {
        let s = split_sentences("The cat sat.  It rained!\nDid it? Yes");
        assert_eq!(s, vec!["The cat sat.", "It rained!", "Did it?", "Yes"]);
    }

    #[test]
    fn test_split_sentences_ignores_inner_dots() {
        let s = split_sentences("Pay $3.50 now... Then go.");
        assert_eq!(s, vec!["Pay $3.50 now...", "Then go."]);
    }

    #[test]
    fn test_split_sentences_empty() {
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_find_whole_word() {
        let text = "Concatenate the cat. Cat!";
        assert_eq!(find_whole_word(text, "cat"), Some(16..19));
        assert_eq!(find_whole_word("Cat!", "cat"), Some(0..3));
        assert_eq!(find_whole_word("category", "cat"), None);
        assert_eq!(find_whole_word("the ________ sat", "sat"), Some(13..16));
    }

    #[test]
    fn test_find_whole_word_non_ascii() {
        let text = "Un café élégant.";
        let range = find_whole_word(text, "élégant").unwrap();
        assert_eq!(&text[range], "élégant");
    }

    #[test]
    fn test_stopwords() {
        assert!(is_stopword("would"));
        assert!(!is_stopword("outside"));
    }
}
