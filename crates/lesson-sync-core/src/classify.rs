//! Path classifier for content-file notifications.
//!
//! Maps a logical object path to a typed [`ClassifiedEvent`] or a
//! [`SkipReason`]. The accepted grammar is:
//!
//! ```text
//! {namespace}/{level}/{lesson}/{pattern}/dictation.json
//! {namespace}/{level}/{lesson}/{pattern}/passage{N}/{filename}
//! ```
//!
//! Passage filenames are matched against [`PASSAGE_RULES`], an ordered list
//! of `(predicate, kind)` pairs; the first predicate that accepts the
//! lowercased filename decides the kind.
//!
//! # Example
//!
//! ```rust
//! use lesson_sync_core::classify::{classify, ArtifactKind};
//!
//! let event = classify("official/Level3/Lesson2/B/passage1/p1_listening.mp3")
//!     .into_event()
//!     .unwrap();
//! assert_eq!(event.kind, ArtifactKind::PassageAudio);
//! assert_eq!(event.passage, Some(1));
//! ```

use std::fmt;

use crate::models::LessonKey;

/// Namespace holding official lesson content.
pub const DEFAULT_NAMESPACE: &str = "official";

/// Pattern excluded from passage-level processing.
pub const EXCLUDED_PATTERN: &str = "evaluation";

/// Filename of the lesson-level dictation document.
pub const LESSON_DICTATION_FILE: &str = "dictation.json";

/// What kind of content file an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    LessonDictation,
    PassageAudio,
    PassageSubtitle,
    PassageScript,
    PassageQuestions,
    PassageDictation,
    PassageImage,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::LessonDictation => "lesson_dictation",
            ArtifactKind::PassageAudio => "passage_audio",
            ArtifactKind::PassageSubtitle => "passage_subtitle",
            ArtifactKind::PassageScript => "passage_script",
            ArtifactKind::PassageQuestions => "passage_questions",
            ArtifactKind::PassageDictation => "passage_dictation",
            ArtifactKind::PassageImage => "passage_image",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a path does not produce an event. Skips are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OutsideNamespace,
    MissingSegments,
    ExcludedPattern,
    UnrecognizedLayout,
    UnrecognizedFile,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OutsideNamespace => "outside_namespace",
            SkipReason::MissingSegments => "missing_segments",
            SkipReason::ExcludedPattern => "excluded_pattern",
            SkipReason::UnrecognizedLayout => "unrecognized_layout",
            SkipReason::UnrecognizedFile => "unrecognized_file",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-file notification resolved to its lesson key and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    /// The full logical path, stored verbatim in the owning field.
    pub path: String,
    pub key: LessonKey,
    /// Passage index; `None` only for [`ArtifactKind::LessonDictation`].
    pub passage: Option<u32>,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Skip(SkipReason),
    Artifact(ClassifiedEvent),
}

impl Classification {
    pub fn into_event(self) -> Option<ClassifiedEvent> {
        match self {
            Classification::Artifact(event) => Some(event),
            Classification::Skip(_) => None,
        }
    }
}

type FilenameRule = (fn(&str) -> bool, ArtifactKind);

/// Passage filename table, checked in order against the lowercased name.
pub const PASSAGE_RULES: &[FilenameRule] = &[
    (is_listening_audio, ArtifactKind::PassageAudio),
    (is_subtitles, ArtifactKind::PassageSubtitle),
    (is_listening_script, ArtifactKind::PassageScript),
    (is_listening_questions, ArtifactKind::PassageQuestions),
    (is_passage_dictation, ArtifactKind::PassageDictation),
    (is_lettered_image, ArtifactKind::PassageImage),
];

fn is_listening_audio(name: &str) -> bool {
    name.ends_with("listening.mp3") || name.ends_with("listening.wav")
}

fn is_subtitles(name: &str) -> bool {
    name.ends_with("subtitles.json")
}

fn is_listening_script(name: &str) -> bool {
    name.ends_with("listening.txt")
}

fn is_listening_questions(name: &str) -> bool {
    name.ends_with("listening_questions.json") || name.ends_with("listening_question.json")
}

fn is_passage_dictation(name: &str) -> bool {
    name.ends_with("dictation.json")
}

/// `img_<anything>_<a-d>.<png|jpg|jpeg>`
fn is_lettered_image(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    if !matches!(ext, "png" | "jpg" | "jpeg") {
        return false;
    }
    match stem.strip_prefix("img_") {
        Some(rest) => {
            let bytes = rest.as_bytes();
            bytes.len() >= 2
                && bytes[bytes.len() - 2] == b'_'
                && (b'a'..=b'd').contains(&bytes[bytes.len() - 1])
        }
        None => false,
    }
}

/// Trailing `_a`..`_d` letter of an image path, before its extension.
pub fn image_suffix(path: &str) -> Option<char> {
    let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    let (stem, ext) = name.rsplit_once('.')?;
    if !matches!(ext, "png" | "jpg" | "jpeg") {
        return None;
    }
    let (_, letter) = stem.rsplit_once('_')?;
    match letter {
        "a" | "b" | "c" | "d" => letter.chars().next(),
        _ => None,
    }
}

/// Parses a `passage{N}` directory name.
fn parse_passage_segment(segment: &str) -> Option<u32> {
    let lower = segment.to_ascii_lowercase();
    let digits = lower.strip_prefix("passage")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Classify a path under the [`DEFAULT_NAMESPACE`].
pub fn classify(path: &str) -> Classification {
    classify_in(DEFAULT_NAMESPACE, path)
}

/// Classify a path under the given content namespace.
pub fn classify_in(namespace: &str, path: &str) -> Classification {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.first() != Some(&namespace) {
        return Classification::Skip(SkipReason::OutsideNamespace);
    }
    if segments.len() < 5 {
        return Classification::Skip(SkipReason::MissingSegments);
    }

    let (level, lesson, pattern) = (segments[1], segments[2], segments[3]);
    if level.is_empty() || lesson.is_empty() || pattern.is_empty() {
        return Classification::Skip(SkipReason::MissingSegments);
    }

    let filename = segments[segments.len() - 1];
    if filename.is_empty() {
        return Classification::Skip(SkipReason::UnrecognizedFile);
    }
    let key = LessonKey::new(level, lesson, pattern);

    match segments.len() {
        5 => {
            if filename.eq_ignore_ascii_case(LESSON_DICTATION_FILE) {
                Classification::Artifact(ClassifiedEvent {
                    path: path.to_string(),
                    key,
                    passage: None,
                    kind: ArtifactKind::LessonDictation,
                })
            } else {
                Classification::Skip(SkipReason::UnrecognizedFile)
            }
        }
        6 => {
            let Some(passage) = parse_passage_segment(segments[4]) else {
                return Classification::Skip(SkipReason::UnrecognizedLayout);
            };
            if pattern == EXCLUDED_PATTERN {
                return Classification::Skip(SkipReason::ExcludedPattern);
            }
            let lower = filename.to_ascii_lowercase();
            match PASSAGE_RULES
                .iter()
                .find(|(accepts, _)| accepts(lower.as_str()))
            {
                Some((_, kind)) => Classification::Artifact(ClassifiedEvent {
                    path: path.to_string(),
                    key,
                    passage: Some(passage),
                    kind: *kind,
                }),
                None => Classification::Skip(SkipReason::UnrecognizedFile),
            }
        }
        _ => Classification::Skip(SkipReason::UnrecognizedLayout),
    }
}
