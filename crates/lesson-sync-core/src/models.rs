//! Core data models used throughout lesson-sync.
//!
//! A [`LessonRecord`] is the converged view of every content file observed
//! for one `(level, lesson, pattern)` key. A [`DictationExercise`] is the
//! cloze document synthesized from that key's transcripts.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Deterministic composite key of a lesson pattern.
///
/// Records are never given random identifiers: every event for the same
/// `(level, lesson, pattern)` resolves to the same key, so redelivered
/// events target the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonKey {
    /// Level directory name, e.g. `Level3`.
    pub level: String,
    /// Lesson directory name, e.g. `Lesson2`.
    pub lesson: String,
    /// Pattern directory name, e.g. `B`.
    pub pattern: String,
}

impl LessonKey {
    pub fn new(
        level: impl Into<String>,
        lesson: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            level: level.into(),
            lesson: lesson.into(),
            pattern: pattern.into(),
        }
    }

    /// First run of digits in the level name (`Level3` → `3`).
    pub fn level_number(&self) -> Option<u32> {
        first_number(&self.level)
    }

    /// First run of digits in the lesson name (`Lesson2` → `2`).
    pub fn lesson_number(&self) -> Option<u32> {
        first_number(&self.lesson)
    }

    /// Legacy short id stored on the record, e.g. `L3_B_02`.
    ///
    /// Falls back to the raw segment when a name carries no digits.
    pub fn legacy_id(&self) -> String {
        let level = self
            .level_number()
            .map(|n| n.to_string())
            .unwrap_or_else(|| self.level.clone());
        let lesson = self
            .lesson_number()
            .map(|n| format!("{:02}", n))
            .unwrap_or_else(|| self.lesson.clone());
        format!("L{}_{}_{}", level, self.pattern, lesson)
    }

    /// Identifier written into exercise documents, e.g. `Level3_Lesson2_B`.
    pub fn lesson_id(&self) -> String {
        format!("{}_{}_{}", self.level, self.lesson, self.pattern)
    }

    /// Object prefix holding this key's files, with a trailing slash.
    pub fn prefix(&self, namespace: &str) -> String {
        format!(
            "{}/{}/{}/{}/",
            namespace, self.level, self.lesson, self.pattern
        )
    }

    /// Object path of the lesson-level dictation document.
    pub fn dictation_path(&self, namespace: &str) -> String {
        format!("{}dictation.json", self.prefix(namespace))
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.lesson, self.pattern)
    }
}

impl FromStr for LessonKey {
    type Err = anyhow::Error;

    /// Parses `Level3/Lesson2/B`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            [level, lesson, pattern]
                if !level.is_empty() && !lesson.is_empty() && !pattern.is_empty() =>
            {
                Ok(Self::new(*level, *lesson, *pattern))
            }
            _ => bail!(
                "invalid lesson key '{}': expected <level>/<lesson>/<pattern>",
                s
            ),
        }
    }
}

fn first_number(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// A capability available for a lesson pattern.
///
/// Declaration order is the serialized order of a record's mode list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Listening,
    Overlapping,
    Dictation,
}

impl Mode {
    /// Modes every record starts with.
    pub const DEFAULTS: [Mode; 2] = [Mode::Listening, Mode::Overlapping];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Listening => "listening",
            Mode::Overlapping => "overlapping",
            Mode::Dictation => "dictation",
        }
    }
}

/// One numbered segment of a lesson pattern.
///
/// Each path field is owned by exactly one artifact kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    pub id: u32,
    pub order: u32,
    #[serde(default)]
    pub duration_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictation_path: Option<String>,
    /// Deduplicated, sorted by `_a`..`_d` suffix.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_paths: Vec<String>,
    /// First entry of `image_paths`, kept for older readers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl Passage {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            order: id,
            duration_sec: 0.0,
            audio_path: None,
            subtitle_path: None,
            script_path: None,
            questions_path: None,
            dictation_path: None,
            image_paths: Vec::new(),
            image_path: None,
        }
    }
}

/// Converged, per-key aggregate of all known content-file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub level: String,
    /// Lesson number, when the lesson name carries one.
    #[serde(default)]
    pub lesson: Option<u32>,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub id: String,
    /// Only ever grows.
    #[serde(default)]
    pub mode: BTreeSet<Mode>,
    /// Lesson-level dictation document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictation_path: Option<String>,
    /// Sorted by passage id, ids unique.
    #[serde(default)]
    pub passages: Vec<Passage>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LessonRecord {
    /// A record with no fields set. Defaults are filled on first merge.
    pub fn empty() -> Self {
        Self {
            title: String::new(),
            level: String::new(),
            lesson: None,
            pattern: String::new(),
            id: String::new(),
            mode: BTreeSet::new(),
            dictation_path: None,
            passages: Vec::new(),
            updated_at: None,
        }
    }

    pub fn has_mode(&self, mode: Mode) -> bool {
        self.mode.contains(&mode)
    }
}

/// A sentence with blanked words plus the removed words, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClozeItem {
    pub id: String,
    pub sentence: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Dictation,
}

/// The three exercise groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseParts {
    #[serde(rename = "A", default)]
    pub a: Vec<ClozeItem>,
    #[serde(rename = "B", default)]
    pub b: Vec<ClozeItem>,
    #[serde(rename = "C", default)]
    pub c: Vec<ClozeItem>,
}

impl ExerciseParts {
    /// Groups with their labels, in A, B, C order.
    pub fn groups(&self) -> [(&'static str, &[ClozeItem]); 3] {
        [
            ("A", self.a.as_slice()),
            ("B", self.b.as_slice()),
            ("C", self.c.as_slice()),
        ]
    }
}

/// Dictation exercise document for one lesson key.
///
/// Recreated wholesale on every synthesis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictationExercise {
    #[serde(rename = "type")]
    pub kind: ExerciseKind,
    pub lesson_id: String,
    pub source_prefix: String,
    /// The chosen snippets before blanking, joined.
    pub text: String,
    pub parts: ExerciseParts,
    pub created_at: DateTime<Utc>,
}
