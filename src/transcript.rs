//! Subtitle (speech-to-text output) documents.
//!
//! ```json
//! { "text": "...", "language": "en",
//!   "segments": [{ "id": 0, "start": 0.0, "end": 2.4, "text": "...", "words": [...] }] }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lesson_sync_core::cloze::text::collapse_whitespace;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
}

impl Transcript {
    /// Whitespace-normalized text; segment texts stand in for an empty `text`.
    pub fn plain_text(&self) -> String {
        let text = collapse_whitespace(&self.text);
        if !text.is_empty() {
            return text;
        }
        collapse_whitespace(
            &self
                .segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

/// Upstream content that cannot be parsed. Not retried.
#[derive(Debug, Error)]
#[error("malformed subtitle JSON at {path}")]
pub struct MalformedTranscript {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

pub fn parse_transcript(bytes: &[u8], path: &str) -> Result<Transcript, MalformedTranscript> {
    serde_json::from_slice(bytes).map_err(|source| MalformedTranscript {
        path: path.to_string(),
        source,
    })
}
