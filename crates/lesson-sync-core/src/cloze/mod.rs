//! Cloze exercise synthesis.
//!
//! ```text
//! transcripts → merge_passages → extract_candidates → select_diverse
//!             → build_cloze (A: 2, B: 3, C: 3 or 4 blanks) → DictationExercise
//! ```
//!
//! Every stage is a pure function of its input; the same transcripts always
//! produce the same exercise apart from `createdAt`.

pub mod assemble;
pub mod blanks;
pub mod candidates;
pub mod diversity;
pub mod text;

pub use assemble::{assemble_exercise, merge_passages, ClozeParams, PassageText};
pub use blanks::{build_cloze, count_blanks, Cloze};
pub use candidates::{extract_candidates, CandidateRules};
pub use diversity::{jaccard, leading_pair, select_diverse, DEFAULT_MAX_SIMILARITY};
