//! # Lesson Sync Core
//!
//! Store-agnostic logic for lesson-sync: data models, path classification,
//! convergent merge rules, cloze exercise synthesis, and the store traits.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! runtime-specific dependencies. Everything except the store traits is a
//! pure function.

pub mod classify;
pub mod cloze;
pub mod merge;
pub mod models;
pub mod objects;
pub mod store;
