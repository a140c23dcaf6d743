//! # lesson-sync
//!
//! Convergent lesson-content aggregation and dictation synthesis.
//!
//! Lesson artifacts (audio, subtitles, scripts, questions, images) land in
//! object storage one file at a time, in any order, possibly more than once.
//! Every arrival is classified by its path and merged into one record per
//! `(level, lesson, pattern)` key. The merge is commutative and idempotent,
//! so the record converges no matter how notifications are ordered or
//! repeated. When a passage subtitle arrives, the key's dictation exercise
//! (three groups of fill-in-the-blank items) is rebuilt from all of the
//! key's transcripts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ POST /events│──▶│   dispatch   │──▶│   aggregate  │──▶ lesson_records
//! │ lsync sync  │   │  (classify)  │   │  (CAS merge) │
//! └─────────────┘   └──────┬───────┘   └──────────────┘
//!                          │ subtitle
//!                          ▼
//!                   ┌──────────────┐
//!                   │  synthesize  │──▶ dictation.json + dictation_exercises
//!                   │   (cloze)    │
//!                   └──────────────┘
//! ```
//!
//! Pure logic (models, classification, merge rules, cloze construction, store
//! traits) lives in the `lesson-sync-core` crate. This crate adds the SQLite
//! store, the filesystem object store, the CLI, and the HTTP server.
//!
//! ## Quick Start
//!
//! ```bash
//! lsync init                                  # create database
//! lsync sync                                  # backfill from content root
//! lsync get Level1/Lesson1/A                  # inspect one record
//! lsync serve                                 # accept notifications
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`aggregate`] | Retrying compare-and-swap merge |
//! | [`dispatch`] | Per-notification routing |
//! | [`synthesize`] | Dictation exercise rebuild |
//! | [`ingest`] | Bulk backfill from the content root |
//! | [`scan`] | Content root walking |
//! | [`objects`] | Filesystem object store |
//! | [`sqlite_store`] | SQLite lesson store |
//! | [`transcript`] | Subtitle document parsing |
//! | [`server`] | HTTP endpoints |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod config;
pub mod context;
pub mod db;
pub mod dispatch;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod objects;
pub mod scan;
pub mod server;
pub mod sqlite_store;
pub mod status;
pub mod synthesize;
pub mod transcript;
