//! Field-level merge rules for [`LessonRecord`]s.
//!
//! [`merge_event`] applies one classified event to a record in place and
//! reports whether anything changed. Every rule is commutative and
//! idempotent, so any permutation of any multiset of events yields the
//! same record (ignoring `updated_at`).
//!
//! # Precedence
//!
//! | Field | Owner | Rule |
//! |-------|-------|------|
//! | `passage.audioPath` .. `passage.dictationPath`, `dictationPath` | the matching kind | set when empty; a different path replaces it only if it sorts first |
//! | `passage.imagePaths` | `PassageImage` | set union, ordered by suffix letter then path |
//! | `passage.imagePath` | `PassageImage` | first image path |
//! | `title`, `level`, `lesson`, `pattern`, `id` | any kind | filled from the key only when unset |
//! | `mode` | any kind | defaults when empty, plus `dictation` once any dictation path exists |

use std::collections::BTreeSet;

use crate::classify::{image_suffix, ArtifactKind, ClassifiedEvent};
use crate::models::{LessonKey, LessonRecord, Mode, Passage};

/// Apply one event to `record`. Returns `true` if the record changed.
pub fn merge_event(record: &mut LessonRecord, event: &ClassifiedEvent) -> bool {
    if !record
        .passages
        .windows(2)
        .all(|pair| pair[0].id < pair[1].id)
    {
        record.passages.sort_by_key(|p| p.id);
        record.passages.dedup_by_key(|p| p.id);
    }

    let mut changed = fill_defaults(record, &event.key);

    changed |= match (event.kind, event.passage) {
        (ArtifactKind::LessonDictation, _) => set_owned_path(&mut record.dictation_path, &event.path),
        (kind, Some(id)) => {
            let (passage, created) = passage_entry(&mut record.passages, id);
            let written = write_passage_field(passage, kind, &event.path);
            created || written
        }
        (_, None) => false,
    };

    changed |= refresh_modes(record);
    changed
}

/// Fill top-level convenience fields that are still unset.
///
/// Every default is a pure function of the key.
pub fn fill_defaults(record: &mut LessonRecord, key: &LessonKey) -> bool {
    let mut changed = false;
    if record.title.is_empty() {
        record.title = key.lesson.clone();
        changed = true;
    }
    if record.level.is_empty() {
        record.level = key.level.clone();
        changed = true;
    }
    if record.lesson.is_none() {
        if let Some(n) = key.lesson_number() {
            record.lesson = Some(n);
            changed = true;
        }
    }
    if record.pattern.is_empty() {
        record.pattern = key.pattern.clone();
        changed = true;
    }
    if record.id.is_empty() {
        record.id = key.legacy_id();
        changed = true;
    }
    changed
}

/// Recompute the mode set. Only ever inserts.
pub fn refresh_modes(record: &mut LessonRecord) -> bool {
    let before = record.mode.len();
    if record.mode.is_empty() {
        record.mode.extend(Mode::DEFAULTS);
    }
    let has_dictation = record.dictation_path.is_some()
        || record.passages.iter().any(|p| p.dictation_path.is_some());
    if has_dictation {
        record.mode.insert(Mode::Dictation);
    }
    record.mode.len() != before
}

fn passage_entry(passages: &mut Vec<Passage>, id: u32) -> (&mut Passage, bool) {
    match passages.binary_search_by_key(&id, |p| p.id) {
        Ok(idx) => (&mut passages[idx], false),
        Err(idx) => {
            passages.insert(idx, Passage::new(id));
            (&mut passages[idx], true)
        }
    }
}

fn write_passage_field(passage: &mut Passage, kind: ArtifactKind, path: &str) -> bool {
    match kind {
        ArtifactKind::PassageAudio => set_owned_path(&mut passage.audio_path, path),
        ArtifactKind::PassageSubtitle => set_owned_path(&mut passage.subtitle_path, path),
        ArtifactKind::PassageScript => set_owned_path(&mut passage.script_path, path),
        ArtifactKind::PassageQuestions => set_owned_path(&mut passage.questions_path, path),
        ArtifactKind::PassageDictation => set_owned_path(&mut passage.dictation_path, path),
        ArtifactKind::PassageImage => {
            let merged = upsert_image_path(&passage.image_paths, path);
            let first = merged.first().cloned();
            let changed = merged != passage.image_paths || first != passage.image_path;
            passage.image_paths = merged;
            passage.image_path = first;
            changed
        }
        ArtifactKind::LessonDictation => false,
    }
}

/// Single-path slot write. The smaller of two competing paths wins so the
/// result does not depend on arrival order.
fn set_owned_path(slot: &mut Option<String>, path: &str) -> bool {
    match slot {
        Some(current) if current.as_str() <= path => false,
        _ => {
            *slot = Some(path.to_string());
            true
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ImageEntry {
    rank: u8,
    path: String,
}

impl ImageEntry {
    fn new(path: &str) -> Self {
        Self {
            rank: image_rank(path),
            path: path.to_string(),
        }
    }
}

/// Sort rank of an image path: `_a` → 0 .. `_d` → 3, anything else last.
pub fn image_rank(path: &str) -> u8 {
    match image_suffix(path) {
        Some(letter) => letter as u8 - b'a',
        None => u8::MAX,
    }
}

/// Add `path` to an image list, returning the deduplicated, sorted list.
pub fn upsert_image_path(existing: &[String], path: &str) -> Vec<String> {
    let mut entries: BTreeSet<ImageEntry> = existing.iter().map(|p| ImageEntry::new(p)).collect();
    entries.insert(ImageEntry::new(path));
    entries.into_iter().map(|e| e.path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn event(path: &str) -> ClassifiedEvent {
        classify(path)
            .into_event()
            .unwrap_or_else(|| panic!("not an event: {}", path))
    }

    fn fold(events: &[ClassifiedEvent]) -> LessonRecord {
        let mut record = LessonRecord::empty();
        for e in events {
            merge_event(&mut record, e);
        }
        record
    }

    fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    fn sample_events() -> Vec<ClassifiedEvent> {
        [
            "official/Level3/Lesson2/B/passage2/p2_listening.mp3",
            "official/Level3/Lesson2/B/passage1/p1_listening_subtitles.json",
            "official/Level3/Lesson2/B/passage1/img_L3_02_c.png",
            "official/Level3/Lesson2/B/passage1/img_L3_02_a.png",
            "official/Level3/Lesson2/B/passage2/p2_dictation.json",
            "official/Level3/Lesson2/B/dictation.json",
        ]
        .iter()
        .map(|p| event(p))
        .collect()
    }

    #[test]
    fn test_converges_for_every_arrival_order() {
        let events = sample_events();
        let indices: Vec<usize> = (0..events.len()).collect();
        let reference = fold(&events);

        for order in permutations(&indices) {
            let ordered: Vec<ClassifiedEvent> = order.iter().map(|&i| events[i].clone()).collect();
            assert_eq!(fold(&ordered), reference, "order {:?}", order);
        }
    }

    #[test]
    fn test_duplicates_do_not_change_result() {
        let events = sample_events();
        let reference = fold(&events);

        let mut noisy = Vec::new();
        for (i, e) in events.iter().enumerate() {
            for _ in 0..=(i % 3) {
                noisy.push(e.clone());
            }
        }
        noisy.extend(events.iter().rev().cloned());
        assert_eq!(fold(&noisy), reference);

        let mut record = reference.clone();
        for e in &events {
            assert!(!merge_event(&mut record, e), "redelivery changed record");
        }
    }

    #[test]
    fn test_first_event_fills_defaults() {
        let record = fold(&[event("official/Level3/Lesson2/B/passage1/a_listening.mp3")]);
        assert_eq!(record.title, "Lesson2");
        assert_eq!(record.level, "Level3");
        assert_eq!(record.lesson, Some(2));
        assert_eq!(record.pattern, "B");
        assert_eq!(record.id, "L3_B_02");
        assert_eq!(
            record.mode.iter().copied().collect::<Vec<_>>(),
            vec![Mode::Listening, Mode::Overlapping]
        );
        assert_eq!(record.passages.len(), 1);
        assert_eq!(record.passages[0].order, 1);
    }

    #[test]
    fn test_defaults_do_not_clobber() {
        let mut record = LessonRecord::empty();
        record.title = "Custom".to_string();
        record.id = "kept".to_string();
        merge_event(&mut record, &event("official/Level3/Lesson2/B/passage1/a_listening.mp3"));
        assert_eq!(record.title, "Custom");
        assert_eq!(record.id, "kept");
    }

    #[test]
    fn test_field_isolation() {
        let audio = event("official/Level3/Lesson2/B/passage1/a_listening.mp3");
        let script = event("official/Level3/Lesson2/B/passage1/a_listening.txt");
        let mut record = fold(&[audio.clone()]);
        let before = record.passages[0].clone();

        merge_event(&mut record, &script);
        let after = &record.passages[0];
        assert_eq!(after.audio_path, before.audio_path);
        assert_eq!(after.subtitle_path, None);
        assert_eq!(after.questions_path, None);
        assert_eq!(after.dictation_path, None);
        assert!(after.image_paths.is_empty());
        assert_eq!(after.script_path.as_deref(), Some(script.path.as_str()));
    }

    #[test]
    fn test_image_ordering() {
        let dir = "official/Level1/Lesson1/A/passage1";
        let arrivals: Vec<ClassifiedEvent> = ["d", "a", "c", "b"]
            .iter()
            .map(|s| event(&format!("{}/img_L1_01_{}.png", dir, s)))
            .collect();
        let record = fold(&arrivals);
        let passage = &record.passages[0];
        let letters: Vec<char> = passage
            .image_paths
            .iter()
            .map(|p| image_suffix(p).unwrap())
            .collect();
        assert_eq!(letters, vec!['a', 'b', 'c', 'd']);
        assert_eq!(passage.image_path.as_deref(), Some(passage.image_paths[0].as_str()));
    }

    #[test]
    fn test_upsert_image_path_dedups_and_sorts_unmatched_last() {
        let existing = vec!["x/img_1_b.png".to_string(), "x/cover.png".to_string()];
        let merged = upsert_image_path(&existing, "x/img_1_a.png");
        assert_eq!(merged, vec!["x/img_1_a.png", "x/img_1_b.png", "x/cover.png"]);
        assert_eq!(upsert_image_path(&merged, "x/img_1_a.png"), merged);
    }

    #[test]
    fn test_competing_paths_resolve_independent_of_order() {
        let mp3 = event("official/Level1/Lesson1/A/passage1/a_listening.mp3");
        let wav = event("official/Level1/Lesson1/A/passage1/a_listening.wav");
        let one = fold(&[mp3.clone(), wav.clone()]);
        let two = fold(&[wav, mp3.clone()]);
        assert_eq!(one, two);
        assert_eq!(one.passages[0].audio_path.as_deref(), Some(mp3.path.as_str()));
    }

    #[test]
    fn test_passages_sorted_by_id() {
        let record = fold(&[
            event("official/Level1/Lesson1/A/passage3/a_listening.mp3"),
            event("official/Level1/Lesson1/A/passage1/a_listening.mp3"),
            event("official/Level1/Lesson1/A/passage2/a_listening.mp3"),
        ]);
        let ids: Vec<u32> = record.passages.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_dictation_mode_from_passage_or_lesson() {
        let record = fold(&[event("official/Level1/Lesson1/A/passage1/x_dictation.json")]);
        assert!(record.has_mode(Mode::Dictation));

        let record = fold(&[event("official/Level1/Lesson1/A/dictation.json")]);
        assert!(record.has_mode(Mode::Dictation));
        assert!(record.has_mode(Mode::Listening));
        assert!(record.passages.is_empty());
    }

    #[test]
    fn test_mode_set_never_shrinks() {
        let mut record = fold(&[event("official/Level1/Lesson1/A/dictation.json")]);
        let before = record.mode.clone();
        merge_event(&mut record, &event("official/Level1/Lesson1/A/passage1/a_listening.mp3"));
        assert!(before.is_subset(&record.mode));
    }
}
