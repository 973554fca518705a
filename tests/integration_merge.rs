//! Integration tests for the merge pipeline.
//!
//! These tests verify end-to-end behavior including:
//! - Duplicate content landing only once
//! - Path mapping across several roots
//! - Copy/move semantics and name collisions
//! - Ordering with several hashing workers

use assert_fs::prelude::*;
use assert_fs::TempDir;
use dedup_merge::core::index::InMemoryIndex;
use dedup_merge::core::pipeline::Pipeline;
use dedup_merge::core::transfer::{MoveFallback, TransferMode};
use dedup_merge::events::{Event, EventChannel, PipelineEvent};
use predicates::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn failing_rename(_: &Path, _: &Path) -> std::io::Result<()> {
    Err(std::io::Error::other("cross-device link"))
}

fn write(temp: &TempDir, relative: &str, content: &str) {
    let child = temp.child(relative);
    if let Some(parent) = Path::new(relative).parent() {
        temp.child(parent).create_dir_all().unwrap();
    }
    child.write_str(content).unwrap();
}

/// Relative path -> content for every file under `root`
fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, std::fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn duplicate_content_lands_once() {
    let temp = TempDir::new().unwrap();
    write(&temp, "A/x.txt", "hello");
    write(&temp, "A/sub/y.txt", "hello");

    let result = Pipeline::builder()
        .sources(vec![temp.child("A").path().to_path_buf()])
        .destination(temp.child("D").path().to_path_buf())
        .sort_entries(true)
        .build()
        .run()
        .unwrap();

    temp.child("D/x.txt").assert("hello");
    temp.child("D/sub/y.txt").assert(predicate::path::missing());
    assert_eq!(result.report.transferred, 1);
    assert_eq!(result.report.duplicates, 1);
}

#[test]
fn name_collision_keeps_first_root() {
    let temp = TempDir::new().unwrap();
    write(&temp, "A/same.txt", "from A");
    write(&temp, "B/same.txt", "from B");

    let result = Pipeline::builder()
        .sources(vec![temp.child("A").path().to_path_buf(), temp.child("B").path().to_path_buf()])
        .destination(temp.child("D").path().to_path_buf())
        .index(Box::new(InMemoryIndex::new()))
        .build()
        .run()
        .unwrap();

    temp.child("D/same.txt").assert("from A");
    assert_eq!(result.report.transferred, 1);
    assert_eq!(result.report.transfer_failures, 1);
}

#[test]
fn roots_map_without_duplicated_prefixes() {
    let temp = TempDir::new().unwrap();
    write(&temp, "A/photos/2019/a.jpg", "a");
    write(&temp, "B/photos/2020/b.jpg", "b");

    Pipeline::builder()
        .sources(vec![temp.child("A").path().to_path_buf(), temp.child("B").path().to_path_buf()])
        .destination(temp.child("D").path().to_path_buf())
        .build()
        .run()
        .unwrap();

    let merged = snapshot(temp.child("D").path());
    let paths: Vec<_> = merged.keys().cloned().collect();
    assert_eq!(
        paths,
        vec![
            PathBuf::from("photos/2019/a.jpg"),
            PathBuf::from("photos/2020/b.jpg")
        ]
    );
}

#[test]
fn copy_mode_leaves_sources_untouched() {
    let temp = TempDir::new().unwrap();
    write(&temp, "A/one.txt", "1");
    write(&temp, "A/two.txt", "2");
    write(&temp, "A/dup/one.txt", "1");
    let before = snapshot(temp.child("A").path());

    Pipeline::builder()
        .sources(vec![temp.child("A").path().to_path_buf()])
        .destination(temp.child("D").path().to_path_buf())
        .build()
        .run()
        .unwrap();

    assert_eq!(snapshot(temp.child("A").path()), before);
}

#[test]
fn move_mode_removes_moved_sources() {
    let temp = TempDir::new().unwrap();
    write(&temp, "A/keep.txt", "unique");
    write(&temp, "A/sub/dup.txt", "unique");

    let result = Pipeline::builder()
        .sources(vec![temp.child("A").path().to_path_buf()])
        .destination(temp.child("D").path().to_path_buf())
        .mode(TransferMode::Move)
        .sort_entries(true)
        .build()
        .run()
        .unwrap();

    temp.child("D/keep.txt").assert("unique");
    temp.child("A/keep.txt").assert(predicate::path::missing());
    // Duplicates are skipped, not moved
    temp.child("A/sub/dup.txt").assert("unique");
    assert_eq!(result.report.fallback_copies, 0);
}

#[test]
fn move_fallback_behaviors_are_distinguishable() {
    for (fallback, source_remains) in [
        (MoveFallback::KeepSource, true),
        (MoveFallback::RemoveSource, false),
    ] {
        let temp = TempDir::new().unwrap();
        write(&temp, "A/file.txt", "content");

        let result = Pipeline::builder()
            .sources(vec![temp.child("A").path().to_path_buf()])
            .destination(temp.child("D").path().to_path_buf())
            .mode(TransferMode::Move)
            .move_fallback(fallback)
            .rename_with(failing_rename)
            .build()
            .run()
            .unwrap();

        temp.child("D/file.txt").assert("content");
        assert_eq!(temp.child("A/file.txt").path().exists(), source_remains);
        assert_eq!(result.report.fallback_copies, 1);
    }
}

#[test]
fn unreadable_roots_do_not_stop_the_merge() {
    let temp = TempDir::new().unwrap();
    write(&temp, "A/x.txt", "x");

    let result = Pipeline::builder()
        .sources(vec![
            temp.child("missing").path().to_path_buf(),
            temp.child("A").path().to_path_buf(),
        ])
        .destination(temp.child("D").path().to_path_buf())
        .build()
        .run()
        .unwrap();

    temp.child("D/x.txt").assert("x");
    assert_eq!(result.walk_errors.len(), 1);
}

#[test]
fn several_hash_workers_give_the_same_tree() {
    let temp = TempDir::new().unwrap();
    for i in 0..40 {
        // Every content value appears under several names
        write(&temp, &format!("A/dir{}/file{}.txt", i % 5, i), &format!("content {}", i % 7));
    }

    let run = |workers: usize, dest: &str| {
        Pipeline::builder()
            .sources(vec![temp.child("A").path().to_path_buf()])
            .destination(temp.child(dest).path().to_path_buf())
            .sort_entries(true)
            .hash_workers(workers)
            .build()
            .run()
            .unwrap()
    };

    let single = run(1, "single");
    let pooled = run(4, "pooled");

    assert_eq!(single.report, pooled.report);
    assert_eq!(single.report.transferred, 7);
    assert_eq!(
        snapshot(temp.child("single").path()),
        snapshot(temp.child("pooled").path())
    );
}

#[test]
fn completion_event_carries_summary() {
    let temp = TempDir::new().unwrap();
    write(&temp, "A/a.txt", "same");
    write(&temp, "A/b.txt", "same");

    let (sender, receiver) = EventChannel::new();
    let result = Pipeline::builder()
        .sources(vec![temp.child("A").path().to_path_buf()])
        .destination(temp.child("D").path().to_path_buf())
        .build()
        .run_with_events(&sender)
        .unwrap();
    drop(sender);

    let summary = receiver
        .iter()
        .find_map(|event| match event {
            Event::Pipeline(PipelineEvent::Completed { summary }) => Some(summary),
            _ => None,
        })
        .expect("completion event");

    assert_eq!(summary, result.summary());
    assert_eq!(summary.files_found, 2);
    assert_eq!(summary.transferred, 1);
    assert_eq!(summary.duplicates, 1);
}
