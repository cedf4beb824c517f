//! End-to-end tests driving the engine the way the CLI does: real
//! directories on disk, an in-memory inventory, and the full
//! scan -> analyze -> groups -> delete lifecycle.

use std::fs;
use std::path::Path;

use nasdupe::engine::Engine;
use nasdupe::inventory::InventoryStore;
use nasdupe::job::JobStatus;
use tempfile::TempDir;

fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn engine_over(dir: &TempDir) -> Engine {
    let store = InventoryStore::open_in_memory().unwrap();
    Engine::new(dir.path().to_path_buf(), store)
}

#[test]
fn scan_indexes_nested_files_and_skips_excluded_directories() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"hello");
    write_file(dir.path(), "sub/b.txt", b"world");
    write_file(dir.path(), "node_modules/dep.js", b"skip me");
    write_file(dir.path(), ".hidden/secret.txt", b"skip me too");
    write_file(dir.path(), ".dotfile", b"also skipped");

    let engine = engine_over(&dir);
    let outcome = engine.trigger_scan();

    assert!(outcome.success);
    assert_eq!(outcome.files_counted, 2);

    let stats = engine.scan_stats().unwrap();
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_size, 10);
}

#[test]
fn rescan_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"same");
    write_file(dir.path(), "b.txt", b"same");

    let engine = engine_over(&dir);
    engine.trigger_scan();
    let first = engine.scan_stats().unwrap();

    // Unchanged tree: second scan converges to the same inventory.
    let outcome = engine.trigger_scan();
    assert!(outcome.success);
    let second = engine.scan_stats().unwrap();

    assert_eq!(first.total_files, second.total_files);
    assert_eq!(first.total_size, second.total_size);
    assert_eq!(first.hashed_files, second.hashed_files);
    assert_eq!(engine.duplicate_groups().unwrap().len(), 1);
}

#[test]
fn only_size_colliding_files_get_hashed() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "twin1.bin", b"xxxx");
    write_file(dir.path(), "twin2.bin", b"yyyy"); // same size, different bytes
    write_file(dir.path(), "loner.bin", b"unique length 16");

    let engine = engine_over(&dir);
    let outcome = engine.trigger_scan();
    assert!(outcome.success);

    // The unique-size file keeps a NULL digest.
    let stats = engine.scan_stats().unwrap();
    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.hashed_files, 2);

    // Equal size but different content is not a duplicate group.
    assert!(engine.duplicate_groups().unwrap().is_empty());
}

#[test]
fn three_identical_files_form_one_group_with_correct_waste() {
    let dir = TempDir::new().unwrap();
    let content = vec![7u8; 1000];
    write_file(dir.path(), "a.bin", &content);
    write_file(dir.path(), "b.bin", &content);
    write_file(dir.path(), "c.bin", &content);

    let engine = engine_over(&dir);
    engine.trigger_scan();

    let groups = engine.duplicate_groups().unwrap();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.len(), 3);
    assert_eq!(group.size, 1000);
    assert_eq!(group.wasted_space, 2000);
    assert_eq!(group.total_size(), 3000);

    let stats = engine.scan_stats().unwrap();
    assert_eq!(stats.wasted_space, 2000);
}

#[test]
fn same_size_different_content_joins_no_group() {
    let dir = TempDir::new().unwrap();
    let shared = vec![1u8; 1000];
    let mut different = vec![1u8; 1000];
    different[500] = 2;
    write_file(dir.path(), "a.txt", &shared);
    write_file(dir.path(), "b.txt", &shared);
    write_file(dir.path(), "c.txt", &different);

    let engine = engine_over(&dir);
    engine.trigger_scan();

    // c.txt collides on size (so it was hashed) but matches no one on
    // content, so it belongs to no group.
    let groups = engine.duplicate_groups().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[0].wasted_space, 1000);
    assert!(groups[0].members.iter().all(|m| m.path != "c.txt"));
    assert_eq!(engine.scan_stats().unwrap().hashed_files, 3);
}

#[test]
fn groups_are_ordered_by_total_size_and_members_by_recency() {
    let dir = TempDir::new().unwrap();
    // Small group: 2 x 10 bytes. Large group: 2 x 500 bytes.
    write_file(dir.path(), "small1.txt", b"ten bytes!");
    write_file(dir.path(), "small2.txt", b"ten bytes!");
    let big = vec![b'z'; 500];
    write_file(dir.path(), "big1.bin", &big);
    write_file(dir.path(), "big2.bin", &big);

    // Make small2 measurably newer than small1.
    let old = filetime::FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(dir.path().join("small1.txt"), old).unwrap();

    let engine = engine_over(&dir);
    engine.trigger_scan();

    let groups = engine.duplicate_groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].size, 500);
    assert_eq!(groups[1].size, 10);

    let small = &groups[1];
    assert_eq!(small.members[0].path, "small2.txt");
    assert_eq!(small.members[1].path, "small1.txt");
}

#[test]
fn analyze_hashes_pending_candidates_without_a_walk() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.dat", b"pair");
    write_file(dir.path(), "b.dat", b"pair");

    let engine = engine_over(&dir);
    engine.trigger_scan();

    // Everything already hashed; a second analyze finds nothing pending.
    let outcome = engine.analyze_duplicates();
    assert!(outcome.success);
    assert_eq!(outcome.hashed_count, 0);

    // A new same-size file shows up as a pending candidate.
    write_file(dir.path(), "c.dat", b"pare");
    engine.trigger_scan();
    assert_eq!(engine.scan_stats().unwrap().hashed_files, 3);
}

#[test]
fn deleting_a_member_shrinks_the_group_away() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "keep.txt", b"duplicate content");
    write_file(dir.path(), "drop.txt", b"duplicate content");

    let engine = engine_over(&dir);
    engine.trigger_scan();
    assert_eq!(engine.duplicate_groups().unwrap().len(), 1);

    let outcome = engine.delete_file("drop.txt");
    assert!(outcome.success);

    // File bytes and record both gone; the pair no longer groups.
    assert!(!dir.path().join("drop.txt").exists());
    assert!(dir.path().join("keep.txt").exists());
    assert!(engine.duplicate_groups().unwrap().is_empty());
    assert_eq!(engine.scan_stats().unwrap().total_files, 1);
}

#[test]
fn delete_of_unknown_path_fails_without_touching_anything() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"data");

    let engine = engine_over(&dir);
    engine.trigger_scan();

    let outcome = engine.delete_file("ghost.txt");
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("no inventory record"));
    assert_eq!(engine.scan_stats().unwrap().total_files, 1);
}

#[test]
fn batch_delete_continues_past_a_missing_file() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"111");
    write_file(dir.path(), "b.txt", b"222");
    write_file(dir.path(), "c.txt", b"333");

    let engine = engine_over(&dir);
    engine.trigger_scan();

    // b vanishes between scan and delete.
    fs::remove_file(dir.path().join("b.txt")).unwrap();

    let outcome = engine.delete_files(&[
        "a.txt".to_string(),
        "b.txt".to_string(),
        "c.txt".to_string(),
    ]);

    assert!(!outcome.success);
    assert_eq!(outcome.deleted_count, 2);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("b.txt: "));

    // a and c are gone from disk and inventory; b's record survives the
    // failed attempt.
    assert!(!dir.path().join("a.txt").exists());
    assert!(!dir.path().join("c.txt").exists());
    assert_eq!(engine.scan_stats().unwrap().total_files, 1);
}

#[test]
fn concurrent_triggers_never_corrupt_the_inventory() {
    let dir = TempDir::new().unwrap();
    for i in 0..200 {
        write_file(dir.path(), &format!("f{i}.dat"), format!("content {i}").as_bytes());
    }

    let engine = engine_over(&dir);

    // Hammer the trigger from a second thread while a scan runs. Every
    // attempt must either complete a full job or be rejected with the
    // in-progress error; nothing in between.
    std::thread::scope(|scope| {
        let rival = scope.spawn(|| {
            let mut rejections = 0u32;
            for _ in 0..50 {
                let outcome = engine.trigger_scan();
                if !outcome.success {
                    assert_eq!(
                        outcome.error.as_deref(),
                        Some("scan already in progress")
                    );
                    rejections += 1;
                }
                std::thread::yield_now();
            }
            rejections
        });
        let outcome = engine.trigger_scan();
        if !outcome.success {
            assert_eq!(outcome.error.as_deref(), Some("scan already in progress"));
        }
        rival.join().unwrap();
    });

    // Whatever interleaving happened, the last completed job left a full,
    // consistent inventory.
    let outcome = engine.trigger_scan();
    assert!(outcome.success);
    assert_eq!(outcome.files_counted, 200);
    assert_eq!(engine.scan_stats().unwrap().total_files, 200);
    assert_eq!(engine.scan_progress().status, JobStatus::Done);
}

#[test]
fn progress_reports_done_with_summary_message() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"pair");
    write_file(dir.path(), "b.txt", b"pair");

    let engine = engine_over(&dir);
    assert_eq!(engine.scan_progress().status, JobStatus::Idle);

    engine.trigger_scan();

    let progress = engine.scan_progress();
    assert_eq!(progress.status, JobStatus::Done);
    assert_eq!(progress.scanned_files, 2);
    assert!(progress.message.unwrap().contains("scan complete"));
}

#[test]
fn failed_scan_surfaces_error_state_and_message() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"x");

    let store = InventoryStore::open_in_memory().unwrap();
    let engine = Engine::new(dir.path().join("a.txt"), store);

    let outcome = engine.trigger_scan();
    assert!(!outcome.success);
    assert!(outcome.error.is_some());

    let progress = engine.scan_progress();
    assert_eq!(progress.status, JobStatus::Error);
    assert!(progress.message.is_some());
}
