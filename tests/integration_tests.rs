//! Integration tests for tree-digest
//!
//! Each test builds a small tree in a temp directory and runs the full
//! walk, digest and merge pipeline against it.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tree_digest::content::{Digester, Md5Digester};
use tree_digest::error::{FileError, ScanError, WalkError};
use tree_digest::output::shard_path;
use tree_digest::record::{FileFailure, HEADER};
use tree_digest::report::{NullReporter, ScanReporter};
use tree_digest::walker::{RunState, ScanCoordinator};
use tree_digest::ScanJob;

const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

/// Reporter that remembers what it saw
#[derive(Default)]
struct RecordingReporter {
    started: Mutex<Option<PathBuf>>,
    directories: Mutex<Vec<(PathBuf, usize)>>,
    failures: Mutex<Vec<FileFailure>>,
    finished: Mutex<Option<u64>>,
    // File to delete as soon as its directory has been listed
    remove_on_listing: Option<PathBuf>,
}

impl ScanReporter for RecordingReporter {
    fn run_started(&self, root: &Path, _: &Path, _: usize) {
        *self.started.lock().unwrap() = Some(root.to_path_buf());
    }

    fn directory_scanned(&self, dir: &Path, file_count: usize) {
        self.directories
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), file_count));
        if let Some(path) = &self.remove_on_listing {
            if path.parent() == Some(dir) {
                let _ = fs::remove_file(path);
            }
        }
    }

    fn directory_skipped(&self, _: &Path, _: &str) {}

    fn file_failed(&self, failure: &FileFailure) {
        self.failures.lock().unwrap().push(failure.clone());
    }

    fn shard_merged(&self, _: &Path, _: u64) {}

    fn run_finished(&self, total_files: u64, _: Duration) {
        *self.finished.lock().unwrap() = Some(total_files);
    }
}

/// MD5 digester that raises the shutdown flag on its first file
#[derive(Default)]
struct StopAfterFirst {
    inner: Md5Digester,
    shutdown: OnceLock<Arc<AtomicBool>>,
    calls: AtomicUsize,
}

impl Digester for StopAfterFirst {
    fn name(&self) -> &'static str {
        "md5"
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<(String, u64)> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(flag) = self.shutdown.get() {
                flag.store(true, Ordering::SeqCst);
            }
        }
        self.inner.digest_reader(reader)
    }
}

/// Tree of `dirs` nested directories with `files_per_dir` files each
fn build_tree(root: &Path, dirs: usize, files_per_dir: usize) -> usize {
    let mut dir = root.to_path_buf();
    let mut total = 0;
    for d in 0..dirs {
        if d > 0 {
            dir = dir.join(format!("level{}", d));
            fs::create_dir(&dir).unwrap();
        }
        for f in 0..files_per_dir {
            fs::write(dir.join(format!("file{}.txt", f)), format!("{}:{}", d, f)).unwrap();
        }
        total += files_per_dir;
    }
    total
}

fn job(tree: &TempDir, out: &TempDir, concurrency: usize) -> ScanJob {
    ScanJob::new(tree.path(), out.path().join("files_md5.csv"))
        .unwrap()
        .with_concurrency(concurrency)
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn rows(path: &Path) -> BTreeSet<String> {
    read_lines(path).into_iter().skip(1).collect()
}

#[test]
fn test_every_file_becomes_one_row() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    let total = build_tree(tree.path(), 5, 4);

    let reporter = Arc::new(RecordingReporter::default());
    let job = job(&tree, &out, 4);
    let output = job.output.clone();

    let summary = ScanCoordinator::new(job, reporter.clone()).run().unwrap();

    assert_eq!(summary.state, RunState::Done);
    assert_eq!(summary.files_discovered, total as u64);
    assert_eq!(summary.records, total as u64);
    assert!(summary.failures.is_empty());
    assert!(summary.is_consistent());
    assert!(!summary.interrupted);

    let lines = read_lines(&output);
    assert_eq!(lines.len(), total + 1);
    assert_eq!(lines[0], HEADER);
    assert_eq!(lines.iter().filter(|l| l.as_str() == HEADER).count(), 1);

    let dirs = reporter.directories.lock().unwrap();
    assert_eq!(dirs.len(), 5);
    assert!(dirs.iter().all(|(_, count)| *count == 4));
    assert_eq!(*reporter.finished.lock().unwrap(), Some(total as u64));
}

#[test]
fn test_run_started_reports_canonical_root() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    build_tree(tree.path(), 2, 1);

    let reporter = Arc::new(RecordingReporter::default());
    let job = ScanJob::new(tree.path().join("level1/.."), out.path().join("files_md5.csv"))
        .unwrap()
        .with_concurrency(1);
    ScanCoordinator::new(job, reporter.clone()).run().unwrap();

    let started = reporter.started.lock().unwrap().clone();
    assert_eq!(started, Some(tree.path().canonicalize().unwrap()));
}

#[test]
fn test_shards_removed_after_merge() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    build_tree(tree.path(), 2, 3);

    let job = job(&tree, &out, 3);
    let output = job.output.clone();
    ScanCoordinator::new(job, Arc::new(NullReporter)).run().unwrap();

    for id in 0..3 {
        assert!(!shard_path(&output, id).exists());
    }
    let names: Vec<_> = fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(names.len(), 1);
}

#[test]
fn test_rerun_is_deterministic() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    build_tree(tree.path(), 3, 5);

    let first = job(&tree, &out, 4);
    let output = first.output.clone();
    ScanCoordinator::new(first, Arc::new(NullReporter)).run().unwrap();
    let first_rows = rows(&output);

    ScanCoordinator::new(job(&tree, &out, 4), Arc::new(NullReporter))
        .run()
        .unwrap();
    assert_eq!(rows(&output), first_rows);
}

#[test]
fn test_concurrency_does_not_change_rows() {
    let tree = tempdir().unwrap();
    let out_serial = tempdir().unwrap();
    let out_parallel = tempdir().unwrap();
    build_tree(tree.path(), 4, 6);

    let serial = job(&tree, &out_serial, 1);
    let serial_output = serial.output.clone();
    ScanCoordinator::new(serial, Arc::new(NullReporter)).run().unwrap();

    let parallel = job(&tree, &out_parallel, 4).with_queue_size(2);
    let parallel_output = parallel.output.clone();
    ScanCoordinator::new(parallel, Arc::new(NullReporter))
        .run()
        .unwrap();

    assert_eq!(rows(&serial_output), rows(&parallel_output));
}

#[test]
fn test_empty_tree_writes_header_only() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();

    let job = job(&tree, &out, 2);
    let output = job.output.clone();
    let summary = ScanCoordinator::new(job, Arc::new(NullReporter)).run().unwrap();

    assert_eq!(summary.files_discovered, 0);
    assert_eq!(summary.state, RunState::Done);
    assert_eq!(read_lines(&output), vec![HEADER.to_string()]);
}

#[test]
fn test_empty_file_row() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::write(tree.path().join("empty.bin"), b"").unwrap();

    let job = job(&tree, &out, 2);
    let output = job.output.clone();
    ScanCoordinator::new(job, Arc::new(NullReporter)).run().unwrap();

    let lines = read_lines(&output);
    assert_eq!(lines.len(), 2);

    let row = &lines[1];
    let root = tree.path().canonicalize().unwrap();
    assert!(row.starts_with(&format!(
        "{},{},empty.bin,",
        root.join("empty.bin").display(),
        root.display()
    )));
    assert!(row.ends_with(&format!(",0,{}", EMPTY_MD5)));
}

#[test]
fn test_known_digest_in_output() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::write(tree.path().join("abc.txt"), b"abc").unwrap();

    let job = job(&tree, &out, 1).with_chunk_size(512);
    let output = job.output.clone();
    let summary = ScanCoordinator::new(job, Arc::new(NullReporter)).run().unwrap();

    assert_eq!(summary.bytes_hashed, 3);
    let lines = read_lines(&output);
    assert!(lines[1].ends_with(",3,900150983cd24fb0d6963f7d28e17f72"));
}

#[test]
fn test_file_removed_after_discovery_is_a_failure() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::write(tree.path().join("keep.txt"), b"keep").unwrap();
    fs::write(tree.path().join("gone.txt"), b"gone").unwrap();

    let root = tree.path().canonicalize().unwrap();
    let gone = root.join("gone.txt");
    let reporter = Arc::new(RecordingReporter {
        remove_on_listing: Some(gone.clone()),
        ..Default::default()
    });

    let job = job(&tree, &out, 2);
    let output = job.output.clone();
    let summary = ScanCoordinator::new(job, reporter.clone()).run().unwrap();

    assert_eq!(summary.state, RunState::Done);
    assert_eq!(summary.files_discovered, 2);
    assert_eq!(summary.records, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].path, gone);
    assert_eq!(summary.failures[0].error, FileError::NotFound);
    assert!(summary.is_consistent());

    assert_eq!(reporter.failures.lock().unwrap().len(), 1);
    assert_eq!(read_lines(&output).len(), 2);
}

#[test]
fn test_failure_report_written() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::write(tree.path().join("gone.txt"), b"gone").unwrap();

    let root = tree.path().canonicalize().unwrap();
    let reporter = Arc::new(RecordingReporter {
        remove_on_listing: Some(root.join("gone.txt")),
        ..Default::default()
    });

    let report = out.path().join("failed.csv");
    let job = job(&tree, &out, 1).with_failure_report(&report).unwrap();
    ScanCoordinator::new(job, reporter).run().unwrap();

    let lines = read_lines(&report);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "abspath,reason");
    assert!(lines[1].contains("gone.txt"));
    assert!(lines[1].contains("file not found"));
}

#[test]
fn test_failure_report_error_keeps_run_done() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::write(tree.path().join("a.txt"), b"a").unwrap();

    let report_dir = out.path().join("reports");
    fs::create_dir(&report_dir).unwrap();
    let job = job(&tree, &out, 1)
        .with_failure_report(report_dir.join("failed.csv"))
        .unwrap();
    let output = job.output.clone();

    // The report can no longer be created once its directory is gone
    fs::remove_dir(&report_dir).unwrap();

    let summary = ScanCoordinator::new(job, Arc::new(NullReporter)).run().unwrap();
    assert_eq!(summary.state, RunState::Done);
    assert_eq!(read_lines(&output).len(), 2);
}

#[test]
fn test_missing_root_fails_run() {
    let out = tempdir().unwrap();
    let missing = out.path().join("does-not-exist");

    let job = ScanJob::new(&missing, out.path().join("files_md5.csv")).unwrap();
    let output = job.output.clone();
    let coordinator = ScanCoordinator::new(job, Arc::new(NullReporter));
    let status = coordinator.status();

    let result = coordinator.run();
    assert!(matches!(
        result,
        Err(ScanError::Walk(WalkError::RootNotFound { .. }))
    ));
    assert_eq!(status.get(), RunState::Failed);
    assert!(!output.exists());
    assert!(!shard_path(&output, 0).exists());
}

#[test]
fn test_invalid_job_fails_run() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();

    let job = job(&tree, &out, 0);
    let result = ScanCoordinator::new(job, Arc::new(NullReporter)).run();
    assert!(matches!(result, Err(ScanError::Config(_))));
}

#[test]
fn test_output_inside_root_not_scanned() {
    let tree = tempdir().unwrap();
    fs::write(tree.path().join("data.txt"), b"data").unwrap();

    let job = ScanJob::new(tree.path(), tree.path().join("files_md5.csv"))
        .unwrap()
        .with_concurrency(2);
    let output = job.output.clone();

    // A stale output from a previous run must not be picked up either
    fs::write(&output, "stale").unwrap();

    let summary = ScanCoordinator::new(job, Arc::new(NullReporter)).run().unwrap();
    assert_eq!(summary.files_discovered, 1);
    // Stale output plus one shard per worker
    assert_eq!(summary.walk.excluded, 3);

    let lines = read_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("data.txt"));
}

#[test]
fn test_shutdown_before_run_submits_nothing() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    build_tree(tree.path(), 2, 2);

    let job = job(&tree, &out, 2);
    let output = job.output.clone();
    let coordinator = ScanCoordinator::new(job, Arc::new(NullReporter));
    coordinator
        .shutdown_flag()
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let summary = coordinator.run().unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.files_discovered, 0);
    assert!(summary.is_consistent());
    assert_eq!(read_lines(&output), vec![HEADER.to_string()]);
}

#[test]
fn test_shutdown_mid_run_drains_queued_files() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    let total = build_tree(tree.path(), 4, 10) as u64;

    let digester = Arc::new(StopAfterFirst::default());
    let job = job(&tree, &out, 1).with_queue_size(2);
    let output = job.output.clone();
    let coordinator =
        ScanCoordinator::with_digester(job, digester.clone(), Arc::new(NullReporter));
    digester
        .shutdown
        .set(coordinator.shutdown_flag())
        .unwrap();

    let summary = coordinator.run().unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.state, RunState::Done);
    assert!(summary.is_consistent());
    assert!(summary.files_discovered < total);

    // The file in flight when the flag went up is finished, the rest are cancelled
    assert_eq!(summary.records, 1);
    assert_eq!(digester.calls.load(Ordering::SeqCst), 1);
    assert!(summary
        .failures
        .iter()
        .all(|f| f.error == FileError::Cancelled));
    assert_eq!(
        summary.records + summary.cancelled_count(),
        summary.files_discovered
    );

    let lines = read_lines(&output);
    assert_eq!(lines.len() as u64, summary.records + 1);
    for row in &lines[1..] {
        assert_eq!(row.split(',').count(), 7);
    }
}

#[test]
fn test_progress_callback_sees_final_counts() {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    let total = build_tree(tree.path(), 3, 3) as u64;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let summary = ScanCoordinator::new(job(&tree, &out, 2), Arc::new(NullReporter))
        .run_with_progress(move |p| sink.lock().unwrap().push(p))
        .unwrap();

    assert_eq!(summary.records, total);
    // The helper thread always reports at least once
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|p| p.records <= total));
}
