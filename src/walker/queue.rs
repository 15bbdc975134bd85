//! Bounded file-task queue with backpressure
//!
//! The coordinator pushes one [`FileTask`] per discovered file. When the queue
//! is full, submission blocks until a worker takes a task, so memory stays
//! bounded regardless of how many files the tree holds.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A task to digest one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Absolute path to the file
    pub path: PathBuf,
}

impl FileTask {
    /// Create a new file task
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,

    /// Number of submissions that had to wait for space
    pub backpressure_events: AtomicU64,

    /// Workers currently processing a task
    pub active_workers: AtomicUsize,
}

impl QueueStats {
    /// Tasks handed to workers so far
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }

    /// Tasks submitted but not yet taken by a worker
    pub fn queued(&self) -> u64 {
        self.enqueued
            .load(Ordering::Relaxed)
            .saturating_sub(self.dequeued.load(Ordering::Relaxed))
    }

    /// Workers currently processing a task
    pub fn active(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }
}

/// The submitting side went away or every receiver was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed(pub FileTask);

/// Work queue with backpressure support
pub struct WorkQueue {
    sender: Sender<FileTask>,
    receiver: Receiver<FileTask>,
    capacity: usize,
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a new work queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self::with_stats(capacity, Arc::new(QueueStats::default()))
    }

    /// Create a queue that records into existing stats
    ///
    /// Lets an observer hold the stats before the queue exists.
    pub fn with_stats(capacity: usize, stats: Arc<QueueStats>) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));

        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
            stats,
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Split into the single submitting handle and a cloneable receiver
    ///
    /// The queue keeps no handles of its own after this: once the sender is
    /// dropped, receivers drain and stop; once every receiver is dropped,
    /// submission fails.
    pub fn split(self) -> (WorkQueueSender, WorkQueueReceiver) {
        let sender = WorkQueueSender {
            sender: self.sender,
            stats: Arc::clone(&self.stats),
        };
        let receiver = WorkQueueReceiver {
            receiver: self.receiver,
            stats: self.stats,
        };
        (sender, receiver)
    }
}

/// Handle for submitting tasks
pub struct WorkQueueSender {
    sender: Sender<FileTask>,
    stats: Arc<QueueStats>,
}

impl WorkQueueSender {
    /// Submit a task, blocking while the queue is full
    pub fn submit(&self, task: FileTask) -> Result<(), QueueClosed> {
        let task = match self.sender.try_send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(TrySendError::Full(task)) => {
                self.stats.backpressure_events.fetch_add(1, Ordering::Relaxed);
                task
            }
            Err(TrySendError::Disconnected(task)) => return Err(QueueClosed(task)),
        };

        self.sender.send(task).map_err(|e| QueueClosed(e.into_inner()))?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Current queue length
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

/// Handle for receiving tasks (clone one per worker)
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<FileTask>,
    stats: Arc<QueueStats>,
}

impl WorkQueueReceiver {
    /// Receive a task, blocking until one is available
    ///
    /// Returns `None` once the sender is dropped and the queue is drained.
    pub fn recv(&self) -> Option<FileTask> {
        match self.receiver.recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Try to receive a task without blocking
    pub fn try_recv(&self) -> Option<FileTask> {
        match self.receiver.try_recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Number of workers currently processing a task
    pub fn active_workers(&self) -> usize {
        self.stats.active()
    }

    fn begin_work(&self) {
        self.stats.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn end_work(&self) {
        self.stats.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard for marking work as active
pub struct WorkGuard<'a> {
    receiver: &'a WorkQueueReceiver,
}

impl<'a> WorkGuard<'a> {
    /// Create a new work guard (marks worker as active)
    pub fn new(receiver: &'a WorkQueueReceiver) -> Self {
        receiver.begin_work();
        Self { receiver }
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        self.receiver.end_work();
    }
}
