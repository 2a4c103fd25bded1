//! Parallel per-file phase of a validation run.
//!
//! A fixed pool of blocking workers claims paths from a shared queue, reads
//! and analyzes each file in isolation, and sends the outcome over a channel
//! to a single collector. The collector returns only after every worker has
//! been joined, which is the barrier before the cross-file pass.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::config::{FsSourceConfig, ValidationConfig};
use crate::document::{FileOutcome, analyze_document};
use crate::error::{FatalError, Issue, IssueKind};
use crate::strategy::fs::read_file_bounded;

/// Message from a worker to the collector.
enum WorkerMessage {
    /// The file was read and analyzed.
    Analyzed(FileOutcome),
    /// The file could not be read; the issue explains why.
    Failed(Issue),
    /// Reading the file would exceed `max_total_bytes`.
    LimitExceeded(Issue),
}

/// State shared by every worker.
struct Shared {
    queue: Mutex<VecDeque<PathBuf>>,
    cancelled: AtomicBool,
    timed_out: AtomicBool,
    total_bytes: AtomicU64,
    deadline: Option<Instant>,
    max_file_size: u64,
    max_total_bytes: u64,
    validation: ValidationConfig,
}

impl Shared {
    /// Claim the next path, or `None` when the queue is drained or the run
    /// has been cancelled.
    fn next_path(&self) -> Option<PathBuf> {
        if self.cancelled.load(Ordering::Acquire) {
            return None;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.timed_out.store(true, Ordering::Release);
            self.cancelled.store(true, Ordering::Release);
            return None;
        }
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn process(&self, path: PathBuf) -> WorkerMessage {
        let content = match read_file_bounded(&path, self.max_file_size) {
            Ok(content) => content,
            Err(issue) => return WorkerMessage::Failed(issue),
        };

        let bytes = content.len() as u64;
        let before = self.total_bytes.fetch_add(bytes, Ordering::AcqRel);
        if before.saturating_add(bytes) > self.max_total_bytes {
            self.cancelled.store(true, Ordering::Release);
            return WorkerMessage::LimitExceeded(Issue::error(
                path,
                0,
                IssueKind::LimitExceeded,
                format!(
                    "scan aborted: max_total_bytes limit ({}) reached; remaining files not validated",
                    self.max_total_bytes
                ),
            ));
        }

        WorkerMessage::Analyzed(analyze_document(&path, content, &self.validation))
    }
}

/// Everything the collector gathered from the workers.
#[derive(Debug, Default)]
pub struct PoolOutput {
    /// Outcomes of every analyzed file.
    pub outcomes: Vec<FileOutcome>,
    /// Read failures and limit violations.
    pub issues: Vec<Issue>,
    /// Files that could not be read.
    pub failed_files: usize,
    /// Files that were queued but never validated.
    pub unvalidated: usize,
    /// The deadline fired before the queue was drained.
    pub timed_out: bool,
    /// `max_total_bytes` stopped the run.
    pub limit_exceeded: bool,
}

fn worker_loop(shared: &Shared, tx: &mpsc::UnboundedSender<WorkerMessage>) {
    while let Some(path) = shared.next_path() {
        debug!(file = %path.display(), "validating file");
        let message = shared.process(path);
        let stop = matches!(message, WorkerMessage::LimitExceeded(_));
        if tx.send(message).is_err() || stop {
            break;
        }
    }
}

/// Validate `files` on a pool of blocking workers.
///
/// # Errors
///
/// Returns [`FatalError::Worker`] if a worker panics or is cancelled by the
/// runtime.
pub async fn run_pool(
    files: Vec<PathBuf>,
    fs_config: &FsSourceConfig,
    validation: &ValidationConfig,
) -> Result<PoolOutput, FatalError> {
    let total = files.len();
    let jobs = fs_config.effective_jobs().clamp(1, total.max(1));
    let deadline = fs_config
        .timeout
        .and_then(|t| Instant::now().checked_add(t));

    let shared = Arc::new(Shared {
        queue: Mutex::new(files.into()),
        cancelled: AtomicBool::new(false),
        timed_out: AtomicBool::new(false),
        total_bytes: AtomicU64::new(0),
        deadline,
        max_file_size: fs_config.max_file_size,
        max_total_bytes: fs_config.max_total_bytes,
        validation: validation.clone(),
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut workers = JoinSet::new();
    for _ in 0..jobs {
        let worker_shared = Arc::clone(&shared);
        let worker_tx = tx.clone();
        workers.spawn_blocking(move || worker_loop(&worker_shared, &worker_tx));
    }
    drop(tx);
    debug!(jobs, files = total, "spawned validation workers");

    let mut output = PoolOutput::default();
    let collector_deadline = deadline.map(tokio::time::Instant::from_std);
    loop {
        let received = match collector_deadline {
            Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                Ok(message) => message,
                Err(_) => {
                    shared.timed_out.store(true, Ordering::Release);
                    shared.cancelled.store(true, Ordering::Release);
                    break;
                }
            },
            None => rx.recv().await,
        };
        let Some(message) = received else {
            break;
        };
        collect(&mut output, message);
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(join_error) = joined {
            error!("validation worker crashed: {join_error}");
            shared.cancelled.store(true, Ordering::Release);
            return Err(FatalError::Worker(join_error.to_string()));
        }
    }

    // Files finished between the deadline and the join still count.
    while let Ok(message) = rx.try_recv() {
        collect(&mut output, message);
    }

    output.timed_out = shared.timed_out.load(Ordering::Acquire);
    output.unvalidated = total
        .saturating_sub(output.outcomes.len())
        .saturating_sub(output.failed_files);
    if output.timed_out {
        warn!(unvalidated = output.unvalidated, "validation timed out");
    }
    Ok(output)
}

fn collect(output: &mut PoolOutput, message: WorkerMessage) {
    match message {
        WorkerMessage::Analyzed(outcome) => output.outcomes.push(outcome),
        WorkerMessage::Failed(issue) => {
            debug!(file = %issue.file.display(), "file could not be read");
            output.failed_files += 1;
            output.issues.push(issue);
        }
        WorkerMessage::LimitExceeded(issue) => {
            warn!(file = %issue.file.display(), "{}", issue.message);
            output.limit_exceeded = true;
            output.issues.push(issue);
        }
    }
}
