//! Dispatch layer - one collector thread per top-level subdirectory
//!
//! The dispatcher is responsible for:
//! - Listing the immediate subdirectories of the input root
//! - Spawning one named collector thread per subdirectory
//! - Waiting on the completion channel, ticking progress while it waits
//! - Joining every worker (the collection barrier)
//!
//! A thread that fails to spawn is recorded and the remaining launches go ahead.

use crate::chunk::EntryKind;
use crate::config::DefragConfig;
use crate::error::{DefragError, Result, WorkerError};
use crate::progress::ProgressReporter;
use crate::registry::ChunkRegistry;
use crate::walker::collector::{CollectSummary, Collector, CollectorStats};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often progress is refreshed while waiting at the barrier
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// List the directories directly under `root`, sorted by name
///
/// Symlinks and regular files in the root are ignored. Fails with
/// [`DefragError::MissingInputDirectory`] when `root` cannot be listed.
pub fn top_level_dirs(root: &Path, config: &DefragConfig) -> Result<Vec<PathBuf>> {
    let missing = |e: std::io::Error| DefragError::MissingInputDirectory {
        path: root.to_path_buf(),
        reason: e.to_string(),
    };

    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(missing)? {
        let entry = entry.map_err(missing)?;
        let is_dir = entry
            .file_type()
            .map(|t| EntryKind::from_file_type(t).is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        let path = entry.path();
        if config.is_excluded(&path) {
            debug!(path = %path.display(), "Excluded top-level directory");
            continue;
        }
        dirs.push(path);
    }

    dirs.sort();
    Ok(dirs)
}

/// A collector running on its own thread
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Subtree this worker walks
    root: PathBuf,

    /// Thread handle
    handle: Option<JoinHandle<std::result::Result<(), WorkerError>>>,

    /// Worker statistics
    stats: Arc<CollectorStats>,
}

impl Worker {
    /// Spawn a collector thread for `root`
    pub fn spawn(
        id: usize,
        root: PathBuf,
        config: Arc<DefragConfig>,
        registry: Arc<ChunkRegistry>,
        done: Sender<usize>,
    ) -> std::result::Result<Self, WorkerError> {
        let stats = Arc::new(CollectorStats::default());
        let stats_clone = Arc::clone(&stats);
        let thread_root = root.clone();

        let handle = thread::Builder::new()
            .name(format!("collector-{}", id))
            .spawn(move || {
                let result =
                    Collector::new(id, &config, &registry, &stats_clone).collect(&thread_root);
                // Release the registry before signalling so it can be unwrapped after join
                drop(registry);
                let _ = done.send(id);
                result
            })
            .map_err(|e| WorkerError::LaunchFailed {
                id,
                root: root.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            root,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Subtree this worker walks
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get worker statistics
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> std::result::Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result,
                Err(payload) => Err(WorkerError::Panicked {
                    id: self.id,
                    message: panic_message(payload.as_ref()),
                }),
            }
        } else {
            Ok(())
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Collector thread panicked".to_string()
    }
}

/// Sum the live counters of all workers
pub fn aggregate_stats(workers: &[Worker]) -> CollectSummary {
    let mut total = CollectSummary::default();
    for worker in workers {
        total += worker.stats().snapshot();
    }
    total
}

/// Outcome of the collection phase
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Workers that started
    pub launched: usize,

    /// Workers that could not be started
    pub launch_failures: Vec<WorkerError>,

    /// Workers that returned an error or panicked
    pub worker_errors: Vec<WorkerError>,

    /// Counters summed over every launched worker
    pub stats: CollectSummary,
}

/// Launches collectors and waits for all of them
pub struct Dispatcher {
    config: Arc<DefragConfig>,
    registry: Arc<ChunkRegistry>,
}

impl Dispatcher {
    pub fn new(config: Arc<DefragConfig>, registry: Arc<ChunkRegistry>) -> Self {
        Self { config, registry }
    }

    /// Walk every directory in `roots` in parallel and return once all are done
    pub fn run(self, roots: Vec<PathBuf>, progress: Option<&ProgressReporter>) -> DispatchReport {
        let (done_tx, done_rx) = unbounded();
        let mut report = DispatchReport::default();
        let mut workers = Vec::with_capacity(roots.len());

        for (id, root) in roots.into_iter().enumerate() {
            match Worker::spawn(
                id,
                root,
                Arc::clone(&self.config),
                Arc::clone(&self.registry),
                done_tx.clone(),
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    warn!(error = %e, "Collector not started");
                    report.launch_failures.push(e);
                }
            }
        }
        drop(done_tx);
        report.launched = workers.len();
        info!(count = workers.len(), "Collectors spawned");

        self.wait_for_completion(&workers, &done_rx, progress);

        report.stats = aggregate_stats(&workers);
        for worker in workers {
            let id = worker.id();
            let root = worker.root().to_path_buf();
            if let Err(e) = worker.join() {
                warn!(id, root = %root.display(), error = %e, "Collector failed");
                report.worker_errors.push(e);
            }
        }

        report
    }

    /// Block until every launched worker has signalled completion
    fn wait_for_completion(
        &self,
        workers: &[Worker],
        done_rx: &Receiver<usize>,
        progress: Option<&ProgressReporter>,
    ) {
        let start = Instant::now();
        let mut remaining = workers.len();

        while remaining > 0 {
            match done_rx.recv_timeout(PROGRESS_INTERVAL) {
                Ok(id) => {
                    remaining -= 1;
                    debug!(id, remaining, "Collector done");
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Every sender is gone, so every thread has exited (possibly by panic)
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if let Some(p) = progress {
                p.update(&CollectProgress {
                    stats: aggregate_stats(workers),
                    active_workers: remaining,
                    total_workers: workers.len(),
                    registry_len: self.registry.snapshot_length(),
                    elapsed: start.elapsed(),
                });
            }
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct CollectProgress {
    /// Counters so far
    pub stats: CollectSummary,

    /// Workers still walking
    pub active_workers: usize,

    /// Workers launched
    pub total_workers: usize,

    /// Current registry length
    pub registry_len: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl CollectProgress {
    /// Calculate chunks per second rate
    pub fn chunks_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.chunks_found as f64 / secs
        } else {
            0.0
        }
    }
}
