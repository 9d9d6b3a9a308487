//! Recursive chunk collector
//!
//! Each collector:
//! - Walks one subtree depth-first using an explicit stack of owned paths
//! - Skips symbolic links and excluded paths
//! - Opens every file whose name parses as a chunk index
//! - Registers the open handle in the shared [`ChunkRegistry`]
//!
//! Unreadable directories are tolerated or fatal depending on the configured
//! [`SubtreePolicy`](crate::config::SubtreePolicy). A chunk file that cannot be
//! opened always fails the collector: its index is known, so skipping it would
//! drop bytes from the output.

use crate::chunk::{parse_chunk_index, ChunkHandle, EntryKind};
use crate::config::DefragConfig;
use crate::error::{ChunkError, WorkerError};
use crate::registry::ChunkRegistry;
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Statistics collected by one collector
#[derive(Debug, Default)]
pub struct CollectorStats {
    /// Directories successfully listed
    pub dirs_visited: AtomicU64,

    /// Chunk files registered
    pub chunks_found: AtomicU64,

    /// Sum of registered chunk sizes
    pub chunk_bytes: AtomicU64,

    /// Files whose names are not chunk indices
    pub noise_files: AtomicU64,

    /// Symbolic links skipped
    pub symlinks_skipped: AtomicU64,

    /// Entries matched by an exclude pattern
    pub excluded: AtomicU64,

    /// Directories that could not be opened or read
    pub subtrees_skipped: AtomicU64,

    /// Non-chunk entries whose type could not be determined
    pub errors: AtomicU64,
}

impl CollectorStats {
    fn record_dir(&self) {
        self.dirs_visited.fetch_add(1, Ordering::Relaxed);
    }

    fn record_chunk(&self, bytes: u64) {
        self.chunks_found.fetch_add(1, Ordering::Relaxed);
        self.chunk_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_noise(&self) {
        self.noise_files.fetch_add(1, Ordering::Relaxed);
    }

    fn record_symlink(&self) {
        self.symlinks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_excluded(&self) {
        self.excluded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.subtrees_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> CollectSummary {
        CollectSummary {
            dirs_visited: self.dirs_visited.load(Ordering::Relaxed),
            chunks_found: self.chunks_found.load(Ordering::Relaxed),
            chunk_bytes: self.chunk_bytes.load(Ordering::Relaxed),
            noise_files: self.noise_files.load(Ordering::Relaxed),
            symlinks_skipped: self.symlinks_skipped.load(Ordering::Relaxed),
            excluded: self.excluded.load(Ordering::Relaxed),
            subtrees_skipped: self.subtrees_skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Plain counters, summed across collectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub dirs_visited: u64,
    pub chunks_found: u64,
    pub chunk_bytes: u64,
    pub noise_files: u64,
    pub symlinks_skipped: u64,
    pub excluded: u64,
    pub subtrees_skipped: u64,
    pub errors: u64,
}

impl AddAssign for CollectSummary {
    fn add_assign(&mut self, other: Self) {
        self.dirs_visited += other.dirs_visited;
        self.chunks_found += other.chunks_found;
        self.chunk_bytes += other.chunk_bytes;
        self.noise_files += other.noise_files;
        self.symlinks_skipped += other.symlinks_skipped;
        self.excluded += other.excluded;
        self.subtrees_skipped += other.subtrees_skipped;
        self.errors += other.errors;
    }
}

/// Directory waiting to be listed
#[derive(Debug, Clone)]
struct DirTask {
    path: PathBuf,
    /// Levels below the input root; top-level subdirectories are depth 1
    depth: usize,
}

/// Walks one subtree and registers the chunks it finds
pub struct Collector<'a> {
    id: usize,
    config: &'a DefragConfig,
    registry: &'a ChunkRegistry,
    stats: &'a CollectorStats,
}

impl<'a> Collector<'a> {
    pub fn new(
        id: usize,
        config: &'a DefragConfig,
        registry: &'a ChunkRegistry,
        stats: &'a CollectorStats,
    ) -> Self {
        Self {
            id,
            config,
            registry,
            stats,
        }
    }

    /// Collect every chunk under `root`, a top-level subdirectory of the input
    pub fn collect(&self, root: &Path) -> Result<(), WorkerError> {
        let mut stack = vec![DirTask {
            path: root.to_path_buf(),
            depth: 1,
        }];

        while let Some(task) = stack.pop() {
            self.visit(task, &mut stack)?;
        }

        debug!(
            id = self.id,
            root = %root.display(),
            chunks = self.stats.chunks_found.load(Ordering::Relaxed),
            "Collector finished"
        );
        Ok(())
    }

    /// List one directory, registering chunks and queueing subdirectories
    fn visit(&self, task: DirTask, stack: &mut Vec<DirTask>) -> Result<(), WorkerError> {
        let entries = match fs::read_dir(&task.path) {
            Ok(entries) => entries,
            Err(e) => return self.subtree_failed(&task.path, e),
        };
        self.stats.record_dir();

        // read_dir never yields "." or ".."
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return self.subtree_failed(&task.path, e),
            };

            let path = entry.path();
            let kind = match entry.file_type() {
                Ok(file_type) => EntryKind::from_file_type(file_type),
                Err(e) if path.file_name().and_then(parse_chunk_index).is_some() => {
                    return Err(WorkerError::Chunk {
                        id: self.id,
                        chunk: ChunkError::OpenFailed {
                            path,
                            reason: e.to_string(),
                        },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot determine entry type, skipping");
                    self.stats.record_error();
                    continue;
                }
            };

            if self.config.is_excluded(&path) {
                trace!(path = %path.display(), "Excluded");
                self.stats.record_excluded();
                continue;
            }

            match kind {
                EntryKind::Symlink => {
                    trace!(path = %path.display(), "Skipping symlink");
                    self.stats.record_symlink();
                }
                EntryKind::Directory => {
                    let depth = task.depth + 1;
                    if self.config.allows_depth(depth) {
                        stack.push(DirTask { path, depth });
                    } else {
                        trace!(path = %path.display(), depth, "Max depth reached");
                    }
                }
                EntryKind::File => self.register(path)?,
                EntryKind::Other => self.stats.record_noise(),
            }
        }

        Ok(())
    }

    /// Open a chunk candidate and hand it to the registry
    fn register(&self, path: PathBuf) -> Result<(), WorkerError> {
        let index = match path.file_name().and_then(parse_chunk_index) {
            Some(index) => index,
            None => {
                trace!(path = %path.display(), "Not a chunk name");
                self.stats.record_noise();
                return Ok(());
            }
        };

        let handle = ChunkHandle::open(index, &path).map_err(|e| WorkerError::Chunk {
            id: self.id,
            chunk: ChunkError::OpenFailed {
                path: path.clone(),
                reason: e.to_string(),
            },
        })?;

        let bytes = handle.size();
        self.registry
            .insert(index, handle)
            .map_err(|chunk| WorkerError::Chunk { id: self.id, chunk })?;
        self.stats.record_chunk(bytes);
        Ok(())
    }

    fn subtree_failed(&self, path: &Path, e: io::Error) -> Result<(), WorkerError> {
        let err = WorkerError::SubtreeOpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        if self.config.is_strict() {
            return Err(err);
        }
        warn!(id = self.id, error = %err, "Skipping subtree");
        self.stats.record_skip();
        Ok(())
    }
}
