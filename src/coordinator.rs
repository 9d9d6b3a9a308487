//! Run coordinator - orchestrates one reassembly
//!
//! The coordinator is responsible for:
//! - Opening the input root and creating the output file
//! - Dispatching collectors and waiting at the barrier
//! - Deciding which collection problems are fatal
//! - Assembling the registry into the output
//! - Removing a partial output when the run fails

use crate::assemble::{Assembler, AssemblyStats};
use crate::config::DefragConfig;
use crate::error::{DefragError, Result, WorkerError};
use crate::progress::ProgressReporter;
use crate::registry::ChunkRegistry;
use crate::walker::{top_level_dirs, CollectSummary, DispatchReport, Dispatcher};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of a completed reassembly
#[derive(Debug, Clone)]
pub struct DefragResult {
    /// Collectors started
    pub workers: usize,

    /// Collectors that could not be started
    pub launch_failures: usize,

    /// Counters summed over all collectors
    pub collected: CollectSummary,

    /// Chunk handles replaced by a later file with the same index
    pub duplicates: u64,

    /// What was written to the output
    pub assembled: AssemblyStats,

    /// Time taken for the run
    pub duration: Duration,
}

/// Coordinates collection and assembly for one input tree
pub struct Defragmenter {
    /// Configuration
    config: Arc<DefragConfig>,
}

impl Defragmenter {
    pub fn new(config: DefragConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run the reassembly
    ///
    /// On failure after the output file was created, the partial output is
    /// removed before the error is returned.
    pub fn run(self) -> Result<DefragResult> {
        let start = Instant::now();
        let roots = top_level_dirs(&self.config.input_dir, &self.config)?;

        let output_path = &self.config.output_path;
        let output = File::create(output_path).map_err(|e| DefragError::OutputCreate {
            path: output_path.clone(),
            reason: e.to_string(),
        })?;

        info!(
            input = %self.config.input_dir.display(),
            output = %output_path.display(),
            collectors = roots.len(),
            "Starting reassembly"
        );

        let result = self.collect_and_assemble(roots, output, start);
        if result.is_err() {
            if let Err(e) = fs::remove_file(output_path) {
                warn!(path = %output_path.display(), error = %e, "Failed to remove partial output");
            }
        }
        result
    }

    fn collect_and_assemble(
        &self,
        roots: Vec<PathBuf>,
        output: File,
        start: Instant,
    ) -> Result<DefragResult> {
        let registry = Arc::new(ChunkRegistry::new(
            self.config.duplicate_policy,
            self.config.max_index,
        ));

        let progress = self.config.show_progress.then(ProgressReporter::new);
        if let Some(ref p) = progress {
            p.set_status("Collecting chunks...");
        }

        let mut report = Dispatcher::new(Arc::clone(&self.config), Arc::clone(&registry))
            .run(roots, progress.as_ref());

        if let Some(ref p) = progress {
            p.finish_and_clear();
        }

        self.check_report(&mut report)?;

        let registry = Arc::try_unwrap(registry).map_err(|_| DefragError::RegistryStillShared)?;
        let duplicates = registry.duplicates();
        let slots = registry.into_slots();
        info!(
            chunks = report.stats.chunks_found,
            slots = slots.len(),
            "Collection finished"
        );

        let mut writer = BufWriter::new(output);
        let assembled = Assembler::new(self.config.copy_mode).assemble(slots, &mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        let duration = start.elapsed();
        info!(
            chunks = assembled.chunks,
            bytes = assembled.bytes,
            duration_ms = duration.as_millis() as u64,
            "Reassembly completed"
        );

        Ok(DefragResult {
            workers: report.launched,
            launch_failures: report.launch_failures.len(),
            collected: report.stats,
            duplicates,
            assembled,
            duration,
        })
    }

    /// Turn the first fatal collection problem into an error
    ///
    /// Recoverable errors (launch failures) only reduce coverage unless the
    /// run is strict; a chunk they would have supplied below the highest
    /// index still surfaces as a gap during assembly.
    fn check_report(&self, report: &mut DispatchReport) -> Result<()> {
        let strict = self.config.is_strict();
        let fatal = |e: &WorkerError| strict || !e.is_recoverable();

        for errors in [&mut report.worker_errors, &mut report.launch_failures] {
            if let Some(i) = errors.iter().position(fatal) {
                return Err(errors.swap_remove(i).into());
            }
        }

        Ok(())
    }
}
