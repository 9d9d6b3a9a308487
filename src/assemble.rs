//! Sequential assembler
//!
//! Runs after the collection barrier, on a single thread. Drains the registry
//! slots in ascending index order and appends each chunk to the output,
//! closing every handle once it has been copied.

use crate::chunk::ChunkHandle;
use crate::config::CopyMode;
use crate::error::{ChunkError, Result};
use std::io::{self, Read, Write};
use tracing::{debug, trace};

/// Read size for streamed copies
const STREAM_BUF_SIZE: usize = 64 * 1024;

/// What the assembler wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Chunks copied
    pub chunks: u64,

    /// Bytes written to the output
    pub bytes: u64,
}

/// Copies registry slots into an output stream in index order
#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler {
    copy_mode: CopyMode,
}

impl Assembler {
    pub fn new(copy_mode: CopyMode) -> Self {
        Self { copy_mode }
    }

    /// Write every chunk in `slots` to `out`
    ///
    /// The slot vector is checked for gaps before anything is written: a
    /// missing index yields [`ChunkError::MissingChunk`] and leaves `out`
    /// untouched.
    pub fn assemble<W: Write>(
        &self,
        slots: Vec<Option<ChunkHandle>>,
        out: &mut W,
    ) -> Result<AssemblyStats> {
        if let Some(index) = slots.iter().position(Option::is_none) {
            return Err(ChunkError::MissingChunk {
                index,
                expected: slots.len(),
            }
            .into());
        }

        let mut stats = AssemblyStats::default();
        let mut buf = Vec::new();

        for handle in slots.into_iter().flatten() {
            let (index, path, mut file) = handle.into_parts();
            let read_failed = |e: io::Error| ChunkError::ReadFailed {
                index,
                path: path.clone(),
                reason: e.to_string(),
            };

            let written = match self.copy_mode {
                CopyMode::Buffered => {
                    buf.clear();
                    file.read_to_end(&mut buf).map_err(read_failed)?;
                    out.write_all(&buf)?;
                    buf.len() as u64
                }
                CopyMode::Streamed => {
                    buf.resize(STREAM_BUF_SIZE, 0);
                    let mut total = 0u64;
                    loop {
                        let n = match file.read(&mut buf) {
                            Ok(0) => break,
                            Ok(n) => n,
                            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                            Err(e) => return Err(read_failed(e).into()),
                        };
                        out.write_all(&buf[..n])?;
                        total += n as u64;
                    }
                    total
                }
            };

            trace!(index, bytes = written, "Chunk written");
            stats.chunks += 1;
            stats.bytes += written;
            // file dropped here, closing the chunk
        }

        out.flush()?;
        debug!(chunks = stats.chunks, bytes = stats.bytes, "Assembly finished");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DefragError;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn slots(dir: &Path, chunks: &[Option<&str>]) -> Vec<Option<ChunkHandle>> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, data)| {
                data.map(|bytes| {
                    let path = dir.join(i.to_string());
                    fs::write(&path, bytes).unwrap();
                    ChunkHandle::open(i as u64, path).unwrap()
                })
            })
            .collect()
    }

    #[test]
    fn test_assembles_in_index_order() {
        let dir = tempdir().unwrap();
        let slots = slots(dir.path(), &[Some("AA"), Some("BB"), Some(""), Some("CC")]);

        let mut out = Vec::new();
        let stats = Assembler::default().assemble(slots, &mut out).unwrap();
        assert_eq!(out, b"AABBCC");
        assert_eq!(stats, AssemblyStats { chunks: 4, bytes: 6 });
    }

    #[test]
    fn test_streamed_matches_buffered() {
        let dir = tempdir().unwrap();
        let big = "z".repeat(256 * 1024 + 17);
        let chunks = [Some("head"), Some(big.as_str()), Some("tail")];

        let mut buffered = Vec::new();
        Assembler::new(CopyMode::Buffered)
            .assemble(slots(dir.path(), &chunks), &mut buffered)
            .unwrap();

        let mut streamed = Vec::new();
        Assembler::new(CopyMode::Streamed)
            .assemble(slots(dir.path(), &chunks), &mut streamed)
            .unwrap();

        assert_eq!(buffered, streamed);
        assert_eq!(buffered.len(), 8 + big.len());
    }

    #[test]
    fn test_gap_is_fatal_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let slots = slots(dir.path(), &[Some("AA"), None, Some("CC")]);

        let mut out = Vec::new();
        let err = Assembler::default().assemble(slots, &mut out).unwrap_err();
        assert!(matches!(
            err,
            DefragError::Chunk(ChunkError::MissingChunk {
                index: 1,
                expected: 3
            })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_registry() {
        let mut out = Vec::new();
        let stats = Assembler::default().assemble(Vec::new(), &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(stats, AssemblyStats::default());
    }
}
