//! defrag - Parallel Chunk Reassembler
//!
//! Rebuilds a file that was split into numbered chunks and scattered across
//! a directory tree. Every file whose name is a non-negative integer is a
//! chunk; its name is its position in the output. Everything else is noise.
//!
//! # Features
//!
//! - **Parallel Collection**: One collector thread per top-level
//!   subdirectory, each walking its subtree depth-first.
//!
//! - **Index-Addressed Registry**: Open chunk handles land in a single
//!   mutex-guarded table, so discovery order never affects output order.
//!
//! - **Gap Detection**: A missing index fails the run instead of producing a
//!   short or shifted file.
//!
//! - **Configurable Hardening**: Strict mode for unreadable subtrees and a
//!   reject policy for duplicate indices.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Input Root                               │
//! │            a/        b/        c/   ...    n/                    │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │ read_dir (no symlinks)
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Collector Threads                            │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐      │
//! │  │  a/**   │  │  b/**   │  │  c/**   │  ...    │  n/**   │      │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘      │
//! │       └────────────┼────────────┼────────────────────┘           │
//! │                    ▼            ▼                                │
//! │            ┌──────────────────────────┐                          │
//! │            │     ChunkRegistry        │                          │
//! │            │  Mutex<Vec<Option<..>>>  │                          │
//! │            └──────────────────────────┘                          │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │ barrier (join all)
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │  Assembler: 0, 1, 2, ... │
//!                    └────────────┬─────────────┘
//!                                 ▼
//!                         ┌──────────────┐
//!                         │ Output file  │
//!                         └──────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Reassemble
//! defrag ./dirs music.mp3
//!
//! # Fail on unreadable directories and duplicate indices
//! defrag ./dirs music.mp3 --strict --reject-duplicates
//! ```

pub mod assemble;
pub mod chunk;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod progress;
pub mod registry;
pub mod walker;

pub use assemble::{Assembler, AssemblyStats};
pub use chunk::{parse_chunk_index, ChunkHandle, EntryKind};
pub use config::{CliArgs, CopyMode, DefragConfig, DuplicatePolicy, SubtreePolicy};
pub use coordinator::{DefragResult, Defragmenter};
pub use error::{ChunkError, DefragError, Result, WorkerError};
pub use registry::ChunkRegistry;
