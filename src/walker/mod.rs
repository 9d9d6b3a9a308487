//! Parallel chunk collection
//!
//! One collector thread per top-level subdirectory of the input root. Each
//! collector walks its subtree depth-first and registers chunk files in the
//! shared registry; the dispatcher joins them all before assembly starts.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │       Dispatcher        │
//!                     │  - list top-level dirs  │
//!                     │  - spawn + join         │
//!                     └───────────┬─────────────┘
//!                                 │
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │Collector 0│             │Collector 1│             │Collector N│
//! │  dir a/   │             │  dir b/   │             │  dir n/   │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                     ┌─────────────────────────┐
//!                     │  ChunkRegistry (Mutex)  │
//!                     └─────────────────────────┘
//! ```

pub mod collector;
pub mod dispatch;

pub use collector::{CollectSummary, Collector, CollectorStats};
pub use dispatch::{top_level_dirs, CollectProgress, DispatchReport, Dispatcher, Worker};
