//! Configuration types for defrag
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Policies for duplicate indices, unreadable subtrees and chunk copying

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::{Path, PathBuf};

/// One-line usage shown on argument errors
pub const USAGE: &str = "USAGE: defrag <INPUT_DIR> <OUTPUT_FILE> [OPTIONS]";

/// Reassemble a file from numbered chunks scattered across a directory tree
#[derive(Parser, Debug, Clone)]
#[command(
    name = "defrag",
    version,
    about = "Reassemble a file from numbered chunks scattered across a directory tree",
    long_about = "Walks every top-level subdirectory of INPUT_DIR on its own thread, collects files \
                  whose names are non-negative integers, and concatenates them in index order \
                  into OUTPUT_FILE.\n\n\
                  Files with other names are ignored. Symbolic links are never followed.",
    after_help = "EXAMPLES:\n    \
        defrag ./dirs music.mp3\n    \
        defrag ./dirs out.bin --strict --reject-duplicates\n    \
        defrag ./dirs out.bin --exclude '\\.snapshot' --copy-mode streamed"
)]
pub struct CliArgs {
    /// Root directory holding the chunk tree
    #[arg(value_name = "INPUT_DIR")]
    pub input: PathBuf,

    /// File to write the reassembled output to (created or truncated)
    #[arg(value_name = "OUTPUT_FILE")]
    pub output: PathBuf,

    /// Fail the run when a directory cannot be read or a collector cannot start
    #[arg(long)]
    pub strict: bool,

    /// Fail the run when two files carry the same index
    #[arg(long)]
    pub reject_duplicates: bool,

    /// How chunk contents are copied to the output
    #[arg(long, value_enum, default_value_t = CopyMode::Buffered)]
    pub copy_mode: CopyMode,

    /// Largest chunk index accepted (unlimited if not set)
    #[arg(long, value_name = "NUM")]
    pub max_index: Option<u64>,

    /// Maximum directory depth below INPUT_DIR (unlimited if not set)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub max_depth: Option<usize>,

    /// Exclude paths matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Quiet mode - suppress progress and summary output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// What happens when a second file claims an occupied index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the most recently registered file
    #[default]
    LastWins,
    /// Fail the run
    Reject,
}

/// What happens when a directory cannot be opened or read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtreePolicy {
    /// Warn and keep walking elsewhere
    #[default]
    Lenient,
    /// Fail the run
    Strict,
}

/// How chunk contents are moved into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CopyMode {
    /// Read each chunk fully into memory, then write it
    #[default]
    Buffered,
    /// Stream each chunk through a fixed-size buffer
    Streamed,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct DefragConfig {
    /// Root directory holding the chunk tree
    pub input_dir: PathBuf,

    /// Output file path
    pub output_path: PathBuf,

    /// Policy for unreadable directories
    pub subtree_policy: SubtreePolicy,

    /// Policy for colliding indices
    pub duplicate_policy: DuplicatePolicy,

    /// Chunk copy strategy
    pub copy_mode: CopyMode,

    /// Largest accepted chunk index
    pub max_index: Option<u64>,

    /// Maximum traversal depth below the input root
    pub max_depth: Option<usize>,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Show header, spinner and summary
    pub show_progress: bool,
}

impl DefragConfig {
    /// Configuration with default policies and no progress output
    pub fn new(input_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_path: output_path.into(),
            subtree_policy: SubtreePolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            copy_mode: CopyMode::default(),
            max_index: None,
            max_depth: None,
            exclude_patterns: Vec::new(),
            show_progress: false,
        }
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.output.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }

        if args.output.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.output.clone(),
                reason: "Path is a directory".to_string(),
            });
        }

        Ok(Self {
            input_dir: args.input,
            output_path: args.output,
            subtree_policy: if args.strict {
                SubtreePolicy::Strict
            } else {
                SubtreePolicy::Lenient
            },
            duplicate_policy: if args.reject_duplicates {
                DuplicatePolicy::Reject
            } else {
                DuplicatePolicy::LastWins
            },
            copy_mode: args.copy_mode,
            max_index: args.max_index,
            max_depth: args.max_depth,
            exclude_patterns,
            show_progress: !args.quiet,
        })
    }

    /// Check if a path should be excluded
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude_patterns.is_empty() {
            return false;
        }
        let path = path.to_string_lossy();
        self.exclude_patterns.iter().any(|re| re.is_match(&path))
    }

    /// Check whether a directory at `depth` below the input root may be entered
    pub fn allows_depth(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }

    pub fn is_strict(&self) -> bool {
        self.subtree_policy == SubtreePolicy::Strict
    }
}
