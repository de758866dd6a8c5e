//! **deepctx** - Pack a codebase into one Markdown context document for LLMs
//!
//! Gitignore-aware scanning with directory pruning, parallel ingestion on a
//! bounded worker pool, and tail truncation of oversized files.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - match, scan, ingest, coordinate, render
pub mod core {
    /// Gitignore-style rule parsing and path matching with a denylist fast path
    pub mod matcher;
    pub use matcher::{DEFAULT_IGNORE_PATTERNS, IgnoreRule, PatternMatcher};

    /// Pruning directory walk and tree rendering
    pub mod scanner;
    pub use scanner::{EMPTY_TREE, ScanEntry, TreeScanner, render_tree};

    /// Per-file reading, language detection and tail truncation
    pub mod ingest;
    pub use ingest::{FileArtifact, FileIngestor, IngestOptions, SkipReason};

    /// Bounded worker pool and deterministic aggregation
    pub mod coordinator;
    pub use coordinator::{PackError, ProjectSummary, ScanCoordinator};

    /// Markdown report rendering
    pub mod report;
    pub use report::{MarkdownRenderer, ReportMeta, ReportRenderer};

    /// `pack` command
    pub mod pack;
    pub use pack::run as pack_run;

    /// `tree` command
    pub mod tree;
    pub use tree::run as tree_run;
}

/// Infrastructure - configuration, I/O, logging and diagnostics
pub mod infra {
    /// Layered configuration (file + DEEPCTX_* environment)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Memory-mapped tail reads and path helpers
    pub mod io;
    pub use io::{read_tail_lines, relative_posix};

    /// tracing subscriber setup
    pub mod logging;
    pub use logging::init_tracing;

    /// Warning/progress sink shared by the scan and ingest stages
    pub mod reporter;
    pub use reporter::{MemoryReporter, ProgressReporter, Reporter, ScanWarning, TracingReporter};
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{pack_run, tree_run};
pub use infra::{Config, load_config};

// Core types for external consumers
pub use core::{
    FileArtifact, FileIngestor, IgnoreRule, PatternMatcher, ProjectSummary, ScanCoordinator, ScanEntry,
    TreeScanner, render_tree,
};
pub use infra::{MemoryReporter, Reporter, ScanWarning};
