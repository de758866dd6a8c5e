//! Filepath: src/infra/reporter.rs
//! Injected reporting capability for the scan pipeline.
//!
//! Core components never log through globals; they receive a
//! `&dyn Reporter` and push warnings, info lines, and progress
//! ticks through it. The CLI forwards to `tracing` (suspending any
//! live progress bar), tests collect events in memory.

use std::path::PathBuf;
use std::sync::Mutex;

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::core::ingest::SkipReason;

/// Non-fatal conditions surfaced while scanning and ingesting
#[derive(Debug, thiserror::Error)]
pub enum ScanWarning
{
    /// Project ignore file does not exist; built-ins only
    #[error("no ignore file at {}; using built-in patterns only", path.display())]
    IgnoreFileMissing
    {
        path: PathBuf,
    },

    /// Project ignore file exists but could not be read
    #[error("could not read ignore file {}: {reason}; using built-in patterns only", path.display())]
    IgnoreFileUnreadable
    {
        path: PathBuf,
        reason: String,
    },

    /// A single ignore line failed to compile as a glob
    #[error("skipping invalid ignore pattern {pattern:?}: {reason}")]
    InvalidPattern
    {
        pattern: String,
        reason: String,
    },

    /// A directory could not be read mid-walk
    #[error("traversal error, subtree skipped: {reason}")]
    Traversal
    {
        reason: String,
    },

    /// A file was left out of the summary
    #[error("skipped {}: {reason}", path.display())]
    Skipped
    {
        path: PathBuf,
        reason: SkipReason,
    },
}

/// Sink for pipeline diagnostics. Must be shareable across ingest workers.
pub trait Reporter: Sync
{
    /// Report a non-fatal condition
    fn warn(
        &self,
        warning: &ScanWarning,
    );

    /// Operator-facing milestone
    fn info(
        &self,
        message: &str,
    );

    /// Verbose detail; ignored unless a sink cares
    fn debug(
        &self,
        _message: &str,
    )
    {
    }

    /// Ingestion progress side channel
    fn progress(
        &self,
        _completed: usize,
        _total: usize,
    )
    {
    }
}

/// Forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter
{
    fn warn(
        &self,
        warning: &ScanWarning,
    )
    {
        warn!("{warning}");
    }

    fn info(
        &self,
        message: &str,
    )
    {
        info!("{message}");
    }

    fn debug(
        &self,
        message: &str,
    )
    {
        debug!("{message}");
    }
}

/// `tracing` output routed around a live progress bar.
/// Pass `ProgressBar::hidden()` in quiet mode.
pub struct ProgressReporter
{
    bar: ProgressBar,
}

impl ProgressReporter
{
    pub fn new(bar: ProgressBar) -> Self
    {
        Self { bar }
    }

    /// Borrow the underlying bar (to restyle or finish it)
    pub fn bar(&self) -> &ProgressBar
    {
        &self.bar
    }
}

impl Reporter for ProgressReporter
{
    fn warn(
        &self,
        warning: &ScanWarning,
    )
    {
        self.bar
            .suspend(|| warn!("{warning}"));
    }

    fn info(
        &self,
        message: &str,
    )
    {
        self.bar
            .suspend(|| info!("{message}"));
    }

    fn debug(
        &self,
        message: &str,
    )
    {
        self.bar
            .suspend(|| debug!("{message}"));
    }

    fn progress(
        &self,
        completed: usize,
        total: usize,
    )
    {
        self.bar
            .set_length(total as u64);
        self.bar
            .set_position(completed as u64);
    }
}

/// Records rendered events in memory. Handy for tests and for
/// embedding the pipeline where log output is unwanted.
#[derive(Debug, Default)]
pub struct MemoryReporter
{
    warnings: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
    last_progress: Mutex<Option<(usize, usize)>>,
    ticks: Mutex<usize>,
}

impl MemoryReporter
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Rendered warning messages, in arrival order
    pub fn warnings(&self) -> Vec<String>
    {
        self.warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Info messages, in arrival order
    pub fn infos(&self) -> Vec<String>
    {
        self.infos
            .lock()
            .map(|i| i.clone())
            .unwrap_or_default()
    }

    /// Number of progress ticks received
    pub fn progress_ticks(&self) -> usize
    {
        self.ticks
            .lock()
            .map(|t| *t)
            .unwrap_or_default()
    }

    /// Highest `(completed, total)` pair seen
    pub fn last_progress(&self) -> Option<(usize, usize)>
    {
        self.last_progress
            .lock()
            .ok()
            .and_then(|p| *p)
    }
}

impl Reporter for MemoryReporter
{
    fn warn(
        &self,
        warning: &ScanWarning,
    )
    {
        if let Ok(mut w) = self
            .warnings
            .lock()
        {
            w.push(warning.to_string());
        }
    }

    fn info(
        &self,
        message: &str,
    )
    {
        if let Ok(mut i) = self
            .infos
            .lock()
        {
            i.push(message.to_string());
        }
    }

    fn progress(
        &self,
        completed: usize,
        total: usize,
    )
    {
        if let Ok(mut t) = self
            .ticks
            .lock()
        {
            *t += 1;
        }

        // Completion order is arbitrary; keep the high-water mark
        if let Ok(mut p) = self
            .last_progress
            .lock()
            && p.is_none_or(|(done, _)| completed > done)
        {
            *p = Some((completed, total));
        }
    }
}
