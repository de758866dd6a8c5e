//! Filepath: src/core/coordinator.rs
//! Scan → fan-out ingest → aggregate.
//!
//! The walk runs on the calling thread and yields a sorted path list.
//! Ingestion is a parallel map on a dedicated rayon pool; workers share
//! only the read-only root and options. The final artifact list is
//! re-sorted so worker completion order never leaks into the result.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::core::ingest::{FileArtifact, FileIngestor};
use crate::core::scanner::{ScanEntry, TreeScanner, render_tree};
use crate::infra::io::resolve_destination;
use crate::infra::reporter::Reporter;

/// Worker count when available parallelism cannot be determined
pub const FALLBACK_WORKERS: usize = 4;

/// Fatal, run-level failures
#[derive(Debug, thiserror::Error)]
pub enum PackError
{
    #[error("path does not exist: {}", path.display())]
    RootMissing
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", path.display())]
    RootNotDirectory
    {
        path: PathBuf,
    },

    #[error("output destination is not writable: {}", path.display())]
    OutputNotWritable
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregated result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary
{
    pub total_files: usize,
    pub total_lines: usize,
    pub total_tokens: usize,

    #[serde(skip)]
    pub tree: String,

    /// Ordered by relative path
    pub artifacts: Vec<FileArtifact>,
}

impl ProjectSummary
{
    /// Sort artifacts and compute totals
    pub fn from_artifacts(
        tree: String,
        mut artifacts: Vec<FileArtifact>,
    ) -> Self
    {
        artifacts.sort_by(|a, b| {
            a.relative_path
                .cmp(&b.relative_path)
        });

        Self {
            total_files: artifacts.len(),
            total_lines: artifacts
                .iter()
                .map(|a| a.lines)
                .sum(),
            total_tokens: artifacts
                .iter()
                .map(|a| a.token_estimate)
                .sum(),
            tree,
            artifacts,
        }
    }
}

/// Available processing units, or `FALLBACK_WORKERS`
pub fn default_workers() -> usize
{
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_WORKERS)
}

/// Display name for a root directory (last component)
pub fn root_name(root: &Path) -> String
{
    root.file_name()
        .unwrap_or(root.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Orchestrates one scan-filter-read run
#[derive(Debug, Clone)]
pub struct ScanCoordinator
{
    scanner: TreeScanner,
    ingestor: FileIngestor,
    workers: usize,

    /// Resolved output path to keep out of the ingest set
    destination: Option<PathBuf>,
}

impl ScanCoordinator
{
    pub fn new(
        scanner: TreeScanner,
        ingestor: FileIngestor,
    ) -> Self
    {
        Self {
            scanner,
            ingestor,
            workers: default_workers(),
            destination: None,
        }
    }

    /// Bound the ingest pool (minimum 1)
    pub fn with_workers(
        mut self,
        workers: usize,
    ) -> Self
    {
        self.workers = workers.max(1);
        self
    }

    /// Never ingest the file the report will be written to
    pub fn with_output_destination(
        mut self,
        path: &Path,
    ) -> Self
    {
        self.destination = Some(resolve_destination(path));
        self
    }

    pub fn workers(&self) -> usize
    {
        self.workers
    }

    /// Canonicalize and validate `root`
    pub fn resolve_root(root: &Path) -> Result<PathBuf, PackError>
    {
        let resolved = dunce::canonicalize(root).map_err(|source| PackError::RootMissing {
            path: root.to_path_buf(),
            source,
        })?;

        if !resolved.is_dir()
        {
            return Err(PackError::RootNotDirectory { path: resolved });
        }

        Ok(resolved)
    }

    /// Run the full pipeline over `root`
    pub fn run(
        &self,
        root: &Path,
        reporter: &dyn Reporter,
    ) -> Result<ProjectSummary>
    {
        let root = Self::resolve_root(root)?;

        // Step 1: sequential walk + tree
        let entries = self
            .scanner
            .scan(&root, reporter);
        let rels: Vec<&str> = entries
            .iter()
            .map(|e| {
                e.relative
                    .as_str()
            })
            .collect();
        let tree = render_tree(&rels, &root_name(&root));

        // Step 2: drop the report's own destination and the ignore file
        let inputs: Vec<&ScanEntry> = entries
            .iter()
            .filter(|e| !self.is_run_input(&e.path))
            .collect();

        reporter.info(&format!(
            "Found {} files; ingesting with {} workers",
            inputs.len(),
            self.workers
        ));

        // Step 3: bounded fan-out
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("deepctx-ingest-{i}"))
            .build()
            .context("Failed to build ingest worker pool")?;

        let total = inputs.len();
        let completed = AtomicUsize::new(0);

        let artifacts: Vec<FileArtifact> = pool.install(|| {
            inputs
                .par_iter()
                .filter_map(|entry| {
                    let artifact = self
                        .ingestor
                        .ingest(&entry.path, &root, reporter);

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    reporter.progress(done, total);

                    artifact
                })
                .collect()
        });

        // Step 4: deterministic aggregate
        let summary = ProjectSummary::from_artifacts(tree, artifacts);

        reporter.info(&format!(
            "Ingested {} of {} files ({} skipped)",
            summary.total_files,
            total,
            total - summary.total_files
        ));

        Ok(summary)
    }

    /// Walk paths hang off the canonical root, so plain equality suffices
    fn is_run_input(
        &self,
        path: &Path,
    ) -> bool
    {
        self.destination
            .as_deref()
            == Some(path)
            || self
                .scanner
                .matcher()
                .source()
                == Some(path)
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::core::ingest::IngestOptions;
    use crate::core::matcher::PatternMatcher;
    use crate::infra::reporter::MemoryReporter;

    fn coordinator(
        root: &Path,
        reporter: &MemoryReporter,
    ) -> ScanCoordinator
    {
        let matcher = PatternMatcher::for_root(root, &[], ".gitignore", reporter).expect("matcher");

        ScanCoordinator::new(TreeScanner::new(matcher), FileIngestor::new(IngestOptions::default()))
    }

    #[test]
    fn gitignored_dir_and_ignore_file_stay_out()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();

        let go: Vec<String> = (1..=10)
            .map(|i| format!("line {i}"))
            .collect();
        fs::write(root.join("src/main.go"), go.join("\n")).unwrap();
        fs::write(root.join(".gitignore"), "build/\n").unwrap();
        fs::write(root.join("build/output.bin"), [0u8, 1, 2]).unwrap();

        let reporter = MemoryReporter::new();
        let summary = coordinator(root, &reporter)
            .run(root, &reporter)
            .unwrap();

        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.artifacts[0].relative_path, "src/main.go");
        assert_eq!(summary.artifacts[0].lines, 10);
        assert_eq!(summary.artifacts[0].language, "go");
        assert!(summary.tree.contains("src/"));
        assert!(summary.tree.contains("main.go"));
        assert!(!summary.tree.contains("build"));
    }

    #[test]
    fn empty_file_is_not_counted()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("empty.txt"), "").unwrap();
        fs::write(root.join("a.txt"), "hello").unwrap();

        let reporter = MemoryReporter::new();
        let summary = coordinator(root, &reporter)
            .run(root, &reporter)
            .unwrap();

        let rels: Vec<&str> = summary
            .artifacts
            .iter()
            .map(|a| a.relative_path.as_str())
            .collect();

        assert_eq!(rels, vec!["a.txt"]);
        assert_eq!(summary.total_files, 1);
        assert!(
            reporter
                .warnings()
                .iter()
                .any(|w| w.contains("empty.txt"))
        );
    }

    #[test]
    fn worker_count_does_not_change_order()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        for i in 0..100
        {
            let dir = root.join(format!("d{}", i % 7));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("f{i}.txt")), format!("file {i}\n")).unwrap();
        }

        let reporter = MemoryReporter::new();
        let four = coordinator(root, &reporter)
            .with_workers(4)
            .run(root, &reporter)
            .unwrap();
        let one = coordinator(root, &reporter)
            .with_workers(1)
            .run(root, &reporter)
            .unwrap();

        assert_eq!(four.total_files, 100);
        assert_eq!(four, one);

        let mut sorted = four
            .artifacts
            .iter()
            .map(|a| a.relative_path.clone())
            .collect::<Vec<_>>();
        sorted.sort();
        assert_eq!(
            sorted,
            four.artifacts
                .iter()
                .map(|a| a.relative_path.clone())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn output_file_is_excluded()
    {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("keep.rs"), "fn main() {}\n").unwrap();
        fs::write(root.join("codebase_context.md"), "# old report\n").unwrap();

        let reporter = MemoryReporter::new();
        let summary = coordinator(root, &reporter)
            .with_output_destination(&root.join("codebase_context.md"))
            .run(root, &reporter)
            .unwrap();

        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.artifacts[0].relative_path, "keep.rs");
        assert_eq!(reporter.last_progress(), Some((1, 1)));
    }

    #[test]
    fn workers_clamp_and_root_checks()
    {
        let tmp = TempDir::new().unwrap();
        let reporter = MemoryReporter::new();

        assert_eq!(
            coordinator(tmp.path(), &reporter)
                .with_workers(0)
                .workers(),
            1
        );
        assert!(default_workers() >= 1);

        let missing = ScanCoordinator::resolve_root(&tmp.path().join("nope"));
        assert!(matches!(missing, Err(PackError::RootMissing { .. })));

        let file = tmp.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            ScanCoordinator::resolve_root(&file),
            Err(PackError::RootNotDirectory { .. })
        ));
    }
}
