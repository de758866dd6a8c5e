//! Filepath: src/core/ingest.rs
//! Per-file ingestion: stat, read, classify, count.
//!
//! - Files at or below `max_file_size` must be valid UTF-8 or are skipped.
//! - Larger files keep only their last `tail_lines` lines (memory-mapped,
//!   lossy decode) behind a warning preamble and are flagged truncated.
//! - `lines` is newline count + 1; `token_estimate` is chars / 4.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::infra::io::{read_tail_lines, relative_posix};
use crate::infra::reporter::{Reporter, ScanWarning};

/// Files above this many bytes are tail-truncated
pub const MAX_FILE_SIZE_BYTES: u64 = 1_000_000;

/// Lines kept from an oversized file
pub const TAIL_LINES: usize = 1_000;

/// Rough characters-per-token ratio for the estimate
pub const CHARS_PER_TOKEN: usize = 4;

/// Why a file produced no artifact
#[derive(Debug, thiserror::Error)]
pub enum SkipReason
{
    #[error("file is empty")]
    Empty,

    #[error("not valid UTF-8 text (likely binary)")]
    Binary,

    #[error("not a regular file")]
    NotAFile,

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Processed representation of one included file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileArtifact
{
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    pub relative_path: String,

    /// Lowercased, without the dot; empty when absent
    pub extension: String,
    pub language: &'static str,

    /// On-disk size in bytes (before any truncation)
    pub size: u64,
    pub lines: usize,

    #[serde(skip)]
    pub content: String,
    pub token_estimate: usize,
    pub is_truncated: bool,
}

/// Size limits applied while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions
{
    pub max_file_size: u64,
    pub tail_lines: usize,
}

impl Default for IngestOptions
{
    fn default() -> Self
    {
        Self {
            max_file_size: MAX_FILE_SIZE_BYTES,
            tail_lines: TAIL_LINES,
        }
    }
}

/// Stateless file reader; safe to share across workers
#[derive(Debug, Clone, Default)]
pub struct FileIngestor
{
    options: IngestOptions,
}

impl FileIngestor
{
    pub fn new(options: IngestOptions) -> Self
    {
        Self { options }
    }

    pub fn options(&self) -> IngestOptions
    {
        self.options
    }

    /// Ingest `path`, reporting any skip as a warning
    pub fn ingest(
        &self,
        path: &Path,
        root: &Path,
        reporter: &dyn Reporter,
    ) -> Option<FileArtifact>
    {
        match self.try_ingest(path, root)
        {
            Ok(artifact) => Some(artifact),
            Err(reason) =>
            {
                reporter.warn(&ScanWarning::Skipped {
                    path: path.to_path_buf(),
                    reason,
                });
                None
            }
        }
    }

    /// Ingest `path`, returning why it was skipped on failure
    pub fn try_ingest(
        &self,
        path: &Path,
        root: &Path,
    ) -> Result<FileArtifact, SkipReason>
    {
        let meta = fs::metadata(path)?;

        if !meta.is_file()
        {
            return Err(SkipReason::NotAFile);
        }

        let size = meta.len();

        if size == 0
        {
            return Err(SkipReason::Empty);
        }

        let (content, is_truncated) = if size > self.options.max_file_size
        {
            let tail = read_tail_lines(path, self.options.tail_lines)?;
            (format!("{}{tail}", truncation_notice(size, self.options.tail_lines)), true)
        }
        else
        {
            let bytes = fs::read(path)?;
            let text = String::from_utf8(bytes).map_err(|_| SkipReason::Binary)?;
            (text, false)
        };

        // Emptied between stat and read
        if content.is_empty()
        {
            return Err(SkipReason::Empty);
        }

        let relative_path = relative_posix(root, path)
            .unwrap_or_else(|| {
                path.to_string_lossy()
                    .into_owned()
            });

        Ok(FileArtifact {
            path: path.to_path_buf(),
            relative_path,
            extension: extension_of(path),
            language: detect_language(path),
            size,
            lines: count_lines(&content),
            token_estimate: estimate_tokens(&content),
            content,
            is_truncated,
        })
    }
}

/// Paths need not be UTF-8; JSON strings must be
fn serialize_lossy<P, S>(
    path: &P,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(
        &path
            .as_ref()
            .to_string_lossy(),
    )
}

/// Preamble placed before a truncated tail
pub fn truncation_notice(
    size: u64,
    tail_lines: usize,
) -> String
{
    format!(
        "<!-- WARNING: File too large ({size} bytes). Truncated to last {tail_lines} lines for context. -->\n\n"
    )
}

/// Newline-delimited segments; a missing trailing newline still counts
pub fn count_lines(content: &str) -> usize
{
    bytecount::count(content.as_bytes(), b'\n') + 1
}

/// Approximate token count from character length
pub fn estimate_tokens(content: &str) -> usize
{
    content
        .chars()
        .count()
        / CHARS_PER_TOKEN
}

fn extension_of(path: &Path) -> String
{
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Language tag from base name, then lowercase extension; `text` otherwise
pub fn detect_language(path: &Path) -> &'static str
{
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    match name.as_str()
    {
        "dockerfile" => return "dockerfile",
        "makefile" => return "makefile",
        _ =>
        {}
    }

    match extension_of(path).as_str()
    {
        // Python
        "py" | "pyi" | "pyx" => "python",
        "ipynb" => "json",
        // Web
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "vue" => "vue",
        "svelte" => "svelte",
        // JVM
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "gradle" => "groovy",
        // Native
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "rs" => "rust",
        "go" => "go",
        // Scripting
        "sh" | "bash" => "bash",
        "zsh" => "zsh",
        "lua" => "lua",
        "rb" => "ruby",
        "php" => "php",
        // Config / data
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "sql" => "sql",
        "md" => "markdown",
        "tf" => "hcl",
        _ => "text",
    }
}
