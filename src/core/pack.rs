//! `dctx pack`: scan, ingest in parallel, render Markdown, write.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::cli::{AppContext, PackArgs};
use crate::core::coordinator::{PackError, ProjectSummary, ScanCoordinator, default_workers, root_name};
use crate::core::ingest::{FileIngestor, IngestOptions};
use crate::core::matcher::PatternMatcher;
use crate::core::report::{MarkdownRenderer, ReportMeta, ReportRenderer, group_thousands};
use crate::core::scanner::{TreeScanner, render_tree};
use crate::infra::config::{Config, load_config};
use crate::infra::io::expand_user_path;
use crate::infra::reporter::{ProgressReporter, Reporter};

/// Effective settings: CLI flags over config over defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSettings
{
    pub output: PathBuf,
    pub workers: usize,
    pub ignore_patterns: Vec<String>,
    pub ignore_file: String,
    pub ingest: IngestOptions,
}

impl PackSettings
{
    pub fn resolve(
        args: &PackArgs,
        config: &Config,
    ) -> Self
    {
        // Config patterns first so CLI patterns can override them
        let mut ignore_patterns = config
            .ignore_patterns
            .clone();
        ignore_patterns.extend(
            args.ignore
                .iter()
                .cloned(),
        );

        let output = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output_file));

        Self {
            output: expand_user_path(&output),
            workers: args
                .jobs
                .or(config.workers)
                .unwrap_or_else(default_workers)
                .max(1),
            ignore_patterns,
            ignore_file: args
                .ignore_file
                .clone()
                .unwrap_or_else(|| {
                    config
                        .ignore_file
                        .clone()
                }),
            ingest: IngestOptions {
                max_file_size: args
                    .max_file_size
                    .unwrap_or(config.max_file_size),
                tail_lines: args
                    .tail_lines
                    .unwrap_or(config.tail_lines),
            },
        }
    }
}

pub fn run(
    args: PackArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let started = Instant::now();

    // Fatal preconditions first: root must exist, output must be writable
    let root = ScanCoordinator::resolve_root(&expand_user_path(&args.path))?;
    let config = load_config(&root)?;
    let settings = PackSettings::resolve(&args, &config);
    ensure_writable(&settings.output)?;

    let reporter = ProgressReporter::new(progress_bar(ctx));
    reporter
        .bar()
        .set_message("scanning");

    let matcher = PatternMatcher::for_root(
        &root,
        &settings.ignore_patterns,
        &settings.ignore_file,
        &reporter,
    )?;
    let scanner = TreeScanner::new(matcher);

    if ctx.dry_run
    {
        let entries = scanner.scan(&root, &reporter);
        reporter
            .bar()
            .finish_and_clear();

        if !ctx.quiet
        {
            let rels: Vec<&str> = entries
                .iter()
                .map(|e| {
                    e.relative
                        .as_str()
                })
                .collect();

            println!("{}", paint_yellow("DRY RUN: Would pack:", ctx));
            println!("  Root: {}", root.display());
            println!("  Output: {}", settings.output.display());
            println!("  Workers: {}", settings.workers);
            println!("  Extra ignore patterns: {:?}", settings.ignore_patterns);
            println!("  Files: {}", entries.len());
            println!("{}", render_tree(&rels, &root_name(&root)));
        }
        return Ok(());
    }

    let coordinator = ScanCoordinator::new(scanner, FileIngestor::new(settings.ingest))
        .with_workers(settings.workers)
        .with_output_destination(&settings.output);

    let summary = coordinator.run(&root, &reporter)?;
    reporter
        .bar()
        .finish_and_clear();

    let document = MarkdownRenderer.render(&summary, &ReportMeta::now(root_name(&root)));

    fs::write(&settings.output, document).map_err(|source| PackError::OutputNotWritable {
        path: settings
            .output
            .clone(),
        source,
    })?;

    reporter.info(&format!("Output written to {}", settings.output.display()));

    let elapsed = started.elapsed();

    if args.json
    {
        println!("{}", json_stats(&root, &settings.output, elapsed, &summary)?);
    }
    else if !ctx.quiet
    {
        println!(
            "{} Output written to: {}",
            paint_green("✓", ctx),
            settings
                .output
                .display()
        );
        println!(
            "  Stats: {} files, {} lines, ~{} tokens",
            summary.total_files,
            summary.total_lines,
            group_thousands(summary.total_tokens)
        );
        println!("  Time taken: {elapsed:.2?}");
    }

    Ok(())
}

/// `--json` payload. Paths are rendered lossily so odd file names
/// never abort the run after the report is written.
pub fn json_stats(
    root: &Path,
    output: &Path,
    elapsed: Duration,
    summary: &ProjectSummary,
) -> Result<String>
{
    let stats = serde_json::json!({
        "root": root.display().to_string(),
        "output": output.display().to_string(),
        "elapsed_ms": elapsed.as_millis() as u64,
        "summary": serde_json::to_value(summary)?,
    });

    Ok(serde_json::to_string(&stats)?)
}

/// Fail before scanning when the report could not be written
pub fn ensure_writable(output: &Path) -> Result<(), PackError>
{
    let not_writable = |source: io::Error| PackError::OutputNotWritable {
        path: output.to_path_buf(),
        source,
    };

    let parent = match output.parent()
    {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let dir = fs::metadata(parent).map_err(not_writable)?;
    if !dir.is_dir()
    {
        return Err(not_writable(io::Error::new(
            ErrorKind::NotADirectory,
            format!("{} is not a directory", parent.display()),
        )));
    }

    if let Ok(meta) = fs::metadata(output)
    {
        if meta.is_dir()
        {
            return Err(not_writable(io::Error::new(
                ErrorKind::IsADirectory,
                "destination is a directory",
            )));
        }

        if meta
            .permissions()
            .readonly()
        {
            return Err(not_writable(io::Error::new(
                ErrorKind::PermissionDenied,
                "destination is read-only",
            )));
        }
    }

    Ok(())
}

fn progress_bar(ctx: &AppContext) -> ProgressBar
{
    if ctx.quiet
    {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn paint_green(
    s: &str,
    ctx: &AppContext,
) -> String
{
    if ctx.no_color { s.to_string() } else { s.green().to_string() }
}

fn paint_yellow(
    s: &str,
    ctx: &AppContext,
) -> String
{
    if ctx.no_color { s.to_string() } else { s.yellow().to_string() }
}

#[cfg(test)]
mod tests
{
    use tempfile::TempDir;

    use super::*;

    fn args() -> PackArgs
    {
        PackArgs {
            path: PathBuf::from("."),
            output: None,
            jobs: None,
            ignore: vec!["*.snap".to_string()],
            ignore_file: None,
            max_file_size: None,
            tail_lines: Some(50),
            json: false,
        }
    }

    #[test]
    fn cli_flags_override_config()
    {
        let config = Config {
            ignore_patterns: vec!["tmp/".to_string()],
            workers: Some(3),
            ..Config::default()
        };

        let s = PackSettings::resolve(&args(), &config);

        assert_eq!(s.ignore_patterns, vec!["tmp/".to_string(), "*.snap".to_string()]);
        assert_eq!(s.workers, 3);
        assert_eq!(s.output, PathBuf::from("codebase_context.md"));
        assert_eq!(s.ingest.tail_lines, 50);
        assert_eq!(s.ingest.max_file_size, 1_000_000);
        assert_eq!(s.ignore_file, ".gitignore");

        let mut a = args();
        a.jobs = Some(0);
        assert_eq!(PackSettings::resolve(&a, &config).workers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn json_stats_survive_non_utf8_names() -> anyhow::Result<()>
    {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        use crate::infra::reporter::MemoryReporter;

        let tmp = TempDir::new()?;
        let root = tmp.path();
        fs::write(root.join("a.txt"), "a\n")?;
        fs::write(root.join(OsStr::from_bytes(b"bad\xffname.txt")), "b\n")?;

        let reporter = MemoryReporter::new();
        let matcher = PatternMatcher::for_root(root, &[], ".gitignore", &reporter)?;
        let summary = ScanCoordinator::new(TreeScanner::new(matcher), FileIngestor::default())
            .with_workers(1)
            .run(root, &reporter)?;
        assert_eq!(summary.total_files, 2);

        let out = root.join(OsStr::from_bytes(b"out\xfe.md"));
        let text = json_stats(root, &out, Duration::from_millis(5), &summary)?;
        let v: serde_json::Value = serde_json::from_str(&text)?;

        assert_eq!(v["summary"]["total_files"], 2);
        assert_eq!(v["elapsed_ms"], 5);
        assert!(
            v["summary"]["artifacts"][1]["path"]
                .as_str()
                .is_some_and(|p| p.ends_with("bad\u{FFFD}name.txt"))
        );
        assert!(
            v["output"]
                .as_str()
                .is_some_and(|p| p.ends_with("out\u{FFFD}.md"))
        );
        Ok(())
    }

    #[test]
    fn writable_checks() -> anyhow::Result<()>
    {
        let tmp = TempDir::new()?;

        assert!(ensure_writable(&tmp.path().join("out.md")).is_ok());
        assert!(ensure_writable(&tmp.path().join("missing/out.md")).is_err());
        assert!(ensure_writable(tmp.path()).is_err());
        Ok(())
    }
}
