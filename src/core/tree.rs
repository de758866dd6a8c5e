//! Filepath: src/core/tree.rs
//! `dctx tree`: print the filtered project tree without reading files.
//!
//! Uses the same matcher and scanner as `pack`, so the output is exactly
//! the structure section a report would contain. Directories are
//! colored blue, files by language (unless --no-color).

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::{AppContext, TreeArgs};
use crate::core::coordinator::{ScanCoordinator, root_name};
use crate::core::ingest::detect_language;
use crate::core::matcher::PatternMatcher;
use crate::core::scanner::{TreeScanner, render_tree};
use crate::infra::config::load_config;
use crate::infra::io::expand_user_path;
use crate::infra::reporter::TracingReporter;

pub fn run(args: TreeArgs, ctx: &AppContext) -> Result<()> {
    let root = ScanCoordinator::resolve_root(&expand_user_path(&args.path))?;
    let config = load_config(&root)?;

    // Combine config ignore patterns with CLI args
    let mut ignore_patterns = config.ignore_patterns.clone();
    ignore_patterns.extend(args.ignore);
    let ignore_file = args.ignore_file.unwrap_or(config.ignore_file);

    if ctx.dry_run {
        if !ctx.quiet {
            let banner = "DRY RUN: Would scan:";
            if ctx.no_color {
                println!("{banner}");
            } else {
                println!("{}", banner.yellow());
            }
            println!("  Root: {}", root.display());
            println!("  Ignore file: {ignore_file}");
            println!("  Ignore patterns: {:?}", ignore_patterns);
        }
        return Ok(());
    }

    let reporter = TracingReporter;
    let matcher = PatternMatcher::for_root(&root, &ignore_patterns, &ignore_file, &reporter)?;
    let entries = TreeScanner::new(matcher).scan(&root, &reporter);

    let rels: Vec<&str> = entries.iter().map(|e| e.relative.as_str()).collect();
    let tree = render_tree(&rels, &root_name(&root));

    // Print tree (unless quiet)
    if !ctx.quiet {
        if ctx.no_color {
            println!("{tree}");
        } else {
            for line in tree.lines() {
                println!("{}", colorize_line(line));
            }
        }
    }

    Ok(())
}

/// Color the name portion of one rendered tree line
fn colorize_line(line: &str) -> String {
    let Some(idx) = line.rfind("── ") else {
        return line.to_string();
    };

    let (prefix, name) = line.split_at(idx + "── ".len());

    if name.ends_with('/') {
        format!("{prefix}{}", name.blue())
    } else {
        format!("{prefix}{}", color_by_language(name))
    }
}

fn color_by_language(name: &str) -> String {
    match detect_language(std::path::Path::new(name)) {
        "rust" => name.yellow().to_string(),
        "python" => name.green().to_string(),
        "javascript" | "typescript" => name.cyan().to_string(),
        "go" => name.magenta().to_string(),
        "c" | "cpp" => name.red().to_string(),
        "markdown" | "text" => name.white().to_string(),
        "toml" | "yaml" | "json" => name.bright_blue().to_string(),
        _ => name.to_string(),
    }
}
