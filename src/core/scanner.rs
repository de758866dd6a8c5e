//! Filepath: src/core/scanner.rs
//! Pruning directory walk and text tree rendering.
//!
//! - Every entry is tested against the `PatternMatcher` inside
//!   `filter_entry`, so an ignored directory is never opened and none
//!   of its descendants are enumerated.
//! - The walker's own ignore handling (hidden, .gitignore, globals) is
//!   switched off; the matcher is the single source of truth.
//! - Output is sorted by relative path for deterministic downstream order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::{DirEntry, WalkBuilder};

use crate::core::matcher::PatternMatcher;
use crate::infra::io::relative_posix;
use crate::infra::reporter::{Reporter, ScanWarning};

/// Marker rendered when a scan yields nothing
pub const EMPTY_TREE: &str = "No files found.";

const BRANCH: &str = "├── ";
const INDENT: &str = "│   ";

/// A discovered, included filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry
{
    /// Absolute path as produced by the walk
    pub path: PathBuf,

    /// Root-relative path with `/` separators
    pub relative: String,

    pub is_dir: bool,
}

/// Matcher-driven walker
#[derive(Debug, Clone)]
pub struct TreeScanner
{
    matcher: Arc<PatternMatcher>,
}

impl TreeScanner
{
    pub fn new(matcher: PatternMatcher) -> Self
    {
        Self { matcher: Arc::new(matcher) }
    }

    pub fn matcher(&self) -> &PatternMatcher
    {
        &self.matcher
    }

    /// Walk `root` and return included regular files, sorted by relative
    /// path. Unreadable directories are reported and skipped.
    pub fn scan(
        &self,
        root: &Path,
        reporter: &dyn Reporter,
    ) -> Vec<ScanEntry>
    {
        let mut builder = WalkBuilder::new(root);

        // We own all filtering
        builder.standard_filters(false);
        builder.follow_links(false);

        let matcher = Arc::clone(&self.matcher);
        let prune_root = root.to_path_buf();
        builder.filter_entry(move |ent: &DirEntry| {
            // Never filter the root itself
            if ent.depth() == 0
            {
                return true;
            }

            let is_dir = ent
                .file_type()
                .is_some_and(|ft| ft.is_dir());

            match relative_posix(&prune_root, ent.path())
            {
                Some(rel) => !matcher.matches(&rel, is_dir),
                None => false,
            }
        });

        let mut out = Vec::new();

        for result in builder.build()
        {
            let entry = match result
            {
                Ok(entry) => entry,
                Err(err) =>
                {
                    reporter.warn(&ScanWarning::Traversal { reason: err.to_string() });
                    continue;
                }
            };

            // Regular files only; symlinks and special files are skipped
            if !entry
                .file_type()
                .is_some_and(|ft| ft.is_file())
            {
                continue;
            }

            if let Some(relative) = relative_posix(root, entry.path())
            {
                out.push(ScanEntry {
                    path: entry.into_path(),
                    relative,
                    is_dir: false,
                });
            }
        }

        out.sort_by(|a, b| {
            a.relative
                .cmp(&b.relative)
        });

        reporter.debug(&format!("scan of {} kept {} files", root.display(), out.len()));

        out
    }
}

/// Render sorted relative paths as an indented tree under `root_name`.
/// Each directory is emitted once, the first time it is reached.
pub fn render_tree<S: AsRef<str>>(
    paths: &[S],
    root_name: &str,
) -> String
{
    if paths.is_empty()
    {
        return EMPTY_TREE.to_string();
    }

    let mut lines = vec![format!("📂 {root_name}/")];
    let mut seen_dirs: HashSet<String> = HashSet::new();

    for path in paths
    {
        let parts: Vec<&str> = path
            .as_ref()
            .split('/')
            .collect();
        let depth = parts.len() - 1;

        for i in 0..depth
        {
            let dir = parts[..=i].join("/");

            if seen_dirs.insert(dir)
            {
                lines.push(format!("{}{BRANCH}{}/", INDENT.repeat(i), parts[i]));
            }
        }

        lines.push(format!("{}{BRANCH}{}", INDENT.repeat(depth), parts[depth]));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::core::matcher::DEFAULT_IGNORE_PATTERNS;
    use crate::infra::reporter::MemoryReporter;

    /// Create a file with parent dirs as needed
    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    ) -> anyhow::Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn scanner(project: &[&str]) -> TreeScanner
    {
        let m = PatternMatcher::compile(DEFAULT_IGNORE_PATTERNS, project, &MemoryReporter::new())
            .unwrap();
        TreeScanner::new(m)
    }

    fn rels(entries: &[ScanEntry]) -> Vec<&str>
    {
        entries
            .iter()
            .map(|e| {
                e.relative
                    .as_str()
            })
            .collect()
    }

    #[test]
    fn scan_sorts_and_filters() -> anyhow::Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "src/main.rs", "fn main() {}")?;
        write_file(root, "README.md", "# hi")?;
        write_file(root, "node_modules/pkg/index.js", "x")?;
        write_file(root, "logo.png", "png")?;
        write_file(root, ".env.example", "A=1")?;

        let entries = scanner(&[]).scan(root, &MemoryReporter::new());

        assert_eq!(rels(&entries), vec![".env.example", "README.md", "src/main.rs"]);
        assert!(
            entries
                .iter()
                .all(|e| !e.is_dir
                    && e.path
                        .starts_with(root))
        );
        Ok(())
    }

    #[test]
    fn ignored_directories_are_pruned() -> anyhow::Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "cache/keep.txt", "k")?;
        write_file(root, "cache/deep/er/file.txt", "f")?;
        write_file(root, "ok.txt", "o")?;

        // Re-including a file under an excluded dir has no effect: the dir is never entered
        let entries = scanner(&["cache/", "!cache/keep.txt"]).scan(root, &MemoryReporter::new());

        assert_eq!(rels(&entries), vec!["ok.txt"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn pruned_directory_is_never_opened() -> anyhow::Result<()>
    {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "locked/secret.txt", "s")?;
        write_file(root, "a.txt", "a")?;
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o000))?;

        // Privileged users read through 0o000, which would hide a missing prune
        if fs::read_dir(root.join("locked")).is_ok()
        {
            fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let reporter = MemoryReporter::new();
        let entries = scanner(&["locked/"]).scan(root, &reporter);

        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755))?;

        // A read attempt would have produced a traversal warning
        assert_eq!(rels(&entries), vec!["a.txt"]);
        assert!(reporter.warnings().is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_reported_and_siblings_kept() -> anyhow::Result<()>
    {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "blocked/inner.txt", "i")?;
        write_file(root, "a.txt", "a")?;
        write_file(root, "z/b.txt", "b")?;
        fs::set_permissions(root.join("blocked"), fs::Permissions::from_mode(0o000))?;

        // Privileged users can still list it; nothing to observe then
        if fs::read_dir(root.join("blocked")).is_ok()
        {
            fs::set_permissions(root.join("blocked"), fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let reporter = MemoryReporter::new();
        let entries = scanner(&[]).scan(root, &reporter);

        fs::set_permissions(root.join("blocked"), fs::Permissions::from_mode(0o755))?;

        assert_eq!(rels(&entries), vec!["a.txt", "z/b.txt"]);

        let warnings = reporter.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("traversal error"));
        assert!(warnings[0].contains("blocked"));
        Ok(())
    }

    #[test]
    fn render_tree_matches_layout()
    {
        let tree = render_tree(&["README.md", "src/core/a.rs", "src/core/b.rs", "src/main.rs"], "proj");

        let expected = [
            "📂 proj/",
            "├── README.md",
            "├── src/",
            "│   ├── core/",
            "│   │   ├── a.rs",
            "│   │   ├── b.rs",
            "│   ├── main.rs",
        ]
        .join("\n");

        assert_eq!(tree, expected);
    }

    #[test]
    fn render_tree_empty_marker()
    {
        let none: [&str; 0] = [];
        assert_eq!(render_tree(&none, "proj"), EMPTY_TREE);
    }
}
