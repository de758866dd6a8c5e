//! Filepath: src/core/matcher.rs
//! Gitignore-compatible rule compiler and matcher.
//!
//! - One ordered rule set: built-ins, then configured extras, then the
//!   project ignore file. Last matching rule wins; `!` re-includes.
//! - Unanchored patterns match at any depth (`**/` prefix), a leading or
//!   middle `/` anchors to the root, a trailing `/` restricts to dirs.
//! - A rule matching an ancestor directory also matches everything
//!   beneath it, so verdicts do not depend on walk pruning.
//! - Built-in exact names and `*.ext` patterns get a base-name fast path
//!   that is only armed while no negation exists in the set.
//!
//! Globs are compiled with `globset` (`*` never crosses `/`).

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Candidate, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::infra::reporter::{Reporter, ScanWarning};

/// Built-in denylist: SCM metadata, dependency caches, build outputs,
/// binary/media extensions, and lockfiles.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // SCM
    ".git",
    ".svn",
    ".hg",
    // Dependencies and caches
    "node_modules",
    "venv",
    ".venv",
    "env",
    "dist",
    "build",
    "target",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "vendor",
    // Media / binary
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.svg",
    "*.pdf",
    "*.zip",
    "*.tar",
    "*.gz",
    "*.7z",
    "*.rar",
    "*.exe",
    "*.dll",
    "*.so",
    "*.dylib",
    "*.class",
    "*.jar",
    "*.db",
    "*.sqlite",
    "*.sqlite3",
    "*.pyc",
    // Lockfiles
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Gemfile.lock",
];

/// Characters that make a pattern body a glob rather than a literal
const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// One parsed line of ignore-file syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule
{
    /// The line as written (trailing whitespace trimmed)
    pub pattern: String,

    /// Body with `!`, leading `/` and trailing `/` removed
    pub body: String,

    /// `!pattern`: re-include on match
    pub negated: bool,

    /// `pattern/`: only applies to directories (and their contents)
    pub dir_only: bool,

    /// Contains a non-trailing `/`: matched from the root only
    pub anchored: bool,
}

impl IgnoreRule
{
    /// Parse one ignore-file line. Blank lines and `#` comments yield None.
    pub fn parse(line: &str) -> Option<Self>
    {
        let line = line.trim_end_matches(['\n', '\r']);
        let line = trim_unescaped_trailing_spaces(line);

        if line.is_empty() || line.starts_with('#')
        {
            return None;
        }

        let (negated, rest) = match line.strip_prefix('!')
        {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let (dir_only, rest) = match rest.strip_suffix('/')
        {
            Some(rest) => (true, rest),
            None => (false, rest),
        };

        let anchored = rest.contains('/');
        let body = rest.strip_prefix('/').unwrap_or(rest);

        if body.is_empty()
        {
            return None;
        }

        Some(Self {
            pattern: line.to_string(),
            body: body.to_string(),
            negated,
            dir_only,
            anchored,
        })
    }

    /// Glob for the path itself
    fn own_glob(&self) -> String
    {
        let body = escape_braces(&self.body);

        if self.anchored || body == "**" || body.starts_with("**/")
        {
            body
        }
        else
        {
            format!("**/{body}")
        }
    }

    /// Glob for anything beneath a matching directory.
    /// None when the own glob already covers descendants.
    fn nested_glob(&self) -> Option<String>
    {
        let own = self.own_glob();

        if own == "**" || own.ends_with("/**")
        {
            None
        }
        else
        {
            Some(format!("{own}/**"))
        }
    }

    /// Base name this rule matches literally (`node_modules`, `yarn.lock`)
    fn literal_name(&self) -> Option<&str>
    {
        let plain = !self.negated && !self.dir_only && !self.anchored;

        (plain && !self.body.contains(GLOB_META)).then_some(self.body.as_str())
    }

    /// Extension suffix for `*.ext` rules (`.png`)
    fn literal_suffix(&self) -> Option<&str>
    {
        let plain = !self.negated && !self.dir_only && !self.anchored;
        let ext = self.body.strip_prefix("*.")?;

        (plain && !ext.is_empty() && !ext.contains(GLOB_META)).then(|| &self.body[1..])
    }
}

/// Braces are literal in ignore files; globset would read them as
/// alternation. Escaped characters and `[...]` classes pass through.
fn escape_braces(body: &str) -> String
{
    let mut out = String::with_capacity(body.len() + 4);
    let mut chars = body.chars();
    let mut in_class = false;

    while let Some(c) = chars.next()
    {
        match c
        {
            '\\' =>
            {
                out.push(c);
                if let Some(next) = chars.next()
                {
                    out.push(next);
                }
            }
            '[' if !in_class =>
            {
                in_class = true;
                out.push(c);
            }
            ']' if in_class =>
            {
                in_class = false;
                out.push(c);
            }
            '{' | '}' if !in_class =>
            {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

/// Trim trailing spaces unless escaped with a backslash (`foo\ `)
fn trim_unescaped_trailing_spaces(line: &str) -> &str
{
    let bytes = line.as_bytes();
    let mut end = bytes.len();

    while end > 0 && bytes[end - 1] == b' '
    {
        if end >= 2 && bytes[end - 2] == b'\\'
        {
            break;
        }

        end -= 1;
    }

    &line[..end]
}

/// Built-in names checked before full evaluation
#[derive(Debug, Default)]
struct FastPath
{
    names: HashSet<String>,
    suffixes: Vec<String>,
}

impl FastPath
{
    fn hit(
        &self,
        base: &str,
    ) -> bool
    {
        self.names
            .contains(base)
            || self
                .suffixes
                .iter()
                .any(|s| base.ends_with(s.as_str()))
    }
}

/// Compiled, immutable rule set
#[derive(Debug)]
pub struct PatternMatcher
{
    /// Every successfully compiled rule, in declaration order
    rules: Vec<IgnoreRule>,

    /// Globs for the path itself; `own_index[i]` is the rule index
    own: GlobSet,
    own_index: Vec<usize>,

    /// Globs for descendants of a matching dir
    nested: GlobSet,
    nested_index: Vec<usize>,

    /// Armed only when the set holds no negations
    fast: Option<FastPath>,

    /// Ignore file the project rules were read from, if any
    source: Option<PathBuf>,
}

impl PatternMatcher
{
    /// Compile `defaults` followed by `ignore_lines` into one ordered set.
    /// Lines that fail to compile are reported and skipped.
    pub fn compile<D, L>(
        defaults: &[D],
        ignore_lines: &[L],
        reporter: &dyn Reporter,
    ) -> Result<Self>
    where
        D: AsRef<str>,
        L: AsRef<str>,
    {
        let mut rules = Vec::new();
        let mut own = GlobSetBuilder::new();
        let mut own_index = Vec::new();
        let mut nested = GlobSetBuilder::new();
        let mut nested_index = Vec::new();
        let mut fast = FastPath::default();

        let lines = defaults
            .iter()
            .map(|d| (d.as_ref(), true))
            .chain(
                ignore_lines
                    .iter()
                    .map(|l| (l.as_ref(), false)),
            );

        for (line, builtin) in lines
        {
            let Some(rule) = IgnoreRule::parse(line)
            else
            {
                continue;
            };

            let own_glob = match build_glob(&rule.own_glob())
            {
                Ok(g) => g,
                Err(err) =>
                {
                    reporter.warn(&ScanWarning::InvalidPattern {
                        pattern: rule.pattern,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let nested_glob = match rule
                .nested_glob()
                .map(|g| build_glob(&g))
                .transpose()
            {
                Ok(g) => g,
                Err(err) =>
                {
                    reporter.warn(&ScanWarning::InvalidPattern {
                        pattern: rule.pattern,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let idx = rules.len();

            own.add(own_glob);
            own_index.push(idx);

            if let Some(g) = nested_glob
            {
                nested.add(g);
                nested_index.push(idx);
            }

            if builtin
            {
                if let Some(name) = rule.literal_name()
                {
                    fast.names
                        .insert(name.to_string());
                }
                else if let Some(suffix) = rule.literal_suffix()
                {
                    fast.suffixes
                        .push(suffix.to_string());
                }
            }

            rules.push(rule);
        }

        let has_negation = rules
            .iter()
            .any(|r| r.negated);

        Ok(Self {
            rules,
            own: own
                .build()
                .context("Failed to build ignore glob set")?,
            own_index,
            nested: nested
                .build()
                .context("Failed to build nested ignore glob set")?,
            nested_index,
            fast: (!has_negation).then_some(fast),
            source: None,
        })
    }

    /// Compile built-ins plus `extra` patterns plus the project ignore
    /// file at `root/ignore_file`. A missing or unreadable file is
    /// reported and the matcher falls back to the other patterns.
    /// A file that was read is remembered as `source()`.
    pub fn for_root(
        root: &Path,
        extra: &[String],
        ignore_file: &str,
        reporter: &dyn Reporter,
    ) -> Result<Self>
    {
        let mut defaults: Vec<&str> = DEFAULT_IGNORE_PATTERNS.to_vec();
        defaults.extend(
            extra
                .iter()
                .map(String::as_str),
        );

        let path = root.join(ignore_file);
        let mut loaded = false;
        let text = match std::fs::read_to_string(&path)
        {
            Ok(text) =>
            {
                loaded = true;
                text
            }
            Err(err) if err.kind() == ErrorKind::NotFound =>
            {
                reporter.warn(&ScanWarning::IgnoreFileMissing { path: path.clone() });
                String::new()
            }
            Err(err) =>
            {
                reporter.warn(&ScanWarning::IgnoreFileUnreadable {
                    path: path.clone(),
                    reason: err.to_string(),
                });
                String::new()
            }
        };

        let lines: Vec<&str> = text
            .lines()
            .collect();

        let mut matcher = Self::compile(&defaults, &lines, reporter)?;

        if loaded
        {
            matcher.source = dunce::canonicalize(&path).ok();
        }

        Ok(matcher)
    }

    /// True when `relative_path` (POSIX separators, relative to the
    /// scan root) is ignored.
    pub fn matches(
        &self,
        relative_path: &str,
        is_dir: bool,
    ) -> bool
    {
        let rel = normalize(relative_path);

        if rel.is_empty()
        {
            return false;
        }

        if let Some(fast) = &self.fast
            && fast.hit(base_name(rel))
        {
            return true;
        }

        self.evaluate(rel, is_dir)
    }

    /// Full rule evaluation with the fast path bypassed
    #[doc(hidden)]
    pub fn matches_without_fast_path(
        &self,
        relative_path: &str,
        is_dir: bool,
    ) -> bool
    {
        let rel = normalize(relative_path);

        !rel.is_empty() && self.evaluate(rel, is_dir)
    }

    /// Compiled rules in evaluation order
    pub fn rules(&self) -> &[IgnoreRule]
    {
        &self.rules
    }

    /// Path of the ignore file that was loaded, when one was read
    pub fn source(&self) -> Option<&Path>
    {
        self.source
            .as_deref()
    }

    /// Whether the base-name fast path is active
    pub fn fast_path_armed(&self) -> bool
    {
        self.fast
            .is_some()
    }

    fn evaluate(
        &self,
        rel: &str,
        is_dir: bool,
    ) -> bool
    {
        let candidate = Candidate::new(rel);

        // Direct hits honour dir-only; ancestor hits are dirs by definition
        let direct = self
            .own
            .matches_candidate(&candidate)
            .into_iter()
            .map(|i| self.own_index[i])
            .filter(|&r| is_dir || !self.rules[r].dir_only);

        let nested = self
            .nested
            .matches_candidate(&candidate)
            .into_iter()
            .map(|i| self.nested_index[i]);

        direct
            .chain(nested)
            .max()
            .is_some_and(|r| !self.rules[r].negated)
    }
}

fn build_glob(glob: &str) -> Result<globset::Glob, globset::Error>
{
    GlobBuilder::new(glob)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
}

fn normalize(path: &str) -> &str
{
    path.trim_start_matches("./")
        .trim_matches('/')
}

fn base_name(rel: &str) -> &str
{
    rel.rsplit('/')
        .next()
        .unwrap_or(rel)
}
