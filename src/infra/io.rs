use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use memchr::memrchr_iter;
use memmap2::Mmap;

/// Read the last `n` lines of a (large) file, replacing invalid UTF-8.
/// The file is memory-mapped and scanned backwards, so only the tail
/// window is ever copied.
pub fn read_tail_lines<P: AsRef<Path>>(
    path: P,
    n: usize,
) -> io::Result<String>
{
    let file = File::open(path.as_ref())?;

    // SAFETY: read-only map of an existing regular file
    let mmap = unsafe { Mmap::map(&file)? };

    Ok(String::from_utf8_lossy(tail_slice(&mmap, n)).into_owned())
}

/// Slice holding the last `n` newline-delimited lines of `bytes`.
/// A trailing '\n' terminates the last line rather than opening a new one.
pub fn tail_slice(
    bytes: &[u8],
    n: usize,
) -> &[u8]
{
    if n == 0
    {
        return &bytes[bytes.len()..];
    }

    // Ignore the final terminator so it is not counted as a boundary
    let search = bytes
        .strip_suffix(b"\n")
        .unwrap_or(bytes);

    match memrchr_iter(b'\n', search).nth(n - 1)
    {
        Some(pos) => &bytes[pos + 1..],
        None => bytes,
    }
}

/// Root-relative path with POSIX separators, or None if `path`
/// is not under `root`.
pub fn relative_posix(
    root: &Path,
    path: &Path,
) -> Option<String>
{
    let rel = path
        .strip_prefix(root)
        .ok()?;

    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c
        {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();

    Some(parts.join("/"))
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_user_path(path: &Path) -> PathBuf
{
    match path.to_str()
    {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Best-effort absolute, symlink-free form of a destination path that
/// may not exist yet: canonicalize the file if present, else its parent.
pub fn resolve_destination(path: &Path) -> PathBuf
{
    if let Ok(p) = dunce::canonicalize(path)
    {
        return p;
    }

    let parent = match path.parent()
    {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    match (dunce::canonicalize(parent), path.file_name())
    {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}
