//! Shallow directory scans.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

/// Every entry below `root`, at most `max_depth` levels down, in file name
/// order.
///
/// Entries for which `enter` returns `false` are skipped along with
/// everything beneath them. A missing `root` yields nothing.
pub fn scan_dir<P>(root: &Path, max_depth: usize, enter: P) -> Result<Vec<DirEntry>, walkdir::Error>
where
  P: FnMut(&DirEntry) -> bool,
{
  if !root.is_dir() {
    return Ok(Vec::new());
  }

  WalkDir::new(root)
    .min_depth(1)
    .max_depth(max_depth)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(enter)
    .collect()
}

/// Lossy UTF-8 file name of an entry.
pub fn entry_name(entry: &DirEntry) -> String {
  entry.file_name().to_string_lossy().into_owned()
}
