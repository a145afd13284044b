use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// How deep to look below each root
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Maximum depth when recursive; `None` means unlimited
    pub max_depth: Option<usize>,
}

impl ScanOptions {
    fn depth(&self) -> usize {
        if self.recursive {
            self.max_depth.unwrap_or(usize::MAX).max(1)
        } else {
            1
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// List the files under one root, sorted by path.
///
/// Hidden entries are skipped, and so is everything below a hidden
/// directory.
pub fn scan_directory(root: &Path, options: ScanOptions) -> Result<Vec<PathBuf>, ScannerError> {
    debug!(path = ?root, recursive = options.recursive, "Scanning directory");

    if !root.exists() {
        return Err(ScannerError::PathNotFound(root.to_path_buf()));
    }

    if !root.is_dir() {
        return Err(ScannerError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(options.depth())
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        trace!(entry = ?entry.path(), "Examining entry");

        if !entry.file_type().is_file() {
            continue;
        }

        files.push(entry.into_path());
    }

    files.sort();

    debug!(count = files.len(), "Scan complete");

    Ok(files)
}

/// Scan several roots in order
pub fn scan(roots: &[PathBuf], options: ScanOptions) -> Result<Vec<PathBuf>, ScannerError> {
    let mut files = Vec::new();
    for root in roots {
        files.extend(scan_directory(root, options)?);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn flat() -> ScanOptions {
        ScanOptions::default()
    }

    fn recursive(max_depth: Option<usize>) -> ScanOptions {
        ScanOptions {
            recursive: true,
            max_depth,
        }
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(scan_directory(dir.path(), flat()).unwrap().is_empty());
    }

    #[test]
    fn test_flat_scan_lists_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), "").unwrap();

        let files = scan_directory(dir.path(), flat()).unwrap();
        assert_eq!(names(dir.path(), &files), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_recursive_scan() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir_all(dir.path().join("sub").join("deeper")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), "").unwrap();
        fs::write(dir.path().join("sub").join("deeper").join("d.txt"), "").unwrap();

        let files = scan_directory(dir.path(), recursive(None)).unwrap();
        assert_eq!(files.len(), 3);

        let files = scan_directory(dir.path(), recursive(Some(2))).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_ignores_hidden_entries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        fs::create_dir(dir.path().join(".autorerename")).unwrap();
        fs::write(dir.path().join(".autorerename").join("rules.json"), "").unwrap();
        fs::write(dir.path().join("visible.txt"), "").unwrap();

        let files = scan_directory(dir.path(), recursive(None)).unwrap();
        assert_eq!(names(dir.path(), &files), vec!["visible.txt"]);
    }

    #[test]
    fn test_path_not_found() {
        let result = scan_directory(Path::new("/nonexistent/path"), flat());
        assert!(matches!(result, Err(ScannerError::PathNotFound(_))));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs::write(&file_path, "content").unwrap();

        let result = scan_directory(&file_path, flat());
        assert!(matches!(result, Err(ScannerError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_multiple_roots() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::write(a.path().join("1.txt"), "").unwrap();
        fs::write(b.path().join("2.txt"), "").unwrap();

        let files = scan(&[a.path().to_path_buf(), b.path().to_path_buf()], flat()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("1.txt"));
        assert!(files[1].ends_with("2.txt"));
    }
}
