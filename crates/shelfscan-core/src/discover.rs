use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Expand directories into the regular files beneath them, sorted per directory.
///
/// Files passed directly in `roots` are kept as-is. Format filtering is left to
/// the caller so unsupported files still show up in run counts.
pub fn collect_files(roots: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push(root.clone());
        } else if root.is_dir() {
            walk_directory(root, recursive, &mut files)?;
        } else {
            return Err(CoreError::DirectoryNotFound(root.display().to_string()));
        }
    }
    Ok(files)
}

fn walk_directory(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recursive {
                walk_directory(&path, true, files)?;
            }
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_collect_flat_directory() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("b.epub")).unwrap();
        File::create(dir.path().join("a.pdf")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let files = collect_files(&[dir.path().to_path_buf()], false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.epub", "notes.txt"]);
    }

    #[test]
    fn test_collect_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("subdir");
        fs::create_dir(&sub).unwrap();
        File::create(dir.path().join("root.pdf")).unwrap();
        File::create(sub.join("nested.epub")).unwrap();

        let flat = collect_files(&[dir.path().to_path_buf()], false).unwrap();
        assert_eq!(flat.len(), 1);

        let deep = collect_files(&[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(deep.len(), 2);
        assert!(deep.iter().any(|p| p.ends_with("subdir/nested.epub")));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let err = collect_files(&[PathBuf::from("/nonexistent/shelfscan/books")], true).unwrap_err();
        assert!(matches!(err, CoreError::DirectoryNotFound(_)));
    }
}
