//! Tile file discovery.

use crate::{QdcError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File name suffix of QuickDraw Contours tiles.
pub const TILE_EXTENSION: &str = ".qdc";

/// Recursively collect every file under `dir` whose name ends with `.qdc`.
///
/// Returned paths are absolute.
///
/// The match is a case-sensitive suffix test on the file name. Entries that
/// cannot be read while walking are skipped. An empty result is not an error.
pub fn find_tile_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(QdcError::InputNotFound(dir.to_path_buf()));
    }
    let root = dir.canonicalize().map_err(|e| QdcError::io("resolve", dir, e))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping unreadable entry under {}: {}", dir.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_tile = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(TILE_EXTENSION));
        if is_tile {
            files.push(entry.into_path());
        }
    }

    debug!("Found {} {} files under {}", files.len(), TILE_EXTENSION, dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            find_tile_files(&missing),
            Err(QdcError::InputNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.qdc");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(find_tile_files(&file), Err(QdcError::InputNotFound(_))));
    }

    #[test]
    fn test_recursive_suffix_match() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("top.qdc"), b"").unwrap();
        fs::write(nested.join("deep.qdc"), b"").unwrap();
        fs::write(nested.join("notes.txt"), b"").unwrap();
        fs::write(nested.join("upper.QDC"), b"").unwrap();
        fs::create_dir(dir.path().join("dir.qdc")).unwrap();

        let mut names: Vec<String> = find_tile_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["deep.qdc", "top.qdc"]);
        assert!(find_tile_files(dir.path()).unwrap().iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_tile_files(dir.path()).unwrap().is_empty());
    }
}
