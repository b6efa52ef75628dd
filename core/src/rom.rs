//! Preinstalled ROM library
//!
//! ROMs shipped alongside the host live in one flat directory and are
//! addressed by file name only.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::RomLoadError;

/// Flat directory of preinstalled ROMs
#[derive(Debug, Clone)]
pub struct RomLibrary {
    root: PathBuf,
}

impl RomLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` to a path inside the library.
    ///
    /// Only bare file names are accepted: no separators, no `.`/`..`.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, RomLoadError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
            || name.contains("..");
        if invalid {
            return Err(RomLoadError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Read the named ROM
    pub fn fetch(&self, name: &str) -> Result<Vec<u8>, RomLoadError> {
        let path = self.resolve(name)?;
        let bytes =
            std::fs::read(&path).map_err(|source| RomLoadError::Fetch { path: path.clone(), source })?;
        debug!("Fetched preinstalled ROM {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes)
    }

    /// Names of the ROMs currently in the library, sorted
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, RomLibrary) {
        let dir = tempfile::tempdir().unwrap();
        for (name, bytes) in files {
            std::fs::write(dir.path().join(name), bytes).unwrap();
        }
        let library = RomLibrary::new(dir.path());
        (dir, library)
    }

    #[test]
    fn test_fetch_existing_rom() {
        let (_dir, library) = library_with(&[("tetris.gb", &[1, 2, 3])]);
        assert_eq!(library.fetch("tetris.gb").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_fetch_missing_rom() {
        let (_dir, library) = library_with(&[]);
        let err = library.fetch("absent.gb").unwrap_err();
        assert!(matches!(err, RomLoadError::Fetch { .. }));
        assert!(err.to_string().contains("absent.gb"));
    }

    #[test]
    fn test_rejects_path_escapes() {
        let (_dir, library) = library_with(&[]);
        for name in ["", ".", "..", "../secret", "a/b.gb", "a\\b.gb", "x..gb"] {
            assert!(
                matches!(library.resolve(name), Err(RomLoadError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_list_is_sorted() {
        let (dir, library) = library_with(&[("b.gb", &[0]), ("a.gb", &[0])]);
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        assert_eq!(library.root(), dir.path());
        assert_eq!(library.list(), vec!["a.gb", "b.gb"]);
    }
}
