//! Whole-file text storage shared by the file-based engines.

use crate::config::WriteMode;
use crate::error::DaoResult;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A text file that is always read and rewritten as a whole.
///
/// # Durability
///
/// With [`WriteMode::AtomicRename`] the new contents are written to a
/// sibling temporary file, synced, then renamed over the target, so readers
/// see either the old or the new file. [`WriteMode::InPlace`] truncates
/// the target first and can leave a partial file if the process dies
/// mid-write.
#[derive(Debug, Clone)]
pub struct TextFile {
    path: PathBuf,
    write_mode: WriteMode,
}

impl TextFile {
    /// Opens an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not a file.
    pub fn open(path: &Path, write_mode: WriteMode) -> DaoResult<Self> {
        File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            write_mode,
        })
    }

    /// Opens a file, creating it and its parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file
    /// cannot be opened.
    pub fn open_or_create(path: &Path, write_mode: WriteMode) -> DaoResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            File::create(path)?;
        }
        Self::open(path, write_mode)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the write mode.
    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Reads the whole file.
    pub fn read_to_string(&self) -> DaoResult<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    /// Reads the file as lines, without line terminators.
    pub fn read_lines(&self) -> DaoResult<Vec<String>> {
        Ok(self
            .read_to_string()?
            .lines()
            .map(str::to_owned)
            .collect())
    }

    /// Replaces the file contents.
    pub fn replace(&self, contents: &str) -> DaoResult<()> {
        match self.write_mode {
            WriteMode::InPlace => {
                let mut file = File::create(&self.path)?;
                file.write_all(contents.as_bytes())?;
                file.sync_all()?;
            }
            WriteMode::AtomicRename => {
                let dir = self
                    .path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                let mut tmp = NamedTempFile::new_in(dir)?;
                tmp.write_all(contents.as_bytes())?;
                tmp.as_file().sync_all()?;
                tmp.persist(&self.path).map_err(|e| e.error)?;
            }
        }
        tracing::trace!(path = %self.path.display(), bytes = contents.len(), "rewrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DaoError;
    use tempfile::tempdir;

    #[test]
    fn file_open_missing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        let result = TextFile::open(&path, WriteMode::InPlace);
        assert!(matches!(result, Err(DaoError::Io(_))));
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("data.csv");

        let file = TextFile::open_or_create(&path, WriteMode::AtomicRename).unwrap();
        assert!(path.exists());
        assert_eq!(file.read_to_string().unwrap(), "");
        assert_eq!(file.path(), path);
    }

    #[test]
    fn file_replace_atomic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let file = TextFile::open_or_create(&path, WriteMode::AtomicRename).unwrap();
        file.replace("a,b\n1,2\n").unwrap();
        assert_eq!(file.read_lines().unwrap(), ["a,b", "1,2"]);

        file.replace("a,b\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n");
        // No temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn file_replace_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "old contents that are longer\n").unwrap();

        let file = TextFile::open(&path, WriteMode::InPlace).unwrap();
        file.replace("new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn file_read_lines_keeps_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a\n\nb\r\n").unwrap();

        let file = TextFile::open(&path, WriteMode::InPlace).unwrap();
        assert_eq!(file.read_lines().unwrap(), ["a", "", "b"]);
    }
}
