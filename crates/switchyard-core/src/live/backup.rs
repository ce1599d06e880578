//! Snapshot and restore of live config files
//!
//! A live write may touch several files. Each file's original bytes are
//! captured before it is overwritten so a failed write can be undone.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Original state of one live file
#[derive(Debug, Clone)]
pub struct BackupFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Original content (None if the file didn't exist)
    pub original_content: Option<Vec<u8>>,
}

impl BackupFile {
    /// Check if this was a new file (didn't exist before)
    #[must_use]
    pub fn was_new(&self) -> bool {
        self.original_content.is_none()
    }
}

/// Originals of every file touched by one live write
#[derive(Debug, Clone, Default)]
pub struct LiveBackup {
    files: Vec<BackupFile>,
}

impl LiveBackup {
    /// Record the current state of `path` before it is written
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read
    pub fn capture(&mut self, path: &Path) -> io::Result<()> {
        if self.files.iter().any(|f| f.path == path) {
            return Ok(());
        }
        let original_content = match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        self.files.push(BackupFile {
            path: path.to_path_buf(),
            original_content,
        });
        Ok(())
    }

    /// Files captured so far
    #[must_use]
    pub fn files(&self) -> &[BackupFile] {
        &self.files
    }

    /// Put every captured file back byte for byte.
    ///
    /// Files that did not exist before are removed.
    ///
    /// # Errors
    /// Returns the first error hit; remaining files are still attempted
    pub fn restore(&self) -> io::Result<()> {
        let mut first_err = None;
        for file in self.files.iter().rev() {
            let result = match &file.original_content {
                Some(content) => write_atomic(&file.path, content),
                None if file.path.exists() => fs::remove_file(&file.path),
                None => Ok(()),
            };
            if let Err(e) = result {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Write a file through a temp file in the same directory, then rename
///
/// # Errors
/// Returns an error if the directory cannot be created or the write fails
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_restore_existing_and_new_files() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("a.json");
        let created = temp.path().join("nested/b.json");
        fs::write(&existing, b"original").unwrap();

        let mut backup = LiveBackup::default();
        backup.capture(&existing).unwrap();
        backup.capture(&created).unwrap();
        assert!(!backup.files()[0].was_new());
        assert!(backup.files()[1].was_new());

        write_atomic(&existing, b"changed").unwrap();
        write_atomic(&created, b"new").unwrap();

        backup.restore().unwrap();
        assert_eq!(fs::read(&existing).unwrap(), b"original");
        assert!(!created.exists());
    }

    #[test]
    fn test_capture_keeps_first_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.json");
        fs::write(&path, b"v1").unwrap();

        let mut backup = LiveBackup::default();
        backup.capture(&path).unwrap();
        fs::write(&path, b"v2").unwrap();
        backup.capture(&path).unwrap();

        assert_eq!(backup.files().len(), 1);
        backup.restore().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"v1");
    }
}
