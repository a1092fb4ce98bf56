//! Directory-backed medium.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::KvMedium;
use crate::{Result, TRACING_TARGET_MEDIUM};

const FILE_EXTENSION: &str = "json";

/// Medium that keeps one file per key inside a directory.
///
/// File names are the hex-encoded key, so any key is accepted without
/// escaping. Each write lands in its own uniquely named temporary file in the
/// same directory and is then renamed over the record, so concurrent writers
/// of one key never share a temporary file and the last rename wins.
#[derive(Debug, Clone)]
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    /// Opens a medium rooted at `root`, creating the directory if needed.
    #[tracing::instrument(skip_all, fields(root = %root.as_ref().display()), target = TRACING_TARGET_MEDIUM)]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        tracing::debug!(
            target: TRACING_TARGET_MEDIUM,
            root = %root.display(),
            "Opened file medium"
        );

        Ok(Self { root })
    }

    /// Returns the directory holding the records.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file a key is stored in.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{FILE_EXTENSION}", hex::encode(key)))
    }
}

impl KvMedium for FileMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let target = self.path_for(key);

        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(value.as_bytes())?;
        temp.persist(&target).map_err(|e| e.error)?;

        tracing::trace!(
            target: TRACING_TARGET_MEDIUM,
            key = %key,
            path = %target.display(),
            size_bytes = value.len(),
            "Wrote record file"
        );
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), format!("removing '{key}': {e}")).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::open(dir.path().join("nested")).unwrap();

        assert_eq!(medium.get_item("status:last").unwrap(), None);
        medium.set_item("status:last", r#"{"v":1,"e":null}"#).unwrap();

        let reopened = FileMedium::open(dir.path().join("nested")).unwrap();
        assert_eq!(
            reopened.get_item("status:last").unwrap().as_deref(),
            Some(r#"{"v":1,"e":null}"#)
        );
    }

    #[test]
    fn test_key_is_hex_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::open(dir.path()).unwrap();

        let path = medium.path_for("a/b");
        assert_eq!(path.file_name().unwrap(), "612f62.json");
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::open(dir.path()).unwrap();

        medium.remove_item("never-written").unwrap();
        medium.set_item("k", "v").unwrap();
        medium.remove_item("k").unwrap();
        assert!(!medium.path_for("k").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_writers_never_fail() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::open(dir.path()).unwrap();

        let writers: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|fill| {
                let medium = medium.clone();
                std::thread::spawn(move || {
                    let value = fill.repeat(64 * 1024);
                    (0..200)
                        .filter(|_| medium.set_item("k", &value).is_err())
                        .count()
                })
            })
            .collect();

        let failed: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(failed, 0);

        let stored = medium.get_item("k").unwrap().unwrap();
        assert_eq!(stored.len(), 64 * 1024);
        assert!(stored.chars().all(|c| c == 'a') || stored.chars().all(|c| c == 'b'));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
