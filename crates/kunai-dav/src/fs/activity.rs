//! File-backed activity store.
//!
//! Keeps one file per activity id under a configured directory, the
//! file body being the bound transaction name. Writes go through a
//! temporary file in the same directory followed by an atomic rename.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::{ActivityStore, FsError, FsResult};

/// Activity store backed by a directory of one-entry files.
#[derive(Debug, Clone)]
pub struct FsActivityStore {
    dir: PathBuf,
}

impl FsActivityStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolves the entry file for an activity id.
    ///
    /// Ids are client-supplied URI segments; anything outside
    /// `[A-Za-z0-9._-]` is rejected so an id cannot address a file
    /// outside the store directory.
    fn entry_path(&self, activity_id: &str) -> FsResult<PathBuf> {
        if activity_id.is_empty()
            || !activity_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            || activity_id.starts_with('.')
        {
            return Err(FsError::InvalidActivityId(activity_id.to_string()));
        }
        Ok(self.dir.join(activity_id))
    }

    /// The store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ActivityStore for FsActivityStore {
    fn transaction_name(&self, activity_id: &str) -> FsResult<Option<String>> {
        let path = self.entry_path(activity_id)?;
        match std::fs::read_to_string(&path) {
            Ok(name) => Ok(Some(name.trim_end_matches('\n').to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    fn store(&self, activity_id: &str, txn_name: &str) -> FsResult<()> {
        let path = self.entry_path(activity_id)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write-then-rename keeps concurrent readers from observing a
        // partial transaction name.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(txn_name.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.persist(&path)
            .map_err(|err| FsError::Io(err.error))?;

        tracing::debug!(activity_id, txn_name, "stored activity");
        Ok(())
    }

    fn delete(&self, activity_id: &str) -> FsResult<()> {
        let path = self.entry_path(activity_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
