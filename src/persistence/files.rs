//! Storage backed by one JSON file per key.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::persistence::storage::{CartStorage, StorageError};

const EXTENSION: &str = "json";

/// Stores each key as `<dir>/<key>.json`, with `:` in keys written as `.`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();

        fs::create_dir_all(&dir).await?;

        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{EXTENSION}", key.replace(':', ".")))
    }
}

fn key_for(path: &Path) -> Option<String> {
    if path.extension()? != EXTENSION {
        return None;
    }

    Some(path.file_stem()?.to_str()?.replace('.', ":"))
}

#[async_trait]
impl CartStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let staging = path.with_extension("tmp");

        let written = match fs::write(&staging, value).await {
            Ok(()) => fs::rename(&staging, &path).await,
            Err(err) => Err(err),
        };

        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&staging).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = %staging.display(), error = %cleanup, "failed to remove staging file");
            }

            return Err(err.into());
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if let Some(key) = key_for(&entry.path()) {
                keys.push(key);
            }
        }

        keys.sort();

        Ok(keys)
    }
}
