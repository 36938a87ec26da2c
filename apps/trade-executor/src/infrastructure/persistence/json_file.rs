//! JSON file state backend.
//!
//! The whole ledger is one JSON document. Saves write a sibling temp file,
//! fsync it, rename it over the target, then fsync the directory so the
//! rename itself is durable. A crash leaves either the previous or the new
//! document on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::application::ports::{PersistenceError, StateBackend};
use crate::domain::portfolio::Ledger;

/// Ledger stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStateBackend {
    path: PathBuf,
}

impl JsonFileStateBackend {
    /// Backend at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: &std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    #[cfg(unix)]
    async fn sync_dir(&self) -> Result<(), PersistenceError> {
        let dir = tokio::fs::File::open(self.parent_dir())
            .await
            .map_err(|e| self.io_error(&e))?;
        dir.sync_all().await.map_err(|e| self.io_error(&e))
    }

    // Directory handles cannot be fsynced on this platform.
    #[cfg(not(unix))]
    async fn sync_dir(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateBackend for JsonFileStateBackend {
    async fn load(&self) -> Result<Option<Ledger>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(&e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PersistenceError::Serialization(format!("{}: {e}", self.path.display())))
    }

    async fn save(&self, ledger: &Ledger) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(ledger)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        tokio::fs::create_dir_all(self.parent_dir())
            .await
            .map_err(|e| self.io_error(&e))?;

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| self.io_error(&e))?;
        file.write_all(&json).await.map_err(|e| self.io_error(&e))?;
        file.sync_all().await.map_err(|e| self.io_error(&e))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(&e))?;
        self.sync_dir().await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::shared::TradingMode;

    fn ledger() -> Ledger {
        Ledger::new(
            TradingMode::Paper,
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            dec!(5000000),
        )
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileStateBackend::new(dir.path().join("state.json"));
        assert!(backend.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileStateBackend::new(dir.path().join("nested/state.json"));
        let ledger = ledger();

        backend.save(&ledger).await.unwrap();

        assert_eq!(backend.load().await.unwrap(), Some(ledger));
        assert!(!backend.temp_path().exists());
    }

    #[tokio::test]
    async fn repeated_saves_replace_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileStateBackend::new(dir.path().join("state.json"));
        let mut ledger = ledger();
        backend.save(&ledger).await.unwrap();

        ledger.revision = 7;
        backend.save(&ledger).await.unwrap();

        assert_eq!(backend.load().await.unwrap(), Some(ledger));
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["state.json".to_string()]);
    }

    #[test]
    fn bare_file_name_lives_in_the_working_directory() {
        assert_eq!(
            JsonFileStateBackend::new("state.json").parent_dir(),
            Path::new(".")
        );
        assert_eq!(
            JsonFileStateBackend::new("data/state.json").parent_dir(),
            Path::new("data")
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{\"mode\": ").unwrap();

        let err = JsonFileStateBackend::new(path).load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization(_)));
    }

    #[tokio::test]
    async fn leftover_temp_file_does_not_shadow_state() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileStateBackend::new(dir.path().join("state.json"));
        backend.save(&ledger()).await.unwrap();
        std::fs::write(backend.temp_path(), b"partial").unwrap();

        assert_eq!(backend.load().await.unwrap(), Some(ledger()));
    }
}
