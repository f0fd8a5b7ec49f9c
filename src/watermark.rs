//! Last-processed-date watermark for incremental runs.
//!
//! One date string on disk, read before a run and written only after a
//! successful publish. A failed run leaves the previous value in place so
//! the next run retries the same window.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Stored date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored watermark. An absent file means a first run;
    /// unparseable contents are logged and treated the same way.
    pub fn load(&self) -> Result<Option<NaiveDate>> {
        if !self.path.exists() {
            debug!("No watermark at {:?}, processing the full window", self.path);
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read watermark file {:?}", self.path))?;
        let trimmed = content.trim();

        match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            Ok(date) => Ok(Some(date)),
            Err(e) => {
                warn!(
                    "Watermark file {:?} holds unparseable date '{}' ({}), ignoring it",
                    self.path, trimmed, e
                );
                Ok(None)
            }
        }
    }

    /// Persist a new watermark atomically: write a temp file alongside the
    /// target, flush it, then rename over the old one.
    pub fn save(&self, date: NaiveDate) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create watermark directory {:?}", parent))?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&temp_path)
                .with_context(|| format!("Failed to create temp watermark {:?}", temp_path))?;
            std::io::Write::write_all(&mut file, date.format(DATE_FORMAT).to_string().as_bytes())?;
            file.sync_all()?;
        }

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to move watermark into place at {:?}", self.path))?;

        debug!("Watermark advanced to {}", date.format(DATE_FORMAT));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_absent_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("last_run.txt"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("data").join("last_run.txt"));

        let date = NaiveDate::from_ymd_opt(2025, 4, 17).unwrap();
        store.save(date).unwrap();
        assert_eq!(store.load().unwrap(), Some(date));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("last_run.txt");
        let store = WatermarkStore::new(&nested);

        store.save(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let dir = tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("last_run.txt"));

        store.save(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).unwrap();
        store.save(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()).unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
        );
    }

    #[test]
    fn test_garbage_contents_load_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_run.txt");
        std::fs::write(&path, "not a date\n").unwrap();

        let store = WatermarkStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_stored_value_is_trimmed_before_parsing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_run.txt");
        std::fs::write(&path, "2025-04-17\n").unwrap();

        let store = WatermarkStore::new(&path);
        assert_eq!(
            store.load().unwrap(),
            Some(NaiveDate::from_ymd_opt(2025, 4, 17).unwrap())
        );
    }
}
