// src/store/file.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::errors::StoreError;
use crate::fs::FileSystem;
use crate::store::table::{ProcessTable, TableBackend};
use crate::store::StoreResult;

/// Default location of the process table, relative to the config directory.
pub const PROCESS_FILE_PATH: &str = ".scriptrun/processes.toml";

/// Persists the process table as a TOML document.
///
/// A missing file is an empty table. A file that exists but does not parse
/// is reported as [`StoreError::Corrupt`] rather than silently replaced.
#[derive(Debug, Clone)]
pub struct FileBackend {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl FileBackend {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }
}

impl TableBackend for FileBackend {
    fn load(&self) -> StoreResult<ProcessTable> {
        if !self.fs.exists(&self.path) {
            debug!(path = ?self.path, "process file absent; starting with empty table");
            return Ok(ProcessTable::default());
        }

        let contents = self
            .fs
            .read_to_string(&self.path)
            .map_err(StoreError::unavailable)?;

        toml::from_str(&contents)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, table: &ProcessTable) -> StoreResult<()> {
        let contents = toml::to_string(table)
            .map_err(|e| StoreError::Corrupt(format!("serializing process table: {e}")))?;

        self.fs
            .write(&self.path, contents.as_bytes())
            .with_context(|| format!("saving process table to {:?}", self.path))
            .map_err(StoreError::unavailable)
    }
}
