// src/store/memory.rs

use std::sync::Mutex;

use crate::errors::StoreError;
use crate::store::table::{ProcessTable, TableBackend};
use crate::store::StoreResult;

/// Keeps the process table in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    table: Mutex<ProcessTable>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("in-memory process table lock poisoned".into())
    }
}

impl TableBackend for MemoryBackend {
    fn load(&self) -> StoreResult<ProcessTable> {
        let table = self.table.lock().map_err(|_| Self::poisoned())?;
        Ok(table.clone())
    }

    fn save(&self, table: &ProcessTable) -> StoreResult<()> {
        let mut current = self.table.lock().map_err(|_| Self::poisoned())?;
        *current = table.clone();
        Ok(())
    }
}
