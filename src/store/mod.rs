// src/store/mod.rs

//! Durable process records and the transactional store contract.
//!
//! Every mutation happens inside a [`StoreScope`] obtained from
//! [`ProcessStore::begin`]. A scope is a bounded unit of work: nothing it
//! stages is visible to other scopes until [`StoreScope::commit`] succeeds,
//! and dropping a scope without committing discards it.
//!
//! - [`table`] holds the staged-commit logic shared by both backends.
//! - [`memory`] keeps the table in memory.
//! - [`file`] persists the table as TOML through [`crate::fs::FileSystem`].

use std::collections::BTreeSet;
use std::fmt::{self, Debug};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::identity::Identity;
use crate::types::ScriptParameter;

pub mod file;
pub mod memory;
pub mod table;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use table::{ProcessTable, ProcessTableStore};

/// Identifier assigned to a process record at creation.
pub type ProcessId = u64;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Status of a persisted process record.
///
/// Only `Created -> Running -> {Completed | Failed}` is legal; the two
/// terminal states accept nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    Created,
    Running,
    Completed,
    Failed,
}

impl ProcessStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessStatus::Completed | ProcessStatus::Failed)
    }

    pub fn can_transition_to(self, next: ProcessStatus) -> bool {
        matches!(
            (self, next),
            (ProcessStatus::Created, ProcessStatus::Running)
                | (ProcessStatus::Running, ProcessStatus::Completed)
                | (ProcessStatus::Running, ProcessStatus::Failed)
        )
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Created => "CREATED",
            ProcessStatus::Running => "RUNNING",
            ProcessStatus::Completed => "COMPLETED",
            ProcessStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Durable representation of one script invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: ProcessId,
    /// Identifier of the invoking identity, if one was resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub script_name: String,
    pub status: ProcessStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub parameters: Vec<ScriptParameter>,
}

/// A store of process records that hands out transactional scopes.
pub trait ProcessStore: Send + Sync + Debug {
    /// Open a new transactional scope.
    fn begin(&self) -> StoreResult<Box<dyn StoreScope + '_>>;

    /// Snapshot of every committed record, ordered by id.
    fn list(&self) -> StoreResult<Vec<ProcessRecord>>;
}

/// One open unit of work against a [`ProcessStore`].
///
/// Transition methods update the passed record in place. Changes become
/// durable only once `commit` returns `Ok`.
pub trait StoreScope {
    fn create(
        &mut self,
        owner: Option<&Identity>,
        script_name: &str,
        parameters: &[ScriptParameter],
        groups: &BTreeSet<String>,
    ) -> StoreResult<ProcessRecord>;

    fn find(&mut self, id: ProcessId) -> StoreResult<Option<ProcessRecord>>;

    /// `Created -> Running`.
    fn start(&mut self, record: &mut ProcessRecord) -> StoreResult<()>;

    /// `Running -> Completed`.
    fn complete(&mut self, record: &mut ProcessRecord) -> StoreResult<()>;

    /// `Running -> Failed`.
    fn fail(&mut self, record: &mut ProcessRecord) -> StoreResult<()>;

    fn commit(self: Box<Self>) -> StoreResult<()>;
}
