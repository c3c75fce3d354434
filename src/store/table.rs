// src/store/table.rs

//! Staged-commit process store shared by the memory and file backends.
//!
//! A [`TableScope`] loads a snapshot of the table when it opens and records
//! every change it makes as a [`StagedChange`]. On commit the changes are
//! replayed against the *current* table under the store's commit lock: a
//! transition whose starting status no longer matches is rejected with
//! [`StoreError::Conflict`], so two terminal transitions of one record can
//! never both land.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::errors::StoreError;
use crate::identity::Identity;
use crate::store::{ProcessId, ProcessRecord, ProcessStatus, ProcessStore, StoreResult, StoreScope};
use crate::types::ScriptParameter;

/// Serialized form of every record a store holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessTable {
    /// Highest id handed out so far.
    #[serde(default)]
    pub last_id: ProcessId,
    #[serde(default)]
    pub process: Vec<ProcessRecord>,
}

impl ProcessTable {
    pub fn get(&self, id: ProcessId) -> Option<&ProcessRecord> {
        self.process.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: ProcessId) -> Option<&mut ProcessRecord> {
        self.process.iter_mut().find(|r| r.id == id)
    }
}

/// Where a [`ProcessTableStore`] keeps its table.
pub trait TableBackend: Send + Sync + Debug {
    fn load(&self) -> StoreResult<ProcessTable>;
    fn save(&self, table: &ProcessTable) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
enum StagedChange {
    Insert(ProcessRecord),
    Transition {
        id: ProcessId,
        from: ProcessStatus,
        to: ProcessStatus,
        at: DateTime<Utc>,
    },
}

/// [`ProcessStore`] over any [`TableBackend`].
#[derive(Debug)]
pub struct ProcessTableStore {
    backend: Box<dyn TableBackend>,
    commit_lock: Mutex<()>,
    open_scopes: Arc<AtomicUsize>,
}

impl ProcessTableStore {
    pub fn new(backend: impl TableBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            commit_lock: Mutex::new(()),
            open_scopes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of scopes currently open against this store.
    pub fn open_scopes(&self) -> usize {
        self.open_scopes.load(Ordering::SeqCst)
    }

    fn apply(&self, changes: &[StagedChange]) -> StoreResult<()> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("process store commit lock poisoned".into()))?;

        let mut current = self.backend.load()?;

        for change in changes {
            match change {
                StagedChange::Insert(record) => {
                    if let Some(existing) = current.get(record.id) {
                        return Err(StoreError::Conflict {
                            id: record.id,
                            expected: record.status,
                            found: existing.status,
                        });
                    }
                    current.last_id = current.last_id.max(record.id);
                    current.process.push(record.clone());
                }
                StagedChange::Transition { id, from, to, at } => {
                    let record = current.get_mut(*id).ok_or(StoreError::NotFound(*id))?;
                    if record.status != *from {
                        return Err(StoreError::Conflict {
                            id: *id,
                            expected: *from,
                            found: record.status,
                        });
                    }
                    stamp(record, *to, *at);
                }
            }
        }

        current.process.sort_by_key(|r| r.id);
        self.backend.save(&current)
    }
}

impl ProcessStore for ProcessTableStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreScope + '_>> {
        let snapshot = self.backend.load()?;
        let open = self.open_scopes.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(open_scopes = open, "process scope opened");
        Ok(Box::new(TableScope {
            store: self,
            snapshot,
            staged: Vec::new(),
            committed: false,
        }))
    }

    fn list(&self) -> StoreResult<Vec<ProcessRecord>> {
        let mut records = self.backend.load()?.process;
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

struct TableScope<'a> {
    store: &'a ProcessTableStore,
    snapshot: ProcessTable,
    staged: Vec<StagedChange>,
    committed: bool,
}

impl TableScope<'_> {
    fn transition(&mut self, record: &mut ProcessRecord, to: ProcessStatus) -> StoreResult<()> {
        let current = self
            .snapshot
            .get_mut(record.id)
            .ok_or(StoreError::NotFound(record.id))?;

        let from = current.status;
        if !from.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                id: record.id,
                from,
                to,
            });
        }

        let at = Utc::now();
        stamp(current, to, at);
        *record = current.clone();
        self.staged.push(StagedChange::Transition {
            id: record.id,
            from,
            to,
            at,
        });
        debug!(process_id = record.id, %from, %to, "staged process transition");
        Ok(())
    }
}

impl StoreScope for TableScope<'_> {
    fn create(
        &mut self,
        owner: Option<&Identity>,
        script_name: &str,
        parameters: &[ScriptParameter],
        groups: &BTreeSet<String>,
    ) -> StoreResult<ProcessRecord> {
        let id = self.snapshot.last_id + 1;
        let record = ProcessRecord {
            id,
            owner: owner.map(|o| o.id.clone()),
            script_name: script_name.to_string(),
            status: ProcessStatus::Created,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            groups: groups.clone(),
            parameters: parameters.to_vec(),
        };

        self.snapshot.last_id = id;
        self.snapshot.process.push(record.clone());
        self.staged.push(StagedChange::Insert(record.clone()));
        debug!(process_id = id, script = script_name, "staged new process record");
        Ok(record)
    }

    fn find(&mut self, id: ProcessId) -> StoreResult<Option<ProcessRecord>> {
        Ok(self.snapshot.get(id).cloned())
    }

    fn start(&mut self, record: &mut ProcessRecord) -> StoreResult<()> {
        self.transition(record, ProcessStatus::Running)
    }

    fn complete(&mut self, record: &mut ProcessRecord) -> StoreResult<()> {
        self.transition(record, ProcessStatus::Completed)
    }

    fn fail(&mut self, record: &mut ProcessRecord) -> StoreResult<()> {
        self.transition(record, ProcessStatus::Failed)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        // An insert immediately followed by transitions of the same record
        // collapses into the snapshot's version of that record.
        let changes = collapse(&self.staged, &self.snapshot);
        self.store.apply(&changes)?;
        self.committed = true;
        debug!(changes = changes.len(), "process scope committed");
        Ok(())
    }
}

impl Drop for TableScope<'_> {
    fn drop(&mut self) {
        self.store.open_scopes.fetch_sub(1, Ordering::SeqCst);
        if !self.committed && !self.staged.is_empty() {
            debug!(
                discarded = self.staged.len(),
                "process scope closed without commit; staged changes discarded"
            );
        }
    }
}

fn stamp(record: &mut ProcessRecord, to: ProcessStatus, at: DateTime<Utc>) {
    record.status = to;
    match to {
        ProcessStatus::Running => record.started_at = Some(at),
        ProcessStatus::Completed | ProcessStatus::Failed => record.finished_at = Some(at),
        ProcessStatus::Created => {}
    }
}

fn collapse(staged: &[StagedChange], snapshot: &ProcessTable) -> Vec<StagedChange> {
    let inserted: BTreeSet<ProcessId> = staged
        .iter()
        .filter_map(|c| match c {
            StagedChange::Insert(r) => Some(r.id),
            _ => None,
        })
        .collect();

    staged
        .iter()
        .filter_map(|change| match change {
            StagedChange::Insert(r) => snapshot.get(r.id).cloned().map(StagedChange::Insert),
            StagedChange::Transition { id, .. } if inserted.contains(id) => None,
            other => Some(other.clone()),
        })
        .collect()
}
