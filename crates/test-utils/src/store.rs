use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use scriptrun::errors::StoreError;
use scriptrun::identity::Identity;
use scriptrun::store::{
    MemoryBackend, ProcessId, ProcessRecord, ProcessStore, ProcessTableStore, StoreResult,
    StoreScope,
};
use scriptrun::types::ScriptParameter;

/// A store operation observed by [`InstrumentedStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    Begin,
    Create,
    Find,
    Start,
    Complete,
    Fail,
    Commit,
    List,
}

/// In-memory process store that records every call and can be told to fail
/// specific operations with [`StoreError::Unavailable`].
#[derive(Debug, Clone)]
pub struct InstrumentedStore {
    inner: Arc<ProcessTableStore>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failing: Arc<Mutex<HashSet<StoreCall>>>,
}

impl Default for InstrumentedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ProcessTableStore::new(MemoryBackend::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make `call` fail from now on.
    pub fn fail_on(&self, call: StoreCall) {
        self.failing.lock().unwrap().insert(call);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn open_scopes(&self) -> usize {
        self.inner.open_scopes()
    }

    /// Committed records, read without being recorded as a call.
    pub fn records(&self) -> Vec<ProcessRecord> {
        self.inner.list().expect("in-memory list cannot fail")
    }

    pub fn record(&self, id: ProcessId) -> Option<ProcessRecord> {
        self.records().into_iter().find(|r| r.id == id)
    }

    fn observe(&self, call: StoreCall) -> StoreResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&call) {
            return Err(StoreError::Unavailable(
                format!("injected failure on {call:?}").into(),
            ));
        }
        Ok(())
    }
}

impl ProcessStore for InstrumentedStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreScope + '_>> {
        self.observe(StoreCall::Begin)?;
        let inner = self.inner.begin()?;
        Ok(Box::new(InstrumentedScope { store: self, inner }))
    }

    fn list(&self) -> StoreResult<Vec<ProcessRecord>> {
        self.observe(StoreCall::List)?;
        self.inner.list()
    }
}

struct InstrumentedScope<'a> {
    store: &'a InstrumentedStore,
    inner: Box<dyn StoreScope + 'a>,
}

impl StoreScope for InstrumentedScope<'_> {
    fn create(
        &mut self,
        owner: Option<&Identity>,
        script_name: &str,
        parameters: &[ScriptParameter],
        groups: &BTreeSet<String>,
    ) -> StoreResult<ProcessRecord> {
        self.store.observe(StoreCall::Create)?;
        self.inner.create(owner, script_name, parameters, groups)
    }

    fn find(&mut self, id: ProcessId) -> StoreResult<Option<ProcessRecord>> {
        self.store.observe(StoreCall::Find)?;
        self.inner.find(id)
    }

    fn start(&mut self, record: &mut ProcessRecord) -> StoreResult<()> {
        self.store.observe(StoreCall::Start)?;
        self.inner.start(record)
    }

    fn complete(&mut self, record: &mut ProcessRecord) -> StoreResult<()> {
        self.store.observe(StoreCall::Complete)?;
        self.inner.complete(record)
    }

    fn fail(&mut self, record: &mut ProcessRecord) -> StoreResult<()> {
        self.store.observe(StoreCall::Fail)?;
        self.inner.fail(record)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.store.observe(StoreCall::Commit)?;
        this.inner.commit()
    }
}
