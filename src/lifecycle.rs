// src/lifecycle.rs

//! Lifecycle of one script run.
//!
//! [`ProcessLifecycleManager`] attributes a run to its invoker, keeps the
//! matching process record in step with the run, and turns a script failure
//! into an [`ExitSignal`] for the binary to act on.
//!
//! Every store interaction happens inside its own scope opened by
//! [`ProcessStore::begin`]; the scope is a `Box` that is dropped (and so
//! released) on every return path, including early `?` exits.
//!
//! No operation here returns an error: resolution and storage failures are
//! reported through the [`LogSink`] and the run carries on without (or with
//! an unchanged) record.

use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::sync::Arc;

use tracing::debug;

use crate::config::ProcessSection;
use crate::errors::StoreError;
use crate::identity::{Identity, IdentityDirectory, IdentityResolver};
use crate::logging::LogSink;
use crate::store::{ProcessId, ProcessStatus, ProcessStore};
use crate::types::{display_parameters, ScriptParameter};

/// Logged by [`ProcessLifecycleManager::handle_exception`] when no message is given.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Script failed";

/// Whether process records are tracked at all.
///
/// Captured once when a manager is built so that one run behaves
/// consistently even if configuration changes underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceGate {
    enabled: bool,
}

impl PersistenceGate {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled() -> Self {
        Self::new(true)
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn from_config(process: &ProcessSection) -> Self {
        Self::new(process.save_enabled)
    }

    pub fn is_enabled(self) -> bool {
        self.enabled
    }
}

/// Collaborators injected into a [`ProcessLifecycleManager`].
#[derive(Clone)]
pub struct LifecycleDeps {
    pub directory: Arc<dyn IdentityDirectory>,
    pub store: Arc<dyn ProcessStore>,
    pub sink: Arc<dyn LogSink>,
}

/// Where a run is in its lifecycle, independent of any persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Request to terminate the host process with `code`.
#[must_use = "the host process must exit with this code"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitSignal {
    code: i32,
}

impl ExitSignal {
    /// Exit status for a failed script run.
    pub const FAILURE: ExitSignal = ExitSignal { code: 1 };

    pub fn code(self) -> i32 {
        self.code
    }

    /// Terminate the current process. Only the binary entry point calls this.
    pub fn exit(self) -> ! {
        std::process::exit(self.code)
    }
}

/// Outcome of trying to move a stored record to a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Applied,
    AlreadyTerminal(ProcessStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Completed,
    Failed,
}

/// Drives one script invocation from start to completion or failure.
pub struct ProcessLifecycleManager {
    script_name: String,
    parameters: Vec<ScriptParameter>,
    groups: BTreeSet<String>,
    persistence_enabled: bool,
    process_id: Option<ProcessId>,
    phase: Phase,
    deps: LifecycleDeps,
}

impl ProcessLifecycleManager {
    pub fn new(
        script_name: impl Into<String>,
        parameters: Vec<ScriptParameter>,
        gate: PersistenceGate,
        deps: LifecycleDeps,
    ) -> Self {
        Self {
            script_name: script_name.into(),
            parameters,
            groups: BTreeSet::new(),
            persistence_enabled: gate.is_enabled(),
            process_id: None,
            phase: Phase::NotStarted,
            deps,
        }
    }

    /// Groups recorded on the process created by [`start`](Self::start).
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Id of the record created by `start`, if one was committed.
    pub fn process_id(&self) -> Option<ProcessId> {
        self.process_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Resolve the invoker and, when tracking is enabled, create the process
    /// record and move it to RUNNING in a single committed scope.
    ///
    /// Calling `start` more than once is logged and ignored.
    pub fn start(&mut self) {
        if self.phase != Phase::NotStarted {
            self.deps.sink.warning(&format!(
                "Script {} has already been started; ignoring repeated start",
                self.script_name
            ));
            return;
        }
        self.phase = Phase::Running;
        self.deps.sink.info("The script has started");

        let resolver = IdentityResolver::new(self.deps.directory.as_ref());
        let owner = match resolver.resolve(&self.parameters) {
            Ok(owner) => owner,
            Err(err) => {
                self.deps.sink.error(
                    &format!(
                        "Could not resolve the invoking identity for script {} with parameters {}; \
                         no process record will be created",
                        self.script_name,
                        display_parameters(&self.parameters)
                    ),
                    Some(&err),
                );
                return;
            }
        };

        if !self.persistence_enabled {
            debug!(script = %self.script_name, "process tracking disabled; no record created");
            return;
        }

        match self.create_running_record(owner.as_ref()) {
            Ok(id) => {
                self.process_id = Some(id);
                debug!(script = %self.script_name, process_id = id, "process record running");
            }
            Err(err) => {
                let invoker = match &owner {
                    Some(identity) => format!("identity {}", identity.id),
                    None => "command-line user".to_string(),
                };
                self.deps.sink.error(
                    &format!(
                        "Process for script {} with {} and parameters {} could not be created ({})",
                        self.script_name,
                        invoker,
                        display_parameters(&self.parameters),
                        err.kind()
                    ),
                    Some(&err),
                );
            }
        }
    }

    /// Mark the run COMPLETED.
    pub fn handle_completion(&mut self) {
        if matches!(self.phase, Phase::Completed | Phase::Failed) {
            self.deps.sink.warning(&format!(
                "Script {} has already finished; ignoring completion",
                self.script_name
            ));
            return;
        }
        self.phase = Phase::Completed;
        self.deps.sink.info("The script has completed");

        if !self.persistence_enabled {
            return;
        }
        let Some(id) = self.process_id else {
            self.deps.sink.warning(&format!(
                "No process record exists for script {}; nothing to complete",
                self.script_name
            ));
            return;
        };

        match self.finish(id, Terminal::Completed) {
            Ok(Transition::Applied) => {
                debug!(process_id = id, "process record completed");
            }
            Ok(Transition::AlreadyTerminal(status)) => {
                self.deps.sink.warning(&format!(
                    "Process {id} is already {status}; not marking it COMPLETED"
                ));
            }
            Err(StoreError::NotFound(_)) => {
                self.deps.sink.error(
                    &format!("Process {id} no longer exists and could not be completed"),
                    None,
                );
            }
            Err(err) => {
                self.deps.sink.error(
                    &format!("Process {id} could not be completed ({})", err.kind()),
                    Some(&err),
                );
            }
        }
    }

    /// Report a script failure and mark the run FAILED.
    ///
    /// Always returns [`ExitSignal::FAILURE`], whether or not the FAILED
    /// status could be stored.
    pub fn handle_exception(
        &mut self,
        message: Option<&str>,
        cause: Option<&(dyn StdError + 'static)>,
    ) -> ExitSignal {
        self.deps.sink.error(message.unwrap_or(DEFAULT_FAILURE_MESSAGE), cause);
        self.phase = Phase::Failed;

        if !self.persistence_enabled {
            return ExitSignal::FAILURE;
        }
        let Some(id) = self.process_id else {
            self.deps.sink.warning(&format!(
                "No process record exists for script {}; failure is not recorded",
                self.script_name
            ));
            return ExitSignal::FAILURE;
        };

        match self.finish(id, Terminal::Failed) {
            Ok(Transition::Applied) => {
                debug!(process_id = id, "process record failed");
            }
            Ok(Transition::AlreadyTerminal(status)) => {
                self.deps.sink.warning(&format!(
                    "Process {id} is already {status}; not marking it FAILED"
                ));
            }
            Err(err) => {
                self.deps.sink.error(
                    &format!(
                        "Could not mark process {id} as FAILED while handling a script failure ({})",
                        err.kind()
                    ),
                    Some(&err),
                );
            }
        }

        ExitSignal::FAILURE
    }

    /// [`handle_exception`](Self::handle_exception) with only a message.
    pub fn fail_with_message(&mut self, message: &str) -> ExitSignal {
        self.handle_exception(Some(message), None)
    }

    /// [`handle_exception`](Self::handle_exception) with only a cause.
    pub fn fail_with_cause(&mut self, cause: &(dyn StdError + 'static)) -> ExitSignal {
        self.handle_exception(None, Some(cause))
    }

    fn create_running_record(&self, owner: Option<&Identity>) -> Result<ProcessId, StoreError> {
        let mut scope = self.deps.store.begin()?;
        let mut record =
            scope.create(owner, &self.script_name, &self.parameters, &self.groups)?;
        scope.start(&mut record)?;
        scope.commit()?;
        Ok(record.id)
    }

    fn finish(&self, id: ProcessId, target: Terminal) -> Result<Transition, StoreError> {
        let mut scope = self.deps.store.begin()?;
        let mut record = scope.find(id)?.ok_or(StoreError::NotFound(id))?;

        if record.status.is_terminal() {
            return Ok(Transition::AlreadyTerminal(record.status));
        }

        match target {
            Terminal::Completed => scope.complete(&mut record)?,
            Terminal::Failed => scope.fail(&mut record)?,
        }
        scope.commit()?;
        Ok(Transition::Applied)
    }
}
