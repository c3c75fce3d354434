// tests/lifecycle_scenarios.rs

use std::error::Error;
use std::sync::Arc;

use scriptrun::identity::{ConfigDirectory, Identity};
use scriptrun::lifecycle::{ExitSignal, LifecycleDeps, Phase, PersistenceGate, ProcessLifecycleManager};
use scriptrun::logging::Severity;
use scriptrun::store::ProcessStatus;
use scriptrun::types::ScriptParameter;
use scriptrun_test_utils::{init_tracing, InstrumentedStore, RecordingSink, StoreCall};

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    store: InstrumentedStore,
    sink: RecordingSink,
    manager: ProcessLifecycleManager,
}

fn harness(params: Vec<ScriptParameter>, known: &[(&str, &str)]) -> Harness {
    init_tracing();

    let store = InstrumentedStore::new();
    let sink = RecordingSink::new();
    let directory = ConfigDirectory::new(known.iter().map(|(id, email)| Identity {
        id: id.to_string(),
        email: email.to_string(),
    }));

    let deps = LifecycleDeps {
        directory: Arc::new(directory),
        store: Arc::new(store.clone()),
        sink: Arc::new(sink.clone()),
    };
    let manager = ProcessLifecycleManager::new("import-items", params, PersistenceGate::enabled(), deps)
        .with_groups(["administrators"]);

    Harness {
        store,
        sink,
        manager,
    }
}

fn import_params() -> Vec<ScriptParameter> {
    vec![ScriptParameter::new("-e user@example.org -f data.csv", "")]
}

fn anonymous_params() -> Vec<ScriptParameter> {
    vec![ScriptParameter::new("-f", "data.csv")]
}

#[test]
fn import_items_runs_then_completes() -> TestResult {
    let mut h = harness(import_params(), &[("eperson-1", "user@example.org")]);

    h.manager.start();

    let id = h.manager.process_id().ok_or("no process id after start")?;
    let record = h.store.record(id).ok_or("record missing")?;
    assert_eq!(record.status, ProcessStatus::Running);
    assert_eq!(record.owner.as_deref(), Some("eperson-1"));
    assert_eq!(record.script_name, "import-items");
    assert_eq!(record.parameters, import_params());
    assert!(record.groups.contains("administrators"));

    h.manager.handle_completion();

    let record = h.store.record(id).ok_or("record missing")?;
    assert_eq!(record.status, ProcessStatus::Completed);
    assert!(record.finished_at.is_some());
    assert_eq!(h.manager.phase(), Phase::Completed);
    assert_eq!(h.store.open_scopes(), 0);
    assert!(h.sink.contains(Severity::Info, "The script has started"));
    assert!(h.sink.contains(Severity::Info, "The script has completed"));
    Ok(())
}

#[test]
fn unknown_email_creates_no_record() -> TestResult {
    let mut h = harness(import_params(), &[("eperson-2", "someone@example.org")]);

    h.manager.start();

    assert_eq!(h.manager.process_id(), None);
    assert!(h.store.records().is_empty());
    assert!(h.store.calls().is_empty());
    assert!(h.sink.contains(Severity::Error, "user@example.org"));
    Ok(())
}

#[test]
fn identity_flag_without_email_is_logged() -> TestResult {
    let mut h = harness(vec![ScriptParameter::new("-e", "not-an-address")], &[]);

    h.manager.start();

    assert_eq!(h.manager.process_id(), None);
    assert!(h.sink.contains(Severity::Error, "No email found in parameters"));
    Ok(())
}

#[test]
fn run_without_identity_flag_is_anonymous() -> TestResult {
    let mut h = harness(vec![ScriptParameter::new("-f", "data.csv")], &[]);

    h.manager.start();

    let id = h.manager.process_id().ok_or("no process id")?;
    assert_eq!(h.store.record(id).ok_or("record missing")?.owner, None);
    Ok(())
}

#[test]
fn empty_parameters_create_no_record() -> TestResult {
    let mut h = harness(Vec::new(), &[("eperson-1", "user@example.org")]);

    h.manager.start();

    assert_eq!(h.manager.process_id(), None);
    assert!(h.store.calls().is_empty());
    assert!(h.sink.contains(Severity::Error, "no process record will be created"));
    assert!(h.sink.contains(Severity::Error, "No parameters given"));

    h.manager.handle_completion();
    assert!(h.store.calls().is_empty());
    assert!(h.sink.contains(Severity::Warning, "nothing to complete"));
    Ok(())
}

#[test]
fn exception_without_message_reports_cause_once() -> TestResult {
    let mut h = harness(import_params(), &[("eperson-1", "user@example.org")]);
    h.manager.start();

    let _ = h.manager.fail_with_cause(&std::io::Error::other("boom"));

    let errors = h.sink.at(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Script failed");
    assert_eq!(errors[0].cause.as_deref(), Some("boom"));
    Ok(())
}

#[test]
fn creation_failure_leaves_id_unset_and_names_invoker() -> TestResult {
    let mut h = harness(import_params(), &[("eperson-1", "user@example.org")]);
    h.store.fail_on(StoreCall::Commit);

    h.manager.start();

    assert_eq!(h.manager.process_id(), None);
    assert!(h.store.records().is_empty());
    assert_eq!(h.store.open_scopes(), 0);
    assert!(h.sink.contains(Severity::Error, "identity eperson-1"));
    assert!(h.sink.contains(Severity::Error, "transient storage failure"));
    Ok(())
}

#[test]
fn anonymous_creation_failure_mentions_command_line_user() -> TestResult {
    let mut h = harness(anonymous_params(), &[]);
    h.store.fail_on(StoreCall::Create);

    h.manager.start();

    assert_eq!(h.manager.process_id(), None);
    assert!(h.sink.contains(Severity::Error, "command-line user"));
    assert_eq!(h.store.open_scopes(), 0);
    Ok(())
}

#[test]
fn failure_marks_record_failed_and_signals_exit() -> TestResult {
    let mut h = harness(import_params(), &[("eperson-1", "user@example.org")]);
    h.manager.start();
    let id = h.manager.process_id().ok_or("no process id")?;

    let cause = std::io::Error::other("row 3: missing title");
    let signal = h.manager.handle_exception(Some("bad input"), Some(&cause));

    assert_eq!(signal, ExitSignal::FAILURE);
    assert_eq!(signal.code(), 1);
    assert_eq!(h.store.record(id).ok_or("record missing")?.status, ProcessStatus::Failed);
    assert!(h.sink.contains(Severity::Error, "bad input"));
    assert!(h.sink.contains(Severity::Error, "row 3: missing title"));
    assert_eq!(h.store.open_scopes(), 0);
    Ok(())
}

#[test]
fn storage_outage_while_failing_still_signals_exit() -> TestResult {
    let mut h = harness(import_params(), &[("eperson-1", "user@example.org")]);
    h.manager.start();
    let id = h.manager.process_id().ok_or("no process id")?;

    h.store.fail_on(StoreCall::Fail);
    let signal = h.manager.fail_with_message("script crashed");

    assert_eq!(signal.code(), 1);
    assert_eq!(h.store.record(id).ok_or("record missing")?.status, ProcessStatus::Running);
    assert!(h.sink.contains(Severity::Error, "Could not mark process"));
    assert!(h.sink.contains(Severity::Error, "injected failure on Fail"));
    assert_eq!(h.store.open_scopes(), 0);
    Ok(())
}

#[test]
fn unreachable_store_while_failing_still_signals_exit() -> TestResult {
    let mut h = harness(anonymous_params(), &[]);
    h.manager.start();

    h.store.fail_on(StoreCall::Begin);
    let signal = h.manager.fail_with_cause(&std::io::Error::other("boom"));

    assert_eq!(signal, ExitSignal::FAILURE);
    assert!(h.sink.contains(Severity::Error, "Could not mark process"));
    Ok(())
}

#[test]
fn completion_after_failure_does_not_revert() -> TestResult {
    let mut h = harness(anonymous_params(), &[]);
    h.manager.start();
    let id = h.manager.process_id().ok_or("no process id")?;

    let _ = h.manager.fail_with_message("first failure");
    let calls_before = h.store.calls().len();
    h.manager.handle_completion();

    assert_eq!(h.store.record(id).ok_or("record missing")?.status, ProcessStatus::Failed);
    assert_eq!(h.store.calls().len(), calls_before, "no store call after a finished run");
    assert!(h.sink.contains(Severity::Warning, "already finished"));
    Ok(())
}

#[test]
fn completion_storage_error_is_contained() -> TestResult {
    let mut h = harness(anonymous_params(), &[]);
    h.manager.start();
    let id = h.manager.process_id().ok_or("no process id")?;

    h.store.fail_on(StoreCall::Complete);
    h.manager.handle_completion();

    assert_eq!(h.store.record(id).ok_or("record missing")?.status, ProcessStatus::Running);
    assert!(h.sink.contains(Severity::Error, "could not be completed"));
    assert_eq!(h.store.open_scopes(), 0);
    Ok(())
}

#[test]
fn completion_without_record_never_touches_store() -> TestResult {
    let mut h = harness(import_params(), &[]);
    h.manager.start();
    assert_eq!(h.manager.process_id(), None);

    h.manager.handle_completion();

    assert!(h.store.calls().is_empty());
    assert!(h.sink.contains(Severity::Warning, "nothing to complete"));
    Ok(())
}

#[test]
fn every_scope_is_committed_or_released() -> TestResult {
    let mut h = harness(anonymous_params(), &[]);
    h.manager.start();
    h.manager.handle_completion();

    let calls = h.store.calls();
    let begins = calls.iter().filter(|c| **c == StoreCall::Begin).count();
    let commits = calls.iter().filter(|c| **c == StoreCall::Commit).count();
    assert_eq!(begins, 2);
    assert_eq!(commits, 2);
    assert_eq!(
        calls,
        vec![
            StoreCall::Begin,
            StoreCall::Create,
            StoreCall::Start,
            StoreCall::Commit,
            StoreCall::Begin,
            StoreCall::Find,
            StoreCall::Complete,
            StoreCall::Commit,
        ]
    );
    assert_eq!(h.store.open_scopes(), 0);
    Ok(())
}
