// tests/persistence_disabled.rs

use std::error::Error;
use std::sync::Arc;

use scriptrun::identity::{ConfigDirectory, Identity};
use scriptrun::lifecycle::{LifecycleDeps, PersistenceGate, ProcessLifecycleManager};
use scriptrun::logging::Severity;
use scriptrun::types::{parameters_from_args, ScriptParameter};
use scriptrun_test_utils::builders::ConfigFileBuilder;
use scriptrun_test_utils::{init_tracing, InstrumentedStore, RecordingSink};

type TestResult = Result<(), Box<dyn Error>>;

fn manager(
    params: Vec<ScriptParameter>,
    gate: PersistenceGate,
) -> (ProcessLifecycleManager, InstrumentedStore, RecordingSink) {
    init_tracing();
    let store = InstrumentedStore::new();
    let sink = RecordingSink::new();
    let deps = LifecycleDeps {
        directory: Arc::new(ConfigDirectory::new([Identity {
            id: "eperson-1".to_string(),
            email: "user@example.org".to_string(),
        }])),
        store: Arc::new(store.clone()),
        sink: Arc::new(sink.clone()),
    };
    (
        ProcessLifecycleManager::new("import-items", params, gate, deps),
        store,
        sink,
    )
}

#[test]
fn gate_reads_the_config_flag() {
    let off = ConfigFileBuilder::new().build();
    let on = ConfigFileBuilder::new().save_enabled(true).build();

    assert!(!PersistenceGate::from_config(&off.process).is_enabled());
    assert!(PersistenceGate::from_config(&on.process).is_enabled());
}

#[test]
fn disabled_tracking_never_calls_the_store() -> TestResult {
    let inputs = vec![
        Vec::new(),
        parameters_from_args(&["-e", "user@example.org"]),
        parameters_from_args(&["-e", "ghost@example.org"]),
        parameters_from_args(&["-f", "data.csv"]),
    ];

    for params in inputs {
        let (mut m, store, _sink) = manager(params, PersistenceGate::disabled());
        m.start();
        m.handle_completion();
        let signal = m.fail_with_message("late failure");

        assert_eq!(signal.code(), 1);
        assert_eq!(m.process_id(), None);
        assert!(store.calls().is_empty(), "store touched: {:?}", store.calls());
    }
    Ok(())
}

#[test]
fn disabled_tracking_still_reports_failures() -> TestResult {
    let (mut m, store, sink) = manager(Vec::new(), PersistenceGate::disabled());
    m.start();
    assert_eq!(m.process_id(), None);

    let err = std::io::Error::other("checksum mismatch");
    let signal = m.handle_exception(Some("bad input"), Some(&err));

    assert_eq!(signal.code(), 1);
    assert!(sink.contains(Severity::Error, "bad input"));
    assert!(sink.contains(Severity::Error, "checksum mismatch"));
    assert!(store.calls().is_empty());
    Ok(())
}

#[test]
fn disabled_tracking_still_resolves_identity() -> TestResult {
    let (mut m, store, sink) = manager(
        parameters_from_args(&["-e", "ghost@example.org"]),
        PersistenceGate::disabled(),
    );
    m.start();

    assert!(sink.contains(Severity::Error, "ghost@example.org"));
    assert!(store.calls().is_empty());
    Ok(())
}
