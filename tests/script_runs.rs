// tests/script_runs.rs
#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;

use scriptrun::config::ConfigFile;
use scriptrun::fs::RealFileSystem;
use scriptrun::store::{FileBackend, ProcessStatus, ProcessStore, ProcessTableStore};
use scriptrun::types::StoreMode;
use scriptrun::{open_store, run_configured_script};
use scriptrun_test_utils::builders::{ConfigFileBuilder, ScriptConfigBuilder};
use scriptrun_test_utils::init_tracing;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

fn tracked_config(script: &str, cmd: &str) -> ConfigFile {
    ConfigFileBuilder::new()
        .save_enabled(true)
        .store(StoreMode::File)
        .store_path("state/processes.toml")
        .special_group("administrators")
        .with_identity("eperson-1", "user@example.org")
        .with_script(script, ScriptConfigBuilder::new(cmd).build())
        .build()
}

fn anonymous_args() -> Vec<String> {
    vec!["-f".to_string(), "data.csv".to_string()]
}

fn records(root: &TempDir) -> Result<Vec<scriptrun::store::ProcessRecord>, Box<dyn Error>> {
    let store = ProcessTableStore::new(FileBackend::new(
        Arc::new(RealFileSystem),
        root.path().join("state/processes.toml"),
    ));
    Ok(store.list()?)
}

#[tokio::test]
async fn successful_script_is_recorded_completed() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let cfg = tracked_config("import-items", "true");

    let args = vec!["-e".to_string(), "user@example.org".to_string()];
    let signal = run_configured_script(&cfg, root.path(), "import-items", args).await?;
    assert_eq!(signal, None);

    let records = records(&root)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessStatus::Completed);
    assert_eq!(records[0].owner.as_deref(), Some("eperson-1"));
    assert!(records[0].groups.contains("administrators"));
    Ok(())
}

#[tokio::test]
async fn failing_script_is_recorded_failed_and_signals_exit() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let cfg = tracked_config("broken", "exit 4");

    let signal = run_configured_script(&cfg, root.path(), "broken", anonymous_args()).await?;
    assert_eq!(signal.map(|s| s.code()), Some(1));

    let records = records(&root)?;
    assert_eq!(records[0].status, ProcessStatus::Failed);
    assert_eq!(records[0].owner, None);
    Ok(())
}

#[tokio::test]
async fn missing_input_artifact_fails_the_run() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let missing = root.path().join("nope.csv");
    let cfg = ConfigFileBuilder::new()
        .save_enabled(true)
        .store_path("state/processes.toml")
        .with_script(
            "needs-input",
            ScriptConfigBuilder::new("cat")
                .input(missing.to_str().ok_or("non-utf8 temp path")?)
                .build(),
        )
        .build();

    let signal = run_configured_script(&cfg, root.path(), "needs-input", anonymous_args()).await?;
    assert_eq!(signal.map(|s| s.code()), Some(1));
    assert_eq!(records(&root)?[0].status, ProcessStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn runs_accumulate_in_the_file_store() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let cfg = tracked_config("again", "true");

    for _ in 0..3 {
        run_configured_script(&cfg, root.path(), "again", anonymous_args()).await?;
    }

    let ids: Vec<u64> = records(&root)?.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn output_artifact_lands_next_to_the_config() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let cfg = ConfigFileBuilder::new()
        .store(StoreMode::Memory)
        .with_script(
            "report",
            ScriptConfigBuilder::new("echo done").output("out/report.txt").build(),
        )
        .build();

    let signal = run_configured_script(&cfg, root.path(), "report", anonymous_args()).await?;
    assert_eq!(signal, None);

    let written = std::fs::read_to_string(root.path().join("out/report.txt"))?;
    assert_eq!(written, "done -f data.csv\n");
    Ok(())
}

#[tokio::test]
async fn unknown_script_is_an_error() -> TestResult {
    let root = TempDir::new()?;
    let cfg = tracked_config("known", "true");

    let result = run_configured_script(&cfg, root.path(), "unknown", Vec::new()).await;
    assert!(result.is_err());
    Ok(())
}

#[test]
fn memory_store_is_selected_by_config() -> TestResult {
    let root = TempDir::new()?;
    let cfg = ConfigFileBuilder::new().store(StoreMode::Memory).build();

    let store = open_store(&cfg, root.path());
    assert!(store.list()?.is_empty());
    assert!(!root.path().join(".scriptrun").exists());
    Ok(())
}
