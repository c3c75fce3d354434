// src/lib.rs

pub mod artifact;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod identity;
pub mod lifecycle;
pub mod logging;
pub mod notify;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::artifact::ArtifactAccess;
use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::ConfigFile;
use crate::errors::ScriptrunError;
use crate::exec::{run_script, ScriptInvocation, ScriptOutcome};
use crate::fs::RealFileSystem;
use crate::identity::{requested_email, ConfigDirectory, IdentityDirectory};
use crate::logging::ConsoleSink;
use crate::store::{FileBackend, MemoryBackend, ProcessRecord, ProcessStore, ProcessTableStore};
use crate::types::{display_parameters, parameters_from_args, StoreMode};

pub use crate::lifecycle::{ExitSignal, LifecycleDeps, PersistenceGate, ProcessLifecycleManager};

/// High-level entry point used by `main.rs`.
///
/// Returns `Some(signal)` when the host process must exit with a failure
/// status after a script run failed.
pub async fn run(args: CliArgs) -> Result<Option<ExitSignal>> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);

    match args.command {
        Command::Run {
            script,
            dry_run,
            args,
        } => {
            if dry_run {
                print_dry_run(&cfg, &script, &args)?;
                return Ok(None);
            }
            run_configured_script(&cfg, &root, &script, args).await
        }
        Command::Processes { id } => {
            let store = open_store(&cfg, &root);
            print_processes(store.as_ref(), id)?;
            Ok(None)
        }
        Command::Patterns { id } => {
            print_patterns(&cfg, id.as_deref())?;
            Ok(None)
        }
    }
}

/// Drive one script run through its whole lifecycle.
pub async fn run_configured_script(
    cfg: &ConfigFile,
    root: &Path,
    name: &str,
    args: Vec<String>,
) -> Result<Option<ExitSignal>> {
    let script = cfg
        .script
        .get(name)
        .ok_or_else(|| ScriptrunError::ScriptNotFound(name.to_string()))?;

    let deps = LifecycleDeps {
        directory: Arc::new(ConfigDirectory::new(cfg.identity.iter().cloned())),
        store: open_store(cfg, root),
        sink: Arc::new(ConsoleSink),
    };
    let mut manager = ProcessLifecycleManager::new(
        name,
        parameters_from_args(&args),
        PersistenceGate::from_config(&cfg.process),
        deps,
    )
    .with_groups(cfg.process.special_groups.iter().cloned());

    manager.start();

    let invocation = ScriptInvocation::from_config(name, script, args).relative_to(root);
    let artifacts = ArtifactAccess::local();

    match run_script(&invocation, &artifacts).await {
        Ok(ScriptOutcome::Success) => {
            manager.handle_completion();
            Ok(None)
        }
        Ok(ScriptOutcome::Failed(code)) => Ok(Some(
            manager.fail_with_message(&format!("Script {name} exited with status {code}")),
        )),
        Err(err) => {
            let cause: &(dyn std::error::Error + 'static) = err.as_ref();
            Ok(Some(manager.handle_exception(
                Some(&format!("Script {name} could not be run")),
                Some(cause),
            )))
        }
    }
}

/// Build the process store selected by `[process].store`.
pub fn open_store(cfg: &ConfigFile, root: &Path) -> Arc<dyn ProcessStore> {
    match cfg.process.store {
        StoreMode::Memory => Arc::new(ProcessTableStore::new(MemoryBackend::new())),
        StoreMode::File => {
            let path = root.join(&cfg.process.store_path);
            debug!(path = ?path, "using file-backed process store");
            Arc::new(ProcessTableStore::new(FileBackend::new(
                Arc::new(RealFileSystem),
                path,
            )))
        }
    }
}

/// Figure out the directory relative paths in the config refer to.
///
/// - If the config path has a non-empty parent (e.g. "ops/Scriptrun.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Scriptrun.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Show what `run` would do without running or recording anything.
fn print_dry_run(cfg: &ConfigFile, name: &str, args: &[String]) -> Result<()> {
    let script = cfg
        .script
        .get(name)
        .ok_or_else(|| ScriptrunError::ScriptNotFound(name.to_string()))?;
    let parameters = parameters_from_args(args);

    println!("scriptrun dry-run");
    println!("  script: {name}");
    println!("  cmd: {}", script.cmd);
    println!("  parameters: {}", display_parameters(&parameters));
    if let Some(ref input) = script.input {
        println!("  input: {input}");
    }
    if let Some(ref output) = script.output {
        println!("  output: {output}");
    }
    println!("  process.save_enabled = {}", cfg.process.save_enabled);
    println!("  process.store = {:?}", cfg.process.store);

    let directory = ConfigDirectory::new(cfg.identity.iter().cloned());
    match requested_email(&parameters) {
        Ok(None) => println!("  invoker: command-line user"),
        Ok(Some(email)) => match directory.find_by_email(email) {
            Some(identity) => println!("  invoker: {} ({})", identity.email, identity.id),
            None => println!("  invoker: unknown email {email}"),
        },
        Err(err) => println!("  invoker: {err}"),
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_processes(store: &dyn ProcessStore, id: Option<u64>) -> Result<()> {
    let records = store.list().map_err(ScriptrunError::from)?;
    let selected: Vec<&ProcessRecord> = match id {
        Some(id) => records.iter().filter(|r| r.id == id).collect(),
        None => records.iter().collect(),
    };

    if selected.is_empty() {
        info!(?id, "no matching process records");
        println!("no process records");
        return Ok(());
    }

    for record in selected {
        println!(
            "{:>5}  {:<10} {:<24} owner={} created={}",
            record.id,
            record.status.to_string(),
            record.script_name,
            record.owner.as_deref().unwrap_or("-"),
            record.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        if id.is_some() {
            println!("       parameters: {}", display_parameters(&record.parameters));
            if !record.groups.is_empty() {
                let groups: Vec<&str> = record.groups.iter().map(String::as_str).collect();
                println!("       groups: {}", groups.join(", "));
            }
            if let Some(started) = record.started_at {
                println!("       started: {}", started.format("%Y-%m-%d %H:%M:%S"));
            }
            if let Some(finished) = record.finished_at {
                println!("       finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }
    Ok(())
}

fn print_patterns(cfg: &ConfigFile, id: Option<&str>) -> Result<()> {
    let service = cfg.notify_service();
    let patterns = match id {
        Some(id) => match service.find_one(id) {
            Some(found) => vec![found],
            None => {
                return Err(ScriptrunError::ConfigError(format!(
                    "no notification pattern set with id '{id}'"
                ))
                .into());
            }
        },
        None => service.find_all(),
    };

    for pattern in patterns {
        println!("{}: {}", pattern.id, pattern.patterns.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn unreadable_process_table_is_a_store_error() {
        let fs = MockFileSystem::new();
        fs.add_file("processes.toml", b"[[process]\nid = ".to_vec());
        let store = ProcessTableStore::new(FileBackend::new(Arc::new(fs), "processes.toml"));

        let err = print_processes(&store, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScriptrunError>(),
            Some(ScriptrunError::Store(StoreError::Corrupt(_)))
        ));
    }
}
