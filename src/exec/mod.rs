// src/exec/mod.rs

//! Script execution layer.
//!
//! Runs the command configured for a script with `tokio::process::Command`,
//! optionally feeding an input artifact to its stdin and capturing its stdout
//! into an output artifact. The lifecycle bookkeeping around a run lives in
//! [`crate::lifecycle`]; this module only reports how the command ended.

pub mod runner;

pub use runner::{run_script, ScriptInvocation};

/// How a script command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    Success,
    Failed(i32),
}
