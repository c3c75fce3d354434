// src/config/mod.rs

//! Configuration loading and validation for scriptrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like unique identity emails (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, DEFAULT_CONFIG_PATH};
pub use model::{ConfigFile, NotifySection, ProcessSection, RawConfigFile, ScriptConfig};
