// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::identity::Identity;
use crate::notify::NotifyPatternService;
use crate::store::file::PROCESS_FILE_PATH;
use crate::types::StoreMode;

/// Configuration exactly as deserialized from TOML.
///
/// ```toml
/// [process]
/// save_enabled = true
/// store = "file"
///
/// [[identity]]
/// id = "7f1c"
/// email = "user@example.org"
///
/// [script.import-items]
/// cmd = "python import.py"
///
/// [notify.patterns]
/// request-review = ["request-review", "request-endorsement"]
/// ```
///
/// All sections are optional. Convert to [`ConfigFile`] with `try_from`,
/// which validates it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub process: ProcessSection,

    #[serde(default)]
    pub identity: Vec<Identity>,

    /// Keys are script names as passed to `scriptrun run <name>`.
    #[serde(default)]
    pub script: BTreeMap<String, ScriptConfig>,

    #[serde(default)]
    pub notify: NotifySection,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub process: ProcessSection,
    pub identity: Vec<Identity>,
    pub script: BTreeMap<String, ScriptConfig>,
    pub notify: NotifySection,
}

impl ConfigFile {
    /// Build without validation. Callers should normally go through
    /// `ConfigFile::try_from(raw)`.
    pub fn new_unchecked(
        process: ProcessSection,
        identity: Vec<Identity>,
        script: BTreeMap<String, ScriptConfig>,
        notify: NotifySection,
    ) -> Self {
        Self {
            process,
            identity,
            script,
            notify,
        }
    }

    pub fn notify_service(&self) -> NotifyPatternService {
        NotifyPatternService::new(self.notify.patterns.clone())
    }
}

/// `[process]` section: process tracking.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSection {
    /// Whether process records are created and updated at all.
    #[serde(default)]
    pub save_enabled: bool,

    #[serde(default)]
    pub store: StoreMode,

    /// Location of the process table for `store = "file"`, relative to the
    /// directory containing the config file.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Groups attached to every record created by this installation.
    #[serde(default)]
    pub special_groups: Vec<String>,
}

fn default_store_path() -> String {
    PROCESS_FILE_PATH.to_string()
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            save_enabled: false,
            store: StoreMode::default(),
            store_path: default_store_path(),
            special_groups: Vec::new(),
        }
    }
}

/// `[script.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    /// Shell command; invocation arguments are appended.
    pub cmd: String,

    /// Artifact fed to the command's stdin.
    #[serde(default)]
    pub input: Option<String>,

    /// Artifact that receives the command's stdout.
    #[serde(default)]
    pub output: Option<String>,
}

/// `[notify]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifySection {
    /// Pattern-set id to its ordered list of patterns.
    #[serde(default)]
    pub patterns: BTreeMap<String, Vec<String>>,
}
