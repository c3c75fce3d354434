#![allow(dead_code)]

use std::collections::BTreeMap;

use scriptrun::config::{ConfigFile, NotifySection, ProcessSection, RawConfigFile, ScriptConfig};
use scriptrun::identity::Identity;
use scriptrun::types::StoreMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                process: ProcessSection::default(),
                identity: Vec::new(),
                script: BTreeMap::new(),
                notify: NotifySection::default(),
            },
        }
    }

    pub fn save_enabled(mut self, val: bool) -> Self {
        self.config.process.save_enabled = val;
        self
    }

    pub fn store(mut self, mode: StoreMode) -> Self {
        self.config.process.store = mode;
        self
    }

    pub fn store_path(mut self, path: &str) -> Self {
        self.config.process.store_path = path.to_string();
        self
    }

    pub fn special_group(mut self, group: &str) -> Self {
        self.config.process.special_groups.push(group.to_string());
        self
    }

    pub fn with_identity(mut self, id: &str, email: &str) -> Self {
        self.config.identity.push(Identity {
            id: id.to_string(),
            email: email.to_string(),
        });
        self
    }

    pub fn with_script(mut self, name: &str, script: ScriptConfig) -> Self {
        self.config.script.insert(name.to_string(), script);
        self
    }

    pub fn with_patterns(mut self, id: &str, patterns: &[&str]) -> Self {
        self.config.notify.patterns.insert(
            id.to_string(),
            patterns.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ScriptConfig`.
pub struct ScriptConfigBuilder {
    script: ScriptConfig,
}

impl ScriptConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            script: ScriptConfig {
                cmd: cmd.to_string(),
                input: None,
                output: None,
            },
        }
    }

    pub fn input(mut self, name: &str) -> Self {
        self.script.input = Some(name.to_string());
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.script.output = Some(name.to_string());
        self
    }

    pub fn build(self) -> ScriptConfig {
        self.script
    }
}
