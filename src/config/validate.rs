// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ScriptrunError};
use crate::types::StoreMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ScriptrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.process,
            raw.identity,
            raw.script,
            raw.notify,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_process_section(cfg)?;
    validate_identities(cfg)?;
    validate_scripts(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn validate_process_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.process.store == StoreMode::File && cfg.process.store_path.trim().is_empty() {
        return Err(ScriptrunError::ConfigError(
            "[process].store_path must not be empty when store = \"file\"".to_string(),
        ));
    }
    Ok(())
}

fn validate_identities(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for identity in cfg.identity.iter() {
        if identity.id.trim().is_empty() {
            return Err(ScriptrunError::ConfigError(format!(
                "identity '{}' has an empty id",
                identity.email
            )));
        }
        if !identity.email.contains('@') {
            return Err(ScriptrunError::ConfigError(format!(
                "identity '{}' has an invalid email '{}'",
                identity.id, identity.email
            )));
        }
        if !seen.insert(identity.email.to_lowercase()) {
            return Err(ScriptrunError::ConfigError(format!(
                "email '{}' is assigned to more than one identity",
                identity.email
            )));
        }
    }
    Ok(())
}

fn validate_scripts(cfg: &RawConfigFile) -> Result<()> {
    for (name, script) in cfg.script.iter() {
        if script.cmd.trim().is_empty() {
            return Err(ScriptrunError::ConfigError(format!(
                "script '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    if cfg.notify.patterns.keys().any(|id| id.trim().is_empty()) {
        return Err(ScriptrunError::ConfigError(
            "[notify.patterns] ids must not be empty".to_string(),
        ));
    }
    Ok(())
}
