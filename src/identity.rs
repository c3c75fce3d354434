// src/identity.rs

//! Invoker identity resolution.
//!
//! A script run may be attributed to a user when its first parameter carries
//! the `-e` flag together with an email address, e.g. `-e user@example.org`.
//! The address is looked up in an [`IdentityDirectory`].

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ResolutionError;
use crate::types::ScriptParameter;

/// Marker that selects an identity in the first parameter.
pub const IDENTITY_FLAG: &str = "-e";

/// A user on whose behalf a script may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Lookup of identities by email address.
pub trait IdentityDirectory: Send + Sync + Debug {
    fn find_by_email(&self, email: &str) -> Option<Identity>;
}

/// Directory backed by the `[[identity]]` entries of the config file.
///
/// Emails are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ConfigDirectory {
    by_email: BTreeMap<String, Identity>,
}

impl ConfigDirectory {
    pub fn new<I>(identities: I) -> Self
    where
        I: IntoIterator<Item = Identity>,
    {
        let by_email = identities
            .into_iter()
            .map(|identity| (identity.email.to_lowercase(), identity))
            .collect();
        Self { by_email }
    }
}

impl IdentityDirectory for ConfigDirectory {
    fn find_by_email(&self, email: &str) -> Option<Identity> {
        self.by_email.get(&email.to_lowercase()).cloned()
    }
}

/// Extract the email requested by the first parameter, if any.
///
/// Returns `Ok(None)` when the first parameter does not mention `-e`, and
/// [`ResolutionError::MissingEmail`] when it does but no whitespace-separated
/// token contains `@`. An empty list is [`ResolutionError::NoParameters`].
pub fn requested_email(parameters: &[ScriptParameter]) -> Result<Option<&str>, ResolutionError> {
    let Some(first) = parameters.first() else {
        return Err(ResolutionError::NoParameters);
    };

    if !first.name.contains(IDENTITY_FLAG) && !first.value.contains(IDENTITY_FLAG) {
        return Ok(None);
    }

    first
        .name
        .split_whitespace()
        .chain(first.value.split_whitespace())
        .find(|token| token.contains('@'))
        .map(Some)
        .ok_or(ResolutionError::MissingEmail)
}

/// Resolves the invoker of a script run against a directory.
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'a> {
    directory: &'a dyn IdentityDirectory,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(directory: &'a dyn IdentityDirectory) -> Self {
        Self { directory }
    }

    /// `Ok(None)` means no identity was requested.
    pub fn resolve(
        &self,
        parameters: &[ScriptParameter],
    ) -> Result<Option<Identity>, ResolutionError> {
        let Some(email) = requested_email(parameters)? else {
            return Ok(None);
        };

        match self.directory.find_by_email(email) {
            Some(identity) => {
                debug!(email, identity = %identity.id, "resolved invoking identity");
                Ok(Some(identity))
            }
            None => Err(ResolutionError::UnknownEmail(email.to_string())),
        }
    }
}
