// src/artifact.rs

//! Named file artifacts read and written by scripts.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use blake3::Hasher;
use tracing::{debug, info};

use crate::errors::ArtifactError;
use crate::fs::{FileSystem, RealFileSystem};

/// What was persisted by [`ArtifactAccess::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReceipt {
    pub path: PathBuf,
    pub bytes: u64,
    /// blake3 hex digest of the written content.
    pub checksum: String,
}

/// Read and write named artifacts through a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct ArtifactAccess {
    fs: Arc<dyn FileSystem>,
}

impl Default for ArtifactAccess {
    fn default() -> Self {
        Self::local()
    }
}

impl ArtifactAccess {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Artifacts on the local disk.
    pub fn local() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }

    /// Open an existing artifact.
    ///
    /// Returns `Ok(None)` when nothing (or a directory) exists under `name`.
    pub fn read(&self, name: &str) -> Result<Option<Box<dyn Read + Send>>, ArtifactError> {
        let path = validate_name(name)?;
        if !self.fs.is_file(&path) {
            debug!(artifact = name, "artifact not found");
            return Ok(None);
        }

        let stream = self
            .fs
            .open_read(&path)
            .map_err(|e| ArtifactError::io(&path, e))?;
        Ok(Some(stream))
    }

    /// Persist the whole of `stream` under `name`, replacing any previous
    /// content.
    pub fn write(&self, name: &str, stream: &mut dyn Read) -> Result<ArtifactReceipt, ArtifactError> {
        let path = validate_name(name)?;
        if self.fs.is_dir(&path) {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .with_context(|| format!("reading input stream for {:?}", path))
            .map_err(|e| ArtifactError::io(&path, e))?;

        self.fs
            .write(&path, &buf)
            .map_err(|e| ArtifactError::io(&path, e))?;

        let receipt = ArtifactReceipt {
            checksum: checksum(&buf),
            bytes: buf.len() as u64,
            path,
        };
        info!(
            artifact = name,
            bytes = receipt.bytes,
            checksum = %receipt.checksum,
            "artifact written"
        );
        Ok(receipt)
    }
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

fn validate_name(name: &str) -> Result<PathBuf, ArtifactError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.ends_with('/') || trimmed.ends_with('\\') {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    if name.contains('\0') {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(Path::new(name).to_path_buf())
}
