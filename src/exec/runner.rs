// src/exec/runner.rs

//! Single script process runner.

use std::io::{Cursor, Read};
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::artifact::ArtifactAccess;
use crate::config::ScriptConfig;
use crate::exec::ScriptOutcome;

/// Everything needed to launch one script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub name: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
}

impl ScriptInvocation {
    pub fn from_config(name: &str, script: &ScriptConfig, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            cmd: script.cmd.clone(),
            args,
            input: script.input.clone(),
            output: script.output.clone(),
        }
    }

    /// Resolve relative `input`/`output` artifact names against `root`, the
    /// directory the config file lives in.
    pub fn relative_to(mut self, root: &Path) -> Self {
        let resolve = |name: String| {
            if Path::new(&name).is_absolute() {
                name
            } else {
                root.join(&name).to_string_lossy().into_owned()
            }
        };
        self.input = self.input.map(resolve);
        self.output = self.output.map(resolve);
        self
    }

    /// Build a shell command appropriate for the platform. Arguments are
    /// passed positionally rather than spliced into the command string.
    fn command(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd).args(&self.args);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c")
                .arg(format!("{} \"$@\"", self.cmd))
                .arg(&self.name)
                .args(&self.args);
            c
        }
    }
}

/// Run a script to completion.
///
/// `Err` means the command could not be run at all (missing input artifact,
/// spawn failure, output artifact not writable); a command that ran and
/// exited non-zero is `Ok(ScriptOutcome::Failed(code))`.
pub async fn run_script(
    invocation: &ScriptInvocation,
    artifacts: &ArtifactAccess,
) -> Result<ScriptOutcome> {
    let stdin_bytes = match &invocation.input {
        Some(input) => {
            let Some(mut stream) = artifacts.read(input)? else {
                bail!("input artifact '{}' not found", input);
            };
            let mut buf = Vec::new();
            stream
                .read_to_end(&mut buf)
                .with_context(|| format!("reading input artifact '{}'", input))?;
            Some(buf)
        }
        None => None,
    };

    info!(
        script = %invocation.name,
        cmd = %invocation.cmd,
        args = ?invocation.args,
        "starting script process"
    );

    let mut cmd = invocation.command();
    cmd.stdin(if stdin_bytes.is_some() {
        Stdio::piped()
    } else {
        Stdio::inherit()
    })
    .stdout(if invocation.output.is_some() {
        Stdio::piped()
    } else {
        Stdio::inherit()
    })
    .stderr(Stdio::inherit())
    .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for script '{}'", invocation.name))?;

    if let (Some(bytes), Some(mut stdin)) = (stdin_bytes, child.stdin.take()) {
        let name = invocation.name.clone();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&bytes).await {
                warn!(script = %name, error = %e, "failed to feed input artifact to stdin");
            }
            // stdin closes on drop so the script sees EOF.
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for process of script '{}'", invocation.name))?;

    let code = output.status.code().unwrap_or(-1);
    info!(
        script = %invocation.name,
        exit_code = code,
        success = output.status.success(),
        "script process exited"
    );

    if let Some(target) = &invocation.output {
        debug!(script = %invocation.name, bytes = output.stdout.len(), "capturing stdout");
        artifacts
            .write(target, &mut Cursor::new(output.stdout))
            .with_context(|| format!("writing output artifact '{}'", target))?;
    }

    Ok(if output.status.success() {
        ScriptOutcome::Success
    } else {
        ScriptOutcome::Failed(code)
    })
}
