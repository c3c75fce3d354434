use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where process records are kept between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Store records in a TOML file (`process.store_path`).
    File,
    /// Keep records in memory only (lost when the invocation exits).
    Memory,
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::File
    }
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StoreMode::File),
            "memory" => Ok(StoreMode::Memory),
            other => Err(format!(
                "invalid process store: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}

/// One entry of a script's ordered parameter list.
///
/// Names are usually option flags (`-e`, `-f`) but may also carry a whole
/// unparsed command-line fragment, in which case `value` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptParameter {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl ScriptParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A parameter with no value (a bare flag or positional argument).
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, String::new())
    }
}

impl fmt::Display for ScriptParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.value)
        }
    }
}

/// Pair raw command-line arguments into [`ScriptParameter`]s.
///
/// A flag (`-x` / `--long`) followed by a non-flag argument becomes one
/// name/value pair; anything else becomes a parameter with an empty value.
pub fn parameters_from_args<S: AsRef<str>>(args: &[S]) -> Vec<ScriptParameter> {
    let mut params = Vec::new();
    let mut iter = args.iter().map(AsRef::as_ref).peekable();

    while let Some(arg) = iter.next() {
        if is_flag(arg) {
            match iter.peek() {
                Some(next) if !is_flag(next) => {
                    params.push(ScriptParameter::new(arg, *next));
                    iter.next();
                }
                _ => params.push(ScriptParameter::flag(arg)),
            }
        } else {
            params.push(ScriptParameter::flag(arg));
        }
    }

    params
}

/// Render a parameter list the way it appears in log lines: `[-e a@b, -f x]`.
pub fn display_parameters(params: &[ScriptParameter]) -> String {
    let inner: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("[{}]", inner.join(", "))
}

fn is_flag(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}
