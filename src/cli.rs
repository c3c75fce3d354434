// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_PATH;

/// Command-line arguments for `scriptrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scriptrun",
    version,
    about = "Run configured scripts and track each run as a process record.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRIPTRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a configured script. Use `-e <email>` as the first argument to
    /// attribute the run to a user.
    Run {
        /// Name of a `[script.<name>]` section.
        script: String,

        /// Print what would run without executing or recording anything.
        #[arg(long)]
        dry_run: bool,

        /// Arguments passed to the script.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List recorded processes, or show one by id.
    Processes {
        id: Option<u64>,
    },

    /// List notification pattern sets, or show one by id.
    Patterns {
        id: Option<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_keeps_hyphenated_script_arguments() {
        let args = CliArgs::try_parse_from([
            "scriptrun",
            "run",
            "import-items",
            "-e",
            "user@example.org",
            "-f",
            "data.csv",
        ])
        .unwrap();

        match args.command {
            Command::Run {
                script,
                dry_run,
                args,
            } => {
                assert_eq!(script, "import-items");
                assert!(!dry_run);
                assert_eq!(args, vec!["-e", "user@example.org", "-f", "data.csv"]);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn processes_takes_optional_id() {
        let args = CliArgs::try_parse_from(["scriptrun", "--config", "x.toml", "processes", "7"])
            .unwrap();
        assert_eq!(args.config, "x.toml");
        assert!(matches!(args.command, Command::Processes { id: Some(7) }));
    }

    #[test]
    fn config_defaults_to_scriptrun_toml() {
        let args = CliArgs::try_parse_from(["scriptrun", "patterns"]).unwrap();
        assert_eq!(args.config, DEFAULT_CONFIG_PATH);
        assert!(matches!(args.command, Command::Patterns { id: None }));
    }
}
