//! Command-line surface for proba test hosts
//!
//! A host binary builds its [`Registry`] and hands it to [`main`], which
//! parses the command line, loads `proba.toml` and runs what was asked for.
//!
//! ```no_run
//! use proba::Registry;
//! use std::process::ExitCode;
//!
//! fn test_addition() -> bool {
//!     1 + 1 == 2
//! }
//!
//! fn main() -> ExitCode {
//!     let mut registry = Registry::new();
//!     proba::register_test!(registry, test_addition);
//!     proba_cli::main(&registry)
//! }
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use proba::{GoldenMode, Registry, RegistryError, Selector};
use proba_config::{Config, ConfigLoader};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod logging;

/// Exit status for usage errors and unknown selectors
pub const USAGE_ERROR: u8 = 2;

/// Run the tests registered by this host.
///
/// Tests run one after another in registration order, each in its own
/// child process unless isolation is turned off. The exit status is the
/// number of failed tests, capped at 255.
///
/// EXAMPLES:
///     proba-demo                      Run every suite
///     proba-demo suite default        Run one suite
///     proba-demo test default::test_foo
///                                     Run one test
///     proba-demo list                 List registered tests
///     proba-demo record               Save output as golden files
///     proba-demo verify               Compare output with golden files
///
/// ENVIRONMENT VARIABLES:
///     PROBA_ISOLATE        Set to '0' to run tests in-process
///     PROBA_RECORD         Set to '1' to record golden files
///     PROBA_TIMER          Set to '0' to hide elapsed time
///     PROBA_GOLDEN_DIR     Directory holding golden files
///     PROBA_STDOUT_SUFFIX  Suffix of stdout golden files
///     PROBA_STDERR_SUFFIX  Suffix of stderr golden files
///     PROBA_LOG            Diagnostic filter (default: warn)
///     NO_COLOR             Set to disable colored output
#[derive(Parser, Debug)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run tests in the runner process instead of a child per test
    #[arg(long, global = true)]
    pub no_isolate: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Do not report elapsed time
    #[arg(long, global = true)]
    pub no_timer: bool,

    /// Directory holding golden files
    #[arg(long, global = true, value_name = "DIR")]
    pub golden_dir: Option<PathBuf>,

    /// Use this proba.toml instead of searching for one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show debug diagnostics on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run every suite (the default)
    #[command(visible_alias = "r")]
    Run,

    /// Run one suite
    ///
    /// EXAMPLES:
    ///     proba-demo suite default
    Suite {
        /// Suite name
        name: String,
    },

    /// Run one test
    ///
    /// EXAMPLES:
    ///     proba-demo test default::test_foo
    Test {
        /// Test as SUITE::TEST
        #[arg(value_name = "SUITE::TEST")]
        id: String,
    },

    /// Print SUITE::TEST for every registered test
    #[command(visible_alias = "ls")]
    List,

    /// Run tests and save their output as golden files
    ///
    /// Output of every passing test is written to <test><suffix> in the
    /// golden directory, replacing earlier files.
    ///
    /// EXAMPLES:
    ///     proba-demo record
    ///     proba-demo record default --golden-dir golden
    Record {
        /// Suite or SUITE::TEST to record (default: all)
        selector: Option<String>,
    },

    /// Run tests and compare their output against golden files
    ///
    /// EXAMPLES:
    ///     proba-demo verify
    ///     proba-demo verify default::test_addition
    Verify {
        /// Suite or SUITE::TEST to verify (default: all)
        selector: Option<String>,
    },
}

/// Parse the process arguments and run against `registry`
pub fn main(registry: &Registry) -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(&cli, registry) {
        Ok(failures) => ExitCode::from(exit_status(failures)),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(USAGE_ERROR)
        }
    }
}

/// Execute a parsed command line, returning the number of failed tests
pub fn run(cli: &Cli, registry: &Registry) -> Result<usize> {
    let config = load_config(cli)?;
    let mut options = config.run_options();

    if cli.no_isolate {
        options.isolate = false;
    }
    if cli.no_color {
        options.color = false;
    }
    if cli.no_timer {
        options.timer = false;
    }
    if let Some(dir) = &cli.golden_dir {
        options.golden_dir = dir.clone();
    }
    if !options.color {
        colored::control::set_override(false);
    }

    let command = cli.command.clone().unwrap_or(Commands::Run);
    let selector = match &command {
        Commands::Run => Selector::All,
        Commands::List => return commands::list(registry).map(|_| 0),
        Commands::Suite { name } => Selector::Suite(name.clone()),
        Commands::Test { id } => parse_test_id(id)?,
        Commands::Record { selector } => {
            options.golden = GoldenMode::Record;
            parse_selector(selector.as_deref())
        }
        Commands::Verify { selector } => {
            options.golden = GoldenMode::Verify;
            parse_selector(selector.as_deref())
        }
    };

    let selected = registry
        .select(&selector)
        .map_err(|e| describe_selection_error(&selector, e))?;
    commands::execute(&selected, &options)
}

/// Failure count as a process exit status
pub fn exit_status(failures: usize) -> u8 {
    u8::try_from(failures).unwrap_or(u8::MAX)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let loader = ConfigLoader::new();
    match &cli.config {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            loader
                .load_from_directory(&cwd)
                .context("failed to load configuration")
        }
    }
}

fn parse_selector(input: Option<&str>) -> Selector {
    input.map(Selector::parse).unwrap_or(Selector::All)
}

fn parse_test_id(id: &str) -> Result<Selector> {
    match Selector::parse(id) {
        selector @ Selector::Test { .. } => Ok(selector),
        _ => anyhow::bail!("expected SUITE::TEST, got '{}'", id),
    }
}

fn describe_selection_error(selector: &Selector, error: RegistryError) -> anyhow::Error {
    anyhow::Error::new(error).context(format!("nothing to run for '{}'", selector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_verb_means_run() {
        let cli = Cli::try_parse_from(["proba-demo"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_global_flags_after_verb() {
        let cli =
            Cli::try_parse_from(["proba-demo", "suite", "io", "--no-isolate", "--no-timer"])
                .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Suite {
                name: "io".to_string()
            })
        );
        assert!(cli.no_isolate);
        assert!(cli.no_timer);
        assert!(!cli.no_color);
    }

    #[test]
    fn test_parse_test_id() {
        assert_eq!(
            parse_test_id("default::test_foo").unwrap(),
            Selector::Test {
                suite: "default".to_string(),
                test: "test_foo".to_string()
            }
        );
        assert!(parse_test_id("default").is_err());
    }

    #[test]
    fn test_exit_status_clamps() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(3), 3);
        assert_eq!(exit_status(255), 255);
        assert_eq!(exit_status(300), 255);
    }

    #[test]
    fn test_selection_error_names_selector() {
        let selector = Selector::parse("nope");
        let err = describe_selection_error(&selector, RegistryError::SuiteNotFound("nope".into()));
        assert_eq!(format!("{:#}", err), "nothing to run for 'nope': no suite named 'nope'");
    }
}
