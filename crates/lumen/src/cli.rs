//! Command-line interface handling for the Lumen server.
//!
//! Every option here overrides the matching setting of the configuration file.

use clap::{Arg, Command};
use lumen_core::PlatformKind;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the application configuration file
    pub config_path: PathBuf,
    /// Optional override for the module configuration file
    pub modules_config: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the platform kind
    pub platform: Option<PlatformKind>,
}

impl CliArgs {
    fn command() -> Command {
        Command::new("Lumen Server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Module framework host: registry, config synchronization and client delivery")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("modules")
                    .short('m')
                    .long("modules")
                    .value_name("FILE")
                    .help("Module configuration file path"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("platform")
                    .long("platform")
                    .value_name("KIND")
                    .help("Platform kind to run as (server, proxy)")
                    .value_parser(clap::value_parser!(PlatformKind)),
            )
    }

    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            modules_config: matches.get_one::<String>("modules").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            platform: matches.get_one::<PlatformKind>("platform").copied(),
        }
    }
}
