//! Command-line interface parsing for i3geoweather
//!
//! Handles the subcommands (`run`, `once`, `stop`, `status`) and the global
//! options that feed into [`crate::config::Config`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// i3geoweather - publish a geolocated weather status line
#[derive(Parser, Debug)]
#[command(name = "i3geoweather")]
#[command(about = "Publishes the local weather as a status line for i3bar and friends")]
#[command(version)]
pub struct Cli {
    /// What to do (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// State directory for caches, output, log and PID file (default: ~/.i3geoweather)
    #[arg(long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// OpenWeatherMap API key
    #[arg(long, global = true, env = "OPENWEATHER_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Override the geolocation service URL
    #[arg(long, global = true, value_name = "URL")]
    pub geo_url: Option<String>,

    /// Override the weather service URL
    #[arg(long, global = true, value_name = "URL")]
    pub weather_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the poll loop in the foreground, holding the PID file
    Run,
    /// Run a single cycle and print the published line
    Once,
    /// Stop the running instance
    Stop,
    /// Report whether an instance is running
    Status,
}

impl Cli {
    /// The selected subcommand, `run` when none was given
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::parse_from(["i3geoweather"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.command(), Command::Run);
    }

    #[test]
    fn test_subcommands_parse() {
        assert_eq!(Cli::parse_from(["i3geoweather", "once"]).command(), Command::Once);
        assert_eq!(Cli::parse_from(["i3geoweather", "stop"]).command(), Command::Stop);
        assert_eq!(Cli::parse_from(["i3geoweather", "status"]).command(), Command::Status);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["i3geoweather", "status", "--base-dir", "/tmp/x", "-v"]);
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/x")));
        assert!(cli.verbose);
        assert!(!cli.log_stderr);
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["i3geoweather", "restart"]).is_err());
    }
}
