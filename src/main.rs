//! i3geoweather - publish the local weather as a status line
//!
//! Runs the poll loop in the foreground (detaching is left to the caller, e.g.
//! `exec --no-startup-id` in the i3 config), or controls a running instance.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use i3geoweather::cli::{Cli, Command};
use i3geoweather::config::Config;
use i3geoweather::daemon::{self, InstanceStatus, PidFile};
use i3geoweather::data::http_client;
use i3geoweather::logging::{self, LogTarget};
use i3geoweather::poll::{NoopStop, PollLoop};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = Config::from_cli(&cli)?;

    match cli.command() {
        Command::Status => {
            match daemon::status(&config.pid_path())? {
                InstanceStatus::Running(pid) => println!("i3geoweather is running (pid {})", pid),
                InstanceStatus::Stale(pid) => {
                    println!("i3geoweather is not running (stale pid file for {})", pid)
                }
                InstanceStatus::Stopped => println!("i3geoweather is not running"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Stop => {
            let pid = daemon::stop(&config.pid_path())?;
            println!("stopped i3geoweather (pid {})", pid);
            Ok(ExitCode::SUCCESS)
        }
        Command::Once => {
            prepare(&config)?;
            // Leave the running instance's log file alone
            logging::init(LogTarget::Stderr, cli.verbose)?;
            let client = http_client(config.http_timeout)?;
            let mut poll = PollLoop::new(&config, client, NoopStop);
            let outcome = poll.run_cycle().await?;
            match outcome.line {
                Some(line) => {
                    print!("{}", line);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("no weather available; see the log for details");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Run => {
            prepare(&config)?;
            // The log file is truncated on init, so only the lock holder may open it
            let lock = PidFile::acquire(config.pid_path())?;
            let target = if cli.log_stderr {
                LogTarget::Stderr
            } else {
                LogTarget::File(config.log_path())
            };
            logging::init(target, cli.verbose)?;
            let client = http_client(config.http_timeout)?;
            let mut poll = PollLoop::new(&config, client, lock);

            tokio::select! {
                result = poll.run() => result?,
                _ = shutdown_signal() => info!("i3geoweather stopping on request"),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Creates the base directory and checks the API key
fn prepare(config: &Config) -> Result<(), Box<dyn Error>> {
    config.ensure_base_dir()?;
    config.require_api_key()?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
