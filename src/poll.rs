//! The poll loop
//!
//! Each cycle locates the caller, fetches the weather, bands the temperature
//! and publishes the status line. A source that cannot be resolved only
//! shortens the next delay; anything else is fatal and stops the loop for good.

use futures::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::classify::{ClassifyError, ThresholdTable};
use crate::config::Config;
use crate::data::{LocationProvider, WeatherProvider};
use crate::publish::{PublishError, Publisher};

/// Published in place of the status when the loop dies
pub const ERROR_LINE: &str = "i3geoweather error\n";

/// Lifecycle of a [`PollLoop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Cycling normally
    Running,
    /// A fatal error occurred; cleaning up
    Stopping,
    /// Finished; will not run again
    Stopped,
}

/// Called once when the loop stops after a fatal error
///
/// The process lifecycle layer implements this to release its single-instance lock.
pub trait StopHook {
    fn signal_stop(&mut self);
}

/// A [`StopHook`] that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStop;

impl StopHook for NoopStop {
    fn signal_stop(&mut self) {}
}

/// Failures that end the loop
#[derive(Debug, Error)]
pub enum PollError {
    /// The temperature fell outside every band
    #[error("cannot classify temperature: {0}")]
    Classify(#[from] ClassifyError),

    /// The status line could not be written
    #[error("cannot publish status: {0}")]
    Publish(#[from] PublishError),

    /// A cycle panicked
    #[error("internal fault: {0}")]
    Internal(String),
}

/// Awaits `cycle`, turning a panic inside it into [`PollError::Internal`]
pub async fn catch_fault<T, F>(cycle: F) -> Result<T, PollError>
where
    F: Future<Output = Result<T, PollError>>,
{
    match AssertUnwindSafe(cycle).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(PollError::Internal(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Result of a single non-fatal cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// The line that was published, if any
    pub line: Option<String>,
    /// How long to wait before the next cycle
    pub delay: Duration,
}

/// Formats the status line: place name padded/truncated to 15 characters, icon, temperature
pub fn render_line(place_name: &str, icon: &str, celsius: f64) -> String {
    format!("{:<15.15} {} {:.1}°C\n", place_name, icon, celsius)
}

/// Orchestrates locate, fetch, classify and publish
pub struct PollLoop<H: StopHook> {
    location: LocationProvider,
    weather: WeatherProvider,
    thresholds: ThresholdTable,
    publisher: Publisher,
    success_delay: Duration,
    failure_delay: Duration,
    state: LoopState,
    stop_hook: H,
}

impl<H: StopHook> PollLoop<H> {
    /// Wires the providers and publisher from `config`
    pub fn new(config: &Config, http_client: Client, stop_hook: H) -> Self {
        Self {
            location: LocationProvider::new(http_client.clone(), config),
            weather: WeatherProvider::new(http_client, config),
            thresholds: config.thresholds.clone(),
            publisher: Publisher::new(config.output_path()),
            success_delay: config.success_delay,
            failure_delay: config.failure_delay,
            state: LoopState::Running,
            stop_hook,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs one cycle
    ///
    /// # Returns
    /// * `Ok(CycleOutcome)` with the published line and the success delay, or no line
    ///   and the failure delay when weather could not be resolved
    /// * `Err(PollError)` when classifying or publishing failed
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, PollError> {
        let location = self.location.resolve().await;
        let reading = match self.weather.resolve(location.as_ref().ok()).await {
            Ok(reading) => reading,
            Err(e) => {
                debug!(error = %e, "no weather this cycle");
                return Ok(CycleOutcome {
                    line: None,
                    delay: self.failure_delay,
                });
            }
        };

        let celsius = reading.temperature_celsius();
        let icon = self.thresholds.icon(celsius)?;
        let line = render_line(&reading.place_name, icon, celsius);
        self.publisher.publish(&line)?;

        Ok(CycleOutcome {
            line: Some(line),
            delay: self.success_delay,
        })
    }

    /// Cycles until a fatal error
    ///
    /// On a fatal error, including a panic inside a cycle, the error line is
    /// published, the stop hook is called and the loop ends in
    /// [`LoopState::Stopped`]. There is no internal restart.
    pub async fn run(&mut self) -> Result<(), PollError> {
        info!("i3geoweather started");
        while self.state == LoopState::Running {
            match catch_fault(self.run_cycle()).await {
                Ok(outcome) => {
                    debug!(delay_secs = outcome.delay.as_secs(), "sleeping");
                    tokio::time::sleep(outcome.delay).await;
                }
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: &PollError) {
        error!(critical = true, error = %err, "unhandled failure");
        if let Err(e) = self.publisher.publish(ERROR_LINE) {
            error!(critical = true, error = %e, "could not publish error line");
        }

        self.state = LoopState::Stopping;
        error!(critical = true, "i3geoweather stopping");
        self.stop_hook.signal_stop();
        self.state = LoopState::Stopped;
        error!(critical = true, "i3geoweather stopped");
    }
}
