//! OpenWeatherMap current-weather client with an on-disk cache
//!
//! Fetches the place name and temperature for a location, reusing the cached
//! reading while it is younger than the configured window.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{Location, WeatherReading};
use crate::cache::{CacheKind, CacheStore};
use crate::config::Config;

/// Reasons a weather reading could not be resolved
#[derive(Debug, Error)]
pub enum WeatherError {
    /// There was no location to ask about
    #[error("no location available")]
    NoLocation,

    /// HTTP request failed or timed out
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("weather service returned HTTP {0}")]
    Status(u16),

    /// The body lacked a textual name or a numeric temperature
    #[error("received invalid weather information: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The subset of the OpenWeatherMap response we rely on
#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    main: OwmMain,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    /// Kelvin
    temp: f64,
}

/// Resolves current weather for a location, cache first
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    /// HTTP client for making requests
    http_client: Client,
    /// Cache for the last good reading
    cache: CacheStore,
    /// Weather service URL
    url: String,
    /// Sent as `appid`
    api_key: String,
    /// How long a cached reading stays usable
    window: Duration,
}

impl WeatherProvider {
    /// Creates a provider from the shared client and configuration
    pub fn new(http_client: Client, config: &Config) -> Self {
        Self {
            http_client,
            cache: CacheStore::with_dir(config.base_dir.clone()),
            url: config.weather_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            window: config.weather_window,
        }
    }

    /// Resolves the current weather
    ///
    /// # Arguments
    /// * `location` - The resolved location, or `None` when geolocation failed
    ///
    /// # Behavior
    /// - `None` short-circuits to `Err(WeatherError::NoLocation)` without touching cache or network
    /// - A cache record younger than the window is returned as-is, even if it was
    ///   stored for a different location than `location`
    /// - Otherwise the service is queried; only valid readings are cached
    pub async fn resolve(&self, location: Option<&Location>) -> Result<WeatherReading, WeatherError> {
        let location = location.ok_or(WeatherError::NoLocation)?;

        if let Some(record) = self.cache.read::<WeatherReading>(CacheKind::Weather) {
            if record.age < self.window {
                debug!(
                    place = %record.data.place_name,
                    age_secs = record.age.as_secs(),
                    "using cached weather"
                );
                return Ok(record.data);
            }
            debug!(age_secs = record.age.as_secs(), "weather cache is stale");
        }

        let reading = self.fetch(location).await.inspect_err(|e| {
            error!(
                error = %e,
                latitude = location.latitude,
                longitude = location.longitude,
                "error receiving weather"
            );
        })?;

        if let Err(e) = self.cache.write(CacheKind::Weather, &reading) {
            warn!(error = %e, "could not cache weather");
        }
        Ok(reading)
    }

    /// Queries the weather service for `location`
    async fn fetch(&self, location: &Location) -> Result<WeatherReading, WeatherError> {
        let response = self
            .http_client
            .get(&self.url)
            .query(&[("lat", location.latitude), ("lon", location.longitude)])
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let body: OwmResponse = serde_json::from_str(&text)?;

        let reading = WeatherReading {
            place_name: body.name,
            temperature_kelvin: body.main.temp,
        };
        info!(
            place = %reading.place_name,
            kelvin = reading.temperature_kelvin,
            "retrieved weather information"
        );
        Ok(reading)
    }
}
