//! IP geolocation with an on-disk cache
//!
//! Resolves the caller's approximate coordinates, reusing the cached location
//! while it is younger than the configured window.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::Location;
use crate::cache::{CacheKind, CacheStore};
use crate::config::Config;

/// Reasons a location could not be resolved
#[derive(Debug, Error)]
pub enum LocationError {
    /// HTTP request failed or timed out
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("geolocation service returned HTTP {0}")]
    Status(u16),

    /// The body was not the expected JSON
    #[error("failed to parse geolocation response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service could not place the caller and answered `0, 0`
    #[error("received invalid location 0, 0 for ip {ip}")]
    Sentinel { ip: String },
}

/// Response body of the geolocation service
#[derive(Debug, Deserialize)]
struct GeoResponse {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    ip: Option<String>,
}

/// Resolves the caller's location, cache first
#[derive(Debug, Clone)]
pub struct LocationProvider {
    /// HTTP client for making requests
    http_client: Client,
    /// Cache for the last good location
    cache: CacheStore,
    /// Geolocation service URL
    url: String,
    /// How long a cached location stays usable
    window: Duration,
}

impl LocationProvider {
    /// Creates a provider from the shared client and configuration
    pub fn new(http_client: Client, config: &Config) -> Self {
        Self {
            http_client,
            cache: CacheStore::with_dir(config.base_dir.clone()),
            url: config.geo_url.clone(),
            window: config.location_window,
        }
    }

    /// Resolves the current location
    ///
    /// # Returns
    /// * `Ok(Location)` from a cache record younger than the window, or from the service
    /// * `Err(LocationError)` when the service fails or reports the `0, 0` sentinel
    ///
    /// # Behavior
    /// - A fresh cache record is returned without any network access
    /// - A stale record is left on disk untouched; only a successful lookup replaces it
    /// - Failed lookups never write to the cache
    pub async fn resolve(&self) -> Result<Location, LocationError> {
        if let Some(record) = self.cache.read::<Location>(CacheKind::Location) {
            if record.data.is_sentinel() {
                warn!("cached location is the 0, 0 sentinel, discarding it");
                if let Err(e) = self.cache.invalidate(CacheKind::Location) {
                    warn!(error = %e, "could not remove sentinel location cache");
                }
            } else if record.age < self.window {
                debug!(
                    latitude = record.data.latitude,
                    longitude = record.data.longitude,
                    age_secs = record.age.as_secs(),
                    "using cached location"
                );
                return Ok(record.data);
            } else {
                debug!(age_secs = record.age.as_secs(), "location cache is stale");
            }
        }

        let location = self.fetch().await.inspect_err(|e| {
            error!(error = %e, "error receiving location");
        })?;

        if let Err(e) = self.cache.write(CacheKind::Location, &location) {
            warn!(error = %e, "could not cache location");
        }
        Ok(location)
    }

    /// Asks the geolocation service for the caller's coordinates
    async fn fetch(&self) -> Result<Location, LocationError> {
        let response = self.http_client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LocationError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let body: GeoResponse = serde_json::from_str(&text)?;
        let ip = body.ip.unwrap_or_else(|| "unknown".to_string());

        let location = Location {
            latitude: body.latitude,
            longitude: body.longitude,
        };
        if location.is_sentinel() {
            return Err(LocationError::Sentinel { ip });
        }

        info!(
            latitude = location.latitude,
            longitude = location.longitude,
            %ip,
            "retrieved location"
        );
        Ok(location)
    }
}
