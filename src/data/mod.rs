//! Remote data sources and the values they produce
//!
//! [`LocationProvider`] and [`WeatherProvider`] each consult the
//! [`crate::cache::CacheStore`] before going to the network, and report an
//! unresolved source as an `Err` rather than panicking or propagating I/O.

pub mod location;
pub mod weather;

pub use location::{LocationError, LocationProvider};
pub use weather::{WeatherError, WeatherProvider};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classify::kelvin_to_celsius;

/// User agent sent with every request
const USER_AGENT: &str = concat!("i3geoweather/", env!("CARGO_PKG_VERSION"));

/// Approximate position of the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Location {
    /// Whether this is the `0, 0` "no location" sentinel
    pub fn is_sentinel(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// Current conditions at a place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Human-readable place name reported by the weather service
    pub place_name: String,
    /// Temperature in Kelvin
    pub temperature_kelvin: f64,
}

impl WeatherReading {
    /// Temperature in degrees Celsius
    pub fn temperature_celsius(&self) -> f64 {
        kelvin_to_celsius(self.temperature_kelvin)
    }
}

/// Builds the shared HTTP client with a finite request timeout
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_zero_is_sentinel() {
        let zero = Location {
            latitude: 0.0,
            longitude: 0.0,
        };
        assert!(zero.is_sentinel());
    }

    #[test]
    fn test_single_zero_coordinate_is_a_real_location() {
        let equator = Location {
            latitude: 0.0,
            longitude: 11.63,
        };
        let greenwich = Location {
            latitude: 48.25,
            longitude: 0.0,
        };
        assert!(!equator.is_sentinel());
        assert!(!greenwich.is_sentinel());
    }

    #[test]
    fn test_reading_converts_to_celsius() {
        let reading = WeatherReading {
            place_name: "Munich".to_string(),
            temperature_kelvin: 295.0,
        };
        assert!((reading.temperature_celsius() - 21.85).abs() < 0.001);
    }

    #[test]
    fn test_http_client_builds() {
        assert!(http_client(Duration::from_secs(5)).is_ok());
    }
}
