//! i3geoweather library
//!
//! Locates the caller by IP, fetches the current weather, and publishes a
//! one-line status for status-bar renderers such as i3bar. Modules are public
//! for use by the binary and integration tests.

pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod data;
pub mod logging;
pub mod poll;
pub mod publish;
