//! Temperature banding
//!
//! Maps a temperature onto one of a fixed, ordered set of bands, each with a
//! display glyph for the status line.

use std::cmp::Ordering;
use thiserror::Error;

/// Offset between Kelvin and Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Default band minimums in degrees Celsius
pub const DEFAULT_THRESHOLDS: [f64; 5] = [-270.0, 0.0, 10.0, 20.0, 28.0];

/// Font Awesome thermometer glyphs, empty to full
pub const DEFAULT_ICONS: [&str; 5] = ["\u{f2cb}", "\u{f2ca}", "\u{f2c9}", "\u{f2c8}", "\u{f2c7}"];

/// Errors from building or querying a [`ThresholdTable`]
#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    /// The temperature is below the lowest band
    #[error("temperature {0:.1}°C is below every threshold")]
    BelowRange(f64),

    /// A table needs at least one band
    #[error("threshold table is empty")]
    Empty,

    /// Thresholds and icons have different lengths
    #[error("{thresholds} thresholds but {icons} icons")]
    LengthMismatch { thresholds: usize, icons: usize },

    /// Band minimums must be strictly increasing
    #[error("threshold {current} at index {index} does not exceed {previous}")]
    NotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// Convert a temperature in Kelvin to Celsius
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// A single temperature band
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    /// Lowest temperature (inclusive) in degrees Celsius
    pub min_celsius: f64,
    /// Glyph shown for this band
    pub icon: String,
}

/// Ordered temperature bands, ascending by minimum
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    bands: Vec<Band>,
}

impl ThresholdTable {
    /// Builds a table, checking it is non-empty and strictly increasing
    pub fn new(bands: Vec<Band>) -> Result<Self, ClassifyError> {
        if bands.is_empty() {
            return Err(ClassifyError::Empty);
        }
        for (index, pair) in bands.windows(2).enumerate() {
            // NaN minimums compare as None and are rejected too
            if pair[1].min_celsius.partial_cmp(&pair[0].min_celsius) != Some(Ordering::Greater) {
                return Err(ClassifyError::NotIncreasing {
                    index: index + 1,
                    previous: pair[0].min_celsius,
                    current: pair[1].min_celsius,
                });
            }
        }
        Ok(Self { bands })
    }

    /// Builds a table from parallel threshold and icon slices
    pub fn from_pairs(thresholds: &[f64], icons: &[&str]) -> Result<Self, ClassifyError> {
        if thresholds.len() != icons.len() {
            return Err(ClassifyError::LengthMismatch {
                thresholds: thresholds.len(),
                icons: icons.len(),
            });
        }
        let bands = thresholds
            .iter()
            .zip(icons)
            .map(|(&min_celsius, icon)| Band {
                min_celsius,
                icon: (*icon).to_string(),
            })
            .collect();
        Self::new(bands)
    }

    /// The bands in ascending order
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Index of the highest band whose minimum is at or below `celsius`
    pub fn band(&self, celsius: f64) -> Result<usize, ClassifyError> {
        self.bands
            .iter()
            .rposition(|band| celsius >= band.min_celsius)
            .ok_or(ClassifyError::BelowRange(celsius))
    }

    /// Glyph for the band containing `celsius`
    pub fn icon(&self, celsius: f64) -> Result<&str, ClassifyError> {
        let index = self.band(celsius)?;
        Ok(&self.bands[index].icon)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let bands = DEFAULT_THRESHOLDS
            .iter()
            .zip(DEFAULT_ICONS)
            .map(|(&min_celsius, icon)| Band {
                min_celsius,
                icon: icon.to_string(),
            })
            .collect();
        Self { bands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lettered() -> ThresholdTable {
        ThresholdTable::from_pairs(&DEFAULT_THRESHOLDS, &["A", "B", "C", "D", "E"])
            .expect("valid table")
    }

    #[test]
    fn test_kelvin_to_celsius() {
        assert!(kelvin_to_celsius(273.15).abs() < 1e-9);
        assert!((kelvin_to_celsius(295.0) - 21.85).abs() < 1e-9);
    }

    #[test]
    fn test_band_picks_tightest_lower_bound() {
        let table = lettered();
        assert_eq!(table.band(15.0), Ok(2));
        assert_eq!(table.icon(15.0), Ok("C"));
        assert_eq!(table.icon(-5.0), Ok("A"));
        assert_eq!(table.icon(35.0), Ok("E"));
    }

    #[test]
    fn test_band_boundary_is_inclusive() {
        let table = lettered();
        assert_eq!(table.band(20.0), Ok(3));
        assert_eq!(table.icon(20.0), Ok("D"));
        assert_eq!(table.icon(0.0), Ok("B"));
        assert_eq!(table.icon(-270.0), Ok("A"));
    }

    #[test]
    fn test_band_below_every_threshold_fails() {
        let table = lettered();
        assert_eq!(table.band(-300.0), Err(ClassifyError::BelowRange(-300.0)));
        assert!(table.icon(-300.0).is_err());
    }

    #[test]
    fn test_nan_temperature_fails() {
        assert!(lettered().band(f64::NAN).is_err());
    }

    #[test]
    fn test_new_rejects_empty_table() {
        assert_eq!(ThresholdTable::new(Vec::new()), Err(ClassifyError::Empty));
    }

    #[test]
    fn test_new_rejects_non_increasing_thresholds() {
        let result = ThresholdTable::from_pairs(&[0.0, 10.0, 10.0], &["a", "b", "c"]);
        assert_eq!(
            result,
            Err(ClassifyError::NotIncreasing {
                index: 2,
                previous: 10.0,
                current: 10.0,
            })
        );
    }

    #[test]
    fn test_from_pairs_rejects_length_mismatch() {
        let result = ThresholdTable::from_pairs(&[0.0, 10.0], &["a"]);
        assert_eq!(
            result,
            Err(ClassifyError::LengthMismatch {
                thresholds: 2,
                icons: 1,
            })
        );
    }

    #[test]
    fn test_default_table_matches_default_constants() {
        let table = ThresholdTable::default();
        assert_eq!(table.bands().len(), DEFAULT_THRESHOLDS.len());
        assert_eq!(table.icon(21.85), Ok(DEFAULT_ICONS[3]));
    }
}
