//! Match configuration.
//!
//! | Preset | Duration | Half-time |
//! |--------|----------|-----------|
//! | `standard()` / `default()` | 80 min | 40:00 |
//! | `full_length()` | 90 min | 45:00 |
//! | `with_duration_minutes(n)` | `n` min | `n/2`:00 |
//!
//! # Example
//!
//! ```
//! use touchline::{MatchBuilder, MatchConfig};
//!
//! let builder = MatchBuilder::new().with_config(MatchConfig::full_length());
//! ```

use crate::{TouchlineError, TouchlineResult};

const DEFAULT_TOTAL_DURATION_MINUTES: u32 = 80;

/// Configuration for one match.
///
/// # Forward Compatibility
///
/// New fields may be added to this struct in future versions. Use the
/// `..MatchConfig::default()` pattern when constructing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "MatchConfig has no effect unless passed to MatchBuilder::with_config()"]
pub struct MatchConfig {
    /// Total playing time in minutes, split into two equal halves.
    ///
    /// Must be even and non-zero.
    ///
    /// Default: 80
    pub total_duration_minutes: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            total_duration_minutes: DEFAULT_TOTAL_DURATION_MINUTES,
        }
    }
}

impl MatchConfig {
    /// Creates a new `MatchConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Two 40-minute halves.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Two 45-minute halves.
    pub fn full_length() -> Self {
        Self {
            total_duration_minutes: 90,
        }
    }

    /// A custom total duration. Call [`validate`](Self::validate) before use.
    pub fn with_duration_minutes(minutes: u32) -> Self {
        Self {
            total_duration_minutes: minutes,
        }
    }

    /// Elapsed seconds at which the first half ends.
    #[must_use]
    pub const fn half_time_seconds(&self) -> u32 {
        self.total_duration_minutes.saturating_mul(60) / 2
    }

    /// Elapsed seconds at which the match ends.
    #[must_use]
    pub const fn full_time_seconds(&self) -> u32 {
        self.total_duration_minutes.saturating_mul(60)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TouchlineError::InvalidConfig`] if the duration is zero, odd,
    /// or too large to express in seconds.
    pub fn validate(&self) -> TouchlineResult<()> {
        validate_duration(self.total_duration_minutes)
    }
}

pub(crate) fn validate_duration(minutes: u32) -> TouchlineResult<()> {
    if minutes == 0 {
        return Err(TouchlineError::InvalidConfig {
            info: "total_duration_minutes must be greater than zero".to_owned(),
        });
    }
    if minutes % 2 != 0 {
        return Err(TouchlineError::InvalidConfig {
            info: format!(
                "total_duration_minutes must be even to split into halves, got {}",
                minutes
            ),
        });
    }
    if minutes.checked_mul(60).is_none() {
        return Err(TouchlineError::InvalidConfig {
            info: format!("total_duration_minutes {} overflows seconds", minutes),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn default_is_two_forty_minute_halves() {
        let config = MatchConfig::default();
        assert_eq!(config.total_duration_minutes, 80);
        assert_eq!(config.half_time_seconds(), 2400);
        assert_eq!(config.full_time_seconds(), 4800);
        assert_eq!(config, MatchConfig::standard());
        assert_eq!(config, MatchConfig::new());
    }

    #[test]
    fn full_length_preset() {
        let config = MatchConfig::full_length();
        assert_eq!(config.half_time_seconds(), 2700);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_and_odd() {
        assert!(MatchConfig::with_duration_minutes(0).validate().is_err());
        assert!(MatchConfig::with_duration_minutes(75).validate().is_err());
        assert!(MatchConfig::with_duration_minutes(u32::MAX - 1)
            .validate()
            .is_err());
        assert!(MatchConfig::with_duration_minutes(2).validate().is_ok());
    }

    #[test]
    fn struct_update_syntax() {
        let config = MatchConfig {
            total_duration_minutes: 60,
            ..MatchConfig::default()
        };
        assert_eq!(config.half_time_seconds(), 1800);
    }
}
