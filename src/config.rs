// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to the components that
//! need it. Nothing here is global.

use crate::services::garmin::GARMIN_API_BASE;
use crate::services::strava::{STRAVA_API_BASE, STRAVA_TOKEN_URL};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Widest accepted time tolerance (one day).
pub const MAX_TIME_TOLERANCE_SECS: i64 = 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Strava (source of record) ---
    /// Strava OAuth client ID
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Long-lived refresh token used to mint access tokens
    pub strava_refresh_token: String,
    /// Where rotated Strava tokens are persisted, if anywhere
    pub strava_token_path: Option<PathBuf>,
    /// Strava API base URL
    pub strava_api_base: String,
    /// Strava OAuth token endpoint
    pub strava_token_url: String,

    // --- Garmin Connect (sensor-log source) ---
    /// Bearer token for Garmin Connect
    pub garmin_access_token: String,
    /// Garmin Connect API base URL
    pub garmin_api_base: String,

    /// Matching, renaming and pacing parameters
    pub sync: SyncSettings,
}

/// Tunables of the reconciliation loop.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Maximum start-time difference for a match (inclusive)
    pub time_tolerance_secs: i64,
    /// Maximum distance difference for a match; `None` disables the check
    pub distance_tolerance_meters: Option<f64>,
    /// Pause between two completed poll cycles
    pub poll_interval: Duration,
    /// Pause before re-authenticating after a failure
    pub retry_backoff: Duration,
    /// Consecutive failures after which the loop gives up
    pub max_consecutive_failures: u32,
    /// How many Strava activities to fetch per cycle
    pub page_size: u32,
    /// How many Garmin activities to fetch per cycle
    pub sensor_fetch_limit: u32,
    /// Zone in which Strava reports local start times
    pub record_timezone: Tz,
    /// Zone in which the session logs record their creation time
    pub sensor_timezone: Tz,
    /// Garmin activity type key to fetch
    pub sensor_category: String,
    /// Name fragment that marks an activity for migration
    pub rename_marker: String,
    /// Text that replaces the marker in the new name
    pub rename_replacement: String,
    /// Category an activity must currently have to be migrated
    pub source_category: String,
    /// Category written back on migration
    pub target_category: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            time_tolerance_secs: 20,
            distance_tolerance_meters: None,
            poll_interval: Duration::from_secs(300),
            retry_backoff: Duration::from_secs(30),
            max_consecutive_failures: 2,
            page_size: 30,
            sensor_fetch_limit: 20,
            record_timezone: chrono_tz::Europe::Amsterdam,
            sensor_timezone: chrono_tz::Europe::Amsterdam,
            sensor_category: "surfing".to_string(),
            rename_marker: "suppen".to_string(),
            rename_replacement: "Surfen".to_string(),
            source_category: "StandUpPaddling".to_string(),
            target_category: "Surfing".to_string(),
        }
    }
}

impl SyncSettings {
    /// Settings for tests: defaults with no waiting between cycles.
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Read every tunable from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let settings = Self {
            time_tolerance_secs: parse_or(
                "MATCH_TIME_TOLERANCE_SECS",
                defaults.time_tolerance_secs,
            )?,
            distance_tolerance_meters: parse_opt("MATCH_DISTANCE_TOLERANCE_METERS")?,
            poll_interval: Duration::from_secs(parse_or(
                "POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )?),
            retry_backoff: Duration::from_secs(parse_or(
                "RETRY_BACKOFF_SECS",
                defaults.retry_backoff.as_secs(),
            )?),
            max_consecutive_failures: parse_or(
                "MAX_CONSECUTIVE_FAILURES",
                defaults.max_consecutive_failures,
            )?,
            page_size: parse_or("STRAVA_PAGE_SIZE", defaults.page_size)?,
            sensor_fetch_limit: parse_or("GARMIN_FETCH_LIMIT", defaults.sensor_fetch_limit)?,
            record_timezone: parse_or("STRAVA_TIMEZONE", defaults.record_timezone)?,
            sensor_timezone: parse_or("GARMIN_TIMEZONE", defaults.sensor_timezone)?,
            sensor_category: env::var("GARMIN_ACTIVITY_TYPE").unwrap_or(defaults.sensor_category),
            rename_marker: env::var("RENAME_MARKER").unwrap_or(defaults.rename_marker),
            rename_replacement: env::var("RENAME_REPLACEMENT")
                .unwrap_or(defaults.rename_replacement),
            source_category: env::var("SOURCE_CATEGORY").unwrap_or(defaults.source_category),
            target_category: env::var("TARGET_CATEGORY").unwrap_or(defaults.target_category),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject tolerances that would disable matching or cannot be
    /// represented.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_TIME_TOLERANCE_SECS).contains(&self.time_tolerance_secs) {
            return Err(ConfigError::Invalid {
                name: "MATCH_TIME_TOLERANCE_SECS",
                value: self.time_tolerance_secs.to_string(),
            });
        }
        if let Some(meters) = self.distance_tolerance_meters {
            if !meters.is_finite() || meters < 0.0 {
                return Err(ConfigError::Invalid {
                    name: "MATCH_DISTANCE_TOLERANCE_METERS",
                    value: meters.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_refresh_token: "test_refresh_token".to_string(),
            strava_token_path: None,
            strava_api_base: "http://localhost:9".to_string(),
            strava_token_url: "http://localhost:9/oauth/token".to_string(),
            garmin_access_token: "test_garmin_token".to_string(),
            garmin_api_base: "http://localhost:9".to_string(),
            sync: SyncSettings::immediate(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            strava_refresh_token: required("STRAVA_REFRESH_TOKEN")?,
            strava_token_path: env::var("STRAVA_TOKEN_PATH").ok().map(PathBuf::from),
            strava_api_base: env::var("STRAVA_API_BASE")
                .unwrap_or_else(|_| STRAVA_API_BASE.to_string()),
            strava_token_url: env::var("STRAVA_TOKEN_URL")
                .unwrap_or_else(|_| STRAVA_TOKEN_URL.to_string()),
            garmin_access_token: required("GARMIN_ACCESS_TOKEN")?,
            garmin_api_base: env::var("GARMIN_API_BASE")
                .unwrap_or_else(|_| GARMIN_API_BASE.to_string()),
            sync: SyncSettings::from_env()?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(parse_opt(name)?.unwrap_or(default))
}

fn parse_opt<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("STRAVA_CLIENT_ID", "test_id");
        env::set_var("STRAVA_CLIENT_SECRET", " test_secret\n");
        env::set_var("STRAVA_REFRESH_TOKEN", "test_refresh");
        env::set_var("GARMIN_ACCESS_TOKEN", "test_garmin");
        env::set_var("MATCH_DISTANCE_TOLERANCE_METERS", "150");
        env::set_var("GARMIN_TIMEZONE", "UTC");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.strava_client_id, "test_id");
        assert_eq!(config.strava_client_secret, "test_secret");
        assert_eq!(config.sync.time_tolerance_secs, 20);
        assert_eq!(config.sync.distance_tolerance_meters, Some(150.0));
        assert_eq!(config.sync.sensor_timezone, chrono_tz::UTC);
        assert_eq!(config.sync.record_timezone, chrono_tz::Europe::Amsterdam);
    }

    #[test]
    fn test_parse_opt_rejects_garbage() {
        env::set_var("SURF_SYNC_TEST_BAD_NUMBER", "twenty");
        let result: Result<Option<i64>, _> = parse_opt("SURF_SYNC_TEST_BAD_NUMBER");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "SURF_SYNC_TEST_BAD_NUMBER", .. })
        ));
    }

    #[test]
    fn test_validate_time_tolerance_range() {
        let mut settings = SyncSettings::default();
        assert!(settings.validate().is_ok());

        settings.time_tolerance_secs = MAX_TIME_TOLERANCE_SECS;
        assert!(settings.validate().is_ok());

        for bad in [-1, MAX_TIME_TOLERANCE_SECS + 1, i64::MAX / 10] {
            settings.time_tolerance_secs = bad;
            assert!(
                matches!(
                    settings.validate(),
                    Err(ConfigError::Invalid { name: "MATCH_TIME_TOLERANCE_SECS", .. })
                ),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_validate_distance_tolerance() {
        let mut settings = SyncSettings::default();
        settings.distance_tolerance_meters = Some(0.0);
        assert!(settings.validate().is_ok());

        for bad in [-5.0, f64::NAN, f64::INFINITY] {
            settings.distance_tolerance_meters = Some(bad);
            assert!(matches!(
                settings.validate(),
                Err(ConfigError::Invalid { name: "MATCH_DISTANCE_TOLERANCE_METERS", .. })
            ));
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = SyncSettings::default();
        assert_eq!(settings.time_tolerance_secs, 20);
        assert!(settings.distance_tolerance_meters.is_none());
        assert_eq!(settings.max_consecutive_failures, 2);
        assert_eq!(settings.rename_marker, "suppen");
        assert_eq!(settings.target_category, "Surfing");
    }
}
