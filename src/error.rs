// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types and failure classification for the sync loop.

/// Application error type shared by the adapters and the sync loop.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Garmin API error: {0}")]
    GarminApi(String),

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Session log decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message used when Strava answers with HTTP 429.
    pub const STRAVA_RATE_LIMIT: &'static str = "Rate limit exceeded";

    /// Message used when Strava rejects the access token (HTTP 401).
    pub const STRAVA_TOKEN_ERROR: &'static str = "Invalid or expired token";

    /// True if this error indicates the Strava token is invalid or revoked.
    pub fn is_strava_token_error(&self) -> bool {
        match self {
            AppError::StravaApi(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("token") || msg.contains("invalid") || msg.contains("unauthorized")
            }
            AppError::Unauthorized => true,
            _ => false,
        }
    }

    /// True if a fresh session may recover from this error.
    ///
    /// Network, authentication and vendor API failures are transient.
    /// Decode failures are handled per log and never reach the loop's
    /// failure path.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized
                | AppError::StravaApi(_)
                | AppError::GarminApi(_)
                | AppError::Http(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Http(err.to_string())
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
