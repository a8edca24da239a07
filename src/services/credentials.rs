// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token lifecycle for the source of record.
//!
//! The sync loop only ever asks for a valid token. Refreshing, rotation of
//! the refresh token and persisting it are the provider's business.

use crate::error::{AppError, Result};
use crate::services::strava::StravaClient;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Token triple returned by an OAuth refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp
    pub expires_at: i64,
}

/// Source of valid access tokens.
#[allow(async_fn_in_trait)]
pub trait CredentialProvider {
    /// Return an access token that is valid for at least a few minutes.
    async fn get_valid_token(&mut self) -> Result<String>;

    /// Record a freshly issued token set.
    fn on_rotation(&mut self, tokens: &TokenSet) -> Result<()>;

    /// Forget any cached access token so the next call refreshes.
    fn invalidate(&mut self);
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Strava credentials backed by a refresh token.
///
/// Rotated tokens are kept in memory and, when `token_path` is set,
/// written there as JSON so a restart picks up the latest refresh token.
pub struct StravaCredentials {
    client: StravaClient,
    refresh_token: String,
    cached: Option<CachedToken>,
    token_path: Option<PathBuf>,
}

impl StravaCredentials {
    /// Create credentials from a configured refresh token.
    ///
    /// If `token_path` points at a previously persisted token set, its
    /// refresh token takes precedence over `refresh_token`.
    pub fn new(client: StravaClient, refresh_token: String, token_path: Option<PathBuf>) -> Self {
        let mut creds = Self {
            client,
            refresh_token,
            cached: None,
            token_path,
        };

        if let Some(path) = creds.token_path.clone() {
            match load_token_set(&path) {
                Ok(Some(tokens)) => {
                    tracing::info!(path = %path.display(), "Loaded persisted Strava tokens");
                    creds.remember(&tokens);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable token file"
                    );
                }
            }
        }

        creds
    }

    fn remember(&mut self, tokens: &TokenSet) {
        self.refresh_token = tokens.refresh_token.clone();
        self.cached = DateTime::from_timestamp(tokens.expires_at, 0).map(|expires_at| CachedToken {
            access_token: tokens.access_token.clone(),
            expires_at,
        });
    }

    /// Refresh token that the next refresh will use.
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl CredentialProvider for StravaCredentials {
    async fn get_valid_token(&mut self) -> Result<String> {
        if let Some(cached) = &self.cached {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.access_token.clone());
            }
        }

        tracing::info!("Refreshing Strava access token");
        let tokens = self.client.refresh_token(&self.refresh_token).await?;
        self.on_rotation(&tokens)?;
        Ok(tokens.access_token)
    }

    fn on_rotation(&mut self, tokens: &TokenSet) -> Result<()> {
        if tokens.refresh_token != self.refresh_token {
            tracing::info!("Strava refresh token rotated");
        }
        self.remember(tokens);

        if let Some(path) = &self.token_path {
            save_token_set(path, tokens)?;
            tracing::debug!(path = %path.display(), "Persisted Strava tokens");
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.cached = None;
    }
}

fn load_token_set(path: &Path) -> anyhow::Result<Option<TokenSet>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&json)?))
}

fn save_token_set(path: &Path, tokens: &TokenSet) -> Result<()> {
    let json = serde_json::to_string_pretty(tokens)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode tokens: {}", e)))?;
    std::fs::write(path, json).map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "Failed to write token file {}: {}",
            path.display(),
            e
        ))
    })
}
