// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for listing and updating activities.
//!
//! Handles:
//! - Recent activity listing (bounded page size)
//! - Activity name / sport type / description updates
//! - Token refresh
//! - Rate limit and token rejection detection

use crate::error::AppError;
use crate::models::{ActivityListing, ActivityUpdate};
use crate::services::credentials::{CredentialProvider, TokenSet};
use crate::services::sync::RecordSource;
use reqwest::StatusCode;
use serde::Deserialize;

pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
pub const STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: STRAVA_API_BASE.to_string(),
            token_url: STRAVA_TOKEN_URL.to_string(),
            client_id,
            client_secret,
        }
    }

    /// Point the client at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Point token refreshes at a different OAuth endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// List the athlete's most recent activities.
    pub async fn list_activities(
        &self,
        access_token: &str,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Apply an update to an activity.
    pub async fn update_activity(
        &self,
        access_token: &str,
        activity_id: u64,
        update: &ActivityUpdate,
    ) -> Result<(), AppError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// Exchange a refresh token for a new token set.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::status_error(response).await)
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }

    async fn status_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error_for_status(status, &body)
    }
}

/// Map a non-success Strava status to an error with a stable message.
fn error_for_status(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!("Strava rate limit hit (429)");
            AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string())
        }
        StatusCode::UNAUTHORIZED => AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string()),
        _ => AppError::StravaApi(format!("HTTP {}: {}", status, body)),
    }
}

/// Summary activity for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivitySummary {
    pub id: u64,
    pub name: String,
    pub sport_type: String,
    /// Local wall-clock start, suffixed with a misleading `Z`
    pub start_date_local: String,
    #[serde(default)]
    pub distance: Option<f64>,
}

impl From<StravaActivitySummary> for ActivityListing {
    fn from(summary: StravaActivitySummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            category: summary.sport_type,
            start_time_local: summary.start_date_local,
            distance: summary.distance,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - client plus token management
// ─────────────────────────────────────────────────────────────────────────────

/// Strava as the loop's source of record.
pub struct StravaService<C> {
    client: StravaClient,
    credentials: C,
}

impl<C: CredentialProvider> StravaService<C> {
    pub fn new(client: StravaClient, credentials: C) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Drop the cached access token as soon as Strava rejects it.
    fn note_failure(&mut self, err: AppError) -> AppError {
        if err.is_strava_token_error() {
            tracing::warn!(error = %err, "Strava rejected the access token, dropping it");
            self.credentials.invalidate();
        }
        err
    }
}

impl<C: CredentialProvider> RecordSource for StravaService<C> {
    async fn list_activities(&mut self, per_page: u32) -> Result<Vec<ActivityListing>, AppError> {
        let access_token = self.credentials.get_valid_token().await?;
        let activities = self
            .client
            .list_activities(&access_token, per_page)
            .await
            .map_err(|e| self.note_failure(e))?;
        tracing::debug!(count = activities.len(), "Fetched Strava activities");
        Ok(activities.into_iter().map(ActivityListing::from).collect())
    }

    async fn update_activity(
        &mut self,
        activity_id: u64,
        update: &ActivityUpdate,
    ) -> Result<(), AppError> {
        let access_token = self.credentials.get_valid_token().await?;
        self.client
            .update_activity(&access_token, activity_id, update)
            .await
            .map_err(|e| self.note_failure(e))
    }

    fn invalidate_credentials(&mut self) {
        self.credentials.invalidate();
    }
}
