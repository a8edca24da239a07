// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin Connect client for activity listings and original FIT files.

use crate::error::AppError;
use crate::models::SensorActivity;
use crate::services::sync::SensorLogSource;
use reqwest::StatusCode;
use serde::Deserialize;
use std::io::{Cursor, Read};

pub const GARMIN_API_BASE: &str = "https://connectapi.garmin.com";

/// Authenticated session handle.
#[derive(Debug, Clone)]
pub struct GarminSession {
    pub display_name: String,
}

/// Garmin Connect API client.
pub struct GarminClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    session: Option<GarminSession>,
}

impl GarminClient {
    pub fn new(base_url: impl Into<String>, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            session: None,
        }
    }

    fn require_session(&self) -> Result<&GarminSession, AppError> {
        self.session.as_ref().ok_or(AppError::Unauthorized)
    }

    /// Authenticated GET; non-success statuses become errors.
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header("NK", "NT")
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::GarminApi(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }
}

/// Map a non-success Garmin status. A rejected token means the session is
/// gone and has to be re-established.
fn error_for_status(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized,
        _ => AppError::GarminApi(format!("HTTP {}: {}", status, body)),
    }
}

impl SensorLogSource for GarminClient {
    async fn connect(&mut self) -> Result<(), AppError> {
        // Drop the old handle first; a failed connect leaves no session.
        self.session = None;

        let url = format!("{}/userprofile-service/socialProfile", self.base_url);
        let profile: GarminProfile = self
            .get(&url, &[])
            .await?
            .json()
            .await
            .map_err(|e| AppError::GarminApi(format!("JSON parse error: {}", e)))?;

        tracing::info!(display_name = %profile.display_name, "Garmin Connect session established");
        self.session = Some(GarminSession {
            display_name: profile.display_name,
        });
        Ok(())
    }

    async fn list_activities(
        &mut self,
        category: &str,
        limit: u32,
    ) -> Result<Vec<SensorActivity>, AppError> {
        self.require_session()?;
        let url = format!(
            "{}/activitylist-service/activities/search/activities",
            self.base_url
        );

        let query = [
            ("activityType", category.to_string()),
            ("start", "0".to_string()),
            ("limit", limit.to_string()),
        ];
        let response = self.get(&url, &query).await?;

        let activities: Vec<GarminActivity> = response
            .json()
            .await
            .map_err(|e| AppError::GarminApi(format!("JSON parse error: {}", e)))?;

        Ok(activities
            .into_iter()
            .map(SensorActivity::from)
            .filter(|a| a.category_key == category)
            .collect())
    }

    async fn download_session_log(&mut self, activity_id: u64) -> Result<Vec<u8>, AppError> {
        self.require_session()?;
        let url = format!(
            "{}/download-service/files/activity/{}",
            self.base_url, activity_id
        );
        let archive = self.get(&url, &[]).await?.bytes().await?;
        extract_fit(&archive)
    }
}

/// Profile response used to validate the session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminProfile {
    display_name: String,
}

/// Activity entry from the activity list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminActivity {
    pub activity_id: u64,
    pub activity_type: GarminActivityType,
    /// e.g. `2024-07-01 18:00:15`
    pub start_time_local: String,
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminActivityType {
    pub type_key: String,
}

impl From<GarminActivity> for SensorActivity {
    fn from(activity: GarminActivity) -> Self {
        Self {
            activity_id: activity.activity_id,
            category_key: activity.activity_type.type_key,
            start_time_local: activity.start_time_local,
            distance: activity.distance,
        }
    }
}

/// Pull the FIT file out of a downloaded archive.
///
/// The first `.fit` member wins. A payload that already is a bare FIT
/// file is passed through.
pub fn extract_fit(payload: &[u8]) -> Result<Vec<u8>, AppError> {
    if payload.len() >= 12 && &payload[8..12] == b".FIT" {
        return Ok(payload.to_vec());
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(payload))
        .map_err(|e| AppError::Decode(format!("Not a zip archive: {}", e)))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| AppError::Decode(format!("Corrupt zip entry {}: {}", index, e)))?;
        if !entry.name().to_ascii_lowercase().ends_with(".fit") {
            continue;
        }
        let name = entry.name().to_string();
        let mut fit = Vec::new();
        entry
            .read_to_end(&mut fit)
            .map_err(|e| AppError::Decode(format!("Failed to inflate {}: {}", name, e)))?;
        tracing::debug!(member = %name, bytes = fit.len(), "Extracted FIT file");
        return Ok(fit);
    }

    Err(AppError::Decode("Archive contains no .fit file".to_string()))
}
