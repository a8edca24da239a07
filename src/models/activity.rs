// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity models for both platforms.

use crate::time_utils::{self, TimeError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Activity as listed by the source of record, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityListing {
    pub id: u64,
    pub name: String,
    pub category: String,
    /// Source-local ISO-8601 start time
    pub start_time_local: String,
    /// Distance in meters
    pub distance: Option<f64>,
}

/// Source-of-record activity with an absolute start instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub start: DateTime<Utc>,
    /// Distance in meters
    pub distance: Option<f64>,
}

impl Activity {
    /// Normalize a listing whose local start time is in `zone`.
    pub fn from_listing(listing: ActivityListing, zone: Tz) -> Result<Self, TimeError> {
        let start = time_utils::parse_in_zone(&listing.start_time_local, zone)?;
        Ok(Self {
            id: listing.id,
            name: listing.name,
            category: listing.category,
            start,
            distance: listing.distance,
        })
    }
}

/// Activity as listed by the sensor-log source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorActivity {
    pub activity_id: u64,
    pub category_key: String,
    /// Source-local start time
    pub start_time_local: String,
    /// Distance in meters
    pub distance: Option<f64>,
}

/// Fields written back to the source of record. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "sport_type", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
