// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use surf_sync::error::AppError;
use surf_sync::models::{ActivityListing, ActivityUpdate, SensorActivity};
use surf_sync::services::{RecordSource, SensorLogSource};

/// Seconds between the Unix epoch and the FIT epoch.
const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// Developer field numbers used by the surf session logs in these tests.
#[allow(dead_code)]
pub const SURF_FIELDS: [(u8, &str); 8] = [
    (0, "wave_count"),
    (1, "num_lefts"),
    (2, "num_rights"),
    (3, "total_wave_time"),
    (4, "total_wave_distance"),
    (5, "max_wave_time"),
    (6, "max_wave_distance"),
    (7, "max_wave_speed"),
];

#[allow(dead_code)]
pub fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

fn fit_seconds(ts: NaiveDateTime) -> u32 {
    (ts.and_utc().timestamp() - FIT_EPOCH_OFFSET) as u32
}

/// Minimal FIT writer for building session logs in tests.
#[derive(Default)]
pub struct FitBuilder {
    records: Vec<u8>,
}

#[allow(dead_code)]
impl FitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// file_id message (local type 0) with `time_created`.
    pub fn file_id(mut self, time_created: NaiveDateTime) -> Self {
        // definition: type (enum), time_created (uint32)
        self.records
            .extend_from_slice(&[0x40, 0, 0, 0, 0, 2, 0, 1, 0x00, 4, 4, 0x86]);
        self.records.push(0x00);
        self.records.push(4); // type = activity
        self.records
            .extend_from_slice(&fit_seconds(time_created).to_le_bytes());
        self
    }

    /// field_description messages (local type 1) for uint32 developer fields.
    pub fn developer_fields(mut self, fields: &[(u8, &str)]) -> Self {
        // definition: developer_data_index, field_definition_number,
        // fit_base_type_id, field_name[32]
        self.records.extend_from_slice(&[
            0x41, 0, 0, 206, 0, 4, 0, 1, 0x02, 1, 1, 0x02, 2, 1, 0x02, 3, 32, 0x07,
        ]);
        for (number, name) in fields {
            self.records.push(0x01);
            self.records.extend_from_slice(&[0, *number, 0x86]);
            let mut raw = [0u8; 32];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            self.records.extend_from_slice(&raw);
        }
        self
    }

    /// session message (local type 2) carrying uint32 developer values.
    pub fn session(mut self, timestamp: NaiveDateTime, values: &[(u8, u32)]) -> Self {
        self.records
            .extend_from_slice(&[0x40 | 0x20 | 0x02, 0, 0, 18, 0, 1, 253, 4, 0x86]);
        self.records.push(values.len() as u8);
        for (number, _) in values {
            self.records.extend_from_slice(&[*number, 4, 0]);
        }

        self.records.push(0x02);
        self.records
            .extend_from_slice(&fit_seconds(timestamp).to_le_bytes());
        for (_, value) in values {
            self.records.extend_from_slice(&value.to_le_bytes());
        }
        self
    }

    /// A record message (local type 3) with a speed sample, as noise.
    pub fn speed_sample(mut self, speed_mm_per_s: u16) -> Self {
        self.records
            .extend_from_slice(&[0x43, 0, 0, 20, 0, 1, 6, 2, 0x84]);
        self.records.push(0x03);
        self.records.extend_from_slice(&speed_mm_per_s.to_le_bytes());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut bytes = vec![12, 0x20, 0x08, 0x08];
        bytes.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b".FIT");
        bytes.extend_from_slice(&self.records);
        let crc = surf_sync::fit::crc16(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }
}

/// Wave statistics in `SURF_FIELDS` order.
#[derive(Debug, Clone, Copy)]
pub struct SurfStats(pub [u32; 8]);

#[allow(dead_code)]
impl SurfStats {
    /// The statistics used throughout the end-to-end scenarios.
    pub fn sample() -> Self {
        SurfStats([5, 2, 3, 120, 300, 12, 40, 18])
    }
}

/// A complete surf session log created at `created` (local time).
#[allow(dead_code)]
pub fn surf_log(created: NaiveDateTime, stats: SurfStats) -> Vec<u8> {
    let values: Vec<(u8, u32)> = SURF_FIELDS
        .iter()
        .zip(stats.0)
        .map(|((number, _), value)| (*number, value))
        .collect();

    FitBuilder::new()
        .file_id(created)
        .developer_fields(&SURF_FIELDS)
        .speed_sample(2500)
        .session(created, &values)
        .build()
}

// ─── Fake sources ────────────────────────────────────────────────────────────

#[allow(dead_code)]
pub fn strava_listing(id: u64, name: &str, category: &str, start_local: &str) -> ActivityListing {
    ActivityListing {
        id,
        name: name.to_string(),
        category: category.to_string(),
        start_time_local: start_local.to_string(),
        distance: None,
    }
}

#[allow(dead_code)]
pub fn garmin_activity(activity_id: u64, start_local: &str) -> SensorActivity {
    SensorActivity {
        activity_id,
        category_key: "surfing".to_string(),
        start_time_local: start_local.to_string(),
        distance: None,
    }
}

/// In-memory source of record. Updates are applied to its listings.
#[derive(Default)]
pub struct FakeStrava {
    pub listings: Vec<ActivityListing>,
    pub updates: Vec<(u64, ActivityUpdate)>,
    pub list_calls: u32,
    /// 1-based list calls that fail with a connection error
    pub fail_list_on: Vec<u32>,
    /// 1-based list calls that fail with a non-recoverable error
    pub fatal_list_on: Vec<u32>,
    pub invalidations: u32,
}

#[allow(dead_code)]
impl FakeStrava {
    pub fn with(listings: Vec<ActivityListing>) -> Self {
        Self {
            listings,
            ..Default::default()
        }
    }
}

impl RecordSource for FakeStrava {
    async fn list_activities(&mut self, per_page: u32) -> Result<Vec<ActivityListing>, AppError> {
        self.list_calls += 1;
        if self.fatal_list_on.contains(&self.list_calls) {
            return Err(AppError::Internal(anyhow::anyhow!("broken invariant")));
        }
        if self.fail_list_on.contains(&self.list_calls) {
            return Err(AppError::Http("connection reset by peer".to_string()));
        }
        Ok(self
            .listings
            .iter()
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn update_activity(
        &mut self,
        activity_id: u64,
        update: &ActivityUpdate,
    ) -> Result<(), AppError> {
        if let Some(listing) = self.listings.iter_mut().find(|l| l.id == activity_id) {
            if let Some(name) = &update.name {
                listing.name = name.clone();
            }
            if let Some(category) = &update.category {
                listing.category = category.clone();
            }
        }
        self.updates.push((activity_id, update.clone()));
        Ok(())
    }

    fn invalidate_credentials(&mut self) {
        self.invalidations += 1;
    }
}

/// In-memory sensor-log source.
#[derive(Default)]
pub struct FakeGarmin {
    pub activities: Vec<SensorActivity>,
    pub logs: HashMap<u64, Vec<u8>>,
    pub connect_calls: u32,
    /// 1-based connect calls that fail
    pub fail_connect_on: Vec<u32>,
    pub downloads: u32,
}

#[allow(dead_code)]
impl FakeGarmin {
    pub fn with_log(mut self, activity: SensorActivity, log: Vec<u8>) -> Self {
        self.logs.insert(activity.activity_id, log);
        self.activities.push(activity);
        self
    }
}

impl SensorLogSource for FakeGarmin {
    async fn connect(&mut self) -> Result<(), AppError> {
        self.connect_calls += 1;
        if self.fail_connect_on.contains(&self.connect_calls) {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }

    async fn list_activities(
        &mut self,
        category: &str,
        limit: u32,
    ) -> Result<Vec<SensorActivity>, AppError> {
        Ok(self
            .activities
            .iter()
            .filter(|a| a.category_key == category)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn download_session_log(&mut self, activity_id: u64) -> Result<Vec<u8>, AppError> {
        self.downloads += 1;
        self.logs
            .get(&activity_id)
            .cloned()
            .ok_or_else(|| AppError::Decode(format!("no log for {}", activity_id)))
    }
}
