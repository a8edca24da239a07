// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decoded session-log messages and the record projected from them.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Unsigned(v) => Some(*v as f64),
            FieldValue::Signed(v) => Some(*v as f64),
            FieldValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// A typed, named bag of fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Message {
    /// Message kind, e.g. `file_id` or `session`
    pub kind: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Message {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion. The first value for a name wins.
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a field unless one with the same name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.entry(name.into()).or_insert(value);
    }

    /// Look up a field by name. `None` means the field is absent.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Session statistics extracted from one session log.
///
/// Every field is optional: a log missing the message that carries a
/// field leaves it `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionRecord {
    /// Local wall-clock creation time of the log
    pub time_created: Option<NaiveDateTime>,
    pub wave_count: Option<f64>,
    pub num_lefts: Option<f64>,
    pub num_rights: Option<f64>,
    /// Seconds
    pub total_wave_time: Option<f64>,
    /// Meters
    pub total_wave_distance: Option<f64>,
    /// Seconds
    pub max_wave_time: Option<f64>,
    /// Meters
    pub max_wave_distance: Option<f64>,
    /// km/h
    pub max_wave_speed: Option<f64>,
}

impl SessionRecord {
    /// True if none of the summary counters were found.
    pub fn summary_missing(&self) -> bool {
        [
            self.wave_count,
            self.num_lefts,
            self.num_rights,
            self.total_wave_time,
            self.total_wave_distance,
            self.max_wave_time,
            self.max_wave_distance,
            self.max_wave_speed,
        ]
        .iter()
        .all(Option::is_none)
    }
}
