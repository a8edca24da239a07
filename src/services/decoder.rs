// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Projection of decoded session-log messages into a [`SessionRecord`].

use crate::models::{FieldValue, Message, SessionRecord};
use std::collections::HashMap;

/// Message kind carrying the log's creation time.
pub const TIMESTAMP_MESSAGE: &str = "file_id";

/// Message kind carrying the wave counters.
pub const SUMMARY_MESSAGE: &str = "session";

/// Build a record from a message stream.
///
/// Only the first message of each kind is consulted. Fields whose message
/// never appears, or which the message lacks, stay `None`.
pub fn decode_session_record(messages: &[Message]) -> SessionRecord {
    let mut first_by_kind: HashMap<&str, &Message> = HashMap::new();
    for message in messages {
        first_by_kind.entry(message.kind.as_str()).or_insert(message);
    }

    let timestamp = first_by_kind.get(TIMESTAMP_MESSAGE);
    let summary = first_by_kind.get(SUMMARY_MESSAGE);
    let number = |name: &str| summary.and_then(|m| m.get(name)).and_then(FieldValue::as_f64);

    SessionRecord {
        time_created: timestamp
            .and_then(|m| m.get("time_created"))
            .and_then(FieldValue::as_timestamp),
        wave_count: number("wave_count"),
        num_lefts: number("num_lefts"),
        num_rights: number("num_rights"),
        total_wave_time: number("total_wave_time"),
        total_wave_distance: number("total_wave_distance"),
        max_wave_time: number("max_wave_time"),
        max_wave_distance: number("max_wave_distance"),
        max_wave_speed: number("max_wave_speed"),
    }
}
