// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Renaming rules and the wave summary written into the description.

use crate::config::SyncSettings;
use crate::models::{Activity, ActivityUpdate, SessionRecord};

/// Rendered in place of a statistic the session log did not contain.
pub const MISSING_PLACEHOLDER: &str = "n/a";

/// Which activities get migrated, and into what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renaming {
    pub marker: String,
    pub replacement: String,
    pub from_category: String,
    pub to_category: String,
}

impl Renaming {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            marker: settings.rename_marker.clone(),
            replacement: settings.rename_replacement.clone(),
            from_category: settings.source_category.clone(),
            to_category: settings.target_category.clone(),
        }
    }

    /// An activity is a target if its name still carries the marker and it
    /// has not been recategorized yet.
    pub fn is_target(&self, activity: &Activity) -> bool {
        !self.marker.is_empty()
            && activity.name.contains(&self.marker)
            && activity.category == self.from_category
    }

    pub fn rename(&self, name: &str) -> String {
        name.replace(&self.marker, &self.replacement)
    }

    /// Build the update for a matched activity.
    pub fn build_update(&self, activity: &Activity, record: &SessionRecord) -> ActivityUpdate {
        ActivityUpdate {
            name: Some(self.rename(&activity.name)),
            category: Some(self.to_category.clone()),
            description: Some(format_description(record)),
        }
    }
}

/// Render the wave statistics, one per line.
pub fn format_description(record: &SessionRecord) -> String {
    let lines = [
        ("Number Of Total Waves", record.wave_count, ""),
        ("Number Of Lefts", record.num_lefts, ""),
        ("Number Of Rights", record.num_rights, ""),
        ("Total Wave Time", record.total_wave_time, " s"),
        ("Total Wave Distance", record.total_wave_distance, " m"),
        ("Max Wave Time", record.max_wave_time, " s"),
        ("Max Wave Distance", record.max_wave_distance, " m"),
        ("Max Speed", record.max_wave_speed, " km/h"),
    ];

    lines
        .iter()
        .map(|(label, value, unit)| match value {
            Some(v) => format!("{}: {}{}", label, format_number(*v), unit),
            None => format!("{}: {}", label, MISSING_PLACEHOLDER),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whole numbers without a fraction, everything else with at most two
/// decimals.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rounded = format!("{:.2}", value);
        rounded.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn renaming() -> Renaming {
        Renaming::from_settings(&SyncSettings::default())
    }

    fn activity(name: &str, category: &str) -> Activity {
        Activity {
            id: 42,
            name: name.to_string(),
            category: category.to_string(),
            start: Utc.with_ymd_and_hms(2024, 7, 1, 16, 0, 0).unwrap(),
            distance: None,
        }
    }

    fn full_record() -> SessionRecord {
        SessionRecord {
            time_created: None,
            wave_count: Some(5.0),
            num_lefts: Some(2.0),
            num_rights: Some(3.0),
            total_wave_time: Some(120.0),
            total_wave_distance: Some(300.0),
            max_wave_time: Some(12.0),
            max_wave_distance: Some(40.0),
            max_wave_speed: Some(18.0),
        }
    }

    #[test]
    fn test_is_target() {
        let r = renaming();
        assert!(r.is_target(&activity("Abendsuppen", "StandUpPaddling")));
        assert!(!r.is_target(&activity("AbendSurfen", "StandUpPaddling")));
        assert!(!r.is_target(&activity("Abendsuppen", "Surfing")));
        assert!(!r.is_target(&activity("Morning Run", "Run")));
    }

    #[test]
    fn test_renamed_activity_is_no_longer_a_target() {
        let r = renaming();
        let mut a = activity("Abendsuppen", "StandUpPaddling");
        let update = r.build_update(&a, &full_record());
        a.name = update.name.unwrap();
        a.category = update.category.unwrap();
        assert_eq!(a.name, "AbendSurfen");
        assert!(!r.is_target(&a));
    }

    #[test]
    fn test_build_update() {
        let paddle = activity("Abendsuppen", "StandUpPaddling");
        let update = renaming().build_update(&paddle, &full_record());
        assert_eq!(update.name.as_deref(), Some("AbendSurfen"));
        assert_eq!(update.category.as_deref(), Some("Surfing"));
        assert_eq!(
            update.description.as_deref(),
            Some(
                "Number Of Total Waves: 5\n\
                 Number Of Lefts: 2\n\
                 Number Of Rights: 3\n\
                 Total Wave Time: 120 s\n\
                 Total Wave Distance: 300 m\n\
                 Max Wave Time: 12 s\n\
                 Max Wave Distance: 40 m\n\
                 Max Speed: 18 km/h"
            )
        );
    }

    #[test]
    fn test_missing_fields_render_placeholders() {
        let description = format_description(&SessionRecord::default());
        assert_eq!(description.lines().count(), 8);
        assert!(description.lines().all(|l| l.ends_with(": n/a")));
    }

    #[test]
    fn test_partial_record() {
        let record = SessionRecord {
            wave_count: Some(7.0),
            max_wave_speed: Some(21.456),
            ..Default::default()
        };
        let description = format_description(&record);
        assert!(description.starts_with("Number Of Total Waves: 7\nNumber Of Lefts: n/a"));
        assert!(description.ends_with("Max Speed: 21.46 km/h"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(18.0), "18");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(0.004), "0");
        assert_eq!(format_number(-3.0), "-3");
    }
}
