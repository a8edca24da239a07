// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The slice of the FIT profile this crate understands.
//!
//! Unknown messages and fields still decode; they are named
//! `unknown_<number>`.

/// Global message number of `field_description`.
pub const FIELD_DESCRIPTION: u16 = 206;

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// How a native field is interpreted beyond its base type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Plain,
    /// Seconds since the FIT epoch
    DateTime,
    /// Value is divided by `scale` after decoding
    Scaled(f64),
}

/// Name of a global message number.
pub fn message_name(global: u16) -> String {
    let name = match global {
        0 => "file_id",
        18 => "session",
        19 => "lap",
        20 => "record",
        21 => "event",
        23 => "device_info",
        34 => "activity",
        206 => "field_description",
        207 => "developer_data_id",
        other => return format!("unknown_{}", other),
    };
    name.to_string()
}

/// Name and interpretation of a native field.
pub fn field(global: u16, number: u8) -> (String, FieldKind) {
    use FieldKind::*;

    // timestamp is common to every message
    if number == 253 {
        return ("timestamp".to_string(), DateTime);
    }

    let known = match (global, number) {
        (0, 0) => Some(("type", Plain)),
        (0, 1) => Some(("manufacturer", Plain)),
        (0, 2) => Some(("product", Plain)),
        (0, 3) => Some(("serial_number", Plain)),
        (0, 4) => Some(("time_created", DateTime)),

        (18, 0) | (19, 0) => Some(("event", Plain)),
        (18, 2) | (19, 2) => Some(("start_time", DateTime)),
        (18, 5) => Some(("sport", Plain)),
        (18, 6) => Some(("sub_sport", Plain)),
        (18, 7) | (19, 7) => Some(("total_elapsed_time", Scaled(1000.0))),
        (18, 8) | (19, 8) => Some(("total_timer_time", Scaled(1000.0))),
        (18, 9) | (19, 9) => Some(("total_distance", Scaled(100.0))),
        (18, 15) => Some(("max_speed", Scaled(1000.0))),

        (20, 5) => Some(("distance", Scaled(100.0))),
        (20, 6) => Some(("speed", Scaled(1000.0))),

        (34, 1) => Some(("num_sessions", Plain)),
        (34, 5) => Some(("local_timestamp", DateTime)),

        (206, 0) => Some(("developer_data_index", Plain)),
        (206, 1) => Some(("field_definition_number", Plain)),
        (206, 2) => Some(("fit_base_type_id", Plain)),
        (206, 3) => Some(("field_name", Plain)),
        (206, 6) => Some(("scale", Plain)),
        (206, 7) => Some(("offset", Plain)),
        (206, 8) => Some(("units", Plain)),

        (207, 3) => Some(("developer_data_index", Plain)),
        _ => None,
    };

    match known {
        Some((name, kind)) => (name.to_string(), kind),
        None => (format!("unknown_{}", number), Plain),
    }
}

/// FIT base types, keyed by the low five bits of the base type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Enum,
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    String,
    Float32,
    Float64,
    UInt8z,
    UInt16z,
    UInt32z,
    Byte,
    SInt64,
    UInt64,
    UInt64z,
}

impl BaseType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use BaseType::*;
        let base = match byte & 0x1F {
            0 => Enum,
            1 => SInt8,
            2 => UInt8,
            3 => SInt16,
            4 => UInt16,
            5 => SInt32,
            6 => UInt32,
            7 => String,
            8 => Float32,
            9 => Float64,
            10 => UInt8z,
            11 => UInt16z,
            12 => UInt32z,
            13 => Byte,
            14 => SInt64,
            15 => UInt64,
            16 => UInt64z,
            _ => return None,
        };
        Some(base)
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        use BaseType::*;
        match self {
            Enum | SInt8 | UInt8 | String | UInt8z | Byte => 1,
            SInt16 | UInt16 | UInt16z => 2,
            SInt32 | UInt32 | UInt32z | Float32 => 4,
            Float64 | SInt64 | UInt64 | UInt64z => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(message_name(0), "file_id");
        assert_eq!(message_name(18), "session");
        assert_eq!(message_name(999), "unknown_999");
        assert_eq!(field(0, 4), ("time_created".to_string(), FieldKind::DateTime));
        assert_eq!(field(18, 253).0, "timestamp");
        assert_eq!(field(18, 77).0, "unknown_77");
    }

    #[test]
    fn test_base_type_ignores_endian_flag() {
        assert_eq!(BaseType::from_byte(0x84), Some(BaseType::UInt16));
        assert_eq!(BaseType::from_byte(0x04), Some(BaseType::UInt16));
        assert_eq!(BaseType::from_byte(0x1F), None);
        assert_eq!(BaseType::UInt32.size(), 4);
    }
}
