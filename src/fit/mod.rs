// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decoder for FIT session logs.
//!
//! Turns the binary container into a flat list of [`Message`]s:
//! - 12/14 byte file header with the `.FIT` signature
//! - definition messages (per local message type, either endianness)
//! - data messages, including compressed-timestamp headers
//! - developer fields, named by preceding `field_description` messages
//! - the trailing file CRC
//!
//! Decoding never gives up on the whole file. When the input is cut short
//! or malformed, everything decoded before the fault is returned together
//! with the error. A CRC mismatch is reported the same way, after all
//! messages have been decoded.

pub mod profile;

use crate::models::{FieldValue, Message};
use chrono::DateTime;
use profile::{BaseType, FieldKind, FIELD_DESCRIPTION, FIT_EPOCH_OFFSET};
use std::collections::HashMap;

const SIGNATURE: &[u8; 4] = b".FIT";
const MIN_HEADER_SIZE: usize = 12;
const TIMESTAMP_FIELD: u8 = 253;

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Errors from FIT decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FitError {
    #[error("File too short for a FIT header ({0} bytes)")]
    TooShort(usize),

    #[error("Missing .FIT signature")]
    BadSignature,

    #[error("Unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("Data message for undefined local type {local} at offset {offset}")]
    UndefinedLocalMessage { local: u8, offset: usize },

    #[error("File CRC mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    BadCrc { stored: u16, computed: u16 },
}

/// Result of decoding one file: the messages and, if decoding stopped
/// early, why.
#[derive(Debug, Default)]
pub struct Decoded {
    pub messages: Vec<Message>,
    pub error: Option<FitError>,
}

impl Decoded {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
struct FieldDef {
    number: u8,
    size: usize,
    base: u8,
}

#[derive(Debug, Clone)]
struct DevFieldDef {
    number: u8,
    size: usize,
    dev_index: u8,
}

#[derive(Debug, Clone)]
struct Definition {
    big_endian: bool,
    global: u16,
    fields: Vec<FieldDef>,
    dev_fields: Vec<DevFieldDef>,
}

#[derive(Debug, Clone)]
struct DevFieldDescription {
    name: String,
    base: BaseType,
    scale: Option<f64>,
    offset: Option<f64>,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Offset of `buf` in the whole file, for error reporting
    base_offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FitError> {
        if self.buf.len() - self.pos < n {
            return Err(FitError::Truncated {
                offset: self.base_offset + self.pos,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, FitError> {
        Ok(self.take(1)?[0])
    }

    fn offset(&self) -> usize {
        self.base_offset + self.pos
    }

    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// Decode a complete FIT file.
pub fn decode(bytes: &[u8]) -> Decoded {
    let (header_size, data_size) = match parse_header(bytes) {
        Ok(h) => h,
        Err(e) => {
            return Decoded {
                messages: Vec::new(),
                error: Some(e),
            }
        }
    };

    let declared_end = header_size.saturating_add(data_size);
    let end = declared_end.min(bytes.len());
    let mut decoder = Decoder::default();
    let mut reader = Reader {
        buf: &bytes[header_size..end],
        pos: 0,
        base_offset: header_size,
    };

    while !reader.at_end() {
        if let Err(e) = decoder.record(&mut reader) {
            return Decoded {
                messages: decoder.messages,
                error: Some(e),
            };
        }
    }

    Decoded {
        messages: decoder.messages,
        error: check_crc(bytes, declared_end).err(),
    }
}

/// FIT CRC-16 of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |crc, byte| {
        let crc = crc_nibble(crc, byte & 0x0F);
        crc_nibble(crc, byte >> 4)
    })
}

fn crc_nibble(crc: u16, nibble: u8) -> u16 {
    let tmp = CRC_TABLE[usize::from(crc & 0x0F)];
    ((crc >> 4) & 0x0FFF) ^ tmp ^ CRC_TABLE[usize::from(nibble)]
}

/// Compare the two bytes after the data section with the CRC of
/// everything before them.
fn check_crc(bytes: &[u8], data_end: usize) -> Result<(), FitError> {
    let Some(stored) = bytes.get(data_end..data_end.saturating_add(2)) else {
        return Err(FitError::Truncated {
            offset: data_end.min(bytes.len()),
        });
    };
    let stored = u16::from_le_bytes([stored[0], stored[1]]);
    let computed = crc16(&bytes[..data_end]);
    if stored != computed {
        return Err(FitError::BadCrc { stored, computed });
    }
    Ok(())
}

/// Returns (header size, data size).
fn parse_header(bytes: &[u8]) -> Result<(usize, usize), FitError> {
    if bytes.len() < MIN_HEADER_SIZE {
        return Err(FitError::TooShort(bytes.len()));
    }
    let header_size = bytes[0] as usize;
    if header_size < MIN_HEADER_SIZE || bytes.len() < header_size {
        return Err(FitError::TooShort(bytes.len()));
    }
    if &bytes[8..12] != SIGNATURE {
        return Err(FitError::BadSignature);
    }
    let data_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    Ok((header_size, data_size))
}

#[derive(Default)]
struct Decoder {
    definitions: HashMap<u8, Definition>,
    dev_descriptions: HashMap<(u8, u8), DevFieldDescription>,
    /// Raw value of the most recent timestamp field, for compressed headers
    last_timestamp: Option<u32>,
    messages: Vec<Message>,
}

impl Decoder {
    fn record(&mut self, r: &mut Reader<'_>) -> Result<(), FitError> {
        let offset = r.offset();
        let header = r.u8()?;

        if header & 0x80 != 0 {
            // Compressed timestamp header: local type in bits 5-6, offset in 0-4
            let timestamp = self.last_timestamp.map(|last| rolled_timestamp(last, header & 0x1F));
            return self.data_message(r, (header >> 5) & 0x03, offset, timestamp);
        }

        let local = header & 0x0F;
        if header & 0x40 != 0 {
            self.definition_message(r, local, header & 0x20 != 0)
        } else {
            self.data_message(r, local, offset, None)
        }
    }

    fn definition_message(
        &mut self,
        r: &mut Reader<'_>,
        local: u8,
        has_dev_fields: bool,
    ) -> Result<(), FitError> {
        let _reserved = r.u8()?;
        let big_endian = r.u8()? == 1;
        let raw_global = r.take(2)?;
        let global = if big_endian {
            u16::from_be_bytes([raw_global[0], raw_global[1]])
        } else {
            u16::from_le_bytes([raw_global[0], raw_global[1]])
        };

        let count = r.u8()?;
        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let def = r.take(3)?;
            fields.push(FieldDef {
                number: def[0],
                size: def[1] as usize,
                base: def[2],
            });
        }

        let mut dev_fields = Vec::new();
        if has_dev_fields {
            let count = r.u8()?;
            for _ in 0..count {
                let def = r.take(3)?;
                dev_fields.push(DevFieldDef {
                    number: def[0],
                    size: def[1] as usize,
                    dev_index: def[2],
                });
            }
        }

        self.definitions.insert(
            local,
            Definition {
                big_endian,
                global,
                fields,
                dev_fields,
            },
        );
        Ok(())
    }

    fn data_message(
        &mut self,
        r: &mut Reader<'_>,
        local: u8,
        offset: usize,
        compressed_timestamp: Option<u32>,
    ) -> Result<(), FitError> {
        let def = self
            .definitions
            .get(&local)
            .cloned()
            .ok_or(FitError::UndefinedLocalMessage { local, offset })?;

        let mut message = Message::new(profile::message_name(def.global));

        for field in &def.fields {
            let raw = r.take(field.size)?;
            let Some(base) = BaseType::from_byte(field.base) else {
                continue;
            };
            let Some(value) = decode_value(raw, base, def.big_endian) else {
                continue;
            };
            if field.number == TIMESTAMP_FIELD {
                if let FieldValue::Unsigned(secs) = value {
                    self.last_timestamp = u32::try_from(secs).ok();
                }
            }
            let (name, kind) = profile::field(def.global, field.number);
            if let Some(value) = apply_kind(value, kind) {
                message.insert(name, value);
            }
        }

        for field in &def.dev_fields {
            let raw = r.take(field.size)?;
            let Some(desc) = self.dev_descriptions.get(&(field.dev_index, field.number)) else {
                continue;
            };
            let Some(value) = decode_value(raw, desc.base, def.big_endian) else {
                continue;
            };
            let value = match (desc.scale, desc.offset, value.as_f64()) {
                (None, None, _) | (_, _, None) => value,
                (scale, offset, Some(v)) => {
                    FieldValue::Float(v / scale.unwrap_or(1.0) - offset.unwrap_or(0.0))
                }
            };
            message.insert(desc.name.clone(), value);
        }

        if let Some(timestamp) = compressed_timestamp {
            self.last_timestamp = Some(timestamp);
            let value = FieldValue::Unsigned(u64::from(timestamp));
            if let Some(value) = apply_kind(value, FieldKind::DateTime) {
                message.insert("timestamp", value);
            }
        }

        if def.global == FIELD_DESCRIPTION {
            self.register_dev_field(&message);
        }

        self.messages.push(message);
        Ok(())
    }

    fn register_dev_field(&mut self, message: &Message) {
        let num = |name: &str| message.get(name).and_then(FieldValue::as_f64);

        let (Some(index), Some(field_number), Some(base_id)) = (
            num("developer_data_index"),
            num("field_definition_number"),
            num("fit_base_type_id"),
        ) else {
            tracing::debug!("Incomplete field_description, ignoring");
            return;
        };
        let Some(base) = BaseType::from_byte(base_id as u8) else {
            return;
        };
        let name = match message.get("field_name") {
            Some(FieldValue::Text(name)) => name.clone(),
            _ => format!("developer_{}_{}", index as u8, field_number as u8),
        };

        self.dev_descriptions.insert(
            (index as u8, field_number as u8),
            DevFieldDescription {
                name,
                base,
                scale: num("scale").filter(|s| *s != 0.0),
                offset: num("offset"),
            },
        );
    }
}

fn apply_kind(value: FieldValue, kind: FieldKind) -> Option<FieldValue> {
    match kind {
        FieldKind::Plain => Some(value),
        FieldKind::Scaled(scale) => value.as_f64().map(|v| FieldValue::Float(v / scale)),
        FieldKind::DateTime => {
            // Out-of-range seconds are treated like the invalid sentinel
            let secs = (value.as_f64()? as i64).checked_add(FIT_EPOCH_OFFSET)?;
            DateTime::from_timestamp(secs, 0).map(|dt| FieldValue::Timestamp(dt.naive_utc()))
        }
    }
}

/// Decode the first element of a field, or `None` for the invalid sentinel.
fn decode_value(raw: &[u8], base: BaseType, big_endian: bool) -> Option<FieldValue> {
    if base == BaseType::String {
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        let text = String::from_utf8_lossy(&raw[..end]).into_owned();
        return (!text.is_empty()).then_some(FieldValue::Text(text));
    }

    let size = base.size();
    if raw.len() < size {
        return None;
    }
    let chunk = &raw[..size];
    let bits = if big_endian {
        chunk.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    } else {
        chunk.iter().rev().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    };

    if bits == invalid_bits(base) {
        return None;
    }

    let value = match base {
        BaseType::SInt8 | BaseType::SInt16 | BaseType::SInt32 | BaseType::SInt64 => {
            let shift = 64 - size * 8;
            FieldValue::Signed(((bits << shift) as i64) >> shift)
        }
        BaseType::Float32 => FieldValue::Float(f64::from(f32::from_bits(bits as u32))),
        BaseType::Float64 => FieldValue::Float(f64::from_bits(bits)),
        _ => FieldValue::Unsigned(bits),
    };
    Some(value)
}

/// Full timestamp for a compressed header's five-bit offset, which counts
/// from the last full timestamp and rolls over every 32 seconds.
fn rolled_timestamp(last: u32, time_offset: u8) -> u32 {
    let time_offset = u32::from(time_offset);
    let base = last & !0x1F;
    if time_offset >= last & 0x1F {
        base.wrapping_add(time_offset)
    } else {
        base.wrapping_add(time_offset).wrapping_add(0x20)
    }
}

fn invalid_bits(base: BaseType) -> u64 {
    use BaseType::*;
    match base {
        Enum | UInt8 | Byte => 0xFF,
        SInt8 => 0x7F,
        SInt16 => 0x7FFF,
        UInt16 => 0xFFFF,
        SInt32 => 0x7FFF_FFFF,
        UInt32 | Float32 => 0xFFFF_FFFF,
        SInt64 => 0x7FFF_FFFF_FFFF_FFFF,
        UInt64 | Float64 => u64::MAX,
        UInt8z | UInt16z | UInt32z | UInt64z => 0,
        String => u64::MAX,
    }
}
