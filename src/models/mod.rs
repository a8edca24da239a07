// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models.

pub mod activity;
pub mod session;

pub use activity::{Activity, ActivityListing, ActivityUpdate, SensorActivity};
pub use session::{FieldValue, Message, SessionRecord};
