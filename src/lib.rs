// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Surf-Sync: turn paddle sessions into surf sessions
//!
//! This crate matches Strava activities against Garmin Connect session
//! logs, pulls the wave statistics out of the FIT file and writes them back
//! to Strava together with the corrected name and sport type.

pub mod config;
pub mod error;
pub mod fit;
pub mod models;
pub mod services;
pub mod time_utils;
