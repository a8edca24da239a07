// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - matching, enrichment and the platform adapters.

pub mod credentials;
pub mod decoder;
pub mod enrich;
pub mod garmin;
pub mod matcher;
pub mod strava;
pub mod sync;

pub use credentials::{CredentialProvider, StravaCredentials, TokenSet};
pub use decoder::decode_session_record;
pub use enrich::{format_description, Renaming};
pub use garmin::GarminClient;
pub use matcher::{find_match, MatchTolerance, Timed};
pub use strava::{StravaClient, StravaService};
pub use sync::{
    Candidate, CycleReport, CycleResult, LoopState, MatchOutcome, RecordSource, SensorLogSource,
    SyncLoop,
};
