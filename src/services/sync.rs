// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconciliation loop.
//!
//! Each poll cycle:
//! 1. List recent activities from the source of record
//! 2. List recent sensor activities and decode their session logs
//! 3. Match every target activity against the decoded logs (first fit)
//! 4. Push the renamed, recategorized and described activity back
//!
//! A failed cycle re-establishes the sensor session and is retried once
//! after a backoff. A second consecutive failure ends the loop.

use crate::config::SyncSettings;
use crate::error::{AppError, Result};
use crate::fit;
use crate::models::{Activity, ActivityListing, ActivityUpdate, SensorActivity, SessionRecord};
use crate::services::decoder::decode_session_record;
use crate::services::enrich::Renaming;
use crate::services::matcher::{find_match, MatchTolerance, Timed};
use crate::time_utils::{self, TimeError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// The platform whose activities get renamed.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    /// Most recent activities, newest first.
    async fn list_activities(&mut self, per_page: u32) -> Result<Vec<ActivityListing>>;

    async fn update_activity(&mut self, activity_id: u64, update: &ActivityUpdate) -> Result<()>;

    /// Drop cached credentials so they are reacquired on next use.
    fn invalidate_credentials(&mut self) {}
}

/// The platform that provides binary session logs.
#[allow(async_fn_in_trait)]
pub trait SensorLogSource {
    /// Establish a fresh session, replacing any previous one.
    async fn connect(&mut self) -> Result<()>;

    async fn list_activities(&mut self, category: &str, limit: u32) -> Result<Vec<SensorActivity>>;

    /// Raw FIT bytes of one activity.
    async fn download_session_log(&mut self, activity_id: u64) -> Result<Vec<u8>>;
}

/// A decoded session log ready for matching.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub sensor_activity_id: u64,
    pub instant: DateTime<Utc>,
    pub distance: Option<f64>,
    pub record: SessionRecord,
}

impl Timed for Candidate {
    fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    fn distance_meters(&self) -> Option<f64> {
        self.distance
    }
}

/// A matched pair and the update derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub activity_id: u64,
    pub sensor_activity_id: u64,
    /// Candidate start minus reference start
    pub offset_secs: i64,
    pub update: ActivityUpdate,
}

/// Outcome of matching one activity.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(Box<Enrichment>),
    NoMatch,
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Source-of-record activities seen
    pub examined: usize,
    /// Activities carrying the rename marker
    pub targets: usize,
    /// Session logs available for matching
    pub candidates: usize,
    pub matched: usize,
    pub updated: usize,
}

/// Outcome of one poll cycle, classified for the state machine.
#[derive(Debug)]
pub enum CycleResult {
    Completed(CycleReport),
    TransientError(AppError),
    FatalError(AppError),
}

impl From<Result<CycleReport>> for CycleResult {
    fn from(result: Result<CycleReport>) -> Self {
        match result {
            Ok(report) => CycleResult::Completed(report),
            Err(e) if e.is_transient() => CycleResult::TransientError(e),
            Err(e) => CycleResult::FatalError(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Authenticating,
    Polling,
}

/// Drives both sources until a fatal failure.
pub struct SyncLoop<R, S> {
    record: R,
    sensor: S,
    settings: SyncSettings,
    renaming: Renaming,
    tolerance: MatchTolerance,
    state: LoopState,
    consecutive_failures: u32,
}

impl<R: RecordSource, S: SensorLogSource> SyncLoop<R, S> {
    pub fn new(record: R, sensor: S, settings: SyncSettings) -> Self {
        Self {
            renaming: Renaming::from_settings(&settings),
            tolerance: MatchTolerance {
                time_secs: settings.time_tolerance_secs,
                distance_meters: settings.distance_tolerance_meters,
            },
            record,
            sensor,
            settings,
            state: LoopState::Authenticating,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_source(&self) -> &R {
        &self.record
    }

    pub fn sensor_source(&self) -> &S {
        &self.sensor
    }

    /// Run until a fatal failure and return the error that ended the loop.
    pub async fn run(&mut self) -> AppError {
        loop {
            match self.state {
                LoopState::Authenticating => {
                    tracing::info!("Connecting to sensor-log source");
                    match self.sensor.connect().await {
                        Ok(()) => self.state = LoopState::Polling,
                        Err(e) => {
                            if let Err(fatal) = self.recover(e).await {
                                return fatal;
                            }
                        }
                    }
                }
                LoopState::Polling => match CycleResult::from(self.run_cycle().await) {
                    CycleResult::Completed(report) => {
                        self.consecutive_failures = 0;
                        tracing::info!(
                            examined = report.examined,
                            targets = report.targets,
                            candidates = report.candidates,
                            updated = report.updated,
                            "Poll cycle complete"
                        );
                        tokio::time::sleep(self.settings.poll_interval).await;
                    }
                    CycleResult::TransientError(e) => {
                        if let Err(fatal) = self.recover(e).await {
                            return fatal;
                        }
                    }
                    CycleResult::FatalError(e) => {
                        tracing::error!(error = %e, "Fatal error, stopping");
                        return e;
                    }
                },
            }
        }
    }

    /// Count a failure and either schedule re-authentication or give up.
    async fn recover(&mut self, err: AppError) -> std::result::Result<(), AppError> {
        self.consecutive_failures += 1;

        if !err.is_transient() {
            tracing::error!(error = %err, "Non-recoverable error, stopping");
            return Err(err);
        }
        if self.consecutive_failures >= self.settings.max_consecutive_failures {
            tracing::error!(
                failures = self.consecutive_failures,
                error = %err,
                "Failed again after reconnecting, giving up"
            );
            return Err(err);
        }

        tracing::warn!(
            failures = self.consecutive_failures,
            error = %err,
            backoff_secs = self.settings.retry_backoff.as_secs(),
            "Poll cycle failed, reconnecting"
        );
        tokio::time::sleep(self.settings.retry_backoff).await;
        self.record.invalidate_credentials();
        self.state = LoopState::Authenticating;
        Ok(())
    }

    /// One poll cycle: fetch, decode, match, update.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let listings = self.record.list_activities(self.settings.page_size).await?;
        let activities = normalize_listings(listings, self.settings.record_timezone);

        let targets: Vec<&Activity> = activities
            .iter()
            .filter(|a| self.renaming.is_target(a))
            .collect();

        let candidates = self.collect_candidates().await?;

        let mut report = CycleReport {
            examined: activities.len(),
            targets: targets.len(),
            candidates: candidates.len(),
            ..Default::default()
        };

        for activity in targets {
            match self.match_activity(activity, &candidates) {
                MatchOutcome::Matched(enrichment) => {
                    report.matched += 1;
                    tracing::info!(
                        activity_id = activity.id,
                        sensor_activity_id = enrichment.sensor_activity_id,
                        offset_secs = enrichment.offset_secs,
                        local_start = %time_utils::to_local(
                            activity.start,
                            self.settings.record_timezone
                        ),
                        name = %activity.name,
                        "Matched activity to session log"
                    );

                    self.record
                        .update_activity(activity.id, &enrichment.update)
                        .await?;
                    report.updated += 1;
                    tracing::info!(
                        activity_id = activity.id,
                        new_name = enrichment.update.name.as_deref().unwrap_or_default(),
                        "Update applied"
                    );
                }
                MatchOutcome::NoMatch => {
                    tracing::info!(
                        activity_id = activity.id,
                        name = %activity.name,
                        "No session log within tolerance, skipping"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Match one activity against the decoded logs.
    pub fn match_activity(&self, activity: &Activity, candidates: &[Candidate]) -> MatchOutcome {
        match find_match(activity, candidates, &self.tolerance) {
            Some(candidate) => MatchOutcome::Matched(Box::new(Enrichment {
                activity_id: activity.id,
                sensor_activity_id: candidate.sensor_activity_id,
                offset_secs: (candidate.instant - activity.start).num_seconds(),
                update: self.renaming.build_update(activity, &candidate.record),
            })),
            None => MatchOutcome::NoMatch,
        }
    }

    /// List sensor activities and decode each one's session log.
    async fn collect_candidates(&mut self) -> Result<Vec<Candidate>> {
        let listed = self
            .sensor
            .list_activities(&self.settings.sensor_category, self.settings.sensor_fetch_limit)
            .await?;

        let mut candidates = Vec::with_capacity(listed.len());
        for sensor_activity in listed {
            let record = match self
                .sensor
                .download_session_log(sensor_activity.activity_id)
                .await
            {
                Ok(bytes) => decode_log(sensor_activity.activity_id, &bytes),
                Err(AppError::Decode(msg)) => {
                    tracing::warn!(
                        sensor_activity_id = sensor_activity.activity_id,
                        error = %msg,
                        "Unreadable session log, using listing only"
                    );
                    SessionRecord::default()
                }
                Err(e) => return Err(e),
            };

            match candidate_instant(&record, &sensor_activity, self.settings.sensor_timezone) {
                Ok(instant) => candidates.push(Candidate {
                    sensor_activity_id: sensor_activity.activity_id,
                    instant,
                    distance: sensor_activity.distance,
                    record,
                }),
                Err(e) => tracing::warn!(
                    sensor_activity_id = sensor_activity.activity_id,
                    error = %e,
                    "No usable start time, skipping session log"
                ),
            }
        }

        Ok(candidates)
    }
}

fn normalize_listings(listings: Vec<ActivityListing>, zone: Tz) -> Vec<Activity> {
    listings
        .into_iter()
        .filter_map(|listing| {
            let id = listing.id;
            match Activity::from_listing(listing, zone) {
                Ok(activity) => Some(activity),
                Err(e) => {
                    tracing::warn!(
                        activity_id = id,
                        error = %e,
                        "Skipping activity with bad start time"
                    );
                    None
                }
            }
        })
        .collect()
}

fn decode_log(sensor_activity_id: u64, bytes: &[u8]) -> SessionRecord {
    let decoded = fit::decode(bytes);
    if let Some(e) = &decoded.error {
        tracing::warn!(
            sensor_activity_id,
            error = %e,
            messages = decoded.messages.len(),
            "Session log decoded partially"
        );
    }
    decode_session_record(&decoded.messages)
}

/// Creation time from the log, falling back to the listed start time.
fn candidate_instant(
    record: &SessionRecord,
    listing: &SensorActivity,
    zone: Tz,
) -> std::result::Result<DateTime<Utc>, TimeError> {
    match record.time_created {
        Some(created) => time_utils::localize(created, zone),
        None => time_utils::parse_in_zone(&listing.start_time_local, zone),
    }
}
