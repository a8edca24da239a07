// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Surf-Sync daemon
//!
//! Polls Strava and Garmin Connect, and rewrites matching paddle sessions
//! as surf sessions with their wave statistics.

use surf_sync::{
    config::Config,
    error::AppError,
    services::{GarminClient, StravaClient, StravaCredentials, StravaService, SyncLoop},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;
    tracing::info!(
        tolerance_secs = config.sync.time_tolerance_secs,
        distance_tolerance_m = ?config.sync.distance_tolerance_meters,
        poll_interval_secs = config.sync.poll_interval.as_secs(),
        "Starting Surf-Sync"
    );

    let strava_client = StravaClient::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
    )
    .with_base_url(&config.strava_api_base)
    .with_token_url(&config.strava_token_url);
    let credentials = StravaCredentials::new(
        strava_client.clone(),
        config.strava_refresh_token.clone(),
        config.strava_token_path.clone(),
    );
    let strava = StravaService::new(strava_client, credentials);
    let garmin = GarminClient::new(&config.garmin_api_base, config.garmin_access_token.clone());

    let mut sync = SyncLoop::new(strava, garmin, config.sync);
    let err = sync.run().await;
    tracing::error!(error = %err, "Sync loop terminated");
    Err(err.into())
}

/// Initialize logging. `LOG_FORMAT=json` selects flattened JSON output.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("surf_sync=debug,info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
