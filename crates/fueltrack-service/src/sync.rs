//! Background weather sync.
//!
//! Keeps `weather_data` filled up to yesterday by importing daily
//! observations. Each pass starts from the day after the newest stored
//! record; an empty table is seeded with the last
//! `sync.initial_backfill_days` days.

use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use fueltrack_core::{ImportReport, import_range};
use fueltrack_types::{WeatherDay, add_days};

use crate::state::AppState;

/// Import errors logged per pass; the rest are only counted.
const LOGGED_ERRORS: usize = 5;

/// Background task that backfills weather on a fixed interval.
pub struct WeatherSync {
    state: Arc<AppState>,
}

impl WeatherSync {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Spawn the sync loop. Returns immediately.
    ///
    /// The first pass runs at once. The loop ends when
    /// [`SyncState::signal_stop`](crate::state::SyncState::signal_stop) is
    /// called; a pass already in progress is allowed to finish.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move { run(state).await })
    }
}

async fn run(state: Arc<AppState>) {
    let period = state.config.sync.interval();
    info!("Starting weather sync (interval: {}s)", period.as_secs());

    let mut stop_rx = state.sync.subscribe_stop();
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    state.sync.set_running(true);

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        match backfill(&state).await {
            Ok(Some(report)) => debug!(
                "Weather sync pass stored {} day(s)",
                report.fetched
            ),
            Ok(None) => debug!("Weather already up to date"),
            Err(e) => error!("Weather sync failed: {}", e),
        }
        state.sync.mark_run(OffsetDateTime::now_utc());
    }

    state.sync.set_running(false);
    info!("Weather sync stopped");
}

/// Days a backfill pass should cover, or `None` when nothing is missing.
///
/// Days before `today` are complete; today's observation is not published
/// until tomorrow.
pub fn backfill_window(
    latest_stored: Option<Date>,
    today: Date,
    initial_days: u32,
) -> Option<(Date, Date)> {
    let yesterday = add_days(today, -1);
    let from = match latest_stored {
        Some(latest) => add_days(latest, 1),
        None => add_days(today, -i64::from(initial_days)),
    };
    (from <= yesterday).then_some((from, yesterday))
}

/// Run one backfill pass.
///
/// Returns `Ok(None)` when the store is already current.
pub async fn backfill(state: &AppState) -> Result<Option<ImportReport>, SyncError> {
    let latest = state.store.lock().await.latest_weather_date()?;
    let Some((from, to)) =
        backfill_window(latest, state.today(), state.config.sync.initial_backfill_days)
    else {
        return Ok(None);
    };

    info!("Backfilling weather from {} to {}", from, to);
    let (report, stored) = import_and_store(state, from, to).await?;

    info!(
        "Weather backfill: {} fetched, {} skipped, {} stored",
        report.fetched,
        report.skipped,
        stored.len()
    );
    log_import_errors(&report);

    Ok(Some(report))
}

/// Import `[from, to]` and upsert every observation found.
///
/// The store lock is not held while fetching.
pub async fn import_and_store(
    state: &AppState,
    from: Date,
    to: Date,
) -> Result<(ImportReport, Vec<WeatherDay>), SyncError> {
    let report = import_range(state.observations.as_ref(), from, to).await?;

    let store = state.store.lock().await;
    let stored = report
        .data
        .iter()
        .map(|observation| store.upsert_weather(&observation.to_weather_day()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((report, stored))
}

fn log_import_errors(report: &ImportReport) {
    for message in report.errors.iter().take(LOGGED_ERRORS) {
        warn!("Weather import: {}", message);
    }
    if report.errors.len() > LOGGED_ERRORS {
        warn!(
            "Weather import: {} more error(s) not shown",
            report.errors.len() - LOGGED_ERRORS
        );
    }
}

/// Sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to import observations: {0}")]
    Import(#[from] fueltrack_core::Error),
    #[error("Failed to store weather: {0}")]
    Store(#[from] fueltrack_store::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueltrack_core::Observation;
    use fueltrack_core::mock::{FailingForecast, StaticObservations};
    use fueltrack_store::{Store, WeatherQuery};
    use fueltrack_types::{NewWeatherDay, WeatherSource};
    use time::macros::date;

    use crate::config::Config;

    fn state_with(observations: StaticObservations, config: Config) -> Arc<AppState> {
        AppState::with_providers(
            Store::open_in_memory().unwrap(),
            config,
            Arc::new(FailingForecast),
            Arc::new(observations),
        )
    }

    #[test]
    fn test_backfill_window() {
        let today = date!(2025 - 01 - 10);
        assert_eq!(
            backfill_window(Some(date!(2025 - 01 - 05)), today, 30),
            Some((date!(2025 - 01 - 06), date!(2025 - 01 - 09)))
        );
        assert_eq!(backfill_window(Some(date!(2025 - 01 - 09)), today, 30), None);
        assert_eq!(backfill_window(Some(date!(2025 - 01 - 12)), today, 30), None);
        assert_eq!(
            backfill_window(None, today, 3),
            Some((date!(2025 - 01 - 07), date!(2025 - 01 - 09)))
        );
    }

    #[tokio::test]
    async fn test_import_and_store_upserts_observations() {
        let observations = StaticObservations::new()
            .with(Observation::from_extremes(date!(2025 - 01 - 02), -10.0, -20.0, 18.0))
            .with(Observation::from_extremes(date!(2025 - 01 - 03), -12.0, -24.0, 18.0));
        let state = state_with(observations, Config::default());

        state
            .store
            .lock()
            .await
            .upsert_weather(&NewWeatherDay {
                date: date!(2025 - 01 - 02),
                max_temp: Some(0.0),
                min_temp: Some(0.0),
                mean_temp: Some(0.0),
                hdd: Some(18.0),
                source: WeatherSource::Manual,
            })
            .unwrap();

        let (report, stored) = import_and_store(&state, date!(2025 - 01 - 01), date!(2025 - 01 - 03))
            .await
            .unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(stored.len(), 2);

        let store = state.store.lock().await;
        let days = store.query_weather(&WeatherQuery::new().oldest_first()).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].hdd, Some(33.0));
        assert_eq!(days[0].source, WeatherSource::Auto);
        assert_eq!(days[1].hdd, Some(36.0));
    }

    #[tokio::test]
    async fn test_backfill_seeds_empty_store() {
        let mut config = Config::default();
        config.sync.initial_backfill_days = 3;
        config.weather.utc_offset_hours = 0;
        let today = OffsetDateTime::now_utc().date();
        let yesterday = add_days(today, -1);

        let observations = StaticObservations::new()
            .with(Observation::from_extremes(yesterday, -5.0, -15.0, 18.0));
        let state = state_with(observations, config);

        let report = backfill(&state).await.unwrap().unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.skipped, 2);

        let latest = state.store.lock().await.latest_weather_date().unwrap();
        assert_eq!(latest, Some(yesterday));

        assert!(backfill(&state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_loop_stops_on_signal() {
        let mut config = Config::default();
        config.sync.initial_backfill_days = 1;
        let state = state_with(StaticObservations::new(), config);

        let handle = WeatherSync::new(Arc::clone(&state)).start();
        state.sync.signal_stop();
        handle.await.unwrap();

        assert!(!state.sync.is_running());
    }
}
