//! Application state shared across handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use time::{Date, OffsetDateTime, UtcOffset};
use tokio::sync::{Mutex, watch};

use fueltrack_core::{DatamartImporter, ForecastProvider, ObservationProvider, OpenMeteoClient};
use fueltrack_store::Store;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The data store (wrapped in Mutex for thread-safe access).
    pub store: Mutex<Store>,
    pub config: Config,
    /// Short-range forecast used for predictions.
    pub forecast: Arc<dyn ForecastProvider>,
    /// Daily observation archive used by the weather sync and imports.
    pub observations: Arc<dyn ObservationProvider>,
    pub sync: SyncState,
    /// Calendar day to use instead of the wall clock.
    fixed_today: Option<Date>,
}

impl AppState {
    /// Create state backed by the live weather services.
    pub fn new(store: Store, config: Config) -> Result<Arc<Self>, fueltrack_core::Error> {
        let forecast = OpenMeteoClient::new(config.weather.forecast_config())?;
        let observations = DatamartImporter::new(config.weather.datamart_config())?;
        Ok(Self::with_providers(
            store,
            config,
            Arc::new(forecast),
            Arc::new(observations),
        ))
    }

    /// Create state with explicit weather providers.
    pub fn with_providers(
        store: Store,
        config: Config,
        forecast: Arc<dyn ForecastProvider>,
        observations: Arc<dyn ObservationProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            config,
            forecast,
            observations,
            sync: SyncState::new(),
            fixed_today: None,
        })
    }

    /// Create state whose [`today`](Self::today) always returns `today`.
    pub fn pinned(
        store: Store,
        config: Config,
        forecast: Arc<dyn ForecastProvider>,
        observations: Arc<dyn ObservationProvider>,
        today: Date,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            config,
            forecast,
            observations,
            sync: SyncState::new(),
            fixed_today: Some(today),
        })
    }

    /// The current calendar day at the configured UTC offset.
    pub fn today(&self) -> Date {
        if let Some(today) = self.fixed_today {
            return today;
        }
        let offset = UtcOffset::from_hms(self.config.weather.utc_offset_hours, 0, 0)
            .unwrap_or(UtcOffset::UTC);
        OffsetDateTime::now_utc().to_offset(offset).date()
    }
}

/// State for tracking and controlling the weather sync task.
pub struct SyncState {
    running: AtomicBool,
    /// Unix timestamp of the last completed backfill, 0 if none.
    last_run: AtomicI64,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl SyncState {
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            last_run: AtomicI64::new(0),
            stop_tx,
            stop_rx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Record a completed backfill.
    pub fn mark_run(&self, at: OffsetDateTime) {
        self.last_run.store(at.unix_timestamp(), Ordering::SeqCst);
    }

    pub fn last_run(&self) -> Option<OffsetDateTime> {
        match self.last_run.load(Ordering::SeqCst) {
            0 => None,
            ts => OffsetDateTime::from_unix_timestamp(ts).ok(),
        }
    }

    /// Get a receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Signal the sync task to stop after its current pass.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueltrack_core::mock::{FailingForecast, StaticObservations};
    use time::macros::date;

    fn test_state(config: Config) -> Arc<AppState> {
        AppState::with_providers(
            Store::open_in_memory().unwrap(),
            config,
            Arc::new(FailingForecast),
            Arc::new(StaticObservations::new()),
        )
    }

    #[test]
    fn test_today_uses_configured_offset() {
        let mut config = Config::default();
        config.weather.utc_offset_hours = 0;
        let utc = test_state(config.clone()).today();
        assert_eq!(utc, OffsetDateTime::now_utc().date());

        config.weather.utc_offset_hours = -7;
        let local = test_state(config).today();
        assert!(local <= utc);
        assert!(fueltrack_types::days_between(local, utc) <= 1);
    }

    #[test]
    fn test_pinned_today_ignores_clock() {
        let mut config = Config::default();
        config.weather.utc_offset_hours = -7;
        let state = AppState::pinned(
            Store::open_in_memory().unwrap(),
            config,
            Arc::new(FailingForecast),
            Arc::new(StaticObservations::new()),
            date!(2025 - 01 - 15),
        );
        assert_eq!(state.today(), date!(2025 - 01 - 15));
    }

    #[test]
    fn test_sync_state() {
        let sync = SyncState::new();
        assert!(!sync.is_running());
        assert!(sync.last_run().is_none());

        sync.set_running(true);
        assert!(sync.is_running());

        let at = OffsetDateTime::from_unix_timestamp(1_736_000_000).unwrap();
        sync.mark_run(at);
        assert_eq!(sync.last_run(), Some(at));

        let rx = sync.subscribe_stop();
        assert!(!*rx.borrow());
        sync.signal_stop();
        assert!(*rx.borrow());
    }

    #[test]
    fn test_new_builds_live_providers() {
        let state = AppState::new(Store::open_in_memory().unwrap(), Config::default());
        assert!(state.is_ok());
    }
}
