//! Trait abstractions for the external weather collaborators.
//!
//! The service talks to the forecast API and the observation archive only
//! through these traits, so tests can swap in the stubs from
//! [`crate::mock`].

use async_trait::async_trait;
use time::Date;

use crate::error::Result;
use crate::forecast::Forecast;
use crate::observations::Observation;

/// Source of a short-range daily forecast.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetch the forecast starting today.
    async fn fetch_forecast(&self) -> Result<Forecast>;
}

/// Source of historical daily observations.
#[async_trait]
pub trait ObservationProvider: Send + Sync {
    /// Observed extremes for `date`.
    ///
    /// `Ok(None)` means the archive has no usable record for the station on
    /// that day.
    async fn fetch_observation(&self, date: Date) -> Result<Option<Observation>>;
}
