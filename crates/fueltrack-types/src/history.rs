//! Read-only access to the recorded fuel history.
//!
//! The tank reconstruction and prediction logic only needs a handful of
//! queries. Expressing them as a trait lets the SQLite store back them in
//! production while tests use an in-memory history.

use time::Date;

use crate::date::DateRange;
use crate::types::{FuelFill, GaugeReading};

/// Aggregate of heating degree days over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HddSummary {
    /// Sum of HDD over days that have a value, `None` when no day has one.
    pub total_hdd: Option<f64>,
    /// Mean HDD over days that have a value.
    pub avg_hdd: Option<f64>,
    /// Number of days with an HDD value.
    pub days: u32,
}

impl HddSummary {
    /// Build a summary from the HDD values of individual days.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut total = 0.0;
        let mut days = 0u32;
        for v in values {
            total += v;
            days += 1;
        }
        if days == 0 {
            return Self::default();
        }
        Self {
            total_hdd: Some(total),
            avg_hdd: Some(total / f64::from(days)),
            days,
        }
    }

    /// Total HDD, treating missing weather as zero.
    pub fn total_or_zero(&self) -> f64 {
        self.total_hdd.unwrap_or(0.0)
    }
}

/// Queries over readings, fills and weather used by the estimators.
pub trait FuelHistory {
    /// Error raised by the backing storage.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Most recent reading by date, ties broken by insertion order.
    fn latest_reading(&self) -> Result<Option<GaugeReading>, Self::Error>;

    /// Most recent fill by date, ties broken by insertion order.
    fn latest_fill(&self) -> Result<Option<FuelFill>, Self::Error>;

    /// Fills dated strictly after `date`, oldest first.
    fn fills_after(&self, date: Date) -> Result<Vec<FuelFill>, Self::Error>;

    /// HDD totals for days inside `range` (exclusive start, inclusive end).
    fn hdd_summary(&self, range: DateRange) -> Result<HddSummary, Self::Error>;
}
