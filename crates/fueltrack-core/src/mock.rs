//! In-memory stand-ins for storage and the weather services.
//!
//! [`MemoryHistory`] implements [`FuelHistory`] over plain vectors, and the
//! provider stubs implement the traits in [`crate::traits`], so the engine
//! and anything built on it can be exercised without a database or network.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use fueltrack_types::{
    DateRange, FuelFill, FuelHistory, GaugeReading, HddSummary, WeatherDay, WeatherSource,
};

use crate::calc::{self, DEFAULT_HDD_BASE_TEMP};
use crate::error::{Error, Result};
use crate::forecast::{Forecast, ForecastDay};
use crate::observations::Observation;
use crate::traits::{ForecastProvider, ObservationProvider};

/// A [`FuelHistory`] backed by vectors.
///
/// Ids are assigned in insertion order, which is what breaks ties between
/// records on the same date.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    readings: Vec<GaugeReading>,
    fills: Vec<FuelFill>,
    weather: Vec<WeatherDay>,
    next_id: i64,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    #[must_use]
    pub fn with_reading(mut self, mut reading: GaugeReading) -> Self {
        reading.id = self.next_id();
        self.readings.push(reading);
        self
    }

    #[must_use]
    pub fn with_fill(mut self, mut fill: FuelFill) -> Self {
        fill.id = self.next_id();
        self.fills.push(fill);
        self
    }

    /// Add weather days. A day already present is replaced.
    #[must_use]
    pub fn with_weather<I>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = WeatherDay>,
    {
        for mut day in days {
            day.id = self.next_id();
            self.weather.retain(|w| w.date != day.date);
            self.weather.push(day);
        }
        self
    }

    pub fn readings(&self) -> &[GaugeReading] {
        &self.readings
    }
}

impl FuelHistory for MemoryHistory {
    type Error = Infallible;

    fn latest_reading(&self) -> std::result::Result<Option<GaugeReading>, Infallible> {
        Ok(self.readings.iter().max_by_key(|r| (r.date, r.id)).cloned())
    }

    fn latest_fill(&self) -> std::result::Result<Option<FuelFill>, Infallible> {
        Ok(self.fills.iter().max_by_key(|f| (f.date, f.id)).cloned())
    }

    fn fills_after(&self, date: Date) -> std::result::Result<Vec<FuelFill>, Infallible> {
        let mut fills: Vec<_> = self.fills.iter().filter(|f| f.date > date).cloned().collect();
        fills.sort_by_key(|f| (f.date, f.id));
        Ok(fills)
    }

    fn hdd_summary(&self, range: DateRange) -> std::result::Result<HddSummary, Infallible> {
        Ok(HddSummary::from_values(
            self.weather
                .iter()
                .filter(|w| range.contains(w.date))
                .filter_map(|w| w.hdd),
        ))
    }
}

/// A gauge reading on `date`.
pub fn reading(date: Date, gauge_percent: f64) -> GaugeReading {
    GaugeReading {
        id: 0,
        date,
        gauge_percent,
        notes: None,
    }
}

/// A fill on `date` priced at $1.50/L with the default discount and GST.
pub fn fill(date: Date, liters_added: f64) -> FuelFill {
    let cost = calc::fill_cost(
        liters_added,
        1.5,
        calc::DEFAULT_DISCOUNT_PER_LITER,
        calc::DEFAULT_GST_RATE,
    );
    FuelFill {
        id: 0,
        date,
        gauge_percent_before: 20.0,
        liters_added,
        liters_before_fill: 200.0,
        price_per_liter: 1.5,
        discount: cost.discount,
        gst: cost.gst,
        total_cost: cost.total,
        notes: None,
    }
}

/// A weather day derived from its extremes.
pub fn weather(date: Date, max_temp: f64, min_temp: f64) -> WeatherDay {
    let day = calc::weather_from_extremes(date, max_temp, min_temp, DEFAULT_HDD_BASE_TEMP, WeatherSource::Manual);
    WeatherDay {
        id: 0,
        date,
        max_temp: day.max_temp,
        min_temp: day.min_temp,
        mean_temp: day.mean_temp,
        hdd: day.hdd,
        source: day.source,
    }
}

/// A weather day carrying only an HDD value.
pub fn weather_hdd(date: Date, hdd: f64) -> WeatherDay {
    WeatherDay {
        id: 0,
        date,
        max_temp: None,
        min_temp: None,
        mean_temp: Some(DEFAULT_HDD_BASE_TEMP - hdd),
        hdd: Some(hdd),
        source: WeatherSource::Imported,
    }
}

/// A forecast provider returning fixed HDD values from `start`.
#[derive(Debug, Clone)]
pub struct StaticForecast {
    start: Date,
    hdd: Vec<f64>,
    calls: std::sync::Arc<AtomicU32>,
}

impl StaticForecast {
    pub fn new(start: Date, hdd: Vec<f64>) -> Self {
        Self {
            start,
            hdd,
            calls: Default::default(),
        }
    }

    /// How many times the forecast was requested.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForecastProvider for StaticForecast {
    async fn fetch_forecast(&self) -> Result<Forecast> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let days: Vec<ForecastDay> = self
            .hdd
            .iter()
            .enumerate()
            .map(|(i, hdd)| {
                let mean = DEFAULT_HDD_BASE_TEMP - hdd;
                ForecastDay {
                    date: fueltrack_types::add_days(self.start, i as i64),
                    max_temp: mean + 5.0,
                    min_temp: mean - 5.0,
                    mean_temp: mean,
                    hdd: *hdd,
                }
            })
            .collect();
        let total: f64 = self.hdd.iter().sum();
        let avg = if days.is_empty() { 0.0 } else { total / days.len() as f64 };
        Ok(Forecast {
            location: "Test".to_string(),
            fetched_at: OffsetDateTime::UNIX_EPOCH,
            days,
            total_hdd: calc::round_to(total, 1),
            avg_hdd_per_day: calc::round_to(avg, 1),
        })
    }
}

/// A forecast provider that always fails, as an unreachable API would.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingForecast;

#[async_trait]
impl ForecastProvider for FailingForecast {
    async fn fetch_forecast(&self) -> Result<Forecast> {
        Err(Error::status(503, "https://forecast.invalid"))
    }
}

/// An observation provider answering from a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticObservations {
    by_date: HashMap<Date, Observation>,
}

impl StaticObservations {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, observation: Observation) -> Self {
        self.by_date.insert(observation.date, observation);
        self
    }
}

#[async_trait]
impl ObservationProvider for StaticObservations {
    async fn fetch_observation(&self, date: Date) -> Result<Option<Observation>> {
        Ok(self.by_date.get(&date).copied())
    }
}
