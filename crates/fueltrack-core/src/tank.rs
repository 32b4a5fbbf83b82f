//! Tank state reconstruction.
//!
//! Readings are sparse and manual, so the level "right now" has to be
//! rebuilt from the latest reading, the deliveries recorded since, and the
//! degree days observed since. Nothing here is stored; every call recomputes
//! from the history it is given.

use serde::Serialize;
use time::Date;
use tracing::debug;

use fueltrack_types::{
    DateRange, FuelFill, FuelHistory, GaugeReading, date::iso_date, days_between,
};

use crate::calc::{self, DEFAULT_EFFICIENCY, DEFAULT_TANK_CAPACITY};
use crate::efficiency;

/// Where the efficiency used for projections came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencySource {
    /// Measured from consumption since the latest fill.
    Measured,
    /// No usable measurement; the configured default applies.
    Default,
}

/// Consumption since the latest fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SinceFill {
    /// No fill has ever been recorded.
    NoFill,
    /// The latest reading is on or after the latest fill, so the drop from
    /// a full tank to the reading is known.
    Measured {
        #[serde(with = "iso_date")]
        fill_date: Date,
        /// Days from the fill to the reading.
        days: i64,
        /// Liters burned since the fill.
        consumption_liters: f64,
        liters_per_day: Option<f64>,
        /// HDD over `(fill, reading]`.
        hdd: Option<f64>,
        efficiency: Option<f64>,
    },
    /// The fill is newer than every reading. Only elapsed time is known.
    Pending {
        #[serde(with = "iso_date")]
        fill_date: Date,
        /// Days from the fill to today.
        days_since_fill: i64,
    },
}

impl SinceFill {
    /// Measured efficiency, if any.
    pub fn efficiency(&self) -> Option<f64> {
        match self {
            SinceFill::Measured { efficiency, .. } => *efficiency,
            _ => None,
        }
    }
}

/// The latest reading carried forward to today.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub liters: f64,
    pub percent: f64,
    /// Liters delivered after the reading.
    pub fills_since_reading: f64,
    pub days_since_reading: i64,
    /// HDD over `(reading, today]`, `None` when no weather was recorded.
    pub hdd_since_reading: Option<f64>,
    /// Liters deducted for the weather since the reading.
    pub consumption_since_reading: f64,
}

/// Everything known about the tank at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankState {
    /// The reading the state is anchored on.
    pub reading: GaugeReading,
    /// Liters at the time of the reading.
    pub reading_liters: f64,
    pub capacity: f64,
    pub since_fill: SinceFill,
    /// Efficiency used to project consumption forward.
    pub efficiency: f64,
    pub efficiency_source: EfficiencySource,
    pub projection: Projection,
}

/// Rebuilds the tank level from recorded history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankReconstructor {
    capacity: f64,
    default_efficiency: f64,
}

impl Default for TankReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_TANK_CAPACITY, DEFAULT_EFFICIENCY)
    }
}

impl TankReconstructor {
    pub fn new(capacity: f64, default_efficiency: f64) -> Self {
        Self {
            capacity,
            default_efficiency,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Reconstruct the tank as of `today`.
    ///
    /// Returns `Ok(None)` when no reading exists: without a single
    /// observation there is no level to start from.
    pub fn reconstruct<H: FuelHistory>(
        &self,
        history: &H,
        today: Date,
    ) -> Result<Option<TankState>, H::Error> {
        let Some(reading) = history.latest_reading()? else {
            return Ok(None);
        };
        let latest_fill = history.latest_fill()?;
        let reading_liters = calc::liters_from_gauge(reading.gauge_percent, self.capacity);

        let since_fill = match latest_fill {
            None => SinceFill::NoFill,
            Some(fill) => self.since_fill(history, &fill, &reading, reading_liters, today)?,
        };

        let (efficiency, efficiency_source) = match since_fill.efficiency() {
            Some(measured) => (measured, EfficiencySource::Measured),
            None => (self.default_efficiency, EfficiencySource::Default),
        };

        let projection = self.project(history, &reading, reading_liters, efficiency, today)?;
        debug!(
            reading_date = %reading.date,
            projected_liters = projection.liters,
            efficiency,
            "reconstructed tank state"
        );

        Ok(Some(TankState {
            reading,
            reading_liters,
            capacity: self.capacity,
            since_fill,
            efficiency,
            efficiency_source,
            projection,
        }))
    }

    fn since_fill<H: FuelHistory>(
        &self,
        history: &H,
        fill: &FuelFill,
        reading: &GaugeReading,
        reading_liters: f64,
        today: Date,
    ) -> Result<SinceFill, H::Error> {
        if reading.date < fill.date {
            return Ok(SinceFill::Pending {
                fill_date: fill.date,
                days_since_fill: days_between(fill.date, today),
            });
        }

        let days = days_between(fill.date, reading.date);
        let consumption = self.capacity - reading_liters;
        let hdd = history.hdd_summary(DateRange::new(fill.date, reading.date))?;
        let liters_per_day =
            (days > 0 && consumption > 0.0).then(|| calc::daily_consumption(consumption, days));

        Ok(SinceFill::Measured {
            fill_date: fill.date,
            days,
            consumption_liters: consumption,
            liters_per_day,
            hdd: hdd.total_hdd,
            efficiency: efficiency::estimate(consumption, hdd.total_hdd),
        })
    }

    fn project<H: FuelHistory>(
        &self,
        history: &H,
        reading: &GaugeReading,
        reading_liters: f64,
        efficiency: f64,
        today: Date,
    ) -> Result<Projection, H::Error> {
        let fills_since_reading: f64 = history
            .fills_after(reading.date)?
            .iter()
            .map(|f| f.liters_added)
            .sum();

        let (hdd_since_reading, consumption_since_reading) = if reading.date < today {
            let summary = history.hdd_summary(DateRange::new(reading.date, today))?;
            (summary.total_hdd, efficiency * summary.total_or_zero())
        } else {
            (None, 0.0)
        };

        let liters = (reading_liters + fills_since_reading - consumption_since_reading)
            .clamp(0.0, self.capacity.max(0.0));

        Ok(Projection {
            liters,
            percent: calc::percent_from_liters(liters, self.capacity),
            fills_since_reading,
            days_since_reading: days_between(reading.date, today),
            hdd_since_reading,
            consumption_since_reading,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryHistory, fill, reading, weather_hdd};
    use fueltrack_types::add_days;
    use time::macros::date;

    #[test]
    fn test_no_readings_means_no_state() {
        let history = MemoryHistory::new().with_fill(fill(date!(2025 - 01 - 01), 600.0));
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 10))
            .unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn test_projection_without_weather_keeps_level() {
        let history = MemoryHistory::new().with_reading(reading(date!(2025 - 01 - 01), 50.0));
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 06))
            .unwrap()
            .unwrap();

        assert_eq!(state.reading_liters, 500.0);
        assert_eq!(state.projection.liters, 500.0);
        assert_eq!(state.projection.days_since_reading, 5);
        assert_eq!(state.projection.hdd_since_reading, None);
        assert_eq!(state.projection.consumption_since_reading, 0.0);
        assert_eq!(state.since_fill, SinceFill::NoFill);
        assert_eq!(state.efficiency_source, EfficiencySource::Default);
    }

    #[test]
    fn test_measured_since_fill() {
        let history = MemoryHistory::new()
            .with_fill(fill(date!(2025 - 01 - 01), 600.0))
            .with_reading(reading(date!(2025 - 01 - 11), 80.0))
            .with_weather((1..=10).map(|d| weather_hdd(add_days(date!(2025 - 01 - 01), d), 40.0)));
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 11))
            .unwrap()
            .unwrap();

        match &state.since_fill {
            SinceFill::Measured {
                days,
                consumption_liters,
                liters_per_day,
                hdd,
                efficiency,
                ..
            } => {
                assert_eq!(*days, 10);
                assert_eq!(*consumption_liters, 200.0);
                assert_eq!(*liters_per_day, Some(20.0));
                assert_eq!(*hdd, Some(400.0));
                assert_eq!(*efficiency, Some(0.5));
            }
            other => panic!("expected measured, got {other:?}"),
        }
        assert_eq!(state.efficiency, 0.5);
        assert_eq!(state.efficiency_source, EfficiencySource::Measured);
        assert_eq!(state.projection.liters, 800.0);
    }

    #[test]
    fn test_fill_start_day_excluded_from_window() {
        let history = MemoryHistory::new()
            .with_fill(fill(date!(2025 - 01 - 01), 600.0))
            .with_reading(reading(date!(2025 - 01 - 03), 90.0))
            .with_weather([
                weather_hdd(date!(2025 - 01 - 01), 100.0),
                weather_hdd(date!(2025 - 01 - 02), 30.0),
                weather_hdd(date!(2025 - 01 - 03), 20.0),
            ]);
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 03))
            .unwrap()
            .unwrap();
        assert_eq!(state.since_fill.efficiency(), Some(2.0));
    }

    #[test]
    fn test_fill_after_reading_is_pending_and_added() {
        let history = MemoryHistory::new()
            .with_reading(reading(date!(2025 - 01 - 01), 30.0))
            .with_fill(fill(date!(2025 - 01 - 05), 650.0));
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 08))
            .unwrap()
            .unwrap();

        assert_eq!(
            state.since_fill,
            SinceFill::Pending {
                fill_date: date!(2025 - 01 - 05),
                days_since_fill: 3,
            }
        );
        assert_eq!(state.projection.fills_since_reading, 650.0);
        assert_eq!(state.projection.liters, 950.0);
        assert_eq!(state.efficiency_source, EfficiencySource::Default);
    }

    #[test]
    fn test_projection_deducts_weather_since_reading() {
        let history = MemoryHistory::new()
            .with_reading(reading(date!(2025 - 02 - 01), 50.0))
            .with_weather([
                weather_hdd(date!(2025 - 02 - 01), 99.0),
                weather_hdd(date!(2025 - 02 - 02), 40.0),
                weather_hdd(date!(2025 - 02 - 03), 35.0),
            ]);
        let state = TankReconstructor::new(1000.0, 0.4)
            .reconstruct(&history, date!(2025 - 02 - 05))
            .unwrap()
            .unwrap();

        assert_eq!(state.projection.hdd_since_reading, Some(75.0));
        assert!((state.projection.consumption_since_reading - 30.0).abs() < 1e-9);
        assert!((state.projection.liters - 470.0).abs() < 1e-9);
        assert!((state.projection.percent - 47.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_clamps_to_capacity() {
        let history = MemoryHistory::new()
            .with_reading(reading(date!(2025 - 01 - 01), 90.0))
            .with_fill(fill(date!(2025 - 01 - 02), 700.0));
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 02))
            .unwrap()
            .unwrap();
        assert_eq!(state.projection.liters, 1000.0);
        assert_eq!(state.projection.percent, 100.0);
    }

    #[test]
    fn test_projection_clamps_to_empty() {
        let history = MemoryHistory::new()
            .with_reading(reading(date!(2025 - 01 - 01), 5.0))
            .with_weather([weather_hdd(date!(2025 - 01 - 02), 500.0)]);
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 02))
            .unwrap()
            .unwrap();
        assert_eq!(state.projection.liters, 0.0);
    }

    #[test]
    fn test_latest_reading_tie_uses_insertion_order() {
        let history = MemoryHistory::new()
            .with_reading(reading(date!(2025 - 01 - 04), 70.0))
            .with_reading(reading(date!(2025 - 01 - 04), 65.0));
        let state = TankReconstructor::default()
            .reconstruct(&history, date!(2025 - 01 - 04))
            .unwrap()
            .unwrap();
        assert_eq!(state.reading.gauge_percent, 65.0);
    }
}
