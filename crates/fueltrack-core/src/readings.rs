//! Consumption between consecutive gauge readings.

use serde::Serialize;

use fueltrack_types::{DateRange, FuelHistory, GaugeReading, days_between};

use crate::calc::{self, round_to};
use crate::efficiency;

/// A reading together with what changed since the one before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingInterval {
    #[serde(flatten)]
    pub reading: GaugeReading,
    pub est_liters: f64,
    pub days_since_last: Option<i64>,
    /// Liters burned since the previous reading. `None` when the level rose,
    /// which means fuel was delivered in between.
    pub liters_used: Option<f64>,
    pub liters_per_day: Option<f64>,
    /// HDD over `(previous, this]`.
    pub hdd_period: Option<f64>,
    pub liters_per_hdd: Option<f64>,
}

/// Enrich readings ordered newest first.
///
/// Each reading is compared with the next one in the slice (the one before
/// it in time). The oldest reading carries only its liter estimate.
pub fn intervals<H: FuelHistory>(
    readings: &[GaugeReading],
    capacity: f64,
    history: &H,
) -> Result<Vec<ReadingInterval>, H::Error> {
    let mut out = Vec::with_capacity(readings.len());
    for (index, reading) in readings.iter().enumerate() {
        let est_liters = calc::liters_from_gauge(reading.gauge_percent, capacity);
        let mut interval = ReadingInterval {
            reading: reading.clone(),
            est_liters,
            days_since_last: None,
            liters_used: None,
            liters_per_day: None,
            hdd_period: None,
            liters_per_hdd: None,
        };

        if let Some(previous) = readings.get(index + 1) {
            let days = days_between(previous.date, reading.date);
            let used = calc::liters_from_gauge(previous.gauge_percent, capacity) - est_liters;
            interval.days_since_last = Some(days);

            if used >= 0.0 {
                interval.liters_used = Some(round_to(used, 1));
                if days > 0 {
                    interval.liters_per_day = Some(round_to(calc::daily_consumption(used, days), 2));
                }
            }

            if days > 0 && used > 0.0 {
                let hdd = history.hdd_summary(DateRange::new(previous.date, reading.date))?;
                interval.hdd_period = hdd.total_hdd.filter(|h| *h > 0.0).map(|h| round_to(h, 1));
                interval.liters_per_hdd =
                    efficiency::estimate(used, hdd.total_hdd).map(|e| round_to(e, 3));
            }
        }
        out.push(interval);
    }
    Ok(out)
}
