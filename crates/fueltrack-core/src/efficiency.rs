//! Liters-per-HDD estimation.
//!
//! An efficiency figure is only ever reported from complete data: a window
//! with no recorded degree days, or one where the tank level rose without a
//! recorded fill, yields `None` rather than a made-up number.

use serde::Serialize;
use time::Date;

use fueltrack_types::{FuelFill, HddSummary, WeatherDay, date::iso_date};

use crate::calc::{self, round_to};
use crate::error::{Error, Result};

/// Liters per HDD for a window, if it can be measured.
///
/// Returns `None` when the window has no HDD total, a total that is not
/// positive, or no positive consumption.
pub fn estimate(liters_used: f64, total_hdd: Option<f64>) -> Option<f64> {
    let total_hdd = total_hdd.filter(|h| *h > 0.0)?;
    if liters_used <= 0.0 {
        return None;
    }
    Some(calc::efficiency(liters_used, total_hdd))
}

/// Liters per HDD between two tank levels bounding a window.
pub fn estimate_between(start_liters: f64, end_liters: f64, hdd: &HddSummary) -> Option<f64> {
    estimate(start_liters - end_liters, hdd.total_hdd)
}

/// A closed span of calendar days `[from, to]` for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    #[serde(with = "iso_date")]
    pub from: Date,
    #[serde(with = "iso_date")]
    pub to: Date,
}

impl Period {
    /// Create a period, rejecting a reversed range.
    pub fn new(from: Date, to: Date) -> Result<Self> {
        if to < from {
            return Err(Error::InvalidRange(format!("{from} is after {to}")));
        }
        Ok(Self { from, to })
    }

    /// Resolve a named preset such as `q1_2025` (January through March).
    pub fn preset(name: &str) -> Result<Self> {
        let year = name
            .strip_prefix("q1_")
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(|| Error::InvalidRange(format!("unknown period '{name}'")))?;
        let from = Date::from_calendar_date(year, time::Month::January, 1)
            .map_err(|e| Error::InvalidRange(e.to_string()))?;
        let to = Date::from_calendar_date(year, time::Month::March, 31)
            .map_err(|e| Error::InvalidRange(e.to_string()))?;
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Weather aggregates over a set of days.
///
/// Averages skip days with missing values; `days` counts every record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WeatherStats {
    pub days: u32,
    pub total_hdd: Option<f64>,
    pub avg_hdd_per_day: Option<f64>,
    pub avg_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
}

impl WeatherStats {
    pub fn from_days<'a, I>(days: I) -> Self
    where
        I: IntoIterator<Item = &'a WeatherDay>,
    {
        let mut stats = Self::default();
        let mut hdd = Vec::new();
        let mut means = Vec::new();
        for day in days {
            stats.days += 1;
            hdd.extend(day.hdd);
            means.extend(day.mean_temp);
            if let Some(min) = day.min_temp {
                stats.min_temp = Some(stats.min_temp.map_or(min, |m| m.min(min)));
            }
            if let Some(max) = day.max_temp {
                stats.max_temp = Some(stats.max_temp.map_or(max, |m| m.max(max)));
            }
        }
        let summary = HddSummary::from_values(hdd);
        stats.total_hdd = summary.total_hdd;
        stats.avg_hdd_per_day = summary.avg_hdd;
        stats.avg_temp = mean(&means);
        stats
    }

    /// Copy with totals rounded for display.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            total_hdd: self.total_hdd.map(|v| round_to(v, 1)),
            avg_hdd_per_day: self.avg_hdd_per_day.map(|v| round_to(v, 2)),
            avg_temp: self.avg_temp.map(|v| round_to(v, 1)),
            ..self
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Fuel delivered over a period.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FuelStats {
    pub total_liters: Option<f64>,
    pub total_cost: Option<f64>,
    pub fill_count: u32,
}

impl FuelStats {
    pub fn from_fills<'a, I>(fills: I) -> Self
    where
        I: IntoIterator<Item = &'a FuelFill>,
    {
        let mut stats = Self::default();
        for fill in fills {
            stats.fill_count += 1;
            *stats.total_liters.get_or_insert(0.0) += fill.liters_added;
            *stats.total_cost.get_or_insert(0.0) += fill.total_cost;
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodEfficiencyFigure {
    pub liters_per_hdd: Option<f64>,
}

/// Weather, deliveries and the resulting L/HDD for a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodEfficiency {
    pub period: Period,
    pub weather: WeatherStats,
    pub fuel: FuelStats,
    pub efficiency: PeriodEfficiencyFigure,
}

/// Compare fuel delivered in a period against the degree days it saw.
///
/// Records outside `period` are ignored.
pub fn period_efficiency(period: Period, weather: &[WeatherDay], fills: &[FuelFill]) -> PeriodEfficiency {
    let weather = WeatherStats::from_days(weather.iter().filter(|w| period.contains(w.date)));
    let fuel = FuelStats::from_fills(fills.iter().filter(|f| period.contains(f.date)));

    let liters_per_hdd = fuel
        .total_liters
        .and_then(|liters| estimate(liters, weather.total_hdd))
        .map(|e| round_to(e, 3));

    PeriodEfficiency {
        period,
        weather: weather.rounded(),
        fuel: FuelStats {
            total_liters: fuel.total_liters.map(|v| round_to(v, 1)),
            total_cost: fuel.total_cost.map(|v| round_to(v, 2)),
            fill_count: fuel.fill_count,
        },
        efficiency: PeriodEfficiencyFigure { liters_per_hdd },
    }
}
