//! Furnace runtime reports joined with fuel and weather.

use serde::Serialize;
use time::{Date, Month};

use fueltrack_types::HvacReport;

use crate::calc::round_to;
use crate::efficiency::Period;
use crate::error::{Error, Result};

/// The calendar month `year-month` as a closed period.
pub fn month_period(year: i32, month: u8) -> Result<Period> {
    let month = Month::try_from(month).map_err(|e| Error::InvalidRange(e.to_string()))?;
    let last = time::util::days_in_year_month(year, month);
    let from = Date::from_calendar_date(year, month, 1).map_err(|e| Error::InvalidRange(e.to_string()))?;
    let to = Date::from_calendar_date(year, month, last).map_err(|e| Error::InvalidRange(e.to_string()))?;
    Period::new(from, to)
}

/// A report with the fuel delivered during its month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HvacEntry {
    #[serde(flatten)]
    pub report: HvacReport,
    pub fuel_liters: Option<f64>,
    pub liters_per_runtime_hour: Option<f64>,
}

/// Attach fuel figures to a report.
pub fn enrich(report: HvacReport, fuel_liters: Option<f64>) -> HvacEntry {
    let liters_per_runtime_hour = per_unit(fuel_liters, report.total_runtime_hours);
    HvacEntry {
        report,
        fuel_liters: fuel_liters.filter(|l| *l > 0.0),
        liters_per_runtime_hour,
    }
}

/// One month of the HVAC efficiency analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HvacEfficiency {
    /// `YYYY-MM`.
    pub period: String,
    pub year: i32,
    pub month: u8,
    pub runtime_hours: f64,
    pub avg_cycle_min: Option<f64>,
    pub avg_outdoor_temp: Option<f64>,
    pub fuel_liters: Option<f64>,
    pub total_hdd: Option<f64>,
    pub liters_per_hour: Option<f64>,
    pub liters_per_hdd: Option<f64>,
}

/// Relate a month's runtime to the fuel delivered and the HDD observed.
pub fn analyze(report: &HvacReport, fuel_liters: Option<f64>, total_hdd: Option<f64>) -> HvacEfficiency {
    let fuel_liters = fuel_liters.filter(|l| *l > 0.0);
    HvacEfficiency {
        period: format!("{}-{:02}", report.year, report.month),
        year: report.year,
        month: report.month,
        runtime_hours: report.total_runtime_hours,
        avg_cycle_min: report.avg_cycle_minutes,
        avg_outdoor_temp: report.avg_outdoor_temp,
        fuel_liters,
        total_hdd: total_hdd.map(|h| round_to(h, 1)),
        liters_per_hour: per_unit(fuel_liters, report.total_runtime_hours),
        liters_per_hdd: total_hdd.and_then(|h| per_unit(fuel_liters, h)),
    }
}

fn per_unit(liters: Option<f64>, denominator: f64) -> Option<f64> {
    let liters = liters.filter(|l| *l > 0.0)?;
    (denominator > 0.0).then(|| round_to(liters / denominator, 3))
}
