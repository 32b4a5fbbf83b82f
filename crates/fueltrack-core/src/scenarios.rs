//! Refill predictions under fixed weather assumptions.

use serde::Serialize;
use time::Date;

use fueltrack_types::date::iso_date;

use crate::calc::round_to;
use crate::predict::{HddSource, RefillPredictor};

/// HDD per day assumed when no forecast average is available.
pub const FORECAST_FALLBACK_HDD: f64 = 25.0;

/// The weather assumption behind a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Average of the short-range forecast.
    Forecast,
    /// Around -10°C on average.
    Mild,
    /// Around -20°C on average.
    Normal,
    /// Around -30°C on average.
    Cold,
}

impl ScenarioKind {
    /// All scenarios in presentation order.
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::Forecast,
        ScenarioKind::Mild,
        ScenarioKind::Normal,
        ScenarioKind::Cold,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::Forecast => "7-Day Forecast Avg",
            ScenarioKind::Mild => "Mild (-10°C avg)",
            ScenarioKind::Normal => "Normal (-20°C avg)",
            ScenarioKind::Cold => "Cold (-30°C avg)",
        }
    }

    /// HDD per day for the fixed buckets. `None` for the forecast.
    pub fn fixed_hdd(&self) -> Option<f64> {
        match self {
            ScenarioKind::Forecast => None,
            ScenarioKind::Mild => Some(28.0),
            ScenarioKind::Normal => Some(38.0),
            ScenarioKind::Cold => Some(48.0),
        }
    }
}

/// One scenario's outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub scenario: &'static str,
    pub hdd_per_day: f64,
    pub daily_fuel_liters: f64,
    pub days_until_refill: Option<u32>,
    #[serde(with = "iso_date::option")]
    pub estimated_refill_date: Option<Date>,
}

/// Run the predictor for every scenario.
///
/// Always returns four entries in [`ScenarioKind::ALL`] order. A missing
/// forecast average falls back to [`FORECAST_FALLBACK_HDD`].
pub fn generate(
    predictor: &RefillPredictor,
    starting_liters: f64,
    efficiency: f64,
    forecast_avg_hdd: Option<f64>,
    today: Date,
) -> Vec<Scenario> {
    ScenarioKind::ALL
        .iter()
        .map(|kind| {
            let hdd_per_day = kind
                .fixed_hdd()
                .unwrap_or_else(|| forecast_avg_hdd.unwrap_or(FORECAST_FALLBACK_HDD));
            let prediction =
                predictor.predict(starting_liters, efficiency, HddSource::Constant(hdd_per_day), today);
            Scenario {
                kind: *kind,
                scenario: kind.label(),
                hdd_per_day: round_to(hdd_per_day, 1),
                daily_fuel_liters: round_to(efficiency * hdd_per_day, 1),
                days_until_refill: prediction.days_until_refill,
                estimated_refill_date: prediction.refill_date,
            }
        })
        .collect()
}
