//! Core entity types for heating-oil tracking.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::ParseError;

/// A manual observation of the tank gauge.
///
/// Readings are only ever created by the user. Several readings may share a
/// date; among those, insertion order (the row id) decides which is latest.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaugeReading {
    /// Database row ID.
    pub id: i64,
    /// Day the gauge was read.
    #[cfg_attr(feature = "serde", serde(with = "crate::date::iso_date"))]
    pub date: Date,
    /// Gauge position, 0 to 100.
    pub gauge_percent: f64,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// A gauge reading that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewGaugeReading {
    #[cfg_attr(feature = "serde", serde(with = "crate::date::iso_date"))]
    pub date: Date,
    pub gauge_percent: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub notes: Option<String>,
}

/// A delivery of fuel into the tank.
///
/// After a fill the tank is assumed to be full.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FuelFill {
    /// Database row ID.
    pub id: i64,
    /// Delivery day.
    #[cfg_attr(feature = "serde", serde(with = "crate::date::iso_date"))]
    pub date: Date,
    /// Gauge position just before the delivery.
    pub gauge_percent_before: f64,
    /// Liters delivered.
    pub liters_added: f64,
    /// Liters in the tank before delivery, derived from the gauge and the
    /// tank capacity at the time the fill was recorded. Not recomputed.
    pub liters_before_fill: f64,
    /// Pump price per liter before discount and tax.
    pub price_per_liter: f64,
    /// Total discount applied.
    pub discount: f64,
    /// GST charged.
    pub gst: f64,
    /// Amount billed.
    pub total_cost: f64,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// A priced fuel fill ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewFuelFill {
    #[cfg_attr(feature = "serde", serde(with = "crate::date::iso_date"))]
    pub date: Date,
    pub gauge_percent_before: f64,
    pub liters_added: f64,
    pub liters_before_fill: f64,
    pub price_per_liter: f64,
    pub discount: f64,
    pub gst: f64,
    pub total_cost: f64,
    pub notes: Option<String>,
}

/// Where a weather record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WeatherSource {
    /// Entered by hand.
    #[default]
    Manual,
    /// Loaded from a historical data file.
    Imported,
    /// Fetched by the observation importer.
    Auto,
}

impl WeatherSource {
    /// The label stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherSource::Manual => "manual",
            WeatherSource::Imported => "imported",
            WeatherSource::Auto => "auto",
        }
    }
}

impl fmt::Display for WeatherSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherSource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(WeatherSource::Manual),
            "imported" => Ok(WeatherSource::Imported),
            "auto" => Ok(WeatherSource::Auto),
            _ => Err(ParseError::UnknownWeatherSource(s.to_string())),
        }
    }
}

/// Weather for one calendar day.
///
/// `mean_temp` and `hdd` are derived from the extremes when the record is
/// written. A record with empty temperatures marks a known gap.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeatherDay {
    /// Database row ID.
    pub id: i64,
    /// Observation day (unique).
    #[cfg_attr(feature = "serde", serde(with = "crate::date::iso_date"))]
    pub date: Date,
    /// Daily high in degrees Celsius.
    pub max_temp: Option<f64>,
    /// Daily low in degrees Celsius.
    pub min_temp: Option<f64>,
    /// Mean of high and low.
    pub mean_temp: Option<f64>,
    /// Heating degree days.
    pub hdd: Option<f64>,
    /// Record origin.
    pub source: WeatherSource,
}

/// A weather record ready to be upserted by date.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewWeatherDay {
    #[cfg_attr(feature = "serde", serde(with = "crate::date::iso_date"))]
    pub date: Date,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub mean_temp: Option<f64>,
    pub hdd: Option<f64>,
    pub source: WeatherSource,
}

/// Monthly furnace runtime summary exported from the thermostat.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HvacReport {
    /// Database row ID.
    pub id: i64,
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1 to 12. Unique together with `year`.
    pub month: u8,
    /// Total burner runtime in hours.
    pub total_runtime_hours: f64,
    /// Average cycle length in minutes.
    pub avg_cycle_minutes: Option<f64>,
    /// Average outdoor temperature in degrees Celsius.
    pub avg_outdoor_temp: Option<f64>,
    /// Average indoor temperature in degrees Celsius.
    pub avg_indoor_temp: Option<f64>,
    /// Average thermostat setpoint in degrees Celsius.
    pub avg_setpoint: Option<f64>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// An HVAC report to insert or replace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewHvacReport {
    pub year: i32,
    pub month: u8,
    pub total_runtime_hours: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub avg_cycle_minutes: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub avg_outdoor_temp: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub avg_indoor_temp: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub avg_setpoint: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub notes: Option<String>,
}

/// Well-known keys in the settings table.
pub mod setting {
    /// Tank capacity in liters.
    pub const TANK_CAPACITY: &str = "tank_capacity";
    /// Supplier discount per liter, in dollars.
    pub const DISCOUNT_PER_LITER: &str = "discount_per_liter";
    /// GST rate as a fraction (0.05 = 5%).
    pub const GST_RATE: &str = "gst_rate";
    /// Thermostat setpoint in degrees Celsius.
    pub const THERMOSTAT_TEMP: &str = "thermostat_temp";
    /// Weather station identifier.
    pub const STATION_ID: &str = "station_id";
}

/// A key-value pair from the settings table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl Setting {
    /// Interpret the value as a number.
    pub fn as_f64(&self) -> Result<f64, ParseError> {
        self.value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::InvalidSetting {
                key: self.key.clone(),
                value: self.value.clone(),
            })
    }
}
