//! Unit conversion and cost primitives.
//!
//! Every function here is pure. None of them round their result except
//! [`fill_cost`], whose rounding is part of the billing contract; callers
//! round for presentation with [`round_to`].

use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

use fueltrack_types::{NewWeatherDay, WeatherSource};

/// HDD base temperature in degrees Celsius.
pub const DEFAULT_HDD_BASE_TEMP: f64 = 18.0;

/// Tank capacity in liters.
pub const DEFAULT_TANK_CAPACITY: f64 = 1000.0;

/// Supplier discount in dollars per liter.
pub const DEFAULT_DISCOUNT_PER_LITER: f64 = 0.02;

/// GST rate as a fraction.
pub const DEFAULT_GST_RATE: f64 = 0.05;

/// Efficiency assumed when nothing has been measured yet (L/HDD).
pub const DEFAULT_EFFICIENCY: f64 = 0.4;

/// HDD per day used for a month missing from [`TYPICAL_HDD_BY_MONTH`].
pub const DEFAULT_TYPICAL_HDD: f64 = 20.0;

/// Typical HDD per day for each calendar month, January first.
///
/// Hand-calibrated for a subarctic climate (Fort Smith, NWT).
pub const TYPICAL_HDD_BY_MONTH: [f64; 12] = [
    38.0, 35.0, 28.0, 15.0, 6.0, 0.0, 0.0, 2.0, 8.0, 15.0, 28.0, 36.0,
];

/// Mean of the daily low and high.
pub fn mean_temp(min: f64, max: f64) -> f64 {
    (min + max) / 2.0
}

/// Heating degree days for a daily mean temperature. Never negative.
pub fn hdd(mean_temp: f64, base_temp: f64) -> f64 {
    (base_temp - mean_temp).max(0.0)
}

/// Liters in the tank for a gauge position.
pub fn liters_from_gauge(percent: f64, capacity: f64) -> f64 {
    (percent / 100.0) * capacity
}

/// Gauge position for a number of liters.
pub fn percent_from_liters(liters: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        liters / capacity * 100.0
    } else {
        0.0
    }
}

/// Liters per HDD, or zero when no degree days were recorded.
pub fn efficiency(liters_used: f64, total_hdd: f64) -> f64 {
    if total_hdd > 0.0 {
        liters_used / total_hdd
    } else {
        0.0
    }
}

/// Liters per day, or zero for an empty span.
pub fn daily_consumption(liters_used: f64, days: i64) -> f64 {
    if days > 0 {
        liters_used / days as f64
    } else {
        0.0
    }
}

/// Round to a number of decimal places, halves away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Breakdown of what a delivery costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FillCost {
    pub gross: f64,
    pub discount: f64,
    pub subtotal: f64,
    pub gst: f64,
    pub total: f64,
}

/// Price a delivery.
///
/// Each field is rounded to cents on its own from the unrounded
/// intermediate values, so `total` is not necessarily `subtotal + gst` of the
/// rounded figures.
pub fn fill_cost(liters: f64, price_per_liter: f64, discount_per_liter: f64, gst_rate: f64) -> FillCost {
    let gross = liters * price_per_liter;
    let discount = liters * discount_per_liter;
    let subtotal = gross - discount;
    let gst = subtotal * gst_rate;
    let total = subtotal + gst;

    FillCost {
        gross: round_to(gross, 2),
        discount: round_to(discount, 2),
        subtotal: round_to(subtotal, 2),
        gst: round_to(gst, 2),
        total: round_to(total, 2),
    }
}

/// Typical HDD per day for a calendar month (1 = January).
pub fn typical_hdd_for_month(month: u8) -> f64 {
    match month {
        1..=12 => TYPICAL_HDD_BY_MONTH[usize::from(month - 1)],
        _ => DEFAULT_TYPICAL_HDD,
    }
}

/// Typical HDD per day for a calendar date.
pub fn typical_hdd_for_date(date: Date) -> f64 {
    typical_hdd_for_month(u8::from(date.month()))
}

/// The typical-HDD table keyed by month number.
pub fn typical_hdd_table() -> BTreeMap<u8, f64> {
    (1u8..=12).map(|m| (m, typical_hdd_for_month(m))).collect()
}

/// Build a weather record from the daily extremes, deriving mean and HDD.
pub fn weather_from_extremes(
    date: Date,
    max_temp: f64,
    min_temp: f64,
    base_temp: f64,
    source: WeatherSource,
) -> NewWeatherDay {
    let mean = mean_temp(min_temp, max_temp);
    NewWeatherDay {
        date,
        max_temp: Some(max_temp),
        min_temp: Some(min_temp),
        mean_temp: Some(mean),
        hdd: Some(hdd(mean, base_temp)),
        source,
    }
}
