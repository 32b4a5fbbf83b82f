//! Forward simulation of tank drawdown.
//!
//! Starting from a liter level, the predictor burns `efficiency × HDD` per
//! simulated day until the tank falls to the refill threshold. The loop is
//! capped at [`MAX_SIMULATION_DAYS`] so that a zero burn rate ends the
//! simulation instead of spinning forever.

use serde::Serialize;
use time::Date;

use fueltrack_types::{add_days, date::iso_date};

use crate::calc::{self, DEFAULT_TANK_CAPACITY, round_to};

/// Refill when the tank falls to this share of capacity.
pub const REFILL_THRESHOLD_PERCENT: f64 = 20.0;

/// Hard cap on simulated days.
pub const MAX_SIMULATION_DAYS: u32 = 120;

/// Number of leading days recorded in the trajectory.
pub const TRAJECTORY_DAYS: u32 = 14;

/// HDD assumed for days past the end of a forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fallback {
    /// Typical HDD for the simulated day's calendar month.
    TypicalForMonth,
    /// A fixed HDD per day.
    Constant(f64),
}

/// Where each simulated day's HDD comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HddSource<'a> {
    /// The same HDD every day.
    Constant(f64),
    /// Forecast values by day index, then the fallback.
    Forecast { days: &'a [f64], fallback: Fallback },
}

impl HddSource<'_> {
    fn hdd_for(&self, index: u32, date: Date) -> f64 {
        match self {
            HddSource::Constant(hdd) => *hdd,
            HddSource::Forecast { days, fallback } => match days.get(index as usize) {
                Some(hdd) => *hdd,
                None => match fallback {
                    Fallback::TypicalForMonth => calc::typical_hdd_for_date(date),
                    Fallback::Constant(hdd) => *hdd,
                },
            },
        }
    }
}

/// Why the simulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The level reached the threshold.
    ThresholdReached,
    /// The cap was hit while fuel was still being burned.
    HorizonReached,
    /// Nothing was burned at all; there is no refill date to predict.
    NoConsumption,
}

/// One simulated day, rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryDay {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub hdd: f64,
    pub fuel_used: f64,
    pub remaining_liters: f64,
    pub remaining_percent: f64,
}

/// Result of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Days until the threshold, `None` when nothing is consumed.
    pub days_until_refill: Option<u32>,
    #[serde(rename = "estimated_refill_date", with = "iso_date::option")]
    pub refill_date: Option<Date>,
    pub refill_threshold_percent: f64,
    pub outcome: Outcome,
    #[serde(rename = "daily_projection")]
    pub trajectory: Vec<TrajectoryDay>,
}

/// Day-by-day refill simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefillPredictor {
    capacity: f64,
    threshold_percent: f64,
}

impl Default for RefillPredictor {
    fn default() -> Self {
        Self::new(DEFAULT_TANK_CAPACITY, REFILL_THRESHOLD_PERCENT)
    }
}

impl RefillPredictor {
    pub fn new(capacity: f64, threshold_percent: f64) -> Self {
        Self {
            capacity,
            threshold_percent,
        }
    }

    /// Threshold level in liters.
    pub fn threshold_liters(&self) -> f64 {
        self.capacity * self.threshold_percent / 100.0
    }

    /// Simulate from `starting_liters` on `today`.
    ///
    /// Day `d` is `today + d`; its fuel is burned before the threshold is
    /// checked again, and the refill date is `today` plus the number of days
    /// simulated.
    pub fn predict(
        &self,
        starting_liters: f64,
        efficiency: f64,
        source: HddSource<'_>,
        today: Date,
    ) -> Prediction {
        let threshold = self.threshold_liters();
        let mut remaining = starting_liters;
        let mut burned = 0.0;
        let mut day = 0u32;
        let mut trajectory = Vec::with_capacity(TRAJECTORY_DAYS as usize);

        while remaining > threshold && day < MAX_SIMULATION_DAYS {
            let date = add_days(today, i64::from(day));
            let hdd = source.hdd_for(day, date);
            let fuel_used = efficiency * hdd;
            remaining -= fuel_used;
            burned += fuel_used;

            if day < TRAJECTORY_DAYS {
                let left = remaining.max(0.0);
                trajectory.push(TrajectoryDay {
                    date,
                    hdd: round_to(hdd, 1),
                    fuel_used: round_to(fuel_used, 1),
                    remaining_liters: round_to(left, 0),
                    remaining_percent: round_to(calc::percent_from_liters(left, self.capacity), 0),
                });
            }
            day += 1;
        }

        let outcome = if remaining <= threshold {
            Outcome::ThresholdReached
        } else if burned > 0.0 {
            Outcome::HorizonReached
        } else {
            Outcome::NoConsumption
        };
        let days_until_refill = (outcome != Outcome::NoConsumption).then_some(day);

        Prediction {
            days_until_refill,
            refill_date: days_until_refill.map(|d| add_days(today, i64::from(d))),
            refill_threshold_percent: self.threshold_percent,
            outcome,
            trajectory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::macros::date;

    const TODAY: Date = date!(2025 - 01 - 15);

    #[test]
    fn test_at_threshold_predicts_zero_days() {
        let prediction = RefillPredictor::default().predict(200.0, 0.4, HddSource::Constant(38.0), TODAY);
        assert_eq!(prediction.days_until_refill, Some(0));
        assert_eq!(prediction.refill_date, Some(TODAY));
        assert_eq!(prediction.outcome, Outcome::ThresholdReached);
        assert!(prediction.trajectory.is_empty());
    }

    #[test]
    fn test_constant_rate() {
        // 15.2 L/day from 500 L: 300 L to burn, 20 days gets to 196 L
        let prediction = RefillPredictor::default().predict(500.0, 0.4, HddSource::Constant(38.0), TODAY);
        assert_eq!(prediction.days_until_refill, Some(20));
        assert_eq!(prediction.refill_date, Some(date!(2025 - 02 - 04)));
        assert_eq!(prediction.trajectory.len(), 14);

        let first = prediction.trajectory[0];
        assert_eq!(first.date, TODAY);
        assert_eq!(first.hdd, 38.0);
        assert_eq!(first.fuel_used, 15.2);
        assert_eq!(first.remaining_liters, 485.0);
        assert_eq!(first.remaining_percent, 48.0);
    }

    #[test]
    fn test_zero_efficiency_stops_at_cap() {
        let prediction = RefillPredictor::default().predict(900.0, 0.0, HddSource::Constant(38.0), TODAY);
        assert_eq!(prediction.outcome, Outcome::NoConsumption);
        assert_eq!(prediction.days_until_refill, None);
        assert_eq!(prediction.refill_date, None);
        assert_eq!(prediction.trajectory.len(), TRAJECTORY_DAYS as usize);
    }

    #[test]
    fn test_slow_burn_hits_horizon() {
        let prediction = RefillPredictor::default().predict(900.0, 0.01, HddSource::Constant(10.0), TODAY);
        assert_eq!(prediction.outcome, Outcome::HorizonReached);
        assert_eq!(prediction.days_until_refill, Some(MAX_SIMULATION_DAYS));
    }

    #[test]
    fn test_forecast_then_typical_month() {
        let forecast = [50.0, 50.0];
        let source = HddSource::Forecast {
            days: &forecast,
            fallback: Fallback::TypicalForMonth,
        };
        let prediction = RefillPredictor::default().predict(260.0, 1.0, source, date!(2025 - 06 - 29));
        // 260 -> 210 -> 160 crosses on the second forecast day
        assert_eq!(prediction.days_until_refill, Some(2));

        let prediction = RefillPredictor::default().predict(400.0, 1.0, source, date!(2025 - 06 - 29));
        // 300 after the forecast, July burns nothing, August 62, then 8/day in September
        assert_eq!(prediction.outcome, Outcome::ThresholdReached);
        assert_eq!(prediction.days_until_refill, Some(69));
        assert_eq!(prediction.refill_date, Some(date!(2025 - 09 - 06)));
        assert_eq!(prediction.trajectory[2].date, date!(2025 - 07 - 01));
        assert_eq!(prediction.trajectory[2].hdd, 0.0);
    }

    #[test]
    fn test_forecast_constant_fallback() {
        let source = HddSource::Forecast {
            days: &[],
            fallback: Fallback::Constant(25.0),
        };
        let prediction = RefillPredictor::default().predict(300.0, 1.0, source, TODAY);
        assert_eq!(prediction.days_until_refill, Some(4));
    }

    proptest! {
        #[test]
        fn prop_simulation_is_bounded(
            start in 0.0f64..1000.0,
            efficiency in 0.0f64..2.0,
            hdd in 0.0f64..60.0,
        ) {
            let prediction = RefillPredictor::default().predict(start, efficiency, HddSource::Constant(hdd), TODAY);
            prop_assert!(prediction.trajectory.len() <= TRAJECTORY_DAYS as usize);
            if let Some(days) = prediction.days_until_refill {
                prop_assert!(days <= MAX_SIMULATION_DAYS);
            }
            if efficiency * hdd == 0.0 && start > 200.0 {
                prop_assert_eq!(prediction.outcome, Outcome::NoConsumption);
            }
        }
    }
}
