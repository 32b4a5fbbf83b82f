//! Spending totals and annual cost projections.

use serde::Serialize;

use fueltrack_types::FuelFill;

use crate::calc::round_to;

/// Degree days in a typical heating year.
pub const ANNUAL_HDD: f64 = 7200.0;

/// Efficiencies (L/HDD) the annual projection is computed for.
pub const PROJECTION_EFFICIENCIES: [f64; 4] = [0.191, 0.35, 0.4, 0.45];

/// Efficiency measured before the window upgrade, kept as a reference point.
pub const BASELINE_EFFICIENCY_Q1_2025: f64 = 0.191;

/// Number of fills listed in the report.
pub const RECENT_FILLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostTotals {
    pub liters: f64,
    pub cost: f64,
    pub fills: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostAverages {
    pub price_per_liter: f64,
    /// Total spend over all recorded degree days.
    pub cost_per_hdd: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnnualScenario {
    pub efficiency: f64,
    pub annual_liters: f64,
    pub annual_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualProjections {
    pub assumed_annual_hdd: f64,
    pub assumed_price_per_liter: f64,
    pub scenarios: Vec<AnnualScenario>,
}

/// The cost analysis payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnalysis {
    pub totals: CostTotals,
    pub averages: CostAverages,
    pub annual_projections: AnnualProjections,
    pub recent_fills: Vec<FuelFill>,
}

/// Analyse spending.
///
/// `fills` must be ordered newest first; `total_hdd` is the sum over all
/// recorded weather, if any.
pub fn analyze(fills: &[FuelFill], total_hdd: Option<f64>) -> CostAnalysis {
    let liters: f64 = fills.iter().map(|f| f.liters_added).sum();
    let cost: f64 = fills.iter().map(|f| f.total_cost).sum();
    let price_per_liter = if liters > 0.0 { cost / liters } else { 0.0 };
    let cost_per_hdd = total_hdd.filter(|h| *h > 0.0).map(|h| round_to(cost / h, 2));

    let scenarios = PROJECTION_EFFICIENCIES
        .iter()
        .map(|&efficiency| {
            let annual_liters = ANNUAL_HDD * efficiency;
            AnnualScenario {
                efficiency,
                annual_liters: round_to(annual_liters, 0),
                annual_cost: round_to(annual_liters * price_per_liter, 2),
            }
        })
        .collect();

    CostAnalysis {
        totals: CostTotals {
            liters: round_to(liters, 1),
            cost: round_to(cost, 2),
            fills: fills.len(),
        },
        averages: CostAverages {
            price_per_liter: round_to(price_per_liter, 3),
            cost_per_hdd,
        },
        annual_projections: AnnualProjections {
            assumed_annual_hdd: ANNUAL_HDD,
            assumed_price_per_liter: round_to(price_per_liter, 3),
            scenarios,
        },
        recent_fills: fills.iter().take(RECENT_FILLS).cloned().collect(),
    }
}
