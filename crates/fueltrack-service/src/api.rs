//! REST API endpoints for the fueltrack service.
//!
//! Every analysis endpoint recomputes from the store on each request; there
//! is no cached computation state. Settings are read fresh per request as
//! well, so a changed tank capacity or GST rate takes effect immediately.
//!
//! # Concurrency
//!
//! `state.store` is a Mutex held only for the duration of the queries a
//! handler needs. It is never held across an outbound fetch: the
//! predictions endpoint reconstructs the tank first, releases the lock, and
//! only then asks the forecast provider.
//!
//! # Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. The one
//! "nothing to analyze" condition (no gauge readings at all) is a distinct
//! [`AppError::NoData`]; every other unknown figure is an explicit `null`.
//!
//! # Example
//!
//! ```ignore
//! use fueltrack_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use fueltrack_core::calc::{self, round_to};
use fueltrack_core::costs::{self, BASELINE_EFFICIENCY_Q1_2025, CostAnalysis};
use fueltrack_core::efficiency::{self, Period, PeriodEfficiency, WeatherStats};
use fueltrack_core::hvac::{self, HvacEfficiency, HvacEntry};
use fueltrack_core::readings::{self, ReadingInterval};
use fueltrack_core::scenarios::{self, Scenario};
use fueltrack_core::{
    EfficiencySource, Fallback, Forecast, HddSource, Outcome, Prediction, Projection,
    RefillPredictor, SinceFill, TankReconstructor, TankState,
};
use fueltrack_store::{SettingsSnapshot, Store, WeatherQuery};
use fueltrack_types::{
    FuelFill, GaugeReading, HvacReport, NewFuelFill, NewGaugeReading, NewHvacReport, ParseError,
    Setting, WeatherDay, WeatherSource, date::iso_date, days_between, parse_date, setting,
};

use crate::config::Config;
use crate::state::AppState;
use crate::sync::{SyncError, import_and_store};

/// Longest range accepted by `POST /api/weather/fetch`.
const MAX_FETCH_DAYS: i64 = 366;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // Gauge readings
        .route("/api/readings", get(list_readings).post(create_reading))
        .route(
            "/api/readings/{id}",
            get(get_reading).put(update_reading).delete(delete_reading),
        )
        // Fuel fills
        .route("/api/fills", get(list_fills).post(create_fill))
        .route(
            "/api/fills/{id}",
            get(get_fill).put(update_fill).delete(delete_fill),
        )
        // Weather
        .route("/api/weather", get(list_weather).post(create_weather))
        .route("/api/weather/summary", get(weather_summary))
        .route("/api/weather/fetch", post(fetch_weather))
        .route("/api/weather/{date}", delete(delete_weather))
        // HVAC reports
        .route("/api/hvac", get(list_hvac).post(upsert_hvac))
        .route("/api/hvac/analysis/efficiency", get(hvac_efficiency))
        .route(
            "/api/hvac/{year}/{month}",
            get(get_hvac).delete(delete_hvac),
        )
        // Analysis
        .route("/api/analysis/current", get(current_analysis))
        .route("/api/analysis/predictions", get(predictions))
        .route("/api/analysis/efficiency", get(period_efficiency))
        .route("/api/analysis/costs", get(cost_analysis))
        // Settings
        .route("/api/settings", get(list_settings))
        .route("/api/settings/{key}", put(update_setting))
}

// ==========================================================================
// Health
// ==========================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub sync: SyncHealth,
}

#[derive(Debug, Serialize)]
pub struct SyncHealth {
    pub running: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_run: Option<OffsetDateTime>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        sync: SyncHealth {
            running: state.sync.is_running(),
            last_run: state.sync.last_run(),
        },
    })
}

// ==========================================================================
// Request validation
// ==========================================================================

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::BadRequest(format!("Missing required field: {}", field)))
}

fn date_field(value: Option<&str>, field: &str) -> Result<Date, AppError> {
    let value = required(value, field)?;
    parse_date(value).map_err(|e| AppError::BadRequest(format!("{}: {}", field, e)))
}

fn optional_date(value: Option<&str>, field: &str) -> Result<Option<Date>, AppError> {
    value.map(|v| date_field(Some(v), field)).transpose()
}

fn percent_field(value: Option<f64>, field: &str) -> Result<f64, AppError> {
    let value = required(value, field)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(AppError::BadRequest(format!(
            "{} must be between 0 and 100, got {}",
            field, value
        )));
    }
    Ok(value)
}

fn positive_field(value: Option<f64>, field: &str) -> Result<f64, AppError> {
    let value = required(value, field)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(AppError::BadRequest(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(value)
}

fn notes(value: Option<String>) -> Option<String> {
    value.filter(|n| !n.trim().is_empty())
}

fn month_field(value: Option<u8>) -> Result<u8, AppError> {
    let month = required(value, "month")?;
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(format!(
            "month must be between 1 and 12, got {}",
            month
        )));
    }
    Ok(month)
}

/// Settings that drive calculations, with config values as fallbacks.
#[derive(Debug, Clone, Copy)]
struct Runtime {
    capacity: f64,
    discount_per_liter: f64,
    gst_rate: f64,
}

impl Runtime {
    fn load(store: &Store, config: &Config) -> Result<Self, AppError> {
        let settings = store.settings()?;
        Ok(Self {
            capacity: settings.f64_or(setting::TANK_CAPACITY, config.tank.capacity_liters)?,
            discount_per_liter: settings
                .f64_or(setting::DISCOUNT_PER_LITER, config.pricing.discount_per_liter)?,
            gst_rate: settings.f64_or(setting::GST_RATE, config.pricing.gst_rate)?,
        })
    }
}

// ==========================================================================
// Gauge readings
// ==========================================================================

/// Body of `POST`/`PUT /api/readings`.
#[derive(Debug, Default, Deserialize)]
pub struct ReadingRequest {
    pub date: Option<String>,
    pub gauge_percent: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReadingRequest {
    fn validate(self) -> Result<NewGaugeReading, AppError> {
        Ok(NewGaugeReading {
            date: date_field(self.date.as_deref(), "date")?,
            gauge_percent: percent_field(self.gauge_percent, "gauge_percent")?,
            notes: notes(self.notes),
        })
    }
}

/// Readings newest first, each with consumption since the previous one.
async fn list_readings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReadingInterval>>, AppError> {
    let store = state.store.lock().await;
    let runtime = Runtime::load(&store, &state.config)?;
    let list = store.list_readings()?;
    let enriched = readings::intervals(&list, runtime.capacity, &*store)?;
    Ok(Json(enriched))
}

async fn get_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<GaugeReading>, AppError> {
    let store = state.store.lock().await;
    let reading = store
        .get_reading(id)?
        .ok_or_else(|| AppError::NotFound("Reading not found".to_string()))?;
    Ok(Json(reading))
}

async fn create_reading(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReadingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reading = request.validate()?;
    let store = state.store.lock().await;
    let stored = store.insert_reading(&reading)?;
    info!(
        "Recorded gauge reading {} on {}: {}%",
        stored.id, stored.date, stored.gauge_percent
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn update_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<ReadingRequest>,
) -> Result<Json<GaugeReading>, AppError> {
    let reading = request.validate()?;
    let store = state.store.lock().await;
    let updated = store
        .update_reading(id, &reading)?
        .ok_or_else(|| AppError::NotFound("Reading not found".to_string()))?;
    Ok(Json(updated))
}

async fn delete_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let store = state.store.lock().await;
    if store.delete_reading(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Reading not found".to_string()))
    }
}

// ==========================================================================
// Fuel fills
// ==========================================================================

/// Body of `POST`/`PUT /api/fills`. Cost fields are derived server-side.
#[derive(Debug, Default, Deserialize)]
pub struct FillRequest {
    pub date: Option<String>,
    pub gauge_percent_before: Option<f64>,
    pub liters_added: Option<f64>,
    pub price_per_liter: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FillRequest {
    /// Validate and price the fill with the current settings.
    fn validate(self, runtime: Runtime) -> Result<NewFuelFill, AppError> {
        let date = date_field(self.date.as_deref(), "date")?;
        let gauge_percent_before = percent_field(self.gauge_percent_before, "gauge_percent_before")?;
        let liters_added = positive_field(self.liters_added, "liters_added")?;
        let price_per_liter = positive_field(self.price_per_liter, "price_per_liter")?;

        let cost = calc::fill_cost(
            liters_added,
            price_per_liter,
            runtime.discount_per_liter,
            runtime.gst_rate,
        );
        Ok(NewFuelFill {
            date,
            gauge_percent_before,
            liters_added,
            liters_before_fill: calc::liters_from_gauge(gauge_percent_before, runtime.capacity),
            price_per_liter,
            discount: cost.discount,
            gst: cost.gst,
            total_cost: cost.total,
            notes: notes(self.notes),
        })
    }
}

async fn list_fills(State(state): State<Arc<AppState>>) -> Result<Json<Vec<FuelFill>>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.list_fills()?))
}

async fn get_fill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<FuelFill>, AppError> {
    let store = state.store.lock().await;
    let fill = store
        .get_fill(id)?
        .ok_or_else(|| AppError::NotFound("Fill not found".to_string()))?;
    Ok(Json(fill))
}

async fn create_fill(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FillRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.lock().await;
    let fill = request.validate(Runtime::load(&store, &state.config)?)?;
    let stored = store.insert_fill(&fill)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn update_fill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<FillRequest>,
) -> Result<Json<FuelFill>, AppError> {
    let store = state.store.lock().await;
    let fill = request.validate(Runtime::load(&store, &state.config)?)?;
    let updated = store
        .update_fill(id, &fill)?
        .ok_or_else(|| AppError::NotFound("Fill not found".to_string()))?;
    Ok(Json(updated))
}

async fn delete_fill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let store = state.store.lock().await;
    if store.delete_fill(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Fill not found".to_string()))
    }
}

// ==========================================================================
// Weather
// ==========================================================================

/// `from`/`to` query parameters, both inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DateRangeQuery {
    fn bounds(&self) -> Result<(Option<Date>, Option<Date>), AppError> {
        Ok((
            optional_date(self.from.as_deref(), "from")?,
            optional_date(self.to.as_deref(), "to")?,
        ))
    }

    fn period(&self) -> Result<Period, AppError> {
        if self.from.is_none() || self.to.is_none() {
            return Err(AppError::BadRequest(
                "Both from and to dates required".to_string(),
            ));
        }
        let from = date_field(self.from.as_deref(), "from")?;
        let to = date_field(self.to.as_deref(), "to")?;
        Period::new(from, to).map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

async fn list_weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<WeatherDay>>, AppError> {
    let (from, to) = query.bounds()?;
    let store = state.store.lock().await;
    let days = store.query_weather(&WeatherQuery::new().between(from, to))?;
    Ok(Json(days))
}

async fn weather_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<WeatherStats>, AppError> {
    let period = query.period()?;
    let store = state.store.lock().await;
    let days = store.query_weather(&WeatherQuery::new().from(period.from).to(period.to))?;
    Ok(Json(WeatherStats::from_days(&days).rounded()))
}

/// Body of `POST /api/weather`.
#[derive(Debug, Default, Deserialize)]
pub struct WeatherRequest {
    pub date: Option<String>,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
}

async fn create_weather(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WeatherRequest>,
) -> Result<impl IntoResponse, AppError> {
    let date = date_field(request.date.as_deref(), "date")?;
    let max_temp = required(request.max_temp, "max_temp")?;
    let min_temp = required(request.min_temp, "min_temp")?;
    if min_temp > max_temp {
        return Err(AppError::BadRequest(format!(
            "min_temp {} is above max_temp {}",
            min_temp, max_temp
        )));
    }

    let day = calc::weather_from_extremes(
        date,
        max_temp,
        min_temp,
        state.config.weather.hdd_base_temp,
        WeatherSource::Manual,
    );
    let store = state.store.lock().await;
    let stored = store.upsert_weather(&day)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Body of `POST /api/weather/fetch`.
#[derive(Debug, Default, Deserialize)]
pub struct FetchRequest {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Outcome of an on-demand import.
#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub fetched: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
    pub data: Vec<WeatherDay>,
}

async fn fetch_weather(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FetchRequest>,
) -> Result<Json<FetchResponse>, AppError> {
    if request.from.is_none() || request.to.is_none() {
        return Err(AppError::BadRequest(
            "Both from and to dates required".to_string(),
        ));
    }
    let from = date_field(request.from.as_deref(), "from")?;
    let to = date_field(request.to.as_deref(), "to")?;
    let span = days_between(from, to);
    if span < 0 {
        return Err(AppError::BadRequest(format!("{} is after {}", from, to)));
    }
    if span >= MAX_FETCH_DAYS {
        return Err(AppError::BadRequest(format!(
            "range too long: at most {} days per request",
            MAX_FETCH_DAYS
        )));
    }

    info!("Fetching weather from {} to {}", from, to);
    let (report, data) = import_and_store(&state, from, to).await?;
    Ok(Json(FetchResponse {
        fetched: report.fetched,
        skipped: report.skipped,
        errors: report.errors,
        data,
    }))
}

async fn delete_weather(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<StatusCode, AppError> {
    let date = date_field(Some(&date), "date")?;
    let store = state.store.lock().await;
    if store.delete_weather(date)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Weather record not found".to_string()))
    }
}

// ==========================================================================
// HVAC reports
// ==========================================================================

/// Body of `POST /api/hvac`. An existing report for the month is replaced.
#[derive(Debug, Default, Deserialize)]
pub struct HvacRequest {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub total_runtime_hours: Option<f64>,
    #[serde(default)]
    pub avg_cycle_minutes: Option<f64>,
    #[serde(default)]
    pub avg_outdoor_temp: Option<f64>,
    #[serde(default)]
    pub avg_indoor_temp: Option<f64>,
    #[serde(default)]
    pub avg_setpoint: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl HvacRequest {
    fn validate(self) -> Result<NewHvacReport, AppError> {
        let year = required(self.year, "year")?;
        let month = month_field(self.month)?;
        let total_runtime_hours = required(self.total_runtime_hours, "total_runtime_hours")?;
        if !(total_runtime_hours.is_finite() && total_runtime_hours >= 0.0) {
            return Err(AppError::BadRequest(format!(
                "total_runtime_hours cannot be negative, got {}",
                total_runtime_hours
            )));
        }
        Ok(NewHvacReport {
            year,
            month,
            total_runtime_hours,
            avg_cycle_minutes: self.avg_cycle_minutes,
            avg_outdoor_temp: self.avg_outdoor_temp,
            avg_indoor_temp: self.avg_indoor_temp,
            avg_setpoint: self.avg_setpoint,
            notes: notes(self.notes),
        })
    }
}

fn report_period(report: &HvacReport) -> Result<Period, AppError> {
    hvac::month_period(report.year, report.month).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Reports newest first, each with the fuel delivered during its month.
async fn list_hvac(State(state): State<Arc<AppState>>) -> Result<Json<Vec<HvacEntry>>, AppError> {
    let store = state.store.lock().await;
    let mut entries = Vec::new();
    for report in store.list_hvac_reports()? {
        let period = report_period(&report)?;
        let liters = store.fill_liters_between(period.from, period.to)?;
        entries.push(hvac::enrich(report, liters));
    }
    Ok(Json(entries))
}

async fn get_hvac(
    State(state): State<Arc<AppState>>,
    Path((year, month)): Path<(i32, u8)>,
) -> Result<Json<HvacReport>, AppError> {
    let store = state.store.lock().await;
    let report = store
        .get_hvac_report(year, month)?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
    Ok(Json(report))
}

async fn upsert_hvac(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HvacRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = request.validate()?;
    let store = state.store.lock().await;
    let stored = store.upsert_hvac_report(&report)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn delete_hvac(
    State(state): State<Arc<AppState>>,
    Path((year, month)): Path<(i32, u8)>,
) -> Result<StatusCode, AppError> {
    let store = state.store.lock().await;
    if store.delete_hvac_report(year, month)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Report not found".to_string()))
    }
}

/// Monthly runtime against fuel and HDD, oldest month first.
async fn hvac_efficiency(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HvacEfficiency>>, AppError> {
    let store = state.store.lock().await;
    let mut rows = Vec::new();
    for report in store.list_hvac_reports()?.iter().rev() {
        let period = report_period(report)?;
        let liters = store.fill_liters_between(period.from, period.to)?;
        let hdd = store.hdd_between(period.from, period.to)?;
        rows.push(hvac::analyze(report, liters, hdd));
    }
    Ok(Json(rows))
}

// ==========================================================================
// Analysis
// ==========================================================================

/// Reconstruct the tank as of today, or fail with [`AppError::NoData`].
fn reconstruct(state: &AppState, store: &Store, today: Date) -> Result<(TankState, Runtime), AppError> {
    let runtime = Runtime::load(store, &state.config)?;
    let reconstructor = TankReconstructor::new(runtime.capacity, state.config.tank.default_efficiency);
    let tank = reconstructor
        .reconstruct(store, today)?
        .ok_or(AppError::NoData)?;
    Ok((tank, runtime))
}

fn predictor(state: &AppState, runtime: Runtime) -> RefillPredictor {
    RefillPredictor::new(runtime.capacity, state.config.tank.refill_threshold_percent)
}

/// Tank level for display.
#[derive(Debug, Serialize)]
pub struct TankSnapshot {
    /// Projected to today.
    pub current_liters: f64,
    pub current_percent: f64,
    pub capacity: f64,
    #[serde(with = "iso_date")]
    pub reading_date: Date,
    pub reading_percent: f64,
    pub reading_liters: f64,
}

impl TankSnapshot {
    fn new(tank: &TankState) -> Self {
        Self {
            current_liters: round_to(tank.projection.liters, 0),
            current_percent: round_to(tank.projection.percent, 1),
            capacity: tank.capacity,
            reading_date: tank.reading.date,
            reading_percent: tank.reading.gauge_percent,
            reading_liters: round_to(tank.reading_liters, 0),
        }
    }
}

/// Efficiency figures behind a prediction.
#[derive(Debug, Serialize)]
pub struct EfficiencyUsed {
    /// Measured since the latest fill, if possible.
    pub measured: Option<f64>,
    pub used: f64,
    pub source: EfficiencySource,
    pub baseline_q1_2025: f64,
}

impl EfficiencyUsed {
    fn new(tank: &TankState) -> Self {
        Self {
            measured: tank.since_fill.efficiency().map(|e| round_to(e, 3)),
            used: round_to(tank.efficiency, 3),
            source: tank.efficiency_source,
            baseline_q1_2025: BASELINE_EFFICIENCY_Q1_2025,
        }
    }
}

/// Projection rounded for display.
#[derive(Debug, Serialize)]
pub struct ProjectionSummary {
    pub days_since_reading: i64,
    pub hdd_since_reading: Option<f64>,
    pub consumption_since_reading: f64,
    pub fills_since_reading: f64,
}

impl From<&Projection> for ProjectionSummary {
    fn from(p: &Projection) -> Self {
        Self {
            days_since_reading: p.days_since_reading,
            hdd_since_reading: p.hdd_since_reading.map(|h| round_to(h, 1)),
            consumption_since_reading: round_to(p.consumption_since_reading, 1),
            fills_since_reading: round_to(p.fills_since_reading, 1),
        }
    }
}

/// Prediction at the typical HDD for the current month.
#[derive(Debug, Serialize)]
pub struct TypicalPrediction {
    pub days_until_refill: Option<u32>,
    #[serde(with = "iso_date::option")]
    pub estimated_refill_date: Option<Date>,
    pub outcome: Outcome,
    pub assumed_hdd_per_day: f64,
    pub assumed_efficiency: f64,
}

/// `GET /api/analysis/current`.
#[derive(Debug, Serialize)]
pub struct CurrentAnalysis {
    pub tank: TankSnapshot,
    pub projection: ProjectionSummary,
    pub consumption: SinceFill,
    pub efficiency: EfficiencyUsed,
    pub prediction: TypicalPrediction,
}

async fn current_analysis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CurrentAnalysis>, AppError> {
    let today = state.today();
    let (tank, runtime) = {
        let store = state.store.lock().await;
        reconstruct(&state, &store, today)?
    };

    let typical = calc::typical_hdd_for_date(today);
    let prediction = predictor(&state, runtime).predict(
        tank.projection.liters,
        tank.efficiency,
        HddSource::Constant(typical),
        today,
    );

    Ok(Json(CurrentAnalysis {
        tank: TankSnapshot::new(&tank),
        projection: ProjectionSummary::from(&tank.projection),
        consumption: round_since_fill(&tank.since_fill),
        efficiency: EfficiencyUsed::new(&tank),
        prediction: TypicalPrediction {
            days_until_refill: prediction.days_until_refill,
            estimated_refill_date: prediction.refill_date,
            outcome: prediction.outcome,
            assumed_hdd_per_day: typical,
            assumed_efficiency: round_to(tank.efficiency, 3),
        },
    }))
}

fn round_since_fill(since_fill: &SinceFill) -> SinceFill {
    match since_fill {
        SinceFill::Measured {
            fill_date,
            days,
            consumption_liters,
            liters_per_day,
            hdd,
            efficiency,
        } => SinceFill::Measured {
            fill_date: *fill_date,
            days: *days,
            consumption_liters: round_to(*consumption_liters, 0),
            liters_per_day: liters_per_day.map(|v| round_to(v, 2)),
            hdd: hdd.map(|v| round_to(v, 1)),
            efficiency: efficiency.map(|v| round_to(v, 3)),
        },
        other => other.clone(),
    }
}

/// Tank level the predictions start from.
#[derive(Debug, Serialize)]
pub struct CurrentTank {
    pub liters: f64,
    pub percent: f64,
    #[serde(with = "iso_date")]
    pub as_of: Date,
}

/// `GET /api/analysis/predictions`.
#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub current_tank: CurrentTank,
    pub efficiency: EfficiencyUsed,
    pub forecast_based_prediction: Prediction,
    /// `None` when the forecast could not be fetched.
    pub forecast: Option<Forecast>,
    pub scenarios: Vec<Scenario>,
    pub typical_hdd_by_month: BTreeMap<u8, f64>,
}

async fn predictions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PredictionsResponse>, AppError> {
    let today = state.today();
    let (tank, runtime) = {
        let store = state.store.lock().await;
        reconstruct(&state, &store, today)?
    };

    let forecast = match state.forecast.fetch_forecast().await {
        Ok(forecast) if !forecast.days.is_empty() => Some(forecast),
        Ok(_) => {
            warn!("Forecast returned no days; using typical HDD");
            None
        }
        Err(e) => {
            warn!("Failed to fetch forecast: {}; using typical HDD", e);
            None
        }
    };

    let predictor = predictor(&state, runtime);
    let hdd_series = forecast.as_ref().map(Forecast::hdd_series).unwrap_or_default();
    let prediction = predictor.predict(
        tank.projection.liters,
        tank.efficiency,
        HddSource::Forecast {
            days: &hdd_series,
            fallback: Fallback::TypicalForMonth,
        },
        today,
    );
    let scenarios = scenarios::generate(
        &predictor,
        tank.projection.liters,
        tank.efficiency,
        forecast.as_ref().map(|f| f.avg_hdd_per_day),
        today,
    );

    Ok(Json(PredictionsResponse {
        current_tank: CurrentTank {
            liters: round_to(tank.projection.liters, 0),
            percent: round_to(tank.projection.percent, 1),
            as_of: today,
        },
        efficiency: EfficiencyUsed::new(&tank),
        forecast_based_prediction: prediction,
        forecast,
        scenarios,
        typical_hdd_by_month: calc::typical_hdd_table(),
    }))
}

/// Query for `GET /api/analysis/efficiency`.
#[derive(Debug, Default, Deserialize)]
pub struct EfficiencyQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Preset such as `q1_2025`.
    pub period: Option<String>,
}

impl EfficiencyQuery {
    fn period(&self) -> Result<Period, AppError> {
        match &self.period {
            Some(name) => Period::preset(name).map_err(|e| AppError::BadRequest(e.to_string())),
            None if self.from.is_some() && self.to.is_some() => DateRangeQuery {
                from: self.from.clone(),
                to: self.to.clone(),
            }
            .period(),
            None => Err(AppError::BadRequest(
                "Specify from/to dates or a period such as q1_2025".to_string(),
            )),
        }
    }
}

async fn period_efficiency(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EfficiencyQuery>,
) -> Result<Json<PeriodEfficiency>, AppError> {
    let period = query.period()?;
    let store = state.store.lock().await;
    let weather = store.query_weather(&WeatherQuery::new().from(period.from).to(period.to))?;
    let fills = store.fills_between(period.from, period.to)?;
    Ok(Json(efficiency::period_efficiency(period, &weather, &fills)))
}

async fn cost_analysis(State(state): State<Arc<AppState>>) -> Result<Json<CostAnalysis>, AppError> {
    let store = state.store.lock().await;
    let fills = store.list_fills()?;
    let total_hdd = store.total_hdd()?;
    Ok(Json(costs::analyze(&fills, total_hdd)))
}

// ==========================================================================
// Settings
// ==========================================================================

async fn list_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsSnapshot>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.settings()?))
}

/// Body of `PUT /api/settings/{key}`.
#[derive(Debug, Deserialize)]
pub struct SettingRequest {
    pub value: Option<serde_json::Value>,
}

/// Keys whose values feed calculations and must be numbers.
const NUMERIC_SETTINGS: [&str; 4] = [
    setting::TANK_CAPACITY,
    setting::DISCOUNT_PER_LITER,
    setting::GST_RATE,
    setting::THERMOSTAT_TEMP,
];

fn setting_value(key: &str, value: serde_json::Value) -> Result<String, AppError> {
    let text = match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(AppError::BadRequest(format!(
                "value must be a string or number, got {}",
                other
            )));
        }
    };

    if NUMERIC_SETTINGS.contains(&key) {
        let number = Setting {
            key: key.to_string(),
            value: text.clone(),
        }
        .as_f64()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let valid = match key {
            setting::TANK_CAPACITY => number > 0.0,
            setting::GST_RATE => (0.0..=1.0).contains(&number),
            setting::DISCOUNT_PER_LITER => number >= 0.0,
            _ => true,
        };
        if !valid {
            return Err(AppError::BadRequest(format!(
                "{} is out of range for {}",
                text, key
            )));
        }
    } else if text.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", key)));
    }
    Ok(text)
}

async fn update_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(request): Json<SettingRequest>,
) -> Result<Json<Setting>, AppError> {
    let value = setting_value(&key, required(request.value, "value")?)?;
    let store = state.store.lock().await;
    Ok(Json(store.set_setting(&key, &value)?))
}

// ==========================================================================
// Errors
// ==========================================================================

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Store(fueltrack_store::Error),
    /// No gauge reading exists, so there is nothing to analyze.
    NoData,
}

impl From<fueltrack_store::Error> for AppError {
    fn from(e: fueltrack_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        AppError::Store(fueltrack_store::Error::InvalidValue(e))
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Import(e) => AppError::BadRequest(e.to_string()),
            SyncError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::NoData => (StatusCode::NOT_FOUND, "No readings available".to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
