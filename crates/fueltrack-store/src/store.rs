//! Main store implementation.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use time::Date;
use tracing::{debug, info};

use fueltrack_types::{
    DateRange, FuelFill, FuelHistory, GaugeReading, HddSummary, HvacReport, NewFuelFill,
    NewGaugeReading, NewHvacReport, NewWeatherDay, Setting, WeatherDay, format_date, parse_date,
};

use crate::error::{Error, Result};
use crate::models::SettingsSnapshot;
use crate::queries::WeatherQuery;
use crate::schema;

const READING_COLUMNS: &str = "id, date, gauge_percent, notes";
const FILL_COLUMNS: &str = "id, date, gauge_percent_before, liters_added, liters_before_fill, \
                            price_per_liter, discount, gst, total_cost, notes";
const WEATHER_COLUMNS: &str = "id, date, max_temp, min_temp, mean_temp, hdd, source";
const HVAC_COLUMNS: &str = "id, year, month, total_runtime_hours, avg_cycle_minutes, \
                            avg_outdoor_temp, avg_indoor_temp, avg_setpoint, notes";

/// SQLite-based store for fuel, weather and HVAC records.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let mut conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&mut conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::initialize(&mut conn)?;
        Ok(Self { conn })
    }
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Date> {
    let text: String = row.get(idx)?;
    parse_date(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn reading_from_row(row: &Row<'_>) -> rusqlite::Result<GaugeReading> {
    Ok(GaugeReading {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        gauge_percent: row.get(2)?,
        notes: row.get(3)?,
    })
}

fn fill_from_row(row: &Row<'_>) -> rusqlite::Result<FuelFill> {
    Ok(FuelFill {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        gauge_percent_before: row.get(2)?,
        liters_added: row.get(3)?,
        liters_before_fill: row.get(4)?,
        price_per_liter: row.get(5)?,
        discount: row.get(6)?,
        gst: row.get(7)?,
        total_cost: row.get(8)?,
        notes: row.get(9)?,
    })
}

fn weather_from_row(row: &Row<'_>) -> rusqlite::Result<WeatherDay> {
    let source: String = row.get(6)?;
    Ok(WeatherDay {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        max_temp: row.get(2)?,
        min_temp: row.get(3)?,
        mean_temp: row.get(4)?,
        hdd: row.get(5)?,
        source: source
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
    })
}

fn hvac_from_row(row: &Row<'_>) -> rusqlite::Result<HvacReport> {
    Ok(HvacReport {
        id: row.get(0)?,
        year: row.get(1)?,
        month: row.get(2)?,
        total_runtime_hours: row.get(3)?,
        avg_cycle_minutes: row.get(4)?,
        avg_outdoor_temp: row.get(5)?,
        avg_indoor_temp: row.get(6)?,
        avg_setpoint: row.get(7)?,
        notes: row.get(8)?,
    })
}

// Gauge reading operations
impl Store {
    /// Insert a reading and return it with its assigned ID.
    pub fn insert_reading(&self, reading: &NewGaugeReading) -> Result<GaugeReading> {
        self.conn.execute(
            "INSERT INTO gauge_readings (date, gauge_percent, notes) VALUES (?1, ?2, ?3)",
            rusqlite::params![format_date(reading.date), reading.gauge_percent, reading.notes],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted gauge reading {} for {}", id, reading.date);

        self.get_reading(id)?
            .ok_or_else(|| Error::not_found("reading", id))
    }

    pub fn get_reading(&self, id: i64) -> Result<Option<GaugeReading>> {
        let reading = self
            .conn
            .query_row(
                &format!("SELECT {READING_COLUMNS} FROM gauge_readings WHERE id = ?"),
                [id],
                reading_from_row,
            )
            .optional()?;
        Ok(reading)
    }

    /// All readings, newest first. Same-day readings are ordered by insertion.
    pub fn list_readings(&self) -> Result<Vec<GaugeReading>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {READING_COLUMNS} FROM gauge_readings ORDER BY date DESC, id DESC"
        ))?;
        let readings = stmt
            .query_map([], reading_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(readings)
    }

    /// Replace a reading's fields. Returns `None` if the ID does not exist.
    pub fn update_reading(
        &self,
        id: i64,
        reading: &NewGaugeReading,
    ) -> Result<Option<GaugeReading>> {
        let changed = self.conn.execute(
            "UPDATE gauge_readings SET date = ?2, gauge_percent = ?3, notes = ?4 WHERE id = ?1",
            rusqlite::params![
                id,
                format_date(reading.date),
                reading.gauge_percent,
                reading.notes
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_reading(id)
    }

    /// Delete a reading. Returns whether a row was removed.
    pub fn delete_reading(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM gauge_readings WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// Most recent reading by date, then by insertion order.
    pub fn latest_reading(&self) -> Result<Option<GaugeReading>> {
        let reading = self
            .conn
            .query_row(
                &format!(
                    "SELECT {READING_COLUMNS} FROM gauge_readings \
                     ORDER BY date DESC, id DESC LIMIT 1"
                ),
                [],
                reading_from_row,
            )
            .optional()?;
        Ok(reading)
    }
}

// Fuel fill operations
impl Store {
    /// Insert a priced fill and return it with its assigned ID.
    pub fn insert_fill(&self, fill: &NewFuelFill) -> Result<FuelFill> {
        self.conn.execute(
            "INSERT INTO fuel_fills (date, gauge_percent_before, liters_added, liters_before_fill,
                price_per_liter, discount, gst, total_cost, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                format_date(fill.date),
                fill.gauge_percent_before,
                fill.liters_added,
                fill.liters_before_fill,
                fill.price_per_liter,
                fill.discount,
                fill.gst,
                fill.total_cost,
                fill.notes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(
            "Recorded fill {} on {}: {:.1} L",
            id, fill.date, fill.liters_added
        );

        self.get_fill(id)?.ok_or_else(|| Error::not_found("fill", id))
    }

    pub fn get_fill(&self, id: i64) -> Result<Option<FuelFill>> {
        let fill = self
            .conn
            .query_row(
                &format!("SELECT {FILL_COLUMNS} FROM fuel_fills WHERE id = ?"),
                [id],
                fill_from_row,
            )
            .optional()?;
        Ok(fill)
    }

    /// All fills, newest first.
    pub fn list_fills(&self) -> Result<Vec<FuelFill>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILL_COLUMNS} FROM fuel_fills ORDER BY date DESC, id DESC"
        ))?;
        let fills = stmt
            .query_map([], fill_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(fills)
    }

    /// Replace a fill's fields. Returns `None` if the ID does not exist.
    pub fn update_fill(&self, id: i64, fill: &NewFuelFill) -> Result<Option<FuelFill>> {
        let changed = self.conn.execute(
            "UPDATE fuel_fills SET date = ?2, gauge_percent_before = ?3, liters_added = ?4,
                liters_before_fill = ?5, price_per_liter = ?6, discount = ?7, gst = ?8,
                total_cost = ?9, notes = ?10
             WHERE id = ?1",
            rusqlite::params![
                id,
                format_date(fill.date),
                fill.gauge_percent_before,
                fill.liters_added,
                fill.liters_before_fill,
                fill.price_per_liter,
                fill.discount,
                fill.gst,
                fill.total_cost,
                fill.notes,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_fill(id)
    }

    /// Delete a fill. Returns whether a row was removed.
    pub fn delete_fill(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM fuel_fills WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// Most recent fill by date, then by insertion order.
    pub fn latest_fill(&self) -> Result<Option<FuelFill>> {
        let fill = self
            .conn
            .query_row(
                &format!(
                    "SELECT {FILL_COLUMNS} FROM fuel_fills ORDER BY date DESC, id DESC LIMIT 1"
                ),
                [],
                fill_from_row,
            )
            .optional()?;
        Ok(fill)
    }

    /// Fills dated strictly after `date`, oldest first.
    pub fn fills_after(&self, date: Date) -> Result<Vec<FuelFill>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILL_COLUMNS} FROM fuel_fills WHERE date > ? ORDER BY date ASC, id ASC"
        ))?;
        let fills = stmt
            .query_map([format_date(date)], fill_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(fills)
    }

    /// Fills dated within `from..=to`, oldest first.
    pub fn fills_between(&self, from: Date, to: Date) -> Result<Vec<FuelFill>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILL_COLUMNS} FROM fuel_fills WHERE date >= ?1 AND date <= ?2 \
             ORDER BY date ASC, id ASC"
        ))?;
        let fills = stmt
            .query_map([format_date(from), format_date(to)], fill_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(fills)
    }

    /// Liters delivered within `from..=to`. `None` when there were no fills.
    pub fn fill_liters_between(&self, from: Date, to: Date) -> Result<Option<f64>> {
        let liters = self.conn.query_row(
            "SELECT SUM(liters_added) FROM fuel_fills WHERE date >= ?1 AND date <= ?2",
            [format_date(from), format_date(to)],
            |row| row.get(0),
        )?;
        Ok(liters)
    }
}

// Weather operations
impl Store {
    /// Insert or replace the record for `day.date`. The last write wins.
    pub fn upsert_weather(&self, day: &NewWeatherDay) -> Result<WeatherDay> {
        self.conn.execute(
            "INSERT INTO weather_data (date, max_temp, min_temp, mean_temp, hdd, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(date) DO UPDATE SET
                max_temp = excluded.max_temp,
                min_temp = excluded.min_temp,
                mean_temp = excluded.mean_temp,
                hdd = excluded.hdd,
                source = excluded.source",
            rusqlite::params![
                format_date(day.date),
                day.max_temp,
                day.min_temp,
                day.mean_temp,
                day.hdd,
                day.source.as_str(),
            ],
        )?;
        debug!("Stored weather for {} ({})", day.date, day.source);

        self.get_weather(day.date)?
            .ok_or_else(|| Error::not_found("weather", day.date))
    }

    pub fn get_weather(&self, date: Date) -> Result<Option<WeatherDay>> {
        let day = self
            .conn
            .query_row(
                &format!("SELECT {WEATHER_COLUMNS} FROM weather_data WHERE date = ?"),
                [format_date(date)],
                weather_from_row,
            )
            .optional()?;
        Ok(day)
    }

    /// Query weather records with filters.
    pub fn query_weather(&self, query: &WeatherQuery) -> Result<Vec<WeatherDay>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let days = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), weather_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(days)
    }

    /// Delete the record for `date`. Returns whether a row was removed.
    pub fn delete_weather(&self, date: Date) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM weather_data WHERE date = ?", [format_date(date)])?;
        Ok(changed > 0)
    }

    /// Date of the newest stored weather record.
    pub fn latest_weather_date(&self) -> Result<Option<Date>> {
        let text: Option<String> =
            self.conn
                .query_row("SELECT MAX(date) FROM weather_data", [], |row| row.get(0))?;
        Ok(text.as_deref().map(parse_date).transpose()?)
    }

    /// HDD over the half-open `range`. Days with no HDD value are ignored.
    pub fn hdd_summary(&self, range: DateRange) -> Result<HddSummary> {
        let (total_hdd, avg_hdd, days): (Option<f64>, Option<f64>, i64) = self.conn.query_row(
            "SELECT SUM(hdd), AVG(hdd), COUNT(hdd) FROM weather_data
             WHERE date > ?1 AND date <= ?2",
            [format_date(range.after), format_date(range.through)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(HddSummary {
            total_hdd,
            avg_hdd,
            days: u32::try_from(days).unwrap_or(u32::MAX),
        })
    }

    /// HDD over `from..=to`. `None` when no day in the window has a value.
    pub fn hdd_between(&self, from: Date, to: Date) -> Result<Option<f64>> {
        let total = self.conn.query_row(
            "SELECT SUM(hdd) FROM weather_data WHERE date >= ?1 AND date <= ?2",
            [format_date(from), format_date(to)],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// HDD over every stored day.
    pub fn total_hdd(&self) -> Result<Option<f64>> {
        let total = self
            .conn
            .query_row("SELECT SUM(hdd) FROM weather_data", [], |row| row.get(0))?;
        Ok(total)
    }
}

// HVAC report operations
impl Store {
    /// Insert or replace the report for `(year, month)`.
    pub fn upsert_hvac_report(&self, report: &NewHvacReport) -> Result<HvacReport> {
        self.conn.execute(
            "INSERT INTO hvac_reports (year, month, total_runtime_hours, avg_cycle_minutes,
                avg_outdoor_temp, avg_indoor_temp, avg_setpoint, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(year, month) DO UPDATE SET
                total_runtime_hours = excluded.total_runtime_hours,
                avg_cycle_minutes = excluded.avg_cycle_minutes,
                avg_outdoor_temp = excluded.avg_outdoor_temp,
                avg_indoor_temp = excluded.avg_indoor_temp,
                avg_setpoint = excluded.avg_setpoint,
                notes = excluded.notes",
            rusqlite::params![
                report.year,
                report.month,
                report.total_runtime_hours,
                report.avg_cycle_minutes,
                report.avg_outdoor_temp,
                report.avg_indoor_temp,
                report.avg_setpoint,
                report.notes,
            ],
        )?;

        self.get_hvac_report(report.year, report.month)?
            .ok_or_else(|| Error::not_found("hvac report", format!("{}-{:02}", report.year, report.month)))
    }

    pub fn get_hvac_report(&self, year: i32, month: u8) -> Result<Option<HvacReport>> {
        let report = self
            .conn
            .query_row(
                &format!("SELECT {HVAC_COLUMNS} FROM hvac_reports WHERE year = ?1 AND month = ?2"),
                rusqlite::params![year, month],
                hvac_from_row,
            )
            .optional()?;
        Ok(report)
    }

    /// All reports, newest month first.
    pub fn list_hvac_reports(&self) -> Result<Vec<HvacReport>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HVAC_COLUMNS} FROM hvac_reports ORDER BY year DESC, month DESC"
        ))?;
        let reports = stmt
            .query_map([], hvac_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// Delete the report for `(year, month)`. Returns whether a row was removed.
    pub fn delete_hvac_report(&self, year: i32, month: u8) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM hvac_reports WHERE year = ?1 AND month = ?2",
            rusqlite::params![year, month],
        )?;
        Ok(changed > 0)
    }
}

// Settings operations
impl Store {
    /// Insert each pair unless the key already has a value.
    pub fn seed_settings<K, V>(&self, defaults: &[(K, V)]) -> Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in defaults {
            self.conn.execute(
                "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
                [key.as_ref(), value.as_ref()],
            )?;
        }
        Ok(())
    }

    pub fn settings(&self) -> Result<SettingsSnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let snapshot = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<SettingsSnapshot, _>>()?;
        Ok(snapshot)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let setting = self
            .conn
            .query_row(
                "SELECT key, value FROM settings WHERE key = ?",
                [key],
                |row| {
                    Ok(Setting {
                        key: row.get(0)?,
                        value: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(setting)
    }

    /// Create or overwrite a setting.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<Setting> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        info!("Setting {} = {}", key, value);
        Ok(Setting {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

impl FuelHistory for Store {
    type Error = Error;

    fn latest_reading(&self) -> Result<Option<GaugeReading>> {
        Store::latest_reading(self)
    }

    fn latest_fill(&self) -> Result<Option<FuelFill>> {
        Store::latest_fill(self)
    }

    fn fills_after(&self, date: Date) -> Result<Vec<FuelFill>> {
        Store::fills_after(self, date)
    }

    fn hdd_summary(&self, range: DateRange) -> Result<HddSummary> {
        Store::hdd_summary(self, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueltrack_types::WeatherSource;
    use time::macros::date;

    fn new_reading(date: Date, gauge_percent: f64) -> NewGaugeReading {
        NewGaugeReading {
            date,
            gauge_percent,
            notes: None,
        }
    }

    fn new_fill(date: Date, liters_added: f64) -> NewFuelFill {
        NewFuelFill {
            date,
            gauge_percent_before: 20.0,
            liters_added,
            liters_before_fill: 200.0,
            price_per_liter: 1.5,
            discount: 0.0,
            gst: 0.0,
            total_cost: liters_added * 1.5,
            notes: None,
        }
    }

    fn new_weather(date: Date, hdd: Option<f64>) -> NewWeatherDay {
        NewWeatherDay {
            date,
            max_temp: None,
            min_temp: None,
            mean_temp: None,
            hdd,
            source: WeatherSource::Manual,
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.list_readings().unwrap().is_empty());
        assert!(store.list_fills().unwrap().is_empty());
        assert!(store.latest_weather_date().unwrap().is_none());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fuel.db");

        {
            let store = Store::open(&path).unwrap();
            store
                .insert_reading(&new_reading(date!(2025 - 01 - 10), 55.0))
                .unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.list_readings().unwrap().len(), 1);
    }

    #[test]
    fn test_reading_crud() {
        let store = Store::open_in_memory().unwrap();

        let reading = store
            .insert_reading(&NewGaugeReading {
                date: date!(2025 - 01 - 10),
                gauge_percent: 55.0,
                notes: Some("after storm".into()),
            })
            .unwrap();
        assert_eq!(reading.gauge_percent, 55.0);
        assert_eq!(store.get_reading(reading.id).unwrap(), Some(reading.clone()));

        let updated = store
            .update_reading(reading.id, &new_reading(date!(2025 - 01 - 11), 52.5))
            .unwrap()
            .unwrap();
        assert_eq!(updated.date, date!(2025 - 01 - 11));
        assert_eq!(updated.notes, None);

        assert!(store.update_reading(999, &new_reading(date!(2025 - 01 - 11), 1.0)).unwrap().is_none());
        assert!(store.delete_reading(reading.id).unwrap());
        assert!(!store.delete_reading(reading.id).unwrap());
    }

    #[test]
    fn test_latest_reading_tie_breaks_by_insertion() {
        let store = Store::open_in_memory().unwrap();
        store.insert_reading(&new_reading(date!(2025 - 01 - 10), 60.0)).unwrap();
        store.insert_reading(&new_reading(date!(2025 - 01 - 12), 50.0)).unwrap();
        let second = store
            .insert_reading(&new_reading(date!(2025 - 01 - 12), 48.0))
            .unwrap();
        store.insert_reading(&new_reading(date!(2025 - 01 - 08), 70.0)).unwrap();

        assert_eq!(store.latest_reading().unwrap(), Some(second));

        let dates: Vec<_> = store
            .list_readings()
            .unwrap()
            .iter()
            .map(|r| r.gauge_percent)
            .collect();
        assert_eq!(dates, vec![48.0, 50.0, 60.0, 70.0]);
    }

    #[test]
    fn test_fill_queries() {
        let store = Store::open_in_memory().unwrap();
        store.insert_fill(&new_fill(date!(2024 - 12 - 01), 800.0)).unwrap();
        store.insert_fill(&new_fill(date!(2025 - 01 - 15), 700.0)).unwrap();
        let last = store.insert_fill(&new_fill(date!(2025 - 02 - 01), 600.0)).unwrap();

        assert_eq!(store.latest_fill().unwrap(), Some(last));

        let after: Vec<_> = store
            .fills_after(date!(2025 - 01 - 15))
            .unwrap()
            .iter()
            .map(|f| f.liters_added)
            .collect();
        assert_eq!(after, vec![600.0]);

        let between = store
            .fills_between(date!(2025 - 01 - 15), date!(2025 - 02 - 01))
            .unwrap();
        assert_eq!(between.len(), 2);
        assert_eq!(between[0].liters_added, 700.0);

        assert_eq!(
            store
                .fill_liters_between(date!(2024 - 12 - 01), date!(2025 - 01 - 31))
                .unwrap(),
            Some(1500.0)
        );
        assert_eq!(
            store
                .fill_liters_between(date!(2023 - 01 - 01), date!(2023 - 12 - 31))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_fill_update_and_delete() {
        let store = Store::open_in_memory().unwrap();
        let fill = store.insert_fill(&new_fill(date!(2025 - 01 - 15), 700.0)).unwrap();

        let mut changed = new_fill(date!(2025 - 01 - 16), 710.0);
        changed.notes = Some("corrected".into());
        let updated = store.update_fill(fill.id, &changed).unwrap().unwrap();
        assert_eq!(updated.liters_added, 710.0);
        assert_eq!(updated.notes.as_deref(), Some("corrected"));

        assert!(store.delete_fill(fill.id).unwrap());
        assert!(store.get_fill(fill.id).unwrap().is_none());
        assert!(store.update_fill(fill.id, &changed).unwrap().is_none());
    }

    #[test]
    fn test_weather_upsert_last_write_wins() {
        let store = Store::open_in_memory().unwrap();
        let first = store
            .upsert_weather(&new_weather(date!(2025 - 01 - 05), Some(30.0)))
            .unwrap();

        let mut replacement = new_weather(date!(2025 - 01 - 05), Some(35.5));
        replacement.source = WeatherSource::Auto;
        let second = store.upsert_weather(&replacement).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.hdd, Some(35.5));
        assert_eq!(second.source, WeatherSource::Auto);
        assert_eq!(store.query_weather(&WeatherQuery::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_weather_query_and_delete() {
        let store = Store::open_in_memory().unwrap();
        for day in 1..=5u8 {
            let date = Date::from_calendar_date(2025, time::Month::January, day).unwrap();
            store.upsert_weather(&new_weather(date, Some(20.0 + day as f64))).unwrap();
        }

        let query = WeatherQuery::new()
            .from(date!(2025 - 01 - 02))
            .to(date!(2025 - 01 - 04))
            .oldest_first();
        let days: Vec<_> = store
            .query_weather(&query)
            .unwrap()
            .iter()
            .map(|d| d.date)
            .collect();
        assert_eq!(
            days,
            vec![date!(2025 - 01 - 02), date!(2025 - 01 - 03), date!(2025 - 01 - 04)]
        );

        assert_eq!(store.latest_weather_date().unwrap(), Some(date!(2025 - 01 - 05)));
        assert!(store.delete_weather(date!(2025 - 01 - 05)).unwrap());
        assert!(!store.delete_weather(date!(2025 - 01 - 05)).unwrap());
        assert_eq!(store.latest_weather_date().unwrap(), Some(date!(2025 - 01 - 04)));
    }

    #[test]
    fn test_hdd_summary_is_half_open() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_weather(&new_weather(date!(2025 - 01 - 01), Some(10.0))).unwrap();
        store.upsert_weather(&new_weather(date!(2025 - 01 - 02), Some(20.0))).unwrap();
        store.upsert_weather(&new_weather(date!(2025 - 01 - 03), None)).unwrap();
        store.upsert_weather(&new_weather(date!(2025 - 01 - 04), Some(40.0))).unwrap();

        let summary = store
            .hdd_summary(DateRange::new(date!(2025 - 01 - 01), date!(2025 - 01 - 04)))
            .unwrap();
        assert_eq!(summary.total_hdd, Some(60.0));
        assert_eq!(summary.avg_hdd, Some(30.0));
        assert_eq!(summary.days, 2);

        let empty = store
            .hdd_summary(DateRange::new(date!(2025 - 01 - 04), date!(2025 - 01 - 04)))
            .unwrap();
        assert_eq!(empty.total_hdd, None);
        assert_eq!(empty.days, 0);

        assert_eq!(
            store
                .hdd_between(date!(2025 - 01 - 01), date!(2025 - 01 - 02))
                .unwrap(),
            Some(30.0)
        );
        assert_eq!(store.total_hdd().unwrap(), Some(70.0));
    }

    #[test]
    fn test_hvac_reports() {
        let store = Store::open_in_memory().unwrap();
        let report = NewHvacReport {
            year: 2025,
            month: 1,
            total_runtime_hours: 210.0,
            avg_cycle_minutes: Some(14.5),
            avg_outdoor_temp: Some(-24.0),
            avg_indoor_temp: None,
            avg_setpoint: Some(21.0),
            notes: None,
        };
        let stored = store.upsert_hvac_report(&report).unwrap();
        assert_eq!(stored.month, 1);

        let replaced = store
            .upsert_hvac_report(&NewHvacReport {
                total_runtime_hours: 220.0,
                ..report.clone()
            })
            .unwrap();
        assert_eq!(replaced.id, stored.id);
        assert_eq!(replaced.total_runtime_hours, 220.0);

        store
            .upsert_hvac_report(&NewHvacReport {
                month: 2,
                ..report.clone()
            })
            .unwrap();
        let months: Vec<_> = store
            .list_hvac_reports()
            .unwrap()
            .iter()
            .map(|r| r.month)
            .collect();
        assert_eq!(months, vec![2, 1]);

        assert!(store.delete_hvac_report(2025, 2).unwrap());
        assert!(store.get_hvac_report(2025, 2).unwrap().is_none());
    }

    #[test]
    fn test_settings_seed_does_not_overwrite() {
        let store = Store::open_in_memory().unwrap();
        store.set_setting("tank_capacity", "1100").unwrap();
        store
            .seed_settings(&[("tank_capacity", "1000"), ("gst_rate", "0.05")])
            .unwrap();

        let snapshot = store.settings().unwrap();
        assert_eq!(snapshot.get("tank_capacity"), Some("1100"));
        assert_eq!(snapshot.get("gst_rate"), Some("0.05"));

        assert_eq!(
            store.get_setting("gst_rate").unwrap().map(|s| s.value),
            Some("0.05".to_string())
        );
        assert!(store.get_setting("missing").unwrap().is_none());
    }

    #[test]
    fn test_store_as_fuel_history() {
        fn latest<H: FuelHistory>(history: &H) -> Option<GaugeReading> {
            history.latest_reading().ok().flatten()
        }

        let store = Store::open_in_memory().unwrap();
        let reading = store
            .insert_reading(&new_reading(date!(2025 - 01 - 10), 55.0))
            .unwrap();
        assert_eq!(latest(&store), Some(reading));
    }
}
