//! Database schema.
//!
//! The schema version lives in SQLite's `user_version` pragma. Each entry of
//! [`MIGRATIONS`] upgrades the database by one version and runs inside a
//! transaction together with the version bump.
//!
//! Dates are `YYYY-MM-DD` text, so range comparisons on them are plain
//! string comparisons.

use rusqlite::Connection;

use crate::error::Result;

/// Ordered upgrade scripts. Index `n` moves a database from version `n` to
/// `n + 1`.
const MIGRATIONS: &[&str] = &[V1];

/// Version a fully migrated database reports.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

const V1: &str = r#"
        CREATE TABLE fuel_fills (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            gauge_percent_before REAL NOT NULL,
            liters_added REAL NOT NULL,
            liters_before_fill REAL NOT NULL,
            price_per_liter REAL NOT NULL,
            discount REAL NOT NULL DEFAULT 0,
            gst REAL NOT NULL DEFAULT 0,
            total_cost REAL NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX idx_fuel_fills_date ON fuel_fills(date);

        CREATE TABLE gauge_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            gauge_percent REAL NOT NULL,
            notes TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX idx_gauge_readings_date ON gauge_readings(date);

        CREATE TABLE weather_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT UNIQUE NOT NULL,
            max_temp REAL,
            min_temp REAL,
            mean_temp REAL,
            hdd REAL,
            source TEXT NOT NULL DEFAULT 'manual',
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE hvac_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
            total_runtime_hours REAL NOT NULL,
            avg_cycle_minutes REAL,
            avg_outdoor_temp REAL,
            avg_indoor_temp REAL,
            avg_setpoint REAL,
            notes TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(year, month)
        );
        "#;

/// Bring the database up to [`SCHEMA_VERSION`].
pub fn initialize(conn: &mut Connection) -> Result<()> {
    let current = user_version(conn)?;
    for (from, script) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let tx = conn.transaction()?;
        tx.execute_batch(script)?;
        tx.pragma_update(None, "user_version", from as u32 + 1)?;
        tx.commit()?;
        tracing::debug!("Migrated database schema to version {}", from + 1);
    }
    Ok(())
}

fn user_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
