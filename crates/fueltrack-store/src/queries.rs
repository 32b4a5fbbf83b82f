//! Query builder for weather records.
//!
//! # Example
//!
//! ```
//! use fueltrack_store::{Store, WeatherQuery};
//! use time::macros::date;
//!
//! let store = Store::open_in_memory()?;
//!
//! let january = WeatherQuery::new()
//!     .from(date!(2025 - 01 - 01))
//!     .to(date!(2025 - 01 - 31))
//!     .oldest_first();
//! let days = store.query_weather(&january)?;
//! assert!(days.is_empty());
//! # Ok::<(), fueltrack_store::Error>(())
//! ```

use time::Date;

use fueltrack_types::format_date;

/// Fluent query builder for [`Store::query_weather`](crate::Store::query_weather).
///
/// Both bounds are inclusive. By default results are newest first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    /// Earliest date to include.
    pub from: Option<Date>,
    /// Latest date to include.
    pub to: Option<Date>,
    /// Order by date descending.
    pub newest_first: bool,
}

impl WeatherQuery {
    /// All records, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Include days on or after `date`.
    #[must_use]
    pub fn from(mut self, date: Date) -> Self {
        self.from = Some(date);
        self
    }

    /// Include days on or before `date`.
    #[must_use]
    pub fn to(mut self, date: Date) -> Self {
        self.to = Some(date);
        self
    }

    /// Set both bounds from optional values.
    #[must_use]
    pub fn between(mut self, from: Option<Date>, to: Option<Date>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Chronological order.
    #[must_use]
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    pub(crate) fn build_where(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(from) = self.from {
            conditions.push("date >= ?");
            params.push(format_date(from));
        }
        if let Some(to) = self.to {
            conditions.push("date <= ?");
            params.push(format_date(to));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (where_clause, params)
    }

    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };
        format!(
            "SELECT id, date, max_temp, min_temp, mean_temp, hdd, source \
             FROM weather_data {} ORDER BY date {}",
            where_clause, order
        )
    }
}
