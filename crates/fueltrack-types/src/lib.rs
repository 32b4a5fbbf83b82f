//! Shared types for heating-oil tracking.
//!
//! This crate holds the entities recorded by the fuel tracker (gauge
//! readings, fills, daily weather, HVAC reports), calendar-date helpers and
//! the [`FuelHistory`] trait through which estimators query recorded data.
//!
//! # Features
//!
//! - `serde` (default): serialization of all entities, with dates as
//!   `YYYY-MM-DD` strings
//!
//! # Example
//!
//! ```
//! use fueltrack_types::{DateRange, WeatherSource, parse_date};
//!
//! let after = parse_date("2025-01-01").unwrap();
//! let through = parse_date("2025-01-31").unwrap();
//! let range = DateRange::new(after, through);
//! assert_eq!(range.days(), 30);
//! assert_eq!("auto".parse::<WeatherSource>().unwrap(), WeatherSource::Auto);
//! ```

pub mod date;
pub mod error;
pub mod history;
pub mod types;

pub use date::{DateRange, add_days, days_between, format_date, parse_date};
pub use error::{ParseError, ParseResult};
pub use history::{FuelHistory, HddSummary};
pub use types::{
    FuelFill, GaugeReading, HvacReport, NewFuelFill, NewGaugeReading, NewHvacReport,
    NewWeatherDay, Setting, WeatherDay, WeatherSource, setting,
};

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_weather_source_roundtrip_labels() {
        for source in [
            WeatherSource::Manual,
            WeatherSource::Imported,
            WeatherSource::Auto,
        ] {
            assert_eq!(source.as_str().parse::<WeatherSource>().unwrap(), source);
        }
        assert_eq!("AUTO".parse::<WeatherSource>().unwrap(), WeatherSource::Auto);
    }

    #[test]
    fn test_weather_source_unknown() {
        let err = "satellite".parse::<WeatherSource>().unwrap_err();
        assert_eq!(err, ParseError::UnknownWeatherSource("satellite".into()));
        assert!(err.to_string().contains("satellite"));
    }

    #[test]
    fn test_setting_as_f64() {
        let setting = Setting {
            key: setting::TANK_CAPACITY.into(),
            value: " 1100 ".into(),
        };
        assert_eq!(setting.as_f64().unwrap(), 1100.0);

        let bad = Setting {
            key: setting::GST_RATE.into(),
            value: "five percent".into(),
        };
        assert!(matches!(
            bad.as_f64(),
            Err(ParseError::InvalidSetting { .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_reading_serializes_date_as_iso_string() {
        let reading = GaugeReading {
            id: 7,
            date: date!(2025 - 01 - 15),
            gauge_percent: 62.5,
            notes: None,
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["date"], "2025-01-15");
        assert_eq!(json["gauge_percent"], 62.5);

        let back: GaugeReading = serde_json::from_value(json).unwrap();
        assert_eq!(back, reading);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_new_reading_notes_optional() {
        let input: NewGaugeReading =
            serde_json::from_str(r#"{"date":"2025-02-01","gauge_percent":40}"#).unwrap();
        assert_eq!(input.date, date!(2025 - 02 - 01));
        assert_eq!(input.notes, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_weather_source_serde_lowercase() {
        let json = serde_json::to_string(&WeatherSource::Imported).unwrap();
        assert_eq!(json, "\"imported\"");
    }
}
