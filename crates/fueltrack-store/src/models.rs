//! Aggregate views over stored data.

use std::collections::BTreeMap;

use serde::Serialize;

use fueltrack_types::{ParseError, Setting};

/// All settings as read at one point in time.
///
/// Settings are re-read on every request, so this is a snapshot rather
/// than a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SettingsSnapshot(BTreeMap<String, String>);

impl SettingsSnapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Numeric value of `key`, or `default` when the key is absent.
    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, ParseError> {
        match self.0.get(key) {
            Some(value) => Setting {
                key: key.to_string(),
                value: value.clone(),
            }
            .as_f64(),
            None => Ok(default),
        }
    }

    pub fn into_settings(self) -> Vec<Setting> {
        self.0
            .into_iter()
            .map(|(key, value)| Setting { key, value })
            .collect()
    }
}

impl FromIterator<(String, String)> for SettingsSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_or() {
        let snapshot: SettingsSnapshot = [
            ("tank_capacity".to_string(), "1100".to_string()),
            ("gst_rate".to_string(), "abc".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.f64_or("tank_capacity", 1000.0).unwrap(), 1100.0);
        assert_eq!(snapshot.f64_or("discount_per_liter", 0.02).unwrap(), 0.02);
        assert!(snapshot.f64_or("gst_rate", 0.05).is_err());
        assert_eq!(snapshot.get("tank_capacity"), Some("1100"));
    }
}
