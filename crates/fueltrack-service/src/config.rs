//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fueltrack_core::calc::{
    DEFAULT_DISCOUNT_PER_LITER, DEFAULT_EFFICIENCY, DEFAULT_GST_RATE, DEFAULT_HDD_BASE_TEMP,
    DEFAULT_TANK_CAPACITY,
};
use fueltrack_core::predict::REFILL_THRESHOLD_PERCENT;
use fueltrack_core::{DatamartConfig, ForecastConfig, StationMatcher};
use fueltrack_types::setting;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub tank: TankConfig,
    pub pricing: PricingConfig,
    pub weather: WeatherConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Read `~/.config/fueltrack/server.toml`, or use defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        match path.try_exists() {
            Ok(true) => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse a TOML file. Missing sections and keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(ConfigError::io("read", path))?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(ConfigError::io("create", dir))?;
        }
        std::fs::write(path, text).map_err(ConfigError::io("write", path))
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use fueltrack_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.tank.validate());
        errors.extend(self.pricing.validate());
        errors.extend(self.weather.validate());
        errors.extend(self.sync.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// [`load`](Self::load) followed by [`validate`](Self::validate).
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Values written to the settings table on first start.
    ///
    /// Existing rows are never overwritten, so edits made through the API
    /// survive a restart.
    pub fn setting_defaults(&self) -> Vec<(&'static str, String)> {
        vec![
            (setting::TANK_CAPACITY, self.tank.capacity_liters.to_string()),
            (
                setting::DISCOUNT_PER_LITER,
                self.pricing.discount_per_liter.to_string(),
            ),
            (setting::GST_RATE, self.pricing.gst_rate.to_string()),
            (setting::THERMOSTAT_TEMP, "22".to_string()),
            (setting::STATION_ID, self.weather.station_id.clone()),
        ]
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3001").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
                Ok(_) => {}
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: fueltrack_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }
        errors
    }
}

/// Tank geometry and projection defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TankConfig {
    /// Seeds the `tank_capacity` setting.
    pub capacity_liters: f64,
    pub refill_threshold_percent: f64,
    /// L/HDD used when no measurement exists.
    pub default_efficiency: f64,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            capacity_liters: DEFAULT_TANK_CAPACITY,
            refill_threshold_percent: REFILL_THRESHOLD_PERCENT,
            default_efficiency: DEFAULT_EFFICIENCY,
        }
    }
}

impl TankConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !(self.capacity_liters > 0.0) {
            errors.push(ValidationError::new(
                "tank.capacity_liters",
                format!("capacity {} must be positive", self.capacity_liters),
            ));
        }
        if !(0.0..100.0).contains(&self.refill_threshold_percent) {
            errors.push(ValidationError::new(
                "tank.refill_threshold_percent",
                format!(
                    "threshold {} must be in [0, 100)",
                    self.refill_threshold_percent
                ),
            ));
        }
        if !(self.default_efficiency > 0.0) {
            errors.push(ValidationError::new(
                "tank.default_efficiency",
                format!("efficiency {} must be positive", self.default_efficiency),
            ));
        }
        errors
    }
}

/// Pricing defaults for new fills.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Dollars off per liter.
    pub discount_per_liter: f64,
    /// Fraction, 0.05 = 5%.
    pub gst_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            discount_per_liter: DEFAULT_DISCOUNT_PER_LITER,
            gst_rate: DEFAULT_GST_RATE,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !(self.discount_per_liter >= 0.0) {
            errors.push(ValidationError::new(
                "pricing.discount_per_liter",
                "discount cannot be negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.gst_rate) {
            errors.push(ValidationError::new(
                "pricing.gst_rate",
                format!("rate {} must be a fraction between 0 and 1", self.gst_rate),
            ));
        }
        errors
    }
}

/// Weather sources and the local calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub hdd_base_temp: f64,
    pub station_id: String,
    pub alternate_station_ids: Vec<String>,
    /// Matched case-insensitively against station names when IDs are absent.
    pub station_name: String,
    pub province: String,
    pub datamart_url: String,
    pub forecast_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub location_name: String,
    /// Defines "today" for all projections.
    pub utc_offset_hours: i8,
    pub request_timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        let forecast = ForecastConfig::default();
        let datamart = DatamartConfig::default();
        let mut station_ids = datamart.station.ids.into_iter();
        Self {
            hdd_base_temp: DEFAULT_HDD_BASE_TEMP,
            station_id: station_ids.next().unwrap_or_default(),
            alternate_station_ids: station_ids.collect(),
            station_name: datamart.station.name_fragment.unwrap_or_default(),
            province: datamart.province,
            datamart_url: datamart.base_url,
            forecast_url: forecast.url,
            latitude: forecast.latitude,
            longitude: forecast.longitude,
            timezone: forecast.timezone,
            location_name: forecast.location_name,
            utc_offset_hours: -7,
            request_timeout_secs: 15,
        }
    }
}

impl WeatherConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.station_id.trim().is_empty() && self.station_name.trim().is_empty() {
            errors.push(ValidationError::new(
                "weather.station_id",
                "either a station id or a station name is required",
            ));
        }
        if self.province.len() != 2 {
            errors.push(ValidationError::new(
                "weather.province",
                format!("'{}' is not a two-letter province code", self.province),
            ));
        }
        for (field, url) in [
            ("weather.datamart_url", &self.datamart_url),
            ("weather.forecast_url", &self.forecast_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError::new(
                    field,
                    format!("'{}' must be an http(s) URL", url),
                ));
            }
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            errors.push(ValidationError::new(
                "weather.latitude",
                "latitude must be within -90..=90",
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errors.push(ValidationError::new(
                "weather.longitude",
                "longitude must be within -180..=180",
            ));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            errors.push(ValidationError::new(
                "weather.utc_offset_hours",
                format!("offset {} is outside -12..=14", self.utc_offset_hours),
            ));
        }
        if self.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "weather.request_timeout_secs",
                "timeout must be at least 1 second",
            ));
        }
        errors
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            url: self.forecast_url.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            timezone: self.timezone.clone(),
            location_name: self.location_name.clone(),
            base_temp: self.hdd_base_temp,
            timeout: self.timeout(),
            ..ForecastConfig::default()
        }
    }

    pub fn datamart_config(&self) -> DatamartConfig {
        let ids = std::iter::once(&self.station_id)
            .chain(&self.alternate_station_ids)
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .collect();
        let name_fragment = Some(self.station_name.trim().to_lowercase()).filter(|n| !n.is_empty());

        DatamartConfig {
            base_url: self.datamart_url.clone(),
            province: self.province.clone(),
            station: StationMatcher { ids, name_fragment },
            base_temp: self.hdd_base_temp,
            timeout: self.timeout(),
        }
    }
}

/// Minimum sync interval in seconds (1 minute).
pub const MIN_SYNC_INTERVAL: u64 = 60;
/// Maximum sync interval in seconds (1 day).
pub const MAX_SYNC_INTERVAL: u64 = 86_400;

/// Background weather sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Days fetched when the database holds no weather at all.
    pub initial_backfill_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            initial_backfill_days: 30,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.interval_secs < MIN_SYNC_INTERVAL {
            errors.push(ValidationError::new(
                "sync.interval_secs",
                format!(
                    "interval {} is too short (minimum {} seconds)",
                    self.interval_secs, MIN_SYNC_INTERVAL
                ),
            ));
        } else if self.interval_secs > MAX_SYNC_INTERVAL {
            errors.push(ValidationError::new(
                "sync.interval_secs",
                format!(
                    "interval {} is too long (maximum {} seconds / 1 day)",
                    self.interval_secs, MAX_SYNC_INTERVAL
                ),
            ));
        }
        if self.initial_backfill_days == 0 || self.initial_backfill_days > 366 {
            errors.push(ValidationError::new(
                "sync.initial_backfill_days",
                "backfill must be between 1 and 366 days",
            ));
        }
        errors
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Cannot encode configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{} configuration problem(s):\n{}", .0.len(), bullet_list(.0))]
    Validation(Vec<ValidationError>),
}

impl ConfigError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| ConfigError::Io {
            action,
            path,
            source,
        }
    }
}

/// One rejected configuration value.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Dotted key, e.g. `tank.capacity_liters`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn bullet_list(errors: &[ValidationError]) -> String {
    let mut out = String::new();
    for error in errors {
        out.push_str("  - ");
        out.push_str(&error.to_string());
        out.push('\n');
    }
    out.pop();
    out
}

/// `server.toml` under the platform config directory.
pub fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_default();
    base.join("fueltrack").join("server.toml")
}
