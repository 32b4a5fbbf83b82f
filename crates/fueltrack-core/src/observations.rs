//! Daily observations from the MSC Datamart "yesterday" XML files.
//!
//! Each province publishes one file per day holding the previous day's
//! extremes for every station. The file for data day `D` is dated `D + 1`.
//! Recent files live under `/today/`, older ones under a dated directory, so
//! each day is tried against an ordered list of [`UrlStrategy`] values and
//! the first one that yields a record wins.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use serde::Serialize;
use time::Date;
use time::macros::format_description;
use tracing::{debug, warn};

use fueltrack_types::{NewWeatherDay, WeatherSource, add_days, date::iso_date};

use crate::calc::{self, DEFAULT_HDD_BASE_TEMP, round_to};
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};
use crate::traits::ObservationProvider;

/// Observed extremes for one day, with derived mean and HDD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub max_temp: f64,
    pub min_temp: f64,
    pub mean_temp: f64,
    pub hdd: f64,
}

impl Observation {
    /// Derive mean and HDD from the extremes, rounded to hundredths.
    pub fn from_extremes(date: Date, max_temp: f64, min_temp: f64, base_temp: f64) -> Self {
        let mean = calc::mean_temp(min_temp, max_temp);
        Self {
            date,
            max_temp,
            min_temp,
            mean_temp: round_to(mean, 2),
            hdd: round_to(calc::hdd(mean, base_temp), 2),
        }
    }

    /// The record to upsert for this observation.
    pub fn to_weather_day(&self) -> NewWeatherDay {
        NewWeatherDay {
            date: self.date,
            max_temp: Some(self.max_temp),
            min_temp: Some(self.min_temp),
            mean_temp: Some(self.mean_temp),
            hdd: Some(self.hdd),
            source: WeatherSource::Auto,
        }
    }
}

/// Which stations in a provincial file count as ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationMatcher {
    /// Transport Canada identifiers, e.g. `ZSM`.
    pub ids: Vec<String>,
    /// Lower-case fragment of the station name.
    pub name_fragment: Option<String>,
}

impl Default for StationMatcher {
    fn default() -> Self {
        Self {
            ids: vec!["ZSM".to_string(), "YSM".to_string()],
            name_fragment: Some("fort smith".to_string()),
        }
    }
}

impl StationMatcher {
    pub fn matches(&self, id: &str, name: &str) -> bool {
        if !id.is_empty() && self.ids.iter().any(|known| known.eq_ignore_ascii_case(id)) {
            return true;
        }
        match &self.name_fragment {
            Some(fragment) if !fragment.is_empty() => name.to_lowercase().contains(fragment.as_str()),
            _ => false,
        }
    }
}

#[derive(Default)]
struct StationBlock {
    id: String,
    name: String,
    high: Option<f64>,
    low: Option<f64>,
}

/// Pull our station's extremes out of a "yesterday" document.
///
/// Returns `Ok(None)` when the station is absent or lacks either extreme.
pub fn parse_yesterday_xml(
    xml: &str,
    date: Date,
    matcher: &StationMatcher,
    base_temp: f64,
) -> Result<Option<Observation>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<StationBlock> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Observation" => {
                current = Some(StationBlock::default());
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"element" => {
                if let Some(block) = current.as_mut() {
                    record_element(block, &e)?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"Observation" => {
                if let Some(block) = current.take()
                    && matcher.matches(&block.id, &block.name)
                    && let (Some(high), Some(low)) = (block.high, block.low)
                {
                    return Ok(Some(Observation::from_extremes(date, high, low, base_temp)));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn record_element(block: &mut StationBlock, element: &BytesStart<'_>) -> Result<()> {
    let mut name = None;
    let mut value = None;
    for attr in element.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(attr.unescape_value()?.into_owned()),
            b"value" => value = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }
    let (Some(name), Some(value)) = (name, value) else {
        return Ok(());
    };
    match name.as_str() {
        "station_name" => block.name = value,
        "transport_canada_id" => block.id = value,
        "air_temperature_yesterday_high" => block.high = value.trim().parse().ok(),
        "air_temperature_yesterday_low" => block.low = value.trim().parse().ok(),
        _ => {}
    }
    Ok(())
}

/// A way of locating the file for a data day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlStrategy {
    /// `{base}/today/observations/xml/{PROV}/yesterday/...`
    Today,
    /// `{base}/{YYYYMMDD}/WXO-DD/observations/xml/{PROV}/yesterday/...`
    Dated,
}

impl UrlStrategy {
    /// Default order: the rolling `today` tree first, then the archive.
    pub const DEFAULT_ORDER: [UrlStrategy; 2] = [UrlStrategy::Today, UrlStrategy::Dated];

    /// URL of the file holding data for `data_date`.
    pub fn url(&self, base: &str, province: &str, data_date: Date) -> String {
        let file_date = add_days(data_date, 1);
        let stamp = file_date
            .format(format_description!("[year][month][day]"))
            .unwrap_or_default();
        let base = base.trim_end_matches('/');
        let upper = province.to_uppercase();
        let lower = province.to_lowercase();
        let file = format!("yesterday/yesterday_{lower}_{stamp}_e.xml");
        match self {
            UrlStrategy::Today => format!("{base}/today/observations/xml/{upper}/{file}"),
            UrlStrategy::Dated => format!("{base}/{stamp}/WXO-DD/observations/xml/{upper}/{file}"),
        }
    }
}

/// Settings for the Datamart importer.
#[derive(Debug, Clone, PartialEq)]
pub struct DatamartConfig {
    pub base_url: String,
    /// Two-letter province code, e.g. `NT`.
    pub province: String,
    pub station: StationMatcher,
    pub base_temp: f64,
    pub timeout: Duration,
}

impl Default for DatamartConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dd.weather.gc.ca".to_string(),
            province: "NT".to_string(),
            station: StationMatcher::default(),
            base_temp: DEFAULT_HDD_BASE_TEMP,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Fetches daily observations from the MSC Datamart.
#[derive(Debug, Clone)]
pub struct DatamartImporter {
    client: Client,
    config: DatamartConfig,
    strategies: Vec<UrlStrategy>,
    retry: RetryConfig,
}

impl DatamartImporter {
    pub fn new(config: DatamartConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: DatamartConfig) -> Self {
        Self {
            client,
            config,
            strategies: UrlStrategy::DEFAULT_ORDER.to_vec(),
            retry: RetryConfig::for_fetch(),
        }
    }

    /// Replace the ordered list of URL strategies.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<UrlStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_document(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(status.as_u16(), url));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ObservationProvider for DatamartImporter {
    async fn fetch_observation(&self, date: Date) -> Result<Option<Observation>> {
        let mut last_error = None;
        for strategy in &self.strategies {
            let url = strategy.url(&self.config.base_url, &self.config.province, date);
            let body = match with_retry(&self.retry, "fetch_observation", || self.fetch_document(&url)).await {
                Ok(body) => body,
                Err(e) => {
                    debug!("{:?} strategy failed for {}: {}", strategy, date, e);
                    last_error = Some(e);
                    continue;
                }
            };
            match parse_yesterday_xml(&body, date, &self.config.station, self.config.base_temp) {
                Ok(Some(observation)) => return Ok(Some(observation)),
                Ok(None) => debug!("station not in {}", url),
                Err(e) => {
                    warn!("could not parse {}: {}", url, e);
                    last_error = Some(e);
                }
            }
        }
        // A 404 from every strategy just means the file is not published.
        match last_error {
            Some(Error::Status { status: 404, .. }) | None => Ok(None),
            Some(e) => Err(e),
        }
    }
}

/// Outcome of importing a range of days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub fetched: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
    pub data: Vec<Observation>,
}

/// Fetch every day in `[from, to]`, oldest first.
///
/// Failures are collected per day rather than aborting the import.
pub async fn import_range<P>(provider: &P, from: Date, to: Date) -> Result<ImportReport>
where
    P: ObservationProvider + ?Sized,
{
    if to < from {
        return Err(Error::InvalidRange(format!("{from} is after {to}")));
    }

    let mut report = ImportReport::default();
    let mut day = from;
    while day <= to {
        match provider.fetch_observation(day).await {
            Ok(Some(observation)) => {
                report.fetched += 1;
                report.data.push(observation);
            }
            Ok(None) => {
                report.skipped += 1;
                report.errors.push(format!("{day}: station not found in data"));
            }
            Err(e) => {
                report.skipped += 1;
                report.errors.push(format!("{day}: {e}"));
            }
        }
        day = add_days(day, 1);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::StaticObservations;
    use time::macros::date;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<om:ObservationCollection xmlns="http://dms.ec.gc.ca/schema/point-observation/2.0" xmlns:om="http://www.opengis.net/om/1.0">
  <om:member>
    <om:Observation>
      <om:metadata>
        <set>
          <identification-elements>
            <element name="station_name" uom="unitless" value="Hay River"/>
            <element name="transport_canada_id" uom="unitless" value="YHY"/>
          </identification-elements>
        </set>
      </om:metadata>
      <om:result>
        <elements>
          <element name="air_temperature_yesterday_high" uom="°C" value="-8.1"/>
          <element name="air_temperature_yesterday_low" uom="°C" value="-19.4"/>
        </elements>
      </om:result>
    </om:Observation>
  </om:member>
  <om:member>
    <om:Observation>
      <om:metadata>
        <set>
          <identification-elements>
            <element name="station_name" uom="unitless" value="Fort Smith"/>
            <element name="transport_canada_id" uom="unitless" value="ZSM"/>
          </identification-elements>
        </set>
      </om:metadata>
      <om:result>
        <elements>
          <element name="air_temperature_yesterday_high" uom="°C" value="-11.3">
            <qualifier name="data_quality" uom="unitless" value="0"/>
          </element>
          <element name="air_temperature_yesterday_low" uom="°C" value="-24.6"/>
        </elements>
      </om:result>
    </om:Observation>
  </om:member>
</om:ObservationCollection>"#;

    #[test]
    fn test_parse_finds_station() {
        let observation = parse_yesterday_xml(
            SAMPLE,
            date!(2025 - 01 - 14),
            &StationMatcher::default(),
            DEFAULT_HDD_BASE_TEMP,
        )
        .unwrap()
        .unwrap();

        assert_eq!(observation.date, date!(2025 - 01 - 14));
        assert_eq!(observation.max_temp, -11.3);
        assert_eq!(observation.min_temp, -24.6);
        assert_eq!(observation.mean_temp, -17.95);
        assert_eq!(observation.hdd, 35.95);
    }

    #[test]
    fn test_parse_matches_by_name() {
        let matcher = StationMatcher {
            ids: vec![],
            name_fragment: Some("hay river".into()),
        };
        let observation = parse_yesterday_xml(SAMPLE, date!(2025 - 01 - 14), &matcher, 18.0)
            .unwrap()
            .unwrap();
        assert_eq!(observation.max_temp, -8.1);
    }

    #[test]
    fn test_parse_station_absent() {
        let matcher = StationMatcher {
            ids: vec!["YZF".into()],
            name_fragment: None,
        };
        let result = parse_yesterday_xml(SAMPLE, date!(2025 - 01 - 14), &matcher, 18.0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_malformed_xml() {
        let result = parse_yesterday_xml(
            "<om:ObservationCollection><om:member></om:ObservationCollection>",
            date!(2025 - 01 - 14),
            &StationMatcher::default(),
            18.0,
        );
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_url_strategies_use_next_day_file() {
        let date = date!(2025 - 01 - 31);
        assert_eq!(
            UrlStrategy::Today.url("https://dd.weather.gc.ca/", "NT", date),
            "https://dd.weather.gc.ca/today/observations/xml/NT/yesterday/yesterday_nt_20250201_e.xml"
        );
        assert_eq!(
            UrlStrategy::Dated.url("https://dd.weather.gc.ca", "nt", date),
            "https://dd.weather.gc.ca/20250201/WXO-DD/observations/xml/NT/yesterday/yesterday_nt_20250201_e.xml"
        );
    }

    #[test]
    fn test_observation_to_weather_day() {
        let day = Observation::from_extremes(date!(2025 - 01 - 01), -10.0, -20.0, 18.0).to_weather_day();
        assert_eq!(day.hdd, Some(33.0));
        assert_eq!(day.source, WeatherSource::Auto);
    }

    #[tokio::test]
    async fn test_import_range_collects_gaps() {
        let provider = StaticObservations::new()
            .with(Observation::from_extremes(date!(2025 - 01 - 01), -10.0, -20.0, 18.0))
            .with(Observation::from_extremes(date!(2025 - 01 - 03), -12.0, -22.0, 18.0));

        let report = import_range(&provider, date!(2025 - 01 - 01), date!(2025 - 01 - 03))
            .await
            .unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors, vec!["2025-01-02: station not found in data".to_string()]);
        assert_eq!(report.data[1].date, date!(2025 - 01 - 03));
    }

    #[tokio::test]
    async fn test_import_range_rejects_reversed_range() {
        let provider = StaticObservations::new();
        let result = import_range(&provider, date!(2025 - 01 - 03), date!(2025 - 01 - 01)).await;
        assert!(matches!(result, Err(Error::InvalidRange(_))));
    }
}
