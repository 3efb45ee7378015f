//! JSON configuration with environment overrides and reload watching.
//!
//! The raw document expresses date strategies by key presence (`date`
//! vs `date_range`, optional `trip_length_days`). Loading resolves
//! that into an explicit `DateStrategy` and rejects contradictory
//! combinations, so a malformed route fails at load time instead of
//! expanding to nothing silently.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

use crate::types::{DateStrategy, RouteSpec, TrackerError};

const DEFAULT_WEB_PORT: u16 = 8080;
const DEFAULT_CHECK_INTERVAL_HOURS: u64 = 6;
const DEFAULT_REQUEST_DELAY_SECS: u64 = 1;

// ---------------------------------------------------------------------------
// Raw document shapes (JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    amadeus_api_key: Option<String>,
    #[serde(default)]
    amadeus_api_secret: Option<String>,
    #[serde(default)]
    serpapi_key: Option<String>,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default = "default_web_port")]
    web_port: u16,
    #[serde(default = "default_check_interval_hours")]
    check_interval_hours: u64,
    #[serde(default = "default_request_delay_secs")]
    request_delay_secs: u64,
    #[serde(default)]
    allow_day_trips: bool,
    #[serde(default)]
    routes: Vec<RawRoute>,
}

fn default_web_port() -> u16 {
    DEFAULT_WEB_PORT
}

fn default_check_interval_hours() -> u64 {
    DEFAULT_CHECK_INTERVAL_HOURS
}

fn default_request_delay_secs() -> u64 {
    DEFAULT_REQUEST_DELAY_SECS
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    departure: String,
    destination: String,
    #[serde(default)]
    description: Option<String>,
    max_price: Decimal,
    #[serde(default = "default_adults")]
    adults: u32,
    #[serde(default)]
    allowed_airlines: Option<Vec<String>>,
    #[serde(default)]
    must_include_dates: Vec<NaiveDate>,
    #[serde(default)]
    exclude_return_dates: Vec<NaiveDate>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    date_range: Option<RawDateRange>,
    #[serde(default)]
    return_date: Option<NaiveDate>,
    #[serde(default)]
    trip_length_days: Option<i64>,
    #[serde(default)]
    trip_flex_days: Option<i64>,
}

fn default_adults() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl RawRoute {
    fn label(&self) -> String {
        format!("{} → {}", self.departure, self.destination)
    }

    /// Resolve the raw shape into a validated `RouteSpec`.
    fn into_route(self) -> Result<RouteSpec> {
        let label = self.label();

        if self.max_price <= Decimal::ZERO {
            bail!("Route {label}: max_price must be positive");
        }
        if self.adults < 1 {
            bail!("Route {label}: adults must be at least 1");
        }
        if let Some(flex) = self.trip_flex_days {
            if flex < 0 {
                bail!("Route {label}: trip_flex_days must not be negative");
            }
            if self.trip_length_days.is_none() {
                bail!("Route {label}: trip_flex_days requires trip_length_days");
            }
        }

        let dates = match (self.date, self.date_range) {
            (Some(_), Some(_)) => {
                bail!("Route {label}: date and date_range are mutually exclusive")
            }
            (None, None) => {
                bail!("Route {label}: one of date or date_range is required")
            }
            (Some(date), None) => {
                if self.trip_length_days.is_some() {
                    bail!("Route {label}: trip_length_days requires date_range");
                }
                DateStrategy::Fixed {
                    date,
                    return_date: self.return_date,
                }
            }
            (None, Some(range)) => {
                if range.start > range.end {
                    bail!("Route {label}: date_range start is after end");
                }
                match self.trip_length_days {
                    Some(trip_length_days) => {
                        if self.return_date.is_some() {
                            bail!(
                                "Route {label}: return_date and trip_length_days \
                                 are mutually exclusive"
                            );
                        }
                        DateStrategy::RangedWithTripLength {
                            start: range.start,
                            end: range.end,
                            trip_length_days,
                            trip_flex_days: self.trip_flex_days.unwrap_or(0),
                        }
                    }
                    None => DateStrategy::RangedPlain {
                        start: range.start,
                        end: range.end,
                        return_date: self.return_date,
                    },
                }
            }
        };

        Ok(RouteSpec {
            departure: self.departure,
            destination: self.destination,
            description: self.description.unwrap_or_default(),
            max_price: self.max_price,
            adults: self.adults,
            allowed_airlines: self.allowed_airlines,
            must_include_dates: self.must_include_dates,
            exclude_return_dates: self.exclude_return_dates.into_iter().collect(),
            dates,
        })
    }
}

// ---------------------------------------------------------------------------
// Application configuration
// ---------------------------------------------------------------------------

/// Which flight-search backend serves queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Amadeus,
    SerpApi,
}

impl ProviderKind {
    fn parse(value: Option<&str>) -> Result<Self> {
        match value {
            None | Some("amadeus") => Ok(ProviderKind::Amadeus),
            Some("serpapi") => Ok(ProviderKind::SerpApi),
            Some(other) => bail!("Unknown provider '{other}' (expected amadeus or serpapi)"),
        }
    }
}

/// Validated runtime configuration.
///
/// Credentials stay as plain strings in this struct and are wrapped
/// into `Secret` at the accessor boundary, so nothing downstream ever
/// sees them unwrapped.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderKind,
    amadeus_api_key: Option<String>,
    amadeus_api_secret: Option<String>,
    serpapi_key: Option<String>,
    pub webhook_url: String,
    pub web_port: u16,
    pub check_interval_hours: u64,
    pub request_delay_secs: u64,
    pub allow_day_trips: bool,
    pub routes: Vec<RouteSpec>,
}

impl AppConfig {
    /// Load and validate configuration from a JSON file, applying
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(contents)
            .map_err(|e| TrackerError::Config(format!("not valid config JSON: {e}")))?;

        if raw.check_interval_hours == 0 {
            bail!("check_interval_hours must be at least 1");
        }

        let routes = raw
            .routes
            .into_iter()
            .map(RawRoute::into_route)
            .collect::<Result<Vec<_>>>()?;
        if routes.is_empty() {
            bail!("No routes configured");
        }

        let webhook_url = env_or(raw.webhook_url, "WEBHOOK_URL")
            .context("webhook_url not set (config or WEBHOOK_URL)")?;

        let config = AppConfig {
            provider: ProviderKind::parse(raw.provider.as_deref())?,
            amadeus_api_key: env_or(raw.amadeus_api_key, "AMADEUS_API_KEY"),
            amadeus_api_secret: env_or(raw.amadeus_api_secret, "AMADEUS_API_SECRET"),
            serpapi_key: env_or(raw.serpapi_key, "SERPAPI_KEY"),
            webhook_url,
            web_port: env_parsed(raw.web_port, "WEB_PORT"),
            check_interval_hours: raw.check_interval_hours,
            request_delay_secs: raw.request_delay_secs,
            allow_day_trips: raw.allow_day_trips,
            routes,
        };

        // Credentials for the selected provider must be present.
        match config.provider {
            ProviderKind::Amadeus => {
                config.amadeus_credentials()?;
            }
            ProviderKind::SerpApi => {
                config.serpapi_key()?;
            }
        }
        Ok(config)
    }

    pub fn amadeus_credentials(&self) -> Result<(Secret<String>, Secret<String>)> {
        let key = self
            .amadeus_api_key
            .clone()
            .context("amadeus_api_key not set (config or AMADEUS_API_KEY)")?;
        let secret = self
            .amadeus_api_secret
            .clone()
            .context("amadeus_api_secret not set (config or AMADEUS_API_SECRET)")?;
        Ok((Secret::new(key), Secret::new(secret)))
    }

    pub fn serpapi_key(&self) -> Result<Secret<String>> {
        self.serpapi_key
            .clone()
            .map(Secret::new)
            .context("serpapi_key not set (config or SERPAPI_KEY)")
    }
}

/// Environment variable wins over the config document.
fn env_or(from_config: Option<String>, var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty()).or(from_config)
}

fn env_parsed<T: std::str::FromStr + Copy>(from_config: T, var: &str) -> T {
    match std::env::var(var) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(var, value, "Ignoring unparseable environment override");
            from_config
        }),
        Err(_) => from_config,
    }
}

// ---------------------------------------------------------------------------
// Reload watching
// ---------------------------------------------------------------------------

/// Polls the config file's mtime once per call.
///
/// The change marker is consumed on every detection, including when the
/// edited file fails to load, so a broken edit is reported once rather
/// than every cycle.
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = mtime(&path);
        ConfigWatcher {
            path,
            last_modified,
        }
    }

    /// `None` when nothing changed; otherwise the reload attempt.
    pub fn poll(&mut self) -> Option<Result<AppConfig>> {
        let current = mtime(&self.path)?;
        if Some(current) == self.last_modified {
            return None;
        }
        self.last_modified = Some(current);
        Some(AppConfig::load(&self.path))
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minimal_config(routes_json: &str) -> String {
        format!(
            r#"{{
                "amadeus_api_key": "key",
                "amadeus_api_secret": "secret",
                "webhook_url": "https://hooks.example.com/fw",
                "routes": {routes_json}
            }}"#
        )
    }

    const FIXED_ROUTE: &str = r#"[
        { "departure": "JFK", "destination": "LAX", "max_price": 250, "date": "2025-06-01" }
    ]"#;

    #[test]
    fn test_defaults_applied() {
        let cfg = AppConfig::from_json_str(&minimal_config(FIXED_ROUTE)).unwrap();
        assert_eq!(cfg.provider, ProviderKind::Amadeus);
        assert_eq!(cfg.web_port, 8080);
        assert_eq!(cfg.check_interval_hours, 6);
        assert_eq!(cfg.request_delay_secs, 1);
        assert!(!cfg.allow_day_trips);
        assert_eq!(cfg.routes.len(), 1);
        assert_eq!(cfg.routes[0].adults, 1);
        assert_eq!(cfg.routes[0].max_price, dec!(250));
    }

    #[test]
    fn test_fixed_date_strategy() {
        let cfg = AppConfig::from_json_str(&minimal_config(FIXED_ROUTE)).unwrap();
        assert_eq!(
            cfg.routes[0].dates,
            DateStrategy::Fixed {
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                return_date: None,
            }
        );
    }

    #[test]
    fn test_ranged_with_trip_length_strategy() {
        let routes = r#"[{
            "departure": "JFK", "destination": "LAX", "max_price": 250,
            "date_range": { "start": "2025-06-01", "end": "2025-06-03" },
            "trip_length_days": 7, "trip_flex_days": 2
        }]"#;
        let cfg = AppConfig::from_json_str(&minimal_config(routes)).unwrap();
        assert_eq!(
            cfg.routes[0].dates,
            DateStrategy::RangedWithTripLength {
                start: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
                trip_length_days: 7,
                trip_flex_days: 2,
            }
        );
    }

    #[test]
    fn test_date_and_range_mutually_exclusive() {
        let routes = r#"[{
            "departure": "JFK", "destination": "LAX", "max_price": 250,
            "date": "2025-06-01",
            "date_range": { "start": "2025-06-01", "end": "2025-06-03" }
        }]"#;
        let err = AppConfig::from_json_str(&minimal_config(routes)).unwrap_err();
        assert!(format!("{err:#}").contains("mutually exclusive"));
    }

    #[test]
    fn test_route_without_dates_rejected() {
        let routes = r#"[
            { "departure": "JFK", "destination": "LAX", "max_price": 250 }
        ]"#;
        let err = AppConfig::from_json_str(&minimal_config(routes)).unwrap_err();
        assert!(format!("{err:#}").contains("date or date_range"));
    }

    #[test]
    fn test_trip_flex_requires_trip_length() {
        let routes = r#"[{
            "departure": "JFK", "destination": "LAX", "max_price": 250,
            "date_range": { "start": "2025-06-01", "end": "2025-06-03" },
            "trip_flex_days": 2
        }]"#;
        let err = AppConfig::from_json_str(&minimal_config(routes)).unwrap_err();
        assert!(format!("{err:#}").contains("requires trip_length_days"));
    }

    #[test]
    fn test_return_date_conflicts_with_trip_length() {
        let routes = r#"[{
            "departure": "JFK", "destination": "LAX", "max_price": 250,
            "date_range": { "start": "2025-06-01", "end": "2025-06-03" },
            "trip_length_days": 7, "return_date": "2025-06-10"
        }]"#;
        assert!(AppConfig::from_json_str(&minimal_config(routes)).is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let routes = r#"[{
            "departure": "JFK", "destination": "LAX", "max_price": 250,
            "date_range": { "start": "2025-06-03", "end": "2025-06-01" }
        }]"#;
        let err = AppConfig::from_json_str(&minimal_config(routes)).unwrap_err();
        assert!(format!("{err:#}").contains("start is after end"));
    }

    #[test]
    fn test_nonpositive_price_rejected() {
        let routes = r#"[
            { "departure": "JFK", "destination": "LAX", "max_price": 0, "date": "2025-06-01" }
        ]"#;
        assert!(AppConfig::from_json_str(&minimal_config(routes)).is_err());
    }

    #[test]
    fn test_no_routes_rejected() {
        let err = AppConfig::from_json_str(&minimal_config("[]")).unwrap_err();
        assert!(format!("{err:#}").contains("No routes"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let doc = r#"{
            "provider": "kayak",
            "webhook_url": "https://hooks.example.com/fw",
            "routes": [
                { "departure": "JFK", "destination": "LAX", "max_price": 250, "date": "2025-06-01" }
            ]
        }"#;
        let err = AppConfig::from_json_str(doc).unwrap_err();
        assert!(format!("{err:#}").contains("Unknown provider"));
    }

    #[test]
    fn test_missing_webhook_url_rejected() {
        let doc = r#"{
            "amadeus_api_key": "key",
            "amadeus_api_secret": "secret",
            "routes": [
                { "departure": "JFK", "destination": "LAX", "max_price": 250, "date": "2025-06-01" }
            ]
        }"#;
        if std::env::var("WEBHOOK_URL").is_err() {
            let err = AppConfig::from_json_str(doc).unwrap_err();
            assert!(format!("{err:#}").contains("webhook_url not set"));
        }
    }

    #[test]
    fn test_missing_credentials_for_selected_provider() {
        let doc = r#"{
            "provider": "serpapi",
            "webhook_url": "https://hooks.example.com/fw",
            "routes": [
                { "departure": "JFK", "destination": "LAX", "max_price": 250, "date": "2025-06-01" }
            ]
        }"#;
        // Only meaningful when the test environment carries no key.
        if std::env::var("SERPAPI_KEY").is_err() {
            let err = AppConfig::from_json_str(doc).unwrap_err();
            assert!(format!("{err:#}").contains("serpapi_key not set"));
        }
    }

    #[test]
    fn test_exclude_dates_collected_into_set() {
        let routes = r#"[{
            "departure": "JFK", "destination": "LAX", "max_price": 250,
            "date": "2025-06-01",
            "exclude_return_dates": ["2025-06-06", "2025-06-06", "2025-06-07"]
        }]"#;
        let cfg = AppConfig::from_json_str(&minimal_config(routes)).unwrap();
        assert_eq!(cfg.routes[0].exclude_return_dates.len(), 2);
    }

    // -- ConfigWatcher tests --

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("farewatch-test-{tag}-{}.json", std::process::id()))
    }

    #[test]
    fn test_watcher_detects_change_and_consumes_marker() {
        let path = temp_config_path("watch");
        fs::write(&path, minimal_config(FIXED_ROUTE)).unwrap();

        let mut watcher = ConfigWatcher::new(&path);
        assert!(watcher.poll().is_none(), "unchanged file must not reload");

        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(&path, minimal_config(FIXED_ROUTE)).unwrap();

        let reload = watcher.poll().expect("change must be detected");
        assert!(reload.is_ok());
        assert!(watcher.poll().is_none(), "marker must be consumed");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_watcher_invalid_edit_reports_once() {
        let path = temp_config_path("invalid");
        fs::write(&path, minimal_config(FIXED_ROUTE)).unwrap();

        let mut watcher = ConfigWatcher::new(&path);
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(&path, "{ not json").unwrap();

        let reload = watcher.poll().expect("change must be detected");
        assert!(reload.is_err());
        // The broken edit is not re-reported next cycle.
        assert!(watcher.poll().is_none());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_watcher_missing_file_is_quiet() {
        let mut watcher = ConfigWatcher::new("/nonexistent/farewatch.json");
        assert!(watcher.poll().is_none());
    }
}
