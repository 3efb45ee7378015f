//! Shared types for the FAREWATCH tracker.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that provider, engine,
//! and server modules can depend on them without circular references.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Route specification
// ---------------------------------------------------------------------------

/// One monitored itinerary definition with a price threshold.
///
/// Immutable once a check cycle has started; the whole route list is
/// replaced atomically on config reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    /// IATA departure code, e.g. "JFK".
    pub departure: String,
    /// IATA destination code, e.g. "LAX".
    pub destination: String,
    /// Free-form description, surfaced in the status document.
    #[serde(default)]
    pub description: String,
    /// Alert threshold. Offers priced at or below this trigger a webhook.
    pub max_price: Decimal,
    pub adults: u32,
    /// Case-insensitive airline matchers. `None` means any airline.
    #[serde(default)]
    pub allowed_airlines: Option<Vec<String>>,
    /// Calendar dates every candidate trip must cover (inclusive).
    #[serde(default)]
    pub must_include_dates: Vec<NaiveDate>,
    /// Return dates that disqualify a candidate outright.
    #[serde(default)]
    pub exclude_return_dates: HashSet<NaiveDate>,
    pub dates: DateStrategy,
}

/// How a route's concrete date-pairs are derived.
///
/// Parsed from the raw config shape (key presence) into an explicit
/// variant so malformed routes fail at load time, not as silent empty
/// expansions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateStrategy {
    /// A single fixed outbound date, optionally with a fixed return.
    Fixed {
        date: NaiveDate,
        return_date: Option<NaiveDate>,
    },
    /// Every outbound day in [start, end], optionally with one global
    /// fixed return date applied to each.
    RangedPlain {
        start: NaiveDate,
        end: NaiveDate,
        return_date: Option<NaiveDate>,
    },
    /// Every outbound day in [start, end] crossed with every trip-length
    /// offset in [length - flex, length + flex].
    RangedWithTripLength {
        start: NaiveDate,
        end: NaiveDate,
        trip_length_days: i64,
        trip_flex_days: i64,
    },
}

impl RouteSpec {
    /// Snapshot map key: one entry per unique (departure, destination,
    /// max_price) triple.
    pub fn key(&self) -> RouteKey {
        RouteKey {
            departure: self.departure.clone(),
            destination: self.destination.clone(),
            max_price: self.max_price,
        }
    }

    /// Human-readable route label, e.g. "JFK → LAX".
    pub fn label(&self) -> String {
        format!("{} → {}", self.departure, self.destination)
    }

    /// Helper to build a test route with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        use rust_decimal_macros::dec;
        RouteSpec {
            departure: "JFK".to_string(),
            destination: "LAX".to_string(),
            description: "East-west weekend hop".to_string(),
            max_price: dec!(250),
            adults: 1,
            allowed_airlines: None,
            must_include_dates: Vec::new(),
            exclude_return_dates: HashSet::new(),
            dates: DateStrategy::Fixed {
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                return_date: None,
            },
        }
    }
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (max ${} | {} adult(s))",
            self.label(),
            self.max_price,
            self.adults,
        )
    }
}

/// Identity of a route's snapshot entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteKey {
    pub departure: String,
    pub destination: String,
    pub max_price: Decimal,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}@{}", self.departure, self.destination, self.max_price)
    }
}

// ---------------------------------------------------------------------------
// Date combinations
// ---------------------------------------------------------------------------

/// One concrete (outbound, optional return) query unit derived from a route.
///
/// Produced fresh each cycle, never mutated, consumed once by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCombination {
    pub outbound: NaiveDate,
    pub return_date: Option<NaiveDate>,
    /// Trip length in days, set only for ranged-with-trip-length routes.
    pub trip_days: Option<i64>,
}

impl DateCombination {
    pub fn one_way(outbound: NaiveDate) -> Self {
        DateCombination {
            outbound,
            return_date: None,
            trip_days: None,
        }
    }

    pub fn round_trip(outbound: NaiveDate, ret: NaiveDate) -> Self {
        DateCombination {
            outbound,
            return_date: Some(ret),
            trip_days: None,
        }
    }
}

impl fmt::Display for DateCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.return_date, self.trip_days) {
            (Some(r), Some(d)) => write!(f, "{} → {} ({d} days)", self.outbound, r),
            (Some(r), None) => write!(f, "{} → {}", self.outbound, r),
            _ => write!(f, "{} (one-way)", self.outbound),
        }
    }
}

// ---------------------------------------------------------------------------
// Offers
// ---------------------------------------------------------------------------

/// A single priced itinerary after normalization.
///
/// Lists of these are always price-ascending once the normalizer has
/// run; ties keep provider order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOffer {
    pub price: Decimal,
    /// Display name resolved from the provider's carrier side-table,
    /// falling back to the raw code.
    pub airline: String,
    pub airline_code: String,
    /// Provider-supplied timestamps, passed through untouched.
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    /// ISO-8601 duration string from the first itinerary that reports one.
    pub duration: Option<String>,
    pub segments: usize,
    pub offer_id: Option<String>,
}

impl fmt::Display for NormalizedOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${} {} ({} segment(s))",
            self.price, self.airline, self.segments,
        )
    }
}

impl NormalizedOffer {
    /// Number of stops implied by the segment count.
    pub fn stops(&self) -> usize {
        self.segments.saturating_sub(1)
    }
}

/// A normalized offer tagged with the dates it was found for.
/// The unit of snapshot storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightEntry {
    #[serde(flatten)]
    pub offer: NormalizedOffer,
    pub outbound: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
}

// ---------------------------------------------------------------------------
// Route snapshot
// ---------------------------------------------------------------------------

/// Latest-known state of one route, replaced wholesale each check.
///
/// The flight list always reflects a single check cycle; stale entries
/// are never merged in.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub departure: String,
    pub destination: String,
    pub description: String,
    pub max_price: Decimal,
    /// Minimum price across `flights`; absent when the list is empty.
    pub best_price: Option<Decimal>,
    pub flights_found: usize,
    pub last_checked: DateTime<Utc>,
    pub flights: Vec<FlightEntry>,
}

impl RouteSnapshot {
    /// Build a snapshot from a freshly accumulated flight list.
    pub fn from_flights(route: &RouteSpec, flights: Vec<FlightEntry>) -> Self {
        let best_price = flights.iter().map(|f| f.offer.price).min();
        RouteSnapshot {
            departure: route.departure.clone(),
            destination: route.destination.clone(),
            description: route.description.clone(),
            max_price: route.max_price,
            best_price,
            flights_found: flights.len(),
            last_checked: Utc::now(),
            flights,
        }
    }
}

impl fmt::Display for RouteSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {}: {} flight(s), best {}",
            self.departure,
            self.destination,
            self.flights_found,
            self.best_price
                .map(|p| format!("${p}"))
                .unwrap_or_else(|| "n/a".to_string()),
        )
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Webhook payload for a qualifying deal.
///
/// Ephemeral: produced at most once per route per cycle (the single
/// cheapest qualifying offer across all date-pairs), dispatched, then
/// discarded. Alerts carry no deduplication key, so an unchanged cheap
/// fare re-alerts every cycle.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    /// "JFK → LAX"
    pub route: String,
    pub date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub trip_length: Option<i64>,
    pub adults: u32,
    pub price: Decimal,
    pub threshold: Decimal,
    pub airline: String,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub duration: Option<String>,
    pub segments: usize,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(route: &RouteSpec, combo: &DateCombination, offer: &NormalizedOffer) -> Self {
        AlertEvent {
            route: route.label(),
            date: combo.outbound,
            return_date: combo.return_date,
            trip_length: combo.trip_days,
            adults: route.adults,
            price: offer.price,
            threshold: route.max_price,
            airline: offer.airline.clone(),
            departure_time: offer.departure_time.clone(),
            arrival_time: offer.arrival_time.clone(),
            duration: offer.duration.clone(),
            segments: offer.segments,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} at ${} (threshold ${}) via {}",
            self.route, self.date, self.price, self.threshold, self.airline,
        )
    }
}

// ---------------------------------------------------------------------------
// Tracker status
// ---------------------------------------------------------------------------

/// Scheduler lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerPhase {
    Initializing,
    Authenticating,
    /// Terminal: credential exchange failed, no route checks attempted.
    AuthFailed,
    Running,
}

impl fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerPhase::Initializing => write!(f, "initializing"),
            TrackerPhase::Authenticating => write!(f, "authenticating"),
            TrackerPhase::AuthFailed => write!(f, "auth_failed"),
            TrackerPhase::Running => write!(f, "running"),
        }
    }
}

/// Lightweight per-route summary for the status document.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub departure: String,
    pub destination: String,
    pub description: String,
}

impl From<&RouteSpec> for RouteSummary {
    fn from(r: &RouteSpec) -> Self {
        RouteSummary {
            departure: r.departure.clone(),
            destination: r.destination.clone(),
            description: r.description.clone(),
        }
    }
}

/// The status record served over HTTP and sent to the webhook on startup
/// and on status changes.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub message: String,
    pub phase: TrackerPhase,
    pub routes_tracked: usize,
    pub routes: Vec<RouteSummary>,
    pub check_interval_hours: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub next_check: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

impl TrackerStatus {
    pub fn startup(routes: &[RouteSpec], check_interval_hours: u64) -> Self {
        TrackerStatus {
            kind: "startup".to_string(),
            status: "initializing".to_string(),
            message: "Starting up...".to_string(),
            phase: TrackerPhase::Initializing,
            routes_tracked: routes.len(),
            routes: routes.iter().map(RouteSummary::from).collect(),
            check_interval_hours,
            last_check: None,
            next_check: None,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error taxonomy for FAREWATCH.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Provider credential exchange failed. Fatal to the process.
    #[error("Authentication failed ({provider}): {message}")]
    Auth { provider: String, message: String },

    /// A single date-pair query failed or timed out. Recovered by
    /// skipping that combination.
    #[error("Search failed ({provider}): {message}")]
    Search { provider: String, message: String },

    /// Missing file, malformed JSON, or failed validation. Fatal at
    /// startup; recovered on reload by keeping the previous config.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected failure while checking one route. Caught at the
    /// per-route boundary; the cycle continues.
    #[error("Route check failed ({route}): {message}")]
    Route { route: String, message: String },

    /// Webhook POST failed. Logged, never retried.
    #[error("Webhook delivery failed: {0}")]
    Delivery(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
