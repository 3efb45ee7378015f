//! Flight-search provider integrations.
//!
//! Defines the `FlightSearchProvider` trait and provides bindings for:
//! - Amadeus (OAuth2 client-credentials) — primary offer source
//! - SerpAPI Google Flights (API key) — alternative offer source
//!
//! Both bindings map their wire formats into the shared
//! `ProviderResponse` shape, so the core engine never sees which
//! provider served a query.

pub mod amadeus;
pub mod serpapi;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// One date-pair query, as handed to a provider.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub departure: String,
    pub destination: String,
    pub outbound: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {} on {}", self.departure, self.destination, self.outbound)?;
        if let Some(r) = self.return_date {
            write!(f, " returning {r}")?;
        }
        if self.adults > 1 {
            write!(f, " for {} adults", self.adults)?;
        }
        Ok(())
    }
}

/// Provider-shaped search result: a carrier-name lookup side-table plus
/// zero or more offer records.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Carrier code → display name.
    pub carriers: HashMap<String, String>,
    pub offers: Vec<RawOffer>,
}

impl ProviderResponse {
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Resolve a carrier code to a display name; the code itself is the
    /// fallback when the side-table has no entry.
    pub fn carrier_name(&self, code: &str) -> String {
        self.carriers
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

/// One priced offer before normalization.
#[derive(Debug, Clone)]
pub struct RawOffer {
    pub id: Option<String>,
    pub price: Decimal,
    /// One or more itinerary legs, each with one or more segments.
    pub itineraries: Vec<RawItinerary>,
}

#[derive(Debug, Clone)]
pub struct RawItinerary {
    /// ISO-8601 total duration, when the provider reports one.
    pub duration: Option<String>,
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Clone)]
pub struct RawSegment {
    pub carrier_code: String,
    pub departure_at: Option<String>,
    pub arrival_at: Option<String>,
}

/// Abstraction over flight-search providers.
///
/// Implementors perform exactly one request per date-pair query; the
/// core handles pagination-free results only. All calls are bounded by
/// the client's HTTP timeout.
#[async_trait]
pub trait FlightSearchProvider: Send + Sync {
    /// Search offers for one date-pair.
    async fn search(&self, query: &SearchQuery) -> Result<ProviderResponse>;

    /// Acquire/verify credentials. No-op for API-key providers.
    async fn authenticate(&self) -> Result<()>;

    /// Provider name for logging and identification.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
