//! SerpAPI Google Flights integration.
//!
//! API-key authenticated alternative to Amadeus. SerpAPI reports airline
//! display names inline rather than via a code side-table, so this
//! binding derives carrier codes from flight numbers and builds the
//! side-table itself.
//!
//! API docs: https://serpapi.com/google-flights-api
//! Base URL: https://serpapi.com/search

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::{
    FlightSearchProvider, ProviderResponse, RawItinerary, RawOffer, RawSegment, SearchQuery,
};

const BASE_URL: &str = "https://serpapi.com/search";
const PROVIDER_NAME: &str = "serpapi";

// ---------------------------------------------------------------------------
// API response types (SerpAPI JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    best_flights: Vec<ApiFlightOption>,
}

/// One priced option. `flights` holds the individual legs.
#[derive(Debug, Deserialize)]
struct ApiFlightOption {
    #[serde(default)]
    price: Option<Decimal>,
    /// Total duration in minutes.
    #[serde(default)]
    total_duration: Option<i64>,
    #[serde(default)]
    flights: Vec<ApiLeg>,
    #[serde(default)]
    booking_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    #[serde(default)]
    airline: Option<String>,
    /// e.g. "DL 447"; the prefix is the carrier code.
    #[serde(default)]
    flight_number: Option<String>,
    #[serde(default)]
    departure_airport: Option<ApiAirport>,
    #[serde(default)]
    arrival_airport: Option<ApiAirport>,
}

#[derive(Debug, Deserialize)]
struct ApiAirport {
    #[serde(default)]
    time: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// SerpAPI Google Flights client.
pub struct SerpApiClient {
    http: Client,
    api_key: Secret<String>,
}

impl SerpApiClient {
    pub fn new(api_key: Secret<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("farewatch/0.1.0 (airfare-monitor)")
            .build()
            .context("Failed to build HTTP client for SerpAPI")?;

        Ok(Self { http, api_key })
    }

    /// Carrier code from a flight number like "DL 447".
    fn carrier_code(leg: &ApiLeg) -> Option<String> {
        leg.flight_number
            .as_deref()
            .and_then(|fnum| fnum.split_whitespace().next())
            .map(str::to_string)
    }

    /// Render minutes as an ISO-8601 duration, e.g. 377 → "PT6H17M".
    fn minutes_to_iso8601(minutes: i64) -> String {
        let hours = minutes / 60;
        let mins = minutes % 60;
        match (hours, mins) {
            (0, m) => format!("PT{m}M"),
            (h, 0) => format!("PT{h}H"),
            (h, m) => format!("PT{h}H{m}M"),
        }
    }

    /// Convert a SerpAPI payload into the provider-agnostic shape.
    ///
    /// Options without a price are dropped. Each option becomes one
    /// offer with a single itinerary whose segments are the legs.
    fn to_provider_response(resp: SearchResponse) -> ProviderResponse {
        let mut carriers = HashMap::new();
        let mut offers = Vec::with_capacity(resp.best_flights.len());

        for option in resp.best_flights {
            let Some(price) = option.price else {
                continue;
            };

            let segments: Vec<RawSegment> = option
                .flights
                .iter()
                .map(|leg| {
                    let airline = leg.airline.clone().unwrap_or_default();
                    let code = Self::carrier_code(leg)
                        .unwrap_or_else(|| airline.clone());
                    if !airline.is_empty() {
                        carriers.entry(code.clone()).or_insert(airline);
                    }
                    RawSegment {
                        carrier_code: code,
                        departure_at: leg
                            .departure_airport
                            .as_ref()
                            .and_then(|a| a.time.clone()),
                        arrival_at: leg
                            .arrival_airport
                            .as_ref()
                            .and_then(|a| a.time.clone()),
                    }
                })
                .collect();

            offers.push(RawOffer {
                id: option.booking_token,
                price,
                itineraries: vec![RawItinerary {
                    duration: option.total_duration.map(Self::minutes_to_iso8601),
                    segments,
                }],
            });
        }

        ProviderResponse { carriers, offers }
    }
}

// ---------------------------------------------------------------------------
// FlightSearchProvider trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl FlightSearchProvider for SerpApiClient {
    async fn search(&self, query: &SearchQuery) -> Result<ProviderResponse> {
        // type=1 is round trip, type=2 is one way
        let trip_type = if query.return_date.is_some() { "1" } else { "2" };

        let mut url = format!(
            "{BASE_URL}?engine=google_flights&departure_id={}&arrival_id={}\
             &outbound_date={}&currency=USD&hl=en&adults={}&type={trip_type}&api_key={}",
            urlencoding::encode(&query.departure),
            urlencoding::encode(&query.destination),
            query.outbound.format("%Y-%m-%d"),
            query.adults,
            urlencoding::encode(self.api_key.expose_secret()),
        );
        if let Some(r) = query.return_date {
            url.push_str(&format!("&return_date={}", r.format("%Y-%m-%d")));
        }

        debug!(query = %query, "Searching SerpAPI Google Flights");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("SerpAPI search request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("SerpAPI search error {status}: {body}");
        }

        let payload: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse SerpAPI response")?;

        Ok(Self::to_provider_response(payload))
    }

    /// SerpAPI has no token exchange; the key is validated on first use.
    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
