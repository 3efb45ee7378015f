//! Amadeus Flight Offers Search integration.
//!
//! OAuth2 client-credentials flow with an in-memory token cache; the
//! token is refreshed 60 seconds before its reported expiry.
//!
//! API docs: https://developers.amadeus.com/self-service
//! Base URL: https://test.api.amadeus.com
//! Auth: `Authorization: Bearer {token}` on every search request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    FlightSearchProvider, ProviderResponse, RawItinerary, RawOffer, RawSegment, SearchQuery,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const AUTH_URL: &str = "https://test.api.amadeus.com/v1/security/oauth2/token";
const SEARCH_URL: &str = "https://test.api.amadeus.com/v2/shopping/flight-offers";
const PROVIDER_NAME: &str = "amadeus";

/// Top-N offers requested per date-pair query.
const MAX_RESULTS: u32 = 10;

/// Refresh the token this many seconds before its reported expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// API response types (Amadeus JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds until expiry. Amadeus issues 1799 by default.
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    1799
}

/// Amadeus flight-offers response. Only the fields we need.
#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<ApiOffer>,
    #[serde(default)]
    dictionaries: Option<Dictionaries>,
}

#[derive(Debug, Deserialize)]
struct Dictionaries {
    /// Carrier code → display name side-table.
    #[serde(default)]
    carriers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiOffer {
    #[serde(default)]
    id: Option<String>,
    price: ApiPrice,
    #[serde(default)]
    itineraries: Vec<ApiItinerary>,
}

#[derive(Debug, Deserialize)]
struct ApiPrice {
    /// Decimal total serialized as a string, e.g. "234.50".
    total: String,
}

#[derive(Debug, Deserialize)]
struct ApiItinerary {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    segments: Vec<ApiSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSegment {
    #[serde(default)]
    carrier_code: String,
    #[serde(default)]
    departure: Option<ApiEndpoint>,
    #[serde(default)]
    arrival: Option<ApiEndpoint>,
}

#[derive(Debug, Deserialize)]
struct ApiEndpoint {
    #[serde(default)]
    at: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Amadeus platform client with OAuth2 token caching.
pub struct AmadeusClient {
    http: Client,
    api_key: Secret<String>,
    api_secret: Secret<String>,
    token: Mutex<Option<CachedToken>>,
}

impl AmadeusClient {
    pub fn new(api_key: Secret<String>, api_secret: Secret<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("farewatch/0.1.0 (airfare-monitor)")
            .build()
            .context("Failed to build HTTP client for Amadeus")?;

        Ok(Self {
            http,
            api_key,
            api_secret,
            token: Mutex::new(None),
        })
    }

    /// Get a valid access token, exchanging credentials if the cached
    /// one is missing or about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        let now = Utc::now();

        if let Some(cached) = guard.as_ref() {
            if cached.is_valid(now) {
                return Ok(cached.value.clone());
            }
        }

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.api_key.expose_secret().as_str()),
            ("client_secret", self.api_secret.expose_secret().as_str()),
        ];

        let resp = self
            .http
            .post(AUTH_URL)
            .timeout(std::time::Duration::from_secs(10))
            .form(&params)
            .send()
            .await
            .context("Amadeus token request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Amadeus token exchange failed {status}: {body}");
        }

        let token: TokenResponse = resp
            .json()
            .await
            .context("Failed to parse Amadeus token response")?;

        let expires_at =
            now + Duration::seconds(token.expires_in - TOKEN_EXPIRY_MARGIN_SECS);
        let value = token.access_token.clone();
        *guard = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });

        info!("Amadeus access token obtained");
        Ok(value)
    }

    /// Convert an Amadeus offers payload into the provider-agnostic shape.
    ///
    /// Offers whose price total fails to parse are dropped with a log.
    fn to_provider_response(resp: OffersResponse) -> ProviderResponse {
        let carriers = resp
            .dictionaries
            .map(|d| d.carriers)
            .unwrap_or_default();

        let mut offers = Vec::with_capacity(resp.data.len());
        for offer in resp.data {
            let price = match offer.price.total.parse() {
                Ok(p) => p,
                Err(e) => {
                    warn!(
                        offer_id = ?offer.id,
                        total = %offer.price.total,
                        error = %e,
                        "Skipping Amadeus offer with unparseable price"
                    );
                    continue;
                }
            };

            let itineraries = offer
                .itineraries
                .into_iter()
                .map(|it| RawItinerary {
                    duration: it.duration,
                    segments: it
                        .segments
                        .into_iter()
                        .map(|s| RawSegment {
                            carrier_code: s.carrier_code,
                            departure_at: s.departure.and_then(|d| d.at),
                            arrival_at: s.arrival.and_then(|a| a.at),
                        })
                        .collect(),
                })
                .collect();

            offers.push(RawOffer {
                id: offer.id,
                price,
                itineraries,
            });
        }

        ProviderResponse { carriers, offers }
    }
}

// ---------------------------------------------------------------------------
// FlightSearchProvider trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl FlightSearchProvider for AmadeusClient {
    async fn search(&self, query: &SearchQuery) -> Result<ProviderResponse> {
        let token = self.access_token().await?;

        let outbound = query.outbound.format("%Y-%m-%d").to_string();
        let adults = query.adults.to_string();
        let max = MAX_RESULTS.to_string();
        let mut params = vec![
            ("originLocationCode", query.departure.as_str()),
            ("destinationLocationCode", query.destination.as_str()),
            ("departureDate", outbound.as_str()),
            ("adults", adults.as_str()),
            ("currencyCode", "USD"),
            ("max", max.as_str()),
        ];

        let return_date = query
            .return_date
            .map(|r| r.format("%Y-%m-%d").to_string());
        if let Some(r) = return_date.as_deref() {
            params.push(("returnDate", r));
        }

        debug!(query = %query, "Searching Amadeus flight offers");

        let resp = self
            .http
            .get(SEARCH_URL)
            .query(&params)
            .bearer_auth(token)
            .send()
            .await
            .context("Amadeus search request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Amadeus search error {status}: {body}");
        }

        let payload: OffersResponse = resp
            .json()
            .await
            .context("Failed to parse Amadeus flight-offers response")?;

        Ok(Self::to_provider_response(payload))
    }

    async fn authenticate(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
