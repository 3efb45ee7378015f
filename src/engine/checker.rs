//! Per-route check orchestration.
//!
//! One `check_route` call runs a route's full cycle: expand the date
//! strategy, query the provider per combination with a fixed delay
//! between requests, normalize and evaluate the offers, replace the
//! route's snapshot, and dispatch at most one alert.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::engine::evaluator::DealEvaluator;
use crate::engine::{expander, offers};
use crate::notify::Notifier;
use crate::providers::{FlightSearchProvider, SearchQuery};
use crate::state::SnapshotStore;
use crate::types::{AlertEvent, RouteSnapshot, RouteSpec, TrackerError};

pub struct RouteChecker {
    provider: Arc<dyn FlightSearchProvider>,
    notifier: Arc<dyn Notifier>,
    store: SnapshotStore,
    /// Pause between consecutive provider requests within one route.
    request_delay: Duration,
    allow_day_trips: bool,
}

impl RouteChecker {
    pub fn new(
        provider: Arc<dyn FlightSearchProvider>,
        notifier: Arc<dyn Notifier>,
        store: SnapshotStore,
        request_delay: Duration,
        allow_day_trips: bool,
    ) -> Self {
        RouteChecker {
            provider,
            notifier,
            store,
            request_delay,
            allow_day_trips,
        }
    }

    /// Check one route against today's calendar. Returns whether an
    /// alert was dispatched.
    pub async fn check_route(&self, route: &RouteSpec) -> Result<bool> {
        self.check_route_on(route, Utc::now().date_naive()).await
    }

    /// Check one route against a fixed reference date.
    ///
    /// A failed date-pair query is skipped; the rest of the route's
    /// combinations still run. The snapshot is replaced wholesale at the
    /// end of the cycle, except when expansion yields no combinations,
    /// in which case the previous snapshot is left untouched.
    pub async fn check_route_on(
        &self,
        route: &RouteSpec,
        today: chrono::NaiveDate,
    ) -> Result<bool> {
        let combos = expander::expand(route, today, self.allow_day_trips);
        if combos.is_empty() {
            warn!(route = %route.label(), "No date combinations to check, keeping previous snapshot");
            return Ok(false);
        }

        info!(
            route = %route.label(),
            combinations = combos.len(),
            "Checking route"
        );

        let mut evaluator = DealEvaluator::new(route.max_price, route.adults);

        for (i, combo) in combos.iter().enumerate() {
            let query = SearchQuery {
                departure: route.departure.clone(),
                destination: route.destination.clone(),
                outbound: combo.outbound,
                return_date: combo.return_date,
                adults: route.adults,
            };

            match self.provider.search(&query).await {
                Ok(resp) => {
                    let normalized =
                        offers::normalize(&resp, route.allowed_airlines.as_deref());
                    evaluator.observe(combo, &normalized);
                }
                Err(e) => {
                    let err = TrackerError::Search {
                        provider: self.provider.name().to_string(),
                        message: format!("{e:#}"),
                    };
                    warn!(
                        route = %route.label(),
                        combination = %combo,
                        error = %err,
                        "Skipping combination"
                    );
                }
            }

            // Delay only between requests, not after the last one.
            if i + 1 < combos.len() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        let outcome = evaluator.finish();
        let snapshot = RouteSnapshot::from_flights(route, outcome.flights);
        info!(route = %route.label(), snapshot = %snapshot, "Cycle complete");
        self.store.replace_route(route.key(), snapshot).await;

        let Some(best) = outcome.best else {
            return Ok(false);
        };

        let alert = AlertEvent::new(route, &best.combo, &best.offer);
        info!(alert = %alert, "Deal found");
        if let Err(e) = self.notifier.send_alert(&alert).await {
            // Delivery failure never fails the cycle.
            error!(route = %route.label(), error = %e, "Alert delivery failed");
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
