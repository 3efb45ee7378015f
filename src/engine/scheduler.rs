//! Polling scheduler.
//!
//! Drives the tracker lifecycle: authenticate once, announce startup,
//! then loop forever checking every route sequentially and sleeping a
//! fixed interval between cycles. Cycle start times drift by however
//! long the checks take; there is no catch-up.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use crate::config::{AppConfig, ConfigWatcher};
use crate::engine::checker::RouteChecker;
use crate::engine::expander;
use crate::notify::Notifier;
use crate::providers::FlightSearchProvider;
use crate::state::SnapshotStore;
use crate::types::{RouteSummary, TrackerError, TrackerPhase};

pub struct PollingScheduler {
    provider: Arc<dyn FlightSearchProvider>,
    notifier: Arc<dyn Notifier>,
    store: SnapshotStore,
    config: AppConfig,
    watcher: ConfigWatcher,
}

impl PollingScheduler {
    pub fn new(
        provider: Arc<dyn FlightSearchProvider>,
        notifier: Arc<dyn Notifier>,
        store: SnapshotStore,
        config: AppConfig,
        watcher: ConfigWatcher,
    ) -> Self {
        PollingScheduler {
            provider,
            notifier,
            store,
            config,
            watcher,
        }
    }

    /// Run until Ctrl-C. Returns an error only when authentication
    /// fails; everything after that point is recovered per-route.
    pub async fn run(mut self) -> Result<()> {
        self.authenticate().await?;
        self.announce_running().await;
        self.log_request_volume();

        loop {
            self.reload_if_changed().await;
            self.run_cycle().await;

            let pause = Duration::from_secs(self.config.check_interval_hours * 3600);
            info!(hours = self.config.check_interval_hours, "Cycle finished, sleeping");
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
            }
        }
    }

    /// Exchange credentials before the first cycle. A failure is
    /// announced over the webhook and ends the process.
    async fn authenticate(&self) -> Result<()> {
        let provider = self.provider.name().to_string();
        self.store
            .update_status(|s| {
                s.phase = TrackerPhase::Authenticating;
                s.status = "authenticating".to_string();
                s.message = format!("Authenticating with {provider}");
            })
            .await;

        if let Err(e) = self.provider.authenticate().await {
            let err = TrackerError::Auth {
                provider,
                message: format!("{e:#}"),
            };
            let message = err.to_string();
            self.store
                .update_status(move |s| {
                    s.kind = "status".to_string();
                    s.phase = TrackerPhase::AuthFailed;
                    s.status = "auth_failed".to_string();
                    s.message = message;
                })
                .await;
            let status = self.store.status().await;
            if let Err(de) = self.notifier.send_status(&status).await {
                error!(error = %de, "Failed to deliver auth-failure status");
            }
            return Err(err.into());
        }

        info!(provider = self.provider.name(), "Authenticated");
        Ok(())
    }

    async fn announce_running(&self) {
        self.store
            .update_status(|s| {
                s.kind = "startup".to_string();
                s.phase = TrackerPhase::Running;
                s.status = "running".to_string();
                s.message = "Tracker running".to_string();
            })
            .await;
        if let Err(e) = self.notifier.send_status(&self.store.status().await).await {
            error!(error = %e, "Failed to deliver startup status");
        }
    }

    fn log_request_volume(&self) {
        let estimate = expander::estimated_requests_per_cycle(
            &self.config.routes,
            Utc::now().date_naive(),
            self.config.allow_day_trips,
        );
        info!(
            routes = self.config.routes.len(),
            estimated_requests = estimate,
            "Per-cycle provider request volume"
        );
    }

    /// Swap in an edited config file, keeping the running one when the
    /// edit fails to load.
    async fn reload_if_changed(&mut self) {
        match self.watcher.poll() {
            None => {}
            Some(Err(e)) => {
                error!(error = %e, "Config reload failed, keeping previous config");
            }
            Some(Ok(new)) => {
                info!(routes = new.routes.len(), "Config file changed, reloaded");
                self.config = new;
                self.log_request_volume();

                let routes: Vec<RouteSummary> =
                    self.config.routes.iter().map(RouteSummary::from).collect();
                let interval = self.config.check_interval_hours;
                self.store
                    .update_status(move |s| {
                        s.kind = "status".to_string();
                        s.status = "config_reloaded".to_string();
                        s.message = format!("Configuration reloaded: {} route(s)", routes.len());
                        s.routes_tracked = routes.len();
                        s.routes = routes;
                        s.check_interval_hours = interval;
                    })
                    .await;
                if let Err(e) = self.notifier.send_status(&self.store.status().await).await {
                    error!(error = %e, "Failed to deliver reload status");
                }
            }
        }
    }

    /// Check every route once, in config order. A route that errors is
    /// logged and skipped; the cycle always completes.
    async fn run_cycle(&self) {
        let now = Utc::now();
        let next = now + chrono::Duration::hours(self.config.check_interval_hours as i64);
        self.store
            .update_status(move |s| {
                s.last_check = Some(now);
                s.next_check = Some(next);
            })
            .await;

        let checker = RouteChecker::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.notifier),
            self.store.clone(),
            Duration::from_secs(self.config.request_delay_secs),
            self.config.allow_day_trips,
        );

        for route in &self.config.routes {
            match checker.check_route(route).await {
                Ok(alerted) => {
                    info!(route = %route.label(), alerted, "Route checked");
                }
                Err(e) => {
                    let err = TrackerError::Route {
                        route: route.label(),
                        message: format!("{e:#}"),
                    };
                    error!(error = %err, "Continuing with next route");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
