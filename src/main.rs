//! FAREWATCH — airfare price monitor.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the selected flight-search provider, spawns the status server,
//! and hands control to the polling scheduler until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use farewatch::config::{AppConfig, ConfigWatcher, ProviderKind};
use farewatch::engine::scheduler::PollingScheduler;
use farewatch::notify::WebhookNotifier;
use farewatch::providers::amadeus::AmadeusClient;
use farewatch::providers::serpapi::SerpApiClient;
use farewatch::providers::FlightSearchProvider;
use farewatch::server;
use farewatch::state::SnapshotStore;
use farewatch::types::TrackerStatus;

const BANNER: &str = r#"
 _____ _    ____  _____ __        ___  _____ ____ _   _
|  ___/ \  |  _ \| ____|\ \      / / \|_   _/ ___| | | |
| |_ / _ \ | |_) |  _|   \ \ /\ / / _ \ | || |   | |_| |
|  _/ ___ \|  _ <| |___   \ V  V / ___ \| || |___|  _  |
|_|/_/   \_\_| \_\_____|   \_/\_/_/   \_\_| \____|_| |_|

  Airfare price monitor
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        PathBuf::from(std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string()));
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path.display(),
        routes = cfg.routes.len(),
        check_interval_hours = cfg.check_interval_hours,
        web_port = cfg.web_port,
        "FAREWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let provider: Arc<dyn FlightSearchProvider> = match cfg.provider {
        ProviderKind::Amadeus => {
            let (key, secret) = cfg.amadeus_credentials()?;
            Arc::new(AmadeusClient::new(key, secret)?)
        }
        ProviderKind::SerpApi => Arc::new(SerpApiClient::new(cfg.serpapi_key()?)?),
    };
    info!(provider = provider.name(), "Flight-search provider ready");

    let notifier = Arc::new(WebhookNotifier::new(cfg.webhook_url.clone())?);
    let store = SnapshotStore::new(TrackerStatus::startup(&cfg.routes, cfg.check_interval_hours));

    server::spawn_status_server(store.clone(), cfg.web_port)?;

    // -- Main loop ---------------------------------------------------------

    let watcher = ConfigWatcher::new(&config_path);
    let scheduler = PollingScheduler::new(provider, notifier, store, cfg, watcher);
    scheduler.run().await?;

    info!("FAREWATCH shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("farewatch=info"));

    let json_logging = std::env::var("FAREWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
