//! # Holiday Monitor
//!
//! Runs the holiday pipeline in the role chosen by `--role` / `HM_ROLE`:
//! `all`, `scraper`, `user-pref` or `notifier`.

use anyhow::Result;
use lib_holiday::configs::load_settings;
use lib_holiday::loggers::setup_logging;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod monitor_logic;
use monitor_logic::{runtime, shutdown};

const APP_NAME: &str = "holiday_monitor";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = load_settings()?;
    let _guard = setup_logging(APP_NAME, settings.log_dir.as_deref(), &settings.log_level)?;

    info!(
        role = %settings.role,
        port = settings.port,
        instance = %settings.instance,
        redis = settings.redis_url.is_some(),
        "Holiday monitor starting"
    );

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        shutdown::shutdown_signal().await;
        warn!("Shutdown signal received, stopping pipeline");
        signal_token.cancel();
    });

    runtime::run(settings, token).await?;

    info!("Shutdown complete.");
    Ok(())
}
