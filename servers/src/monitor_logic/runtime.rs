//! # Role Runtime
//!
//! Starts the stages selected by the process role and serves their HTTP routes until the
//! shutdown token fires.
//!
//! Consumers subscribe before the poller starts, so the first cycle's detections already
//! have a group to land in.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use lib_holiday::bus::matcher_consumer;
use lib_holiday::configs::MonitorSettings;
use lib_holiday::pipeline::{spawn_dispatcher, spawn_matcher, spawn_poller};
use lib_holiday::poller::HolidayPoller;
use lib_holiday::realtime::api::{cors_layer, health_routes, subscription_routes};
use lib_holiday::realtime::hub::notification_routes;
use lib_holiday::realtime::{ConnectionRegistry, NotificationDispatcher};
use lib_holiday::retrieve::nager_date::NagerDateClient;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::backends;

pub async fn run(settings: MonitorSettings, shutdown: CancellationToken) -> Result<()> {
    let backends = backends::connect(&settings).await?;
    let options = settings.consumer_options();
    let role = settings.role;

    let mut tasks = Vec::new();
    let mut router = health_routes();

    // --- Phase 1: Consumers ---
    if role.runs_dispatcher() {
        let dispatcher = Arc::new(NotificationDispatcher::new(Arc::new(ConnectionRegistry::new())));
        tasks.push(
            spawn_dispatcher(
                Arc::clone(&backends.bus),
                Arc::clone(&dispatcher),
                &settings.instance,
                options,
                shutdown.clone(),
            )
            .await
            .context("dispatcher subscription failed")?,
        );
        router = router.merge(notification_routes(dispatcher, shutdown.clone()));
    }

    if role.runs_matcher() {
        tasks.push(
            spawn_matcher(
                Arc::clone(&backends.bus),
                Arc::clone(&backends.store),
                &matcher_consumer(&settings.instance),
                options,
                shutdown.clone(),
            )
            .await
            .context("matcher subscription failed")?,
        );
        router = router.merge(subscription_routes(Arc::clone(&backends.store)));
    }

    // --- Phase 2: Poller ---
    if role.runs_poller() {
        let source = NagerDateClient::new(&settings.holiday_api_base_url, settings.http_max_retries)
            .context("holiday API client")?;
        let poller = HolidayPoller::new(Arc::new(source), Arc::clone(&backends.bus), settings.poller_config());
        tasks.push(spawn_poller(Arc::new(poller), shutdown.clone()));
    }

    // --- Phase 3: HTTP ---
    if role.serves_http() {
        let app = router.layer(cors_layer(&settings.cors_origins));
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;
        info!(%addr, %role, "HTTP server listening");

        let token = shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .context("HTTP server failed")?;
    } else {
        info!(%role, "Running without HTTP surface");
        shutdown.cancelled().await;
    }

    // --- Phase 4: Drain ---
    shutdown.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "Pipeline task ended abnormally");
        }
    }
    Ok(())
}
