//! Storefront Orders - cart, checkout and order service

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_orders::config::Config;
use storefront_orders::http::{router, AppState};
use storefront_orders::service::NotificationOutbox;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events disabled");
                None
            }
        },
        None => None,
    };

    // Outbox dispatcher: turns queued notifications into sent/failed ones.
    let outbox = NotificationOutbox::new(db.clone());
    let interval = Duration::from_secs(config.notification_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = outbox.dispatch_pending().await {
                tracing::warn!(error = %e, "notification dispatch pass failed");
            }
        }
    });

    let port = config.port;
    let state = AppState { db, nats, config: Arc::new(config) };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("storefront-orders listening on 0.0.0.0:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
