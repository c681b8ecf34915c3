//! Storefront service binary.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::Config;
use storefront::http::{self, AppState};
use storefront::services::{EventBus, Invoices, LogMailer, Mailer};
use storefront::store::postgres::PgStore;
use storefront::store::Store;

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

    let config = Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS connection failed, event publishing disabled");
                None
            }
        },
        None => None,
    };

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db));
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    let invoices = Arc::new(Invoices::new(&config.invoice_dir));
    let state = AppState::new(store, mailer, invoices, EventBus::new(nats), &config.currency);

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}
