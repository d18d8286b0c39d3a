//! IMI Commerce - e-commerce backend with PayU checkout

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imi_commerce::config::AppConfig;
use imi_commerce::events::EventPublisher;
use imi_commerce::http::{router, AppState};
use imi_commerce::payment::Reconciler;
use imi_commerce::store::postgres::{PgOrderStore, PgProductStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                None
            }
        },
        None => None,
    };

    let products = Arc::new(PgProductStore::new(db.clone()));
    let orders = Arc::new(PgOrderStore::new(db));
    let reconciler = Arc::new(Reconciler::new(
        config.payu.clone(),
        products.clone(),
        orders.clone(),
        EventPublisher::new(nats),
    )?);

    let state = AppState {
        products,
        orders,
        reconciler,
        frontend_url: config.payu.frontend_url.clone(),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("imi-commerce listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}
