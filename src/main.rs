//! Storefront - multi-vendor e-commerce backend

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::{
    api::{self, AppState},
    auth::JwtKeys,
    config::Config,
    publisher::EventPublisher,
    store::{seed_categories, MemoryStore, PgStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url, 10).await?;
            pg.migrate().await?;
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    seed_categories(store.as_ref()).await?;

    let state = AppState {
        store,
        jwt: Arc::new(JwtKeys::new(
            &config.jwt_secret,
            chrono::Duration::minutes(config.access_token_minutes),
            chrono::Duration::days(config.refresh_token_days),
        )),
        pricing: Arc::new(config.pricing.clone()),
        events: EventPublisher::connect(config.nats_url.as_deref()).await,
        payment_secret: config.payment_webhook_secret.as_deref().map(Arc::from),
    };
    if state.payment_secret.is_none() {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET not set, buyers may report their own payment status");
    }

    let app = api::router(state);
    tracing::info!("Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
