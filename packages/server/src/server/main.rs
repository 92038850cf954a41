use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify_core::core::{
    default_scheduler_fn, DriverRegistry, Engine, EngineConfig, InFlightSet, Lifecycle,
};
use notify_core::drivers::{EchoDriver, HttpDriver, SmsDriver, TelegramDriver};
use notify_core::store::PostgresStore;
use notify_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twilio::SmsOptions;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notify_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting notify-server");

    let config = Config::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("migrations complete");

    let mut registry = DriverRegistry::new().register(Arc::new(EchoDriver)).register(Arc::new(HttpDriver::new()));

    if let (Ok(account_sid), Ok(auth_token), Ok(from)) = (
        env::var("TWILIO_ACCOUNT_SID"),
        env::var("TWILIO_AUTH_TOKEN"),
        env::var("TWILIO_FROM_NUMBER"),
    ) {
        registry = registry.register(Arc::new(SmsDriver::new(SmsOptions {
            account_sid,
            auth_token,
            from,
        })));
        tracing::info!("sms driver registered");
    }

    if let Ok(bot_token) = env::var("TELEGRAM_BOT_TOKEN") {
        registry = registry.register(Arc::new(TelegramDriver::new(bot_token, HashMap::new())));
        tracing::info!("telegram driver registered");
    }

    let registry = Arc::new(registry);
    let store = Arc::new(PostgresStore::new(pool));
    let inflight = Arc::new(InFlightSet::new(config.max_threads as usize));

    let lifecycle = Arc::new(Lifecycle::new(
        store.clone(),
        registry.clone(),
        inflight.clone(),
        config.max_tries,
    ));

    let engine = Engine::start(
        store,
        registry,
        inflight,
        default_scheduler_fn(),
        EngineConfig {
            max_threads: config.max_threads,
            max_tries: config.max_tries,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        },
    );

    let app = notify_core::server::build_app(lifecycle);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind to address")?;
    tracing::info!(%addr, "listening");

    let shutdown_deadline = Duration::from_secs(config.shutdown_deadline_secs);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    engine.shutdown(shutdown_deadline).await;
    tracing::info!("shutdown complete");

    Ok(())
}
