use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paygate::adapters::auth::JwtSessionValidator;
use paygate::adapters::http::{app_router, PaymentAppState};
use paygate::adapters::memory::InMemoryPaymentStore;
use paygate::adapters::postgres::{PostgresIdempotencyStore, PostgresTransactionLedger};
use paygate::config::{AppConfig, ServerConfig, StorageBackend};
use paygate::ports::{IdempotencyStore, TransactionLedger};

type Stores = (Arc<dyn TransactionLedger>, Arc<dyn IdempotencyStore>);

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.json_logs() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn open_stores(config: &AppConfig) -> Result<Stores, Box<dyn Error>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; transactions are lost on restart");
            let store = InMemoryPaymentStore::new();
            Ok((Arc::new(store.clone()), Arc::new(store)))
        }
        StorageBackend::Postgres => {
            let pool = config
                .database
                .pool_options()
                .connect(&config.database.url)
                .await?;
            tracing::info!("Database pool created");

            if config.database.run_migrations {
                sqlx::migrate!().run(&pool).await?;
                tracing::info!("Database migrations completed");
            }

            Ok((
                Arc::new(PostgresTransactionLedger::new(pool.clone())),
                Arc::new(PostgresIdempotencyStore::new(pool)),
            ))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let (ledger, idempotency_store) = open_stores(&config).await?;

    let mode = config.payment.provider_mode();
    if mode.is_simulated() {
        tracing::warn!("No payment provider key configured; running in simulation mode");
    }
    let provider = mode.into_provider()?;

    let mut validator = JwtSessionValidator::new(config.auth.jwt_secret.clone())
        .with_leeway(config.auth.leeway_secs);
    if let Some(issuer) = &config.auth.jwt_issuer {
        validator = validator.with_issuer(issuer.as_str());
    }

    let state = PaymentAppState {
        ledger,
        idempotency_store,
        provider,
        settings: config.payment.settings()?,
    };
    let app = app_router(state, Arc::new(validator), &config.server.http_options());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "PayGate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
