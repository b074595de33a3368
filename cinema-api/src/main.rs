use anyhow::Context;
use cinema_api::{app, middleware::CircuitBreaker, worker, AppState};
use cinema_catalog::{InMemoryShowtimeCatalog, InventoryManager, Showtime, ShowtimeCatalog};
use cinema_core::{Clock, SystemClock};
use cinema_order::{
    BookingConfig, BookingService, InMemoryLedger, MockPaymentGateway, ReservationRepository,
};
use cinema_store::{Config, LedgerBackend, RedisReservationRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema_api=debug,cinema_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting cinema API on port {}", config.server.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let rules = &config.business_rules;

    let seeds: Vec<Showtime> = config.showtimes.iter().cloned().map(Showtime::from).collect();
    tracing::info!("Seeding catalog with {} showtimes", seeds.len());
    let catalog: Arc<dyn ShowtimeCatalog> =
        Arc::new(InMemoryShowtimeCatalog::with_showtimes(seeds).context("Invalid showtime seed")?);

    let ledger: Arc<dyn ReservationRepository> = match config.ledger.backend {
        LedgerBackend::Memory => {
            tracing::warn!("Using in-memory ledger; reservations are lost on restart");
            Arc::new(InMemoryLedger::new())
        }
        LedgerBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .context("ledger.backend = \"redis\" requires a [redis] section")?;
            let repo = RedisReservationRepository::new(&redis.url, &redis.key_prefix)
                .await
                .context("Failed to connect to Redis")?;
            Arc::new(repo)
        }
    };

    let hold_ttl = rules.seat_hold_ttl().context("Invalid seat hold TTL")?;
    let inventory = Arc::new(InventoryManager::new(clock.clone(), hold_ttl));

    let (sse_tx, _) = tokio::sync::broadcast::channel(256);

    let bookings = Arc::new(
        BookingService::new(
            inventory,
            catalog.clone(),
            ledger,
            Arc::new(MockPaymentGateway::new()),
            clock,
            BookingConfig {
                code_attempts: rules.code_attempts,
                payment_timeout: Duration::from_secs(rules.payment_timeout_seconds),
            },
        )
        .with_events(sse_tx.clone()),
    );

    tokio::spawn(worker::start_hold_sweeper(
        bookings.clone(),
        Duration::from_secs(rules.sweep_interval_seconds.max(1)),
    ));

    let breaker = CircuitBreaker::new(
        "reservations",
        config.resiliency.failure_threshold,
        Duration::from_secs(config.resiliency.reset_timeout_seconds),
    );
    let app = app(AppState::new(bookings, catalog, sse_tx, breaker));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
