use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use configuration::{AccountSettings, Config, StorageBackend};
use database::PgLedgerStore;
use executor::{Instruments, Portfolio, TradeExecutor};
use ledger::{LedgerStore, MemoryStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub executor: TradeExecutor,
    pub portfolio: Portfolio,
    pub instruments: Instruments,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, account: AccountSettings) -> Self {
        Self {
            executor: TradeExecutor::new(store.clone()),
            portfolio: Portfolio::new(store.clone(), account),
            instruments: Instruments::new(store),
        }
    }
}

/// Opens the ledger store named by `storage.backend`. PostgreSQL is
/// migrated before it is handed out.
pub async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn LedgerStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory ledger; all state is lost on exit.");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = database::connect(&config.database).await?;
            database::run_migrations(&pool).await?;
            Ok(Arc::new(PgLedgerStore::new(pool)))
        }
    }
}

/// Every API route, with CORS and request tracing applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/instruments",
            get(handlers::list_instruments).post(handlers::create_instrument),
        )
        .route("/api/instruments/:symbol", get(handlers::get_instrument))
        .route("/api/instruments/:symbol/price", put(handlers::update_price))
        .route("/api/accounts", post(handlers::open_account))
        .route("/api/accounts/:account_id", get(handlers::get_account))
        .route("/api/accounts/:account_id/buy", post(handlers::buy))
        .route("/api/accounts/:account_id/sell", post(handlers::sell))
        .route("/api/accounts/:account_id/revalue", post(handlers::revalue))
        .route("/api/accounts/:account_id/positions", get(handlers::positions))
        .route(
            "/api/accounts/:account_id/transactions",
            get(handlers::transactions),
        )
        .route("/api/accounts/:account_id/lots", get(handlers::lots))
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// The main function to configure and run the web server.
///
/// Tracing must already be initialized by the caller.
pub async fn run_server(config: &Config, addr: SocketAddr) -> anyhow::Result<()> {
    let store = build_store(config).await?;
    let app_state = Arc::new(AppState::new(store, config.account.clone()));
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
