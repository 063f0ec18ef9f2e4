//! HTTP server bootstrap for Breach Radar.
//!
//! This module wires together:
//! - configuration
//! - the storage backend (PostgreSQL or an in-memory fixture)
//! - the correlators
//! - the Axum router

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::api::handlers::{health_check, prometheus_metrics, readiness_check};
use crate::correlation::{CorrelationConfig, ExactMatchCorrelator, SensitiveCandidateCorrelator};
use crate::infra::{
    BreachCatalog, FieldColumnMap, FieldStore, InMemoryBreachStore, PgBreachCatalog, PgFieldStore,
};
use crate::metrics::MetricsRegistry;

/// Where breach data is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// JSON fixture loaded into memory
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "fixture" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("Unknown BREACH_STORE {other:?}, expected postgres or memory"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    pub store: StoreBackend,
    /// Fixture for the in-memory backend.
    pub fixture_path: PathBuf,
    pub migrate_on_startup: bool,
    pub correlation: CorrelationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/breach_radar".to_string());

        let port: u16 = env_or("PORT", 8080);
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {host}:{port}: {e}"))?;

        let store = match std::env::var("BREACH_STORE") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let fixture_path = std::env::var("BREACH_FIXTURE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("fixtures/breaches.json"));

        let migrate_on_startup = std::env::var("DB_MIGRATE_ON_STARTUP")
            .ok()
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "off"
                )
            })
            .unwrap_or(true);

        let defaults = CorrelationConfig::default();
        let correlation = CorrelationConfig {
            search_timeout: Duration::from_secs(env_or(
                "SEARCH_TIMEOUT_SECS",
                defaults.search_timeout.as_secs(),
            )),
            candidate_limit: env_or("PREFIX_CANDIDATE_LIMIT", defaults.candidate_limit),
            min_prefix_len: env_or("MIN_PREFIX_LEN", defaults.min_prefix_len),
            max_prefix_len: env_or("MAX_PREFIX_LEN", defaults.max_prefix_len),
            max_concurrent_queries: env_or(
                "MAX_CONCURRENT_QUERIES",
                defaults.max_concurrent_queries,
            ),
        };
        correlation.validate()?;

        Ok(Self {
            database_url,
            listen_addr,
            max_connections: env_or("MAX_DB_CONNECTIONS", 10),
            store,
            fixture_path,
            migrate_on_startup,
            correlation,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub exact: Arc<ExactMatchCorrelator>,
    pub sensitive: Arc<SensitiveCandidateCorrelator>,
    pub catalog: Arc<dyn BreachCatalog>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn BreachCatalog>,
        store: Arc<dyn FieldStore>,
        config: CorrelationConfig,
    ) -> Self {
        Self {
            exact: Arc::new(ExactMatchCorrelator::new(
                catalog.clone(),
                store.clone(),
                config.clone(),
            )),
            sensitive: Arc::new(SensitiveCandidateCorrelator::new(
                catalog.clone(),
                store,
                config,
            )),
            catalog,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// State backed by one in-memory store serving both ports.
    pub fn in_memory(store: InMemoryBreachStore, config: CorrelationConfig) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store, config)
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Breach Radar v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Store backend: {:?}", config.store);
    info!("  Search timeout: {:?}", config.correlation.search_timeout);
    info!(
        "  Prefix length: {}..={}",
        config.correlation.min_prefix_len, config.correlation.max_prefix_len
    );

    let state = match config.store {
        StoreBackend::Postgres => postgres_state(&config).await?,
        StoreBackend::Memory => {
            let store = InMemoryBreachStore::from_json_file(&config.fixture_path)?;
            AppState::in_memory(store, config.correlation.clone())
        }
    };

    let mut router = app(state);
    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Breach Radar is ready to accept connections");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Breach Radar stopped");
    Ok(())
}

/// Completes on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

async fn postgres_state(config: &Config) -> anyhow::Result<AppState> {
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to PostgreSQL");

    if config.migrate_on_startup {
        info!("Running database migrations...");
        crate::migrations::run_postgres(&pool).await?;
        info!("Database migrations applied");
    } else {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    let catalog = PgBreachCatalog::new(pool.clone());
    catalog.ping().await?;

    let columns = Arc::new(FieldColumnMap::standard());
    let store = PgFieldStore::new(pool, columns);

    Ok(AppState::new(
        Arc::new(catalog),
        Arc::new(store),
        config.correlation.clone(),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Full application router: `/api` plus the operational endpoints.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", crate::api::router())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    cors_layer(&origins)
}

fn cors_layer(origins: &str) -> anyhow::Result<Option<CorsLayer>> {
    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}
