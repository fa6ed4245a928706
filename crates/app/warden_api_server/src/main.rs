//! Warden API server binary.
//!
//! Wires the Postgres user store, the credential cache (Redis when
//! `REDIS_URL` is set, in-process otherwise) and the optional upstream
//! client into the axum router, then serves until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use warden_api::config::{ApiConfig, UpstreamConfig};
use warden_core::auth::{Authenticator, TokenCodec};
use warden_core::cache::CredentialCache;
use warden_core::cache::memory::MemoryCredentialCache;
use warden_core::cache::redis::RedisCredentialCache;
use warden_core::store::postgres::PgUserStore;
use warden_core::upstream::{AuthorizedClient, ClientCredentials};

/// How often the in-process cache drops expired entries.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "warden_api_server", about = "Warden API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/warden"
    )]
    database_url: String,

    /// Redis URL for the shared credential cache. Without it, an
    /// in-process cache is used (single instance only).
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Bound on a single durable read during a request, in milliseconds.
    #[arg(
        long,
        env = "STORE_READ_TIMEOUT_MS",
        default_value_t = warden_api::config::DEFAULT_STORE_READ_TIMEOUT_MS
    )]
    store_read_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,warden_api=debug,warden_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    info!(bind = %args.bind, max_connections = args.max_connections, "starting warden_api_server");

    let config = ApiConfig {
        bind_addr: args.bind,
        pg_connection_url: args.database_url,
        redis_url: args.redis_url.filter(|v| !v.is_empty()),
        jwt_secret: warden_core::auth::jwt::resolve_jwt_secret(),
        store_read_timeout: Duration::from_millis(args.store_read_timeout_ms),
        upstream: UpstreamConfig::from_env(),
    };

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;
    let store = Arc::new(PgUserStore::new(pool));

    let cache: Arc<dyn CredentialCache> = match &config.redis_url {
        Some(url) => {
            info!("using redis credential cache");
            Arc::new(RedisCredentialCache::connect(url).await?)
        }
        None => {
            warn!("REDIS_URL not set, using in-process credential cache");
            let cache = Arc::new(MemoryCredentialCache::new());
            cache.spawn_cleanup_task(CACHE_SWEEP_INTERVAL);
            cache as Arc<dyn CredentialCache>
        }
    };

    let codec = TokenCodec::new(config.jwt_secret.as_bytes())?;
    let auth = Authenticator::new(codec, store, cache).with_read_timeout(config.store_read_timeout);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let upstream = config.upstream.as_ref().map(|up| {
        info!(token_url = %up.token_url, "upstream client credentials configured");
        let credentials = ClientCredentials::new(
            http.clone(),
            up.token_url.clone(),
            up.client_id.clone(),
            up.client_secret.clone(),
        );
        AuthorizedClient::new(http.clone(), Arc::new(credentials))
    });

    let state = warden_api::AppState {
        auth: Arc::new(auth),
        upstream,
    };
    let app = warden_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
