//! MyWay LMS API server binary.
//!
//! Connects to PostgreSQL, applies the embedded migrations and serves the
//! REST API until interrupted.

use std::sync::Arc;

use clap::Parser;
use myway_api::config::ApiConfig;
use myway_core::auth::jwt::{DEFAULT_ACCESS_TOKEN_TTL_SECS, MAX_ACCESS_TOKEN_TTL_SECS};
use myway_core::repo::postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "myway_api_server", about = "MyWay LMS API server")]
struct Args {
    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/myway"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Access token lifetime in seconds.
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value_t = DEFAULT_ACCESS_TOKEN_TTL_SECS)]
    access_token_ttl_secs: i64,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,myway_api=debug,myway_core=debug")),
        )
        .init();

    let args = Args::parse();
    if !myway_api::config::valid_access_token_ttl(args.access_token_ttl_secs) {
        return Err(format!(
            "--access-token-ttl-secs must be between 1 and {MAX_ACCESS_TOKEN_TTL_SECS}"
        )
        .into());
    }

    info!(port = args.port, max_connections = args.max_connections, "starting myway_api_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    let store = PgStore::new(pool);
    info!("running database migrations");
    store.migrate().await?;

    // Environment supplies the secret; CLI flags override the rest.
    let config = ApiConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        pg_connection_url: args.database_url,
        access_token_ttl_secs: args.access_token_ttl_secs,
        ..ApiConfig::from_env()
    };

    let state = myway_api::AppState::new(Arc::new(store), config.clone());
    let app = myway_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
