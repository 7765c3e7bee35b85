//! Stafflow API server binary.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use stafflow_api::config::ApiConfig;
use stafflow_core::directory::postgres::PgDirectory;
use stafflow_core::oauth::client::HttpProviderClient;

/// CLI arguments, layered over the environment.
#[derive(Parser, Debug)]
#[command(name = "stafflow_api_server", about = "Stafflow API server")]
struct Args {
    /// Port to listen on (0 = ephemeral). Overrides BIND_ADDR's port.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/stafflow"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stafflow_api=debug,stafflow_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.database_url = args.database_url.clone();
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "127.0.0.1".into());
        config.bind_addr = format!("{host}:{port}");
    }

    info!(database_url = %config.database_url, bind_addr = %config.bind_addr, "starting stafflow_api_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    stafflow_api::migrate(&pool).await?;

    let state = stafflow_api::AppState::new(
        Arc::new(PgDirectory::new(pool)),
        Arc::new(HttpProviderClient::new()),
        config.clone(),
    );

    // Pending federated logins expire after 10 minutes; sweep them.
    let _cleanup = state.login_states.spawn_cleanup_task();

    let app = stafflow_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
