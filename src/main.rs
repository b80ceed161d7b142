use clap::Parser;
use dotenv::dotenv;
use sea_orm::{ConnectOptions, Database};
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smshub::config::ServerConfig;
use smshub::{db, web};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging();
    info!("Starting server, version: {}", env!("CARGO_PKG_VERSION"));
    dotenv().ok();

    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load server configuration: {}", e);
            return Err(e.into());
        }
    };

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env file");
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(10);
    let db_pool = Database::connect(opt).await?;

    db::init_schema(&db_pool).await?;
    info!("Database schema ready");

    if server_config.twilio_account_sid.is_none() {
        info!("Twilio credentials not configured; /sms/send will fail until they are set");
    }

    let app = web::create_router(db_pool, server_config.clone());

    let listener = tokio::net::TcpListener::bind(&server_config.listen_addr).await?;
    info!("HTTP server listening on {}", server_config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
