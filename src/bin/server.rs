use academy_server::collector::collection_service;
use academy_server::db;
use academy_server::server::config::ServerConfig;
use academy_server::version::VERSION;
use academy_server::web::{self, AppState};

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const RATE_LIMIT_SWEEP_SECS: u64 = 300;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // JSON to a daily-rotated file, human-readable to stdout.
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mongodb=warn,tower_http=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

fn spawn_rate_limit_sweeper(app_state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(RATE_LIMIT_SWEEP_SECS));
        loop {
            ticker.tick().await;
            let removed = app_state.rate_limiter.sweep();
            if removed > 0 {
                info!(removed, remaining = app_state.rate_limiter.len(), "Swept expired rate limit windows.");
            }
        }
    });
}

fn spawn_news_collector(app_state: Arc<AppState>) {
    let interval_secs = app_state.config.news.interval_secs;
    if interval_secs == 0 {
        return;
    }
    let Some(source) = app_state.news_source.clone() else {
        warn!("News collection interval set but no news source is configured.");
        return;
    };

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs, "News collection task started.");
        loop {
            ticker.tick().await;
            if let Err(e) = collection_service::run_collection(
                &app_state.db,
                source.as_ref(),
                &app_state.config.news.keywords,
            )
            .await
            {
                error!(error = %e, "Scheduled news collection failed.");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("Server version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    let server_config = Arc::new(ServerConfig::load(args.config.as_deref())?);
    init_logging(&server_config.log_dir);
    info!("Starting server, version: {}", VERSION);

    let database = db::connect(&server_config).await?;
    if let Err(e) = db::init_indexes(&database).await {
        // The driver reconnects on demand; requests surface the outage until then.
        error!(error = %e, "Failed to create indexes. Is the database reachable?");
    }

    let app_state = Arc::new(AppState::new(database, server_config.clone()));
    spawn_rate_limit_sweeper(app_state.clone());
    spawn_news_collector(app_state.clone());

    let app = web::create_axum_router(app_state);

    let addr: SocketAddr = server_config.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Box::new)?;

    info!("Server stopped.");
    Ok(())
}
