use clap::{Parser, Subcommand};
use modelpulse::config::AppConfig;
use modelpulse::dashboard::{self, DashboardState};
use modelpulse::fingerprint::{FingerprintThrottler, MachineCollector, SqliteKvStore};
use modelpulse::storage;
use modelpulse::upstream::UpstreamClient;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Parser)]
#[command(
    name = "modelpulse",
    about = "Model health dashboards for a model gateway"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the dashboard API (default)
    Serve,
    /// Collect and report this machine's fingerprint once, then exit
    ReportFingerprint {
        /// Report even if the last report is recent
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelpulse=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))?;

    if let Err(msg) = config.validate() {
        eprintln!("Configuration error: {msg}");
        return Err(msg.into());
    }

    let pool = storage::sqlite::create_pool(&config.database)?;
    storage::sqlite::init_pool(&pool).await?;
    tracing::info!(db = %config.database.path.display(), "database initialized");

    let upstream = UpstreamClient::new(&config.upstream)?;

    let throttler = if config.fingerprint.enabled {
        Some(Arc::new(FingerprintThrottler::new(
            Arc::new(SqliteKvStore::new(pool.clone())),
            Arc::new(MachineCollector::new()),
            Arc::new(upstream.clone()),
            config.fingerprint.report_interval_ms,
        )))
    } else {
        None
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::ReportFingerprint { force } => {
            let Some(throttler) = throttler else {
                return Err("fingerprint reporting is disabled in config".into());
            };
            let visitor_id = throttler.collect_and_report(force).await?;
            match visitor_id {
                Some(id) => println!("{id}"),
                None => println!("no fingerprint reported yet"),
            }
            Ok(())
        }
        Command::Serve => serve(config, pool, upstream, throttler).await,
    }
}

async fn serve(
    config: AppConfig,
    pool: deadpool_sqlite::Pool,
    upstream: UpstreamClient,
    throttler: Option<Arc<FingerprintThrottler>>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        upstream = %config.upstream.base_url,
        "starting modelpulse"
    );

    if config.fingerprint.report_on_startup {
        if let Some(throttler) = throttler.clone() {
            tokio::spawn(async move {
                match throttler.collect_and_report(false).await {
                    Ok(Some(id)) => tracing::info!(visitor_id = %id, "fingerprint ready"),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "startup fingerprint report failed"),
                }
            });
        }
    }

    let state = Arc::new(DashboardState::new(
        upstream,
        pool,
        config.thresholds.clone(),
        config.upstream.models_cache_ttl_secs,
        throttler,
    ));
    let app = dashboard::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    tracing::info!("shutting down...");
}
